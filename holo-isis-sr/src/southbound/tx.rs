//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//
// Sponsored by NLnet as part of the Next Generation Internet initiative.
// See: https://nlnet.nl/NGI0
//

use std::collections::BTreeSet;

use holo_utils::ibus::{IbusMsg, IbusSender};
use holo_utils::mpls::Label;
use holo_utils::southbound::{LabelInstallMsg, LabelUninstallMsg, Nexthop};
use ipnetwork::IpNetwork;

use crate::nhlfe::Nhlfe;

// ===== global functions =====

pub(crate) fn nhlfe_install(
    ibus_tx: &IbusSender,
    nhlfe: &Nhlfe,
    label_in: Label,
    label_out: Label,
    route: Option<&IpNetwork>,
    replace: bool,
) {
    let msg = LabelInstallMsg {
        label: label_in,
        nexthops: nexthops(nhlfe, vec![label_out]),
        route: route.copied(),
        replace,
    };
    let msg = IbusMsg::MplsLabelInstall(msg);
    let _ = ibus_tx.send(msg);
}

pub(crate) fn nhlfe_uninstall(
    ibus_tx: &IbusSender,
    nhlfe: &Nhlfe,
    label_in: Label,
    route: Option<&IpNetwork>,
) {
    let msg = LabelUninstallMsg {
        label: label_in,
        nexthops: nexthops(nhlfe, vec![]),
        route: route.copied(),
    };
    let msg = IbusMsg::MplsLabelUninstall(msg);
    let _ = ibus_tx.send(msg);
}

// ===== helper functions =====

fn nexthops(nhlfe: &Nhlfe, labels: Vec<Label>) -> BTreeSet<Nexthop> {
    [Nexthop::Address {
        ifindex: nhlfe.ifindex,
        addr: nhlfe.nexthop,
        labels,
    }]
    .into()
}
