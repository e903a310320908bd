//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//
// Sponsored by NLnet as part of the Next Generation Internet initiative.
// See: https://nlnet.nl/NGI0
//

use holo_utils::ip::{AddressFamily, IpNetworkExt};
use holo_utils::mpls::{Label, LabelRange};
use holo_utils::sr::{Sid, SidLastHopBehavior};
use ipnetwork::IpNetwork;
use serde::Serialize;

use crate::collections::Nodes;
use crate::error::{Error, InconsistentError};
use crate::nhlfe::Nhlfe;
use crate::packet::{PrefixSidStlv, SystemId};
use crate::spf::{SpfNexthop, SpfRoute};

// Advertised Prefix-SID.
#[derive(Debug)]
#[derive(Serialize)]
pub struct SrPrefix {
    pub prefix: IpNetwork,
    pub sid: PrefixSidStlv,
    pub status: SidStatus,
    pub nhlfes: Vec<Nhlfe>,
    pub owner: SystemId,
    // Local input label, resolved using the local SRGB.
    pub sr_label: Option<Label>,
}

// Processing status of an SR prefix since it was last committed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Serialize)]
pub enum SidStatus {
    // No input label could be resolved during the last commit.
    Idle,
    New,
    Modified,
    Unchanged,
}

// ===== impl SrPrefix =====

impl SrPrefix {
    pub(crate) fn new(
        prefix: IpNetwork,
        sid: PrefixSidStlv,
        owner: SystemId,
    ) -> SrPrefix {
        SrPrefix {
            prefix,
            sid,
            status: SidStatus::New,
            nhlfes: Default::default(),
            owner,
            sr_label: None,
        }
    }

    // Records newly received SID parameters.
    //
    // A prefix that wasn't committed yet stays new.
    pub(crate) fn update(&mut self, sid: PrefixSidStlv) {
        if self.status == SidStatus::New {
            self.sid = sid;
            return;
        }

        if self.sid != sid {
            self.sid = sid;
            self.status = SidStatus::Modified;
        } else {
            self.status = SidStatus::Unchanged;
        }
    }

    // Returns whether the prefix has changes waiting to be committed.
    pub fn is_pending(&self) -> bool {
        matches!(self.status, SidStatus::New | SidStatus::Modified)
    }
}

// ===== global functions =====

// Maps a SID to an MPLS label using the given SRGB.
pub fn sid_to_label(srgb: &LabelRange, sid: &Sid) -> Result<Label, Error> {
    match *sid {
        Sid::Index(index) => {
            if index >= srgb.size() {
                return Err(Error::OutOfRange {
                    index,
                    srgb: *srgb,
                });
            }
            Ok(Label::new(srgb.lower_bound + index))
        }
        Sid::Label(label) => Ok(label),
    }
}

// Resolves the MPLS label to push when forwarding traffic for the prefix
// through the given nexthop.
pub(crate) fn prefix_sid_output_label(
    prefix: &IpNetwork,
    sid: &PrefixSidStlv,
    route: &SpfRoute,
    nexthop: &SpfNexthop,
    nodes: &Nodes,
) -> Result<Label, Error> {
    let af = prefix.address_family();

    // Handle the penultimate hop.
    if route.is_last_hop(nexthop) {
        match sid.last_hop_behavior() {
            SidLastHopBehavior::Php => {
                return Ok(Label::new(Label::IMPLICIT_NULL));
            }
            SidLastHopBehavior::ExpNull => {
                let label = match af {
                    AddressFamily::Ipv4 => Label::IPV4_EXPLICIT_NULL,
                    AddressFamily::Ipv6 => Label::IPV6_EXPLICIT_NULL,
                };
                return Ok(Label::new(label));
            }
            SidLastHopBehavior::NoPhp => (),
        }
    }

    // The SID is resolved using the SRGB of the nexthop router.
    let nbr = nodes.try_get(&nexthop.system_id)?;
    if !nbr.supports_af(af) {
        return Err(Error::Inconsistent(InconsistentError::UnsupportedAf(
            nbr.system_id,
            af,
        )));
    }
    sid_to_label(&nbr.cap.srgb, &sid.sid)
}
