//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use serde::{Deserialize, Serialize};

use crate::southbound::{LabelInstallMsg, LabelUninstallMsg};
use crate::{UnboundedReceiver, UnboundedSender};

// Useful type definition(s).
pub type IbusReceiver = UnboundedReceiver<IbusMsg>;
pub type IbusSender = UnboundedSender<IbusMsg>;

// Messages exchanged with the dataplane.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum IbusMsg {
    // Install or replace an MPLS forwarding entry.
    MplsLabelInstall(LabelInstallMsg),
    // Withdraw an MPLS forwarding entry.
    MplsLabelUninstall(LabelUninstallMsg),
}

// ===== global functions =====

// Creates a new pair of ibus channels.
pub fn channel() -> (IbusSender, IbusReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}
