//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeSet;
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::mpls::Label;

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum Nexthop {
    Address {
        ifindex: u32,
        addr: IpAddr,
        labels: Vec<Label>,
    },
    Interface {
        ifindex: u32,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct LabelInstallMsg {
    pub label: Label,
    pub nexthops: BTreeSet<Nexthop>,
    pub route: Option<IpNetwork>,
    pub replace: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct LabelUninstallMsg {
    pub label: Label,
    pub nexthops: BTreeSet<Nexthop>,
    pub route: Option<IpNetwork>,
}
