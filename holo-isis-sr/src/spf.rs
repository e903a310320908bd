//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//
// Sponsored by NLnet as part of the Next Generation Internet initiative.
// See: https://nlnet.nl/NGI0
//

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use derive_new::new;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::packet::SystemId;

// Output of an SPF run, as delivered by the IS-IS core.
#[derive(Clone, Debug, Default, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct SpfResult {
    pub routes: BTreeMap<IpNetwork, SpfRoute>,
}

// Shortest-path route towards a destination prefix.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct SpfRoute {
    // System ID of the router advertising the destination.
    pub adv_system_id: SystemId,
    // Equal-cost nexthops.
    pub nexthops: BTreeSet<SpfNexthop>,
}

// Route nexthop.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct SpfNexthop {
    // Nexthop address.
    pub addr: IpAddr,
    // Nexthop interface.
    pub ifindex: u32,
    // System ID of the nexthop router.
    pub system_id: SystemId,
}

// ===== impl SpfResult =====

impl SpfResult {
    pub fn route(&self, prefix: &IpNetwork) -> Option<&SpfRoute> {
        self.routes.get(prefix)
    }
}

// ===== impl SpfRoute =====

impl SpfRoute {
    // Returns whether the given nexthop is the penultimate hop towards the
    // destination, i.e. the nexthop router is the one advertising it.
    pub fn is_last_hop(&self, nexthop: &SpfNexthop) -> bool {
        nexthop.system_id == self.adv_system_id
    }
}
