//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//
// Sponsored by NLnet as part of the Next Generation Internet initiative.
// See: https://nlnet.nl/NGI0
//

use std::collections::BTreeSet;

use holo_utils::ip::AddressFamily;
use ipnetwork::IpNetwork;
use serde::Serialize;

use crate::collections::AdjacencyKey;
use crate::packet::{RouterCap, SrCapabilitiesFlags, SystemId};

// Router known from the link-state database that advertises SR capabilities.
#[derive(Debug)]
#[derive(Serialize)]
pub struct SrNode {
    pub system_id: SystemId,
    pub cap: RouterCap,
    // Prefix-SIDs owned by this node, as keys into the Prefix Registry.
    pub prefix_sids: BTreeSet<IpNetwork>,
    // Adjacency-SIDs owned by this node, as keys into the Adjacency Registry.
    pub adj_sids: BTreeSet<AdjacencyKey>,
    // Set to the local System ID while this node is a direct neighbor.
    pub neighbor: Option<SystemId>,
    pub area: String,
}

// ===== impl SrNode =====

impl SrNode {
    pub(crate) fn new(system_id: SystemId, cap: RouterCap, area: &str) -> SrNode {
        SrNode {
            system_id,
            cap,
            prefix_sids: Default::default(),
            adj_sids: Default::default(),
            neighbor: None,
            area: area.to_owned(),
        }
    }

    // Returns whether the node supports SR-MPLS for the given address family.
    pub fn supports_af(&self, af: AddressFamily) -> bool {
        match af {
            AddressFamily::Ipv4 => {
                self.cap.flags.contains(SrCapabilitiesFlags::I)
            }
            AddressFamily::Ipv6 => {
                self.cap.flags.contains(SrCapabilitiesFlags::V)
            }
        }
    }

    pub fn is_neighbor(&self) -> bool {
        self.neighbor.is_some()
    }
}
