//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//
// Sponsored by NLnet as part of the Next Generation Internet initiative.
// See: https://nlnet.nl/NGI0
//

use std::collections::BTreeSet;
use std::net::IpAddr;

use derive_new::new;
use holo_utils::ip::{AddressFamily, IpAddrExt};
use serde::{Deserialize, Serialize};

use crate::collections::{AdjacencyId, AdjacencyKey};
use crate::nhlfe::Nhlfe;
use crate::packet::{AdjSidStlv, SystemId};

// Advertised Adjacency-SID or LAN-Adjacency-SID.
#[derive(Debug)]
#[derive(Serialize)]
pub struct SrAdjacency {
    pub key: AdjacencyKey,
    // Adjacency endpoint address.
    pub addr: IpAddr,
    // Unset while no label could be allocated.
    pub adj_sid: Option<AdjSidStlv>,
    pub nhlfe: Nhlfe,
    pub owner: SystemId,
    // Underlying protocol adjacency (local Adjacency-SIDs only).
    pub adj_id: Option<AdjacencyId>,
}

// Protocol adjacency reported by the IS-IS core.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct AdjacencyInfo {
    pub adj_id: AdjacencyId,
    pub nbr_system_id: SystemId,
    pub ifindex: u32,
    // Whether the adjacency was formed over a broadcast circuit.
    pub broadcast: bool,
    pub nbr_addrs: BTreeSet<IpAddr>,
}

// ===== impl SrAdjacency =====

impl SrAdjacency {
    pub(crate) fn new_local(
        adj: &AdjacencyInfo,
        af: AddressFamily,
        addr: IpAddr,
        owner: SystemId,
    ) -> SrAdjacency {
        SrAdjacency {
            key: AdjacencyKey::Local(adj.adj_id, af),
            addr,
            adj_sid: None,
            nhlfe: Nhlfe::new(addr, adj.ifindex, Some(adj.nbr_system_id)),
            owner,
            adj_id: Some(adj.adj_id),
        }
    }

    pub(crate) fn new_remote(
        owner: SystemId,
        addr: IpAddr,
        adj_sid: AdjSidStlv,
    ) -> SrAdjacency {
        SrAdjacency {
            key: AdjacencyKey::Remote(owner, addr, adj_sid.nbr_system_id),
            addr,
            adj_sid: Some(adj_sid),
            nhlfe: Nhlfe::new(addr, 0, adj_sid.nbr_system_id),
            owner,
            adj_id: None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.adj_id.is_some()
    }
}

// ===== impl AdjacencyInfo =====

impl AdjacencyInfo {
    // Returns the first neighbor address of each address family.
    pub fn nbr_addrs_by_af(
        &self,
    ) -> impl Iterator<Item = (AddressFamily, IpAddr)> + '_ {
        [AddressFamily::Ipv4, AddressFamily::Ipv6]
            .into_iter()
            .filter_map(|af| {
                self.nbr_addrs
                    .iter()
                    .find(|addr| addr.address_family() == af)
                    .map(|addr| (af, *addr))
            })
    }
}
