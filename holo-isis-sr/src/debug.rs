//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//
// Sponsored by NLnet as part of the Next Generation Internet initiative.
// See: https://nlnet.nl/NGI0
//

use std::time::Duration;

use holo_utils::mpls::LabelRange;
use holo_utils::sr::IgpAlgoType;
use ipnetwork::IpNetwork;
use tracing::{debug, debug_span};

use crate::adjacency::SrAdjacency;
use crate::nhlfe::{Nhlfe, NhlfeEvent, NhlfeState};
use crate::packet::SystemId;
use crate::prefix::SrPrefix;

// Segment Routing debug messages.
#[derive(Debug)]
pub enum Debug<'a> {
    // Database
    SrEnable,
    SrDisable,
    LabelRangeReserve(&'a LabelRange),
    LabelRangeRelease(&'a LabelRange),
    // Nodes
    NodeCreate(&'a SystemId),
    NodeUpdate(&'a SystemId),
    NodeDelete(&'a SystemId),
    LspIgnoreSelf,
    // Prefixes
    PrefixAdd(&'a SrPrefix),
    PrefixUpdate(&'a SrPrefix),
    PrefixDelete(&'a SrPrefix),
    PrefixUnsupportedAlgo(&'a SystemId, &'a IpNetwork, IgpAlgoType),
    // Adjacencies
    AdjSidAdd(&'a SrAdjacency),
    AdjSidDelete(&'a SrAdjacency),
    // NHLFEs
    NhlfeTransition(&'a Nhlfe, NhlfeState, NhlfeEvent),
    // Recomputation
    UpdateTimerStart(Duration),
    UpdateTimerExpiry,
    UpdatePassStart,
    UpdatePassEnd(u64),
}

// ===== impl Debug =====

impl Debug<'_> {
    // Log debug message using the tracing API.
    pub(crate) fn log(&self) {
        match self {
            Debug::SrEnable
            | Debug::SrDisable
            | Debug::LspIgnoreSelf
            | Debug::UpdateTimerExpiry
            | Debug::UpdatePassStart => {
                // Parent span(s): sr
                debug!("{}", self);
            }
            Debug::LabelRangeReserve(range) | Debug::LabelRangeRelease(range) => {
                // Parent span(s): sr
                debug!(%range, "{}", self);
            }
            Debug::NodeCreate(system_id)
            | Debug::NodeUpdate(system_id)
            | Debug::NodeDelete(system_id) => {
                // Parent span(s): sr
                debug_span!("node", %system_id).in_scope(|| {
                    debug!("{}", self);
                })
            }
            Debug::PrefixAdd(srp)
            | Debug::PrefixUpdate(srp)
            | Debug::PrefixDelete(srp) => {
                // Parent span(s): sr
                debug_span!("prefix", prefix = %srp.prefix).in_scope(|| {
                    debug!(owner = %srp.owner, sid = %srp.sid.sid, status = ?srp.status, "{}", self);
                })
            }
            Debug::PrefixUnsupportedAlgo(system_id, prefix, algo) => {
                // Parent span(s): sr
                debug_span!("node", %system_id).in_scope(|| {
                    debug!(%prefix, %algo, "{}", self);
                })
            }
            Debug::AdjSidAdd(sra) | Debug::AdjSidDelete(sra) => {
                // Parent span(s): sr
                debug_span!("adjacency", owner = %sra.owner, addr = %sra.addr)
                    .in_scope(|| {
                        if let Some(label) = sra.nhlfe.label_in {
                            debug!(%label, "{}", self);
                        } else {
                            debug!(label = "none", "{}", self);
                        }
                    })
            }
            Debug::NhlfeTransition(nhlfe, old_state, event) => {
                // Parent span(s): sr
                debug_span!("nhlfe", nexthop = %nhlfe.nexthop, ifindex = %nhlfe.ifindex)
                    .in_scope(|| {
                        debug!(?old_state, ?event, new_state = ?nhlfe.state, "{}", self);
                    })
            }
            Debug::UpdateTimerStart(delay) => {
                // Parent span(s): sr
                debug!(?delay, "{}", self);
            }
            Debug::UpdatePassEnd(count) => {
                // Parent span(s): sr
                debug!(%count, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Debug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::SrEnable => {
                write!(f, "enabling segment routing")
            }
            Debug::SrDisable => {
                write!(f, "disabling segment routing")
            }
            Debug::LabelRangeReserve(..) => {
                write!(f, "label range reserved")
            }
            Debug::LabelRangeRelease(..) => {
                write!(f, "label range released")
            }
            Debug::NodeCreate(..) => {
                write!(f, "node created")
            }
            Debug::NodeUpdate(..) => {
                write!(f, "node capabilities updated")
            }
            Debug::NodeDelete(..) => {
                write!(f, "node deleted")
            }
            Debug::LspIgnoreSelf => {
                write!(f, "ignoring self-originated LSP")
            }
            Debug::PrefixAdd(..) => {
                write!(f, "Prefix-SID added")
            }
            Debug::PrefixUpdate(..) => {
                write!(f, "Prefix-SID updated")
            }
            Debug::PrefixDelete(..) => {
                write!(f, "Prefix-SID deleted")
            }
            Debug::PrefixUnsupportedAlgo(..) => {
                write!(f, "ignoring Prefix-SID with unsupported algorithm")
            }
            Debug::AdjSidAdd(..) => {
                write!(f, "Adjacency-SID added")
            }
            Debug::AdjSidDelete(..) => {
                write!(f, "Adjacency-SID deleted")
            }
            Debug::NhlfeTransition(..) => {
                write!(f, "NHLFE state transition")
            }
            Debug::UpdateTimerStart(..) => {
                write!(f, "scheduling NHLFE update")
            }
            Debug::UpdateTimerExpiry => {
                write!(f, "NHLFE update timer expired")
            }
            Debug::UpdatePassStart => {
                write!(f, "starting NHLFE update")
            }
            Debug::UpdatePassEnd(..) => {
                write!(f, "NHLFE update finished")
            }
        }
    }
}
