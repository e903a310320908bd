//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//
// Sponsored by NLnet as part of the Next Generation Internet initiative.
// See: https://nlnet.nl/NGI0
//

use holo_utils::ip::AddressFamily;
use holo_utils::mpls::{Label, LabelManagerError, LabelRange};
use ipnetwork::IpNetwork;
use tracing::{error, warn};

use crate::collections::{AdjacencyId, PrefixIndex};
use crate::nhlfe::{NhlfeEvent, NhlfeState};
use crate::packet::SystemId;

// Segment Routing database errors.
#[derive(Debug)]
pub enum Error {
    // Label range or label can't be reserved or allocated.
    ResourceExhausted(LabelManagerError),
    // Index-type SID exceeds the SRGB span.
    OutOfRange { index: u32, srgb: LabelRange },
    // Computed label stack exceeds the advertised MSD.
    StackDepthExceeded {
        prefix: IpNetwork,
        depth: u8,
        msd: u8,
    },
    Inconsistent(InconsistentError),
    NotFound(NotFoundError),
}

#[derive(Debug)]
pub enum InconsistentError {
    DuplicateSystemId(SystemId),
    InvalidSrCapability(SystemId),
    InvalidSrgb(LabelRange),
    MissingSelfNode,
    SelfNodePurge,
    PrefixOwnerConflict(IpNetwork, SystemId, SystemId),
    SidConflict(IpNetwork, Label),
    UnsupportedAf(SystemId, AddressFamily),
    NhlfeUnexpectedEvent(NhlfeState, NhlfeEvent),
}

#[derive(Debug)]
pub enum NotFoundError {
    Area(String),
    Node(SystemId),
    Prefix(IpNetwork),
    PrefixIndex(PrefixIndex),
    PrefixCfg(IpNetwork),
    Adjacency(AdjacencyId),
}

// ===== impl Error =====

impl Error {
    pub fn log(&self) {
        match self {
            Error::ResourceExhausted(error) => {
                error!(error = %with_source(error), "{}", self);
            }
            Error::OutOfRange { index, srgb } => {
                warn!(%index, %srgb, "{}", self);
            }
            Error::StackDepthExceeded { prefix, depth, msd } => {
                warn!(%prefix, %depth, %msd, "{}", self);
            }
            Error::Inconsistent(error) => {
                error.log();
            }
            Error::NotFound(error) => {
                error.log();
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ResourceExhausted(..) => {
                write!(f, "failed to reserve MPLS labels")
            }
            Error::OutOfRange { .. } => {
                write!(f, "SID index falls outside the SRGB")
            }
            Error::StackDepthExceeded { .. } => {
                write!(f, "label stack exceeds the maximum SID depth")
            }
            Error::Inconsistent(error) => error.fmt(f),
            Error::NotFound(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ResourceExhausted(error) => Some(error),
            Error::Inconsistent(error) => Some(error),
            Error::NotFound(error) => Some(error),
            _ => None,
        }
    }
}

impl From<LabelManagerError> for Error {
    fn from(error: LabelManagerError) -> Error {
        Error::ResourceExhausted(error)
    }
}

impl From<InconsistentError> for Error {
    fn from(error: InconsistentError) -> Error {
        Error::Inconsistent(error)
    }
}

impl From<NotFoundError> for Error {
    fn from(error: NotFoundError) -> Error {
        Error::NotFound(error)
    }
}

// ===== impl InconsistentError =====

impl InconsistentError {
    pub(crate) fn log(&self) {
        match self {
            InconsistentError::DuplicateSystemId(system_id)
            | InconsistentError::InvalidSrCapability(system_id) => {
                warn!(%system_id, "{}", self);
            }
            InconsistentError::InvalidSrgb(srgb) => {
                warn!(%srgb, "{}", self);
            }
            InconsistentError::MissingSelfNode => {
                error!("{}", self);
            }
            InconsistentError::SelfNodePurge => {
                warn!("{}", self);
            }
            InconsistentError::PrefixOwnerConflict(prefix, owner, system_id) => {
                warn!(%prefix, %owner, %system_id, "{}", self);
            }
            InconsistentError::SidConflict(prefix, label) => {
                warn!(%prefix, %label, "{}", self);
            }
            InconsistentError::UnsupportedAf(system_id, af) => {
                warn!(%system_id, %af, "{}", self);
            }
            InconsistentError::NhlfeUnexpectedEvent(state, event) => {
                error!(?state, ?event, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for InconsistentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InconsistentError::DuplicateSystemId(..) => {
                write!(f, "duplicate System-ID")
            }
            InconsistentError::InvalidSrCapability(..) => {
                write!(f, "malformed SR capabilities")
            }
            InconsistentError::InvalidSrgb(..) => {
                write!(f, "invalid SRGB")
            }
            InconsistentError::MissingSelfNode => {
                write!(f, "missing self node")
            }
            InconsistentError::SelfNodePurge => {
                write!(f, "attempt to purge the self node")
            }
            InconsistentError::PrefixOwnerConflict(..) => {
                write!(f, "prefix already advertised by another node")
            }
            InconsistentError::SidConflict(..) => {
                write!(f, "Prefix-SID label already in use")
            }
            InconsistentError::UnsupportedAf(..) => {
                write!(
                    f,
                    "next-hop router doesn't support SR-MPLS for the address family"
                )
            }
            InconsistentError::NhlfeUnexpectedEvent(..) => {
                write!(f, "unexpected NHLFE FSM event")
            }
        }
    }
}

impl std::error::Error for InconsistentError {}

// ===== impl NotFoundError =====

impl NotFoundError {
    pub(crate) fn log(&self) {
        match self {
            NotFoundError::Area(area) => {
                warn!(%area, "{}", self);
            }
            NotFoundError::Node(system_id) => {
                warn!(%system_id, "{}", self);
            }
            NotFoundError::Prefix(prefix) | NotFoundError::PrefixCfg(prefix) => {
                warn!(%prefix, "{}", self);
            }
            NotFoundError::PrefixIndex(srp_idx) => {
                warn!(?srp_idx, "{}", self);
            }
            NotFoundError::Adjacency(adj_id) => {
                warn!(%adj_id, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotFoundError::Area(..) => {
                write!(f, "area not found")
            }
            NotFoundError::Node(..) => {
                write!(f, "failed to find SR node")
            }
            NotFoundError::Prefix(..) | NotFoundError::PrefixIndex(..) => {
                write!(f, "failed to find SR prefix")
            }
            NotFoundError::PrefixCfg(..) => {
                write!(f, "Prefix-SID not configured")
            }
            NotFoundError::Adjacency(..) => {
                write!(f, "adjacency ID not found")
            }
        }
    }
}

impl std::error::Error for NotFoundError {}

// ===== helper functions =====

fn with_source<E: std::error::Error>(error: E) -> String {
    if let Some(source) = error.source() {
        format!("{} ({})", error, with_source(source))
    } else {
        error.to_string()
    }
}
