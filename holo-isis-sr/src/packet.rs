//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//
// Sponsored by NLnet as part of the Next Generation Internet initiative.
// See: https://nlnet.nl/NGI0
//

//! Decoded IS-IS Segment Routing advertisements.
//!
//! TLV parsing happens in the IS-IS core. The records below are what it hands
//! over once the Router Capability TLV (242) and the Extended Reachability
//! TLVs (22, 135, 236) of an LSP have been decoded.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::str::FromStr;

use bitflags::bitflags;
use derive_new::new;
use holo_utils::ip::IpNetworkExt;
use holo_utils::mpls::LabelRange;
use holo_utils::sr::{IgpAlgoType, Sid, SidLastHopBehavior, SrCfgPrefixSid};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

// Represents an IS-IS System ID.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct SystemId([u8; 6]);

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct PrefixSidFlags: u8 {
        const R = 0x80;
        const N = 0x40;
        const P = 0x20;
        const E = 0x10;
        const V = 0x08;
        const L = 0x04;
    }
}

// Prefix-SID Sub-TLV.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct PrefixSidStlv {
    pub flags: PrefixSidFlags,
    pub algo: IgpAlgoType,
    pub sid: Sid,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct AdjSidFlags: u8 {
        const F = 0x80;
        const B = 0x40;
        const V = 0x20;
        const L = 0x10;
        const S = 0x08;
        const P = 0x04;
    }
}

// Adjacency-SID and LAN-Adjacency-SID Sub-TLVs.
//
// The neighbor System ID is only present in LAN-Adjacency-SIDs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct AdjSidStlv {
    pub flags: AdjSidFlags,
    pub weight: u8,
    pub nbr_system_id: Option<SystemId>,
    pub sid: Sid,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct SrCapabilitiesFlags: u8 {
        const I = 0x80;
        const V = 0x40;
    }
}

// Segment Routing information from the Router Capability TLV.
//
// Only a single SRGB range is supported.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct RouterCap {
    pub flags: SrCapabilitiesFlags,
    pub srgb: LabelRange,
    pub algos: BTreeSet<IgpAlgoType>,
    pub msd: Option<u8>,
}

// Adjacency-SID advertised in an Extended IS Reachability TLV.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct NodeAdjSid {
    // Adjacency endpoint address.
    pub addr: IpAddr,
    pub stlv: AdjSidStlv,
}

// SR-relevant content of all LSP fragments originated by a node.
#[derive(Clone, Debug, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct NodeLsp {
    pub system_id: SystemId,
    pub sr_cap: Option<RouterCap>,
    #[new(default)]
    #[serde(default)]
    pub prefix_sids: BTreeMap<IpNetwork, PrefixSidStlv>,
    #[new(default)]
    #[serde(default)]
    pub adj_sids: Vec<NodeAdjSid>,
}

// ===== impl SystemId =====

impl AsRef<[u8]> for SystemId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 6]> for SystemId {
    fn from(bytes: [u8; 6]) -> SystemId {
        SystemId(bytes)
    }
}

impl std::fmt::Display for SystemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes = &self.0;
        write!(
            f,
            "{:02X}{:02X}.{:02X}{:02X}.{:02X}{:02X}",
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]
        )
    }
}

// Parses the "XXXX.XXXX.XXXX" notation.
impl FromStr for SystemId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.split('.').collect::<String>();
        if digits.len() != 12 {
            return Err(());
        }

        let mut bytes = [0; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = digits.get(i * 2..i * 2 + 2).ok_or(())?;
            *byte = u8::from_str_radix(pair, 16).map_err(|_| ())?;
        }
        Ok(SystemId(bytes))
    }
}

// ===== impl PrefixSidStlv =====

impl PrefixSidStlv {
    // Builds the Prefix-SID advertised for a locally configured prefix.
    pub fn from_cfg(prefix: &IpNetwork, cfg: &SrCfgPrefixSid) -> Self {
        let mut flags = match cfg.last_hop {
            SidLastHopBehavior::ExpNull => PrefixSidFlags::P | PrefixSidFlags::E,
            SidLastHopBehavior::NoPhp => PrefixSidFlags::P,
            SidLastHopBehavior::Php => PrefixSidFlags::empty(),
        };
        if prefix.is_host_prefix() {
            flags.insert(PrefixSidFlags::N);
        }
        if let Sid::Label(_) = cfg.sid {
            flags.insert(PrefixSidFlags::V | PrefixSidFlags::L);
        }
        PrefixSidStlv::new(flags, cfg.algo, cfg.sid)
    }

    // Returns the behavior the penultimate hop must apply.
    pub fn last_hop_behavior(&self) -> SidLastHopBehavior {
        if self.flags.contains(PrefixSidFlags::E) {
            SidLastHopBehavior::ExpNull
        } else if self.flags.contains(PrefixSidFlags::P) {
            SidLastHopBehavior::NoPhp
        } else {
            SidLastHopBehavior::Php
        }
    }
}

// ===== impl AdjSidStlv =====

impl AdjSidStlv {
    pub fn is_lan(&self) -> bool {
        self.nbr_system_id.is_some()
    }
}

// ===== impl RouterCap =====

impl RouterCap {
    // Returns whether the advertised SRGB is usable.
    pub fn is_valid(&self) -> bool {
        self.srgb.is_valid()
    }
}
