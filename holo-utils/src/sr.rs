//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::mpls::{Label, LabelRange};

// IGP Algorithm Types.
//
// IANA registry:
// https://www.iana.org/assignments/igp-parameters/igp-parameters.xhtml#igp-algorithm-types
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum IgpAlgoType {
    Spf = 0,
    StrictSpf = 1,
}

// Segment Routing SID.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum Sid {
    Index(u32),
    Label(Label),
}

// Prefix-SID last-hop behavior.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SidLastHopBehavior {
    ExpNull,
    NoPhp,
    Php,
}

// Prefix-SID configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq, new)]
#[derive(Deserialize, Serialize)]
pub struct SrCfgPrefixSid {
    pub sid: Sid,
    pub last_hop: SidLastHopBehavior,
    #[serde(default = "SrCfgPrefixSid::default_algo")]
    pub algo: IgpAlgoType,
}

// Label range configuration.
#[derive(Clone, Copy, Debug, Eq, Ord, new, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct SrCfgLabelRange {
    pub lower_bound: u32,
    pub upper_bound: u32,
}

// ===== impl IgpAlgoType =====

impl std::fmt::Display for IgpAlgoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IgpAlgoType::Spf => write!(f, "spf"),
            IgpAlgoType::StrictSpf => write!(f, "strict-spf"),
        }
    }
}

// ===== impl Sid =====

impl std::fmt::Display for Sid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sid::Index(index) => write!(f, "index {}", index),
            Sid::Label(label) => write!(f, "label {}", label),
        }
    }
}

// ===== impl SidLastHopBehavior =====

impl std::fmt::Display for SidLastHopBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SidLastHopBehavior::ExpNull => write!(f, "explicit-null"),
            SidLastHopBehavior::NoPhp => write!(f, "no-php"),
            SidLastHopBehavior::Php => write!(f, "php"),
        }
    }
}

// ===== impl SrCfgPrefixSid =====

impl SrCfgPrefixSid {
    fn default_algo() -> IgpAlgoType {
        IgpAlgoType::Spf
    }
}

// ===== impl SrCfgLabelRange =====

impl From<SrCfgLabelRange> for LabelRange {
    fn from(range: SrCfgLabelRange) -> LabelRange {
        LabelRange::new(range.lower_bound, range.upper_bound)
    }
}

impl From<LabelRange> for SrCfgLabelRange {
    fn from(range: LabelRange) -> SrCfgLabelRange {
        SrCfgLabelRange::new(range.lower_bound, range.upper_bound)
    }
}
