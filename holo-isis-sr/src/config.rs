//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//
// Sponsored by NLnet as part of the Next Generation Internet initiative.
// See: https://nlnet.nl/NGI0
//

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use holo_utils::mpls::LabelRange;
use holo_utils::sr::{IgpAlgoType, SrCfgLabelRange, SrCfgPrefixSid};
use ipnetwork::IpNetwork;
use maplit::btreeset;
use serde::{Deserialize, Serialize};

// Local range from which Adjacency-SID labels are allocated.
pub const ADJ_SID_RANGE: LabelRange = LabelRange {
    lower_bound: 5000,
    upper_bound: 5999,
};

// Per-area Segment Routing configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SrDbCfg {
    pub srgb: SrCfgLabelRange,
    pub msd: u8,
    pub algorithms: BTreeSet<IgpAlgoType>,
    // Debounce delay of the recomputation pass, in milliseconds.
    pub update_delay: u32,
    // How long an unactive NHLFE is kept for reactivation, in seconds.
    pub nhlfe_hold_time: u32,
    pub prefix_sids: BTreeMap<IpNetwork, SrCfgPrefixSid>,
}

// ===== impl SrDbCfg =====

impl SrDbCfg {
    pub const DFLT_SRGB_LOWER: u32 = 16000;
    pub const DFLT_SRGB_UPPER: u32 = 23999;
    pub const DFLT_MSD: u8 = 16;
    pub const DFLT_UPDATE_DELAY: u32 = 100;
    pub const DFLT_NHLFE_HOLD_TIME: u32 = 60;

    pub fn srgb(&self) -> LabelRange {
        self.srgb.into()
    }

    pub(crate) fn update_delay(&self) -> Duration {
        Duration::from_millis(self.update_delay.into())
    }

    pub(crate) fn nhlfe_hold_time(&self) -> Duration {
        Duration::from_secs(self.nhlfe_hold_time.into())
    }
}

impl Default for SrDbCfg {
    fn default() -> SrDbCfg {
        SrDbCfg {
            srgb: SrCfgLabelRange::new(
                Self::DFLT_SRGB_LOWER,
                Self::DFLT_SRGB_UPPER,
            ),
            msd: Self::DFLT_MSD,
            algorithms: btreeset![IgpAlgoType::Spf],
            update_delay: Self::DFLT_UPDATE_DELAY,
            nhlfe_hold_time: Self::DFLT_NHLFE_HOLD_TIME,
            prefix_sids: Default::default(),
        }
    }
}
