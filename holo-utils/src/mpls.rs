//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeSet;

use derive_new::new;
use serde::{Deserialize, Serialize};

// MPLS label.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct Label(u32);

// MPLS label range.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, new, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct LabelRange {
    pub lower_bound: u32,
    pub upper_bound: u32,
}

// MPLS label manager.
//
// Owns the process-wide label space. Protocol instances reserve label ranges
// for their exclusive use and allocate individual labels either from one of
// their reserved ranges or from the dynamic range.
#[derive(Debug)]
pub struct LabelManager {
    // Label ranges reserved by protocol instances.
    ranges: BTreeSet<LabelRange>,
    // Allocated labels.
    allocated: BTreeSet<Label>,
    // Range used for dynamic label allocations.
    dynamic_range: LabelRange,
}

// Label manager errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LabelManagerError {
    InvalidRange(LabelRange),
    RangeUnavailable(LabelRange),
    RangeNotReserved(LabelRange),
    RangeExhausted(LabelRange),
    LabelInUse(Label),
}

// ===== impl Label =====

impl Label {
    pub const VALUE_MASK: u32 = 0x000FFFFF;

    // Well-known MPLS labels.
    pub const IPV4_EXPLICIT_NULL: u32 = 0;
    pub const ROUTER_ALERT: u32 = 1;
    pub const IPV6_EXPLICIT_NULL: u32 = 2;
    pub const IMPLICIT_NULL: u32 = 3;
    pub const ELI: u32 = 7;
    pub const GAL: u32 = 13;
    pub const OAM_ALERT: u32 = 14;
    pub const EXTENSION: u32 = 15;

    // MPLS label ranges.
    pub const UNRESERVED_RANGE: std::ops::RangeInclusive<u32> = 16..=1048575;

    pub fn new(label: u32) -> Label {
        if label > *Self::UNRESERVED_RANGE.end() {
            panic!("invalid label value: {}", label);
        }
        Label(label)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    // Returns true if this is the implicit-null label, meaning that no label
    // is pushed when forwarding.
    pub fn is_implicit_null(&self) -> bool {
        self.0 == Self::IMPLICIT_NULL
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Label::IPV4_EXPLICIT_NULL => write!(f, "ipv4-explicit-null"),
            Label::ROUTER_ALERT => write!(f, "router-alert"),
            Label::IPV6_EXPLICIT_NULL => write!(f, "ipv6-explicit-null"),
            Label::IMPLICIT_NULL => write!(f, "implicit-null"),
            Label::ELI => write!(f, "entropy-label-indicator"),
            Label::GAL => write!(f, "generic-associated-channel"),
            Label::OAM_ALERT => write!(f, "oam-alert"),
            Label::EXTENSION => write!(f, "extension"),
            _ => write!(f, "{}", self.0),
        }
    }
}

// ===== impl LabelRange =====

impl LabelRange {
    // Returns true if the range is non-empty and only covers unreserved
    // label values.
    pub fn is_valid(&self) -> bool {
        self.lower_bound <= self.upper_bound
            && Label::UNRESERVED_RANGE.contains(&self.lower_bound)
            && Label::UNRESERVED_RANGE.contains(&self.upper_bound)
    }

    // Number of labels in the range.
    pub fn size(&self) -> u32 {
        self.upper_bound - self.lower_bound + 1
    }

    pub fn contains(&self, label: Label) -> bool {
        (self.lower_bound..=self.upper_bound).contains(&label.get())
    }

    pub fn overlaps(&self, other: &LabelRange) -> bool {
        self.lower_bound <= other.upper_bound
            && other.lower_bound <= self.upper_bound
    }
}

impl std::fmt::Display for LabelRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.lower_bound, self.upper_bound)
    }
}

// ===== impl LabelManager =====

impl LabelManager {
    pub const DYNAMIC_RANGE: LabelRange = LabelRange {
        lower_bound: 1_000_000,
        upper_bound: 1_048_575,
    };

    pub fn new(dynamic_range: LabelRange) -> LabelManager {
        LabelManager {
            ranges: Default::default(),
            allocated: Default::default(),
            dynamic_range,
        }
    }

    // Reserves the given label range.
    //
    // The range must not overlap with any other reserved range nor with the
    // dynamic range.
    pub fn range_reserve(
        &mut self,
        range: LabelRange,
    ) -> Result<(), LabelManagerError> {
        if !range.is_valid() {
            return Err(LabelManagerError::InvalidRange(range));
        }
        if range.overlaps(&self.dynamic_range)
            || self.ranges.iter().any(|other| other.overlaps(&range))
        {
            return Err(LabelManagerError::RangeUnavailable(range));
        }

        self.ranges.insert(range);
        Ok(())
    }

    // Releases the given label range, along with all labels that were
    // allocated from it.
    pub fn range_release(&mut self, range: LabelRange) {
        if !self.ranges.remove(&range) {
            return;
        }

        self.allocated.retain(|label| !range.contains(*label));
    }

    // Returns whether the given label range is currently reserved.
    pub fn range_is_reserved(&self, range: &LabelRange) -> bool {
        self.ranges.contains(range)
    }

    // Allocates a label from the dynamic range.
    pub fn label_request(&mut self) -> Result<Label, LabelManagerError> {
        let range = self.dynamic_range;
        self.label_alloc(range)
    }

    // Allocates the lowest free label from a previously reserved range.
    pub fn label_request_from(
        &mut self,
        range: LabelRange,
    ) -> Result<Label, LabelManagerError> {
        if !self.ranges.contains(&range) {
            return Err(LabelManagerError::RangeNotReserved(range));
        }
        self.label_alloc(range)
    }

    // Allocates a specific label from a previously reserved range.
    pub fn label_claim(
        &mut self,
        range: LabelRange,
        label: Label,
    ) -> Result<(), LabelManagerError> {
        if !self.ranges.contains(&range) || !range.contains(label) {
            return Err(LabelManagerError::RangeNotReserved(range));
        }
        if !self.allocated.insert(label) {
            return Err(LabelManagerError::LabelInUse(label));
        }
        Ok(())
    }

    // Releases a previously allocated label.
    pub fn label_release(&mut self, label: Label) {
        self.allocated.remove(&label);
    }

    // Returns whether the given label is currently allocated.
    pub fn label_is_allocated(&self, label: Label) -> bool {
        self.allocated.contains(&label)
    }

    fn label_alloc(
        &mut self,
        range: LabelRange,
    ) -> Result<Label, LabelManagerError> {
        let label = (range.lower_bound..=range.upper_bound)
            .map(Label::new)
            .find(|label| !self.allocated.contains(label))
            .ok_or(LabelManagerError::RangeExhausted(range))?;
        self.allocated.insert(label);
        Ok(label)
    }
}

impl Default for LabelManager {
    fn default() -> LabelManager {
        LabelManager::new(Self::DYNAMIC_RANGE)
    }
}

// ===== impl LabelManagerError =====

impl std::fmt::Display for LabelManagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelManagerError::InvalidRange(range) => {
                write!(f, "invalid label range {}", range)
            }
            LabelManagerError::RangeUnavailable(range) => {
                write!(f, "label range {} overlaps with a reserved range", range)
            }
            LabelManagerError::RangeNotReserved(range) => {
                write!(f, "label range {} isn't reserved", range)
            }
            LabelManagerError::RangeExhausted(range) => {
                write!(f, "no free labels in range {}", range)
            }
            LabelManagerError::LabelInUse(label) => {
                write!(f, "label {} is already in use", label)
            }
        }
    }
}

impl std::error::Error for LabelManagerError {}
