//! Deterministic tag scheme.
//!
//! Grid tags are `point_number * multiplier + story_index`. Every other kind of
//! tag lives in its own band of width 10^15, so bands can never overlap:
//!
//! | Kind                | Tag                                              |
//! |---------------------|--------------------------------------------------|
//! | grid node           | `point_number * M + story_index`                 |
//! | ground node         | `1e15 + structural tag`                          |
//! | diaphragm master    | `2e15 + story_index`                             |
//! | intermediate node   | `3e15 + 2 * (line_ordinal * M + story) + end`    |
//! | frame element       | `(line_ordinal * M + story) * 4 + slot`          |
//! | spring element      | `1e15 + structural tag`                          |
//! | spring material     | `6 * spring_ordinal + dof_index + 1`             |
//!
//! Node tags and element tags are separate namespaces.

use serde::{Deserialize, Serialize};

use crate::constraints::Dof;
use crate::elements::SegmentRole;

/// Width of one tag band
pub const BAND: u64 = 1_000_000_000_000_000;

/// Point numbers at or above this are ordinals of non-numeric point ids
pub const TEXT_POINT_BASE: u64 = 100_000_000;

/// End of a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum End {
    I,
    J,
}

impl End {
    fn offset(self) -> u64 {
        match self {
            End::I => 0,
            End::J => 1,
        }
    }
}

/// Tag allocator for one model. Pure: the same inputs always give the same tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagScheme {
    multiplier: u64,
}

impl TagScheme {
    /// Scheme for a model with `story_count` stories.
    ///
    /// ```rust
    /// use frame_core::nodes::tags::TagScheme;
    ///
    /// assert_eq!(TagScheme::new(12).multiplier(), 1000);
    /// assert_eq!(TagScheme::new(1000).multiplier(), 10_000);
    /// ```
    pub fn new(story_count: usize) -> Self {
        let mut multiplier: u64 = 1000;
        while multiplier <= story_count as u64 {
            multiplier *= 10;
        }
        TagScheme { multiplier }
    }

    pub fn multiplier(&self) -> u64 {
        self.multiplier
    }

    /// Numeric part of a point id.
    ///
    /// Plain integers below 10^8, written in canonical form, are used as-is;
    /// anything else (`"07"`, `"+7"`, `"A7"`) maps to `10^8 + ordinal` in the
    /// coordinate table, so distinct ids never share a number.
    pub fn point_number(id: &str, ordinal: usize) -> u64 {
        match id.parse::<u64>() {
            Ok(n) if n < TEXT_POINT_BASE && n.to_string() == id => n,
            _ => TEXT_POINT_BASE + ordinal as u64,
        }
    }

    pub fn grid(&self, point_number: u64, story_index: usize) -> u64 {
        point_number * self.multiplier + story_index as u64
    }

    pub fn ground(&self, structural: u64) -> u64 {
        BAND + structural
    }

    pub fn master(&self, story_index: usize) -> u64 {
        2 * BAND + story_index as u64
    }

    fn member_group(&self, line_ordinal: usize, story_index: usize) -> u64 {
        line_ordinal as u64 * self.multiplier + story_index as u64
    }

    pub fn intermediate(&self, line_ordinal: usize, story_index: usize, end: End) -> u64 {
        3 * BAND + 2 * self.member_group(line_ordinal, story_index) + end.offset()
    }

    pub fn frame_element(&self, line_ordinal: usize, story_index: usize, role: SegmentRole) -> u64 {
        self.member_group(line_ordinal, story_index) * 4 + role.slot()
    }

    pub fn spring_element(&self, structural: u64) -> u64 {
        BAND + structural
    }

    pub fn spring_material(&self, spring_ordinal: usize, dof: Dof) -> u64 {
        6 * spring_ordinal as u64 + dof.index() as u64 + 1
    }
}
