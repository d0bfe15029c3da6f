//! # Constraint Generator
//!
//! Everything that ties nodes together or to the ground without being a frame
//! element:
//!
//! - [`support`] - point restraints from `RESTRAINT` masks
//! - [`spring`] - zero-length spring connectors to generated ground nodes
//! - [`diaphragm`] - one rigid floor per story, tying slaves to a master node
//!
//! DOFs are always ordered `UX, UY, UZ, RX, RY, RZ`.

pub mod diaphragm;
pub mod spring;
pub mod support;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use diaphragm::{generate_diaphragms, Diaphragm, DiaphragmOutput};
pub use spring::{generate_springs, SpringConnector, SpringDirection, SpringMaterial, SpringTable};
pub use support::{generate_supports, Support, SupportSource};

// ============================================================================
// DEGREES OF FREEDOM
// ============================================================================

/// One of the six nodal degrees of freedom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dof {
    UX,
    UY,
    UZ,
    RX,
    RY,
    RZ,
}

impl Dof {
    pub const ALL: [Dof; 6] = [Dof::UX, Dof::UY, Dof::UZ, Dof::RX, Dof::RY, Dof::RZ];

    /// Position in a six-entry DOF array
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Dof::UX => "UX",
            Dof::UY => "UY",
            Dof::UZ => "UZ",
            Dof::RX => "RX",
            Dof::RY => "RY",
            Dof::RZ => "RZ",
        }
    }

    /// Case-insensitive lookup by name
    pub fn from_name(name: &str) -> Option<Dof> {
        Dof::ALL.into_iter().find(|d| d.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Dof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Six-entry fixity mask, `true` = fixed.
///
/// ```rust
/// use frame_core::constraints::{Dof, DofMask};
///
/// let pinned = DofMask::from_names("UX UY UZ").unwrap();
/// assert!(pinned.is_fixed(Dof::UZ));
/// assert!(!pinned.is_fixed(Dof::RX));
/// assert_eq!(pinned.as_flags(), [1, 1, 1, 0, 0, 0]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DofMask([bool; 6]);

impl DofMask {
    pub const FREE: DofMask = DofMask([false; 6]);
    pub const FIXED: DofMask = DofMask([true; 6]);

    pub const fn new(flags: [bool; 6]) -> Self {
        DofMask(flags)
    }

    /// Parse a whitespace-separated list of DOF names, e.g. `"UX UY UZ"`
    pub fn from_names(names: &str) -> Result<Self, String> {
        let mut mask = DofMask::FREE;
        for name in names.split_whitespace() {
            let dof = Dof::from_name(name).ok_or_else(|| format!("unknown degree of freedom '{name}'"))?;
            mask.0[dof.index()] = true;
        }
        Ok(mask)
    }

    pub fn is_fixed(&self, dof: Dof) -> bool {
        self.0[dof.index()]
    }

    pub fn fixed_count(&self) -> usize {
        self.0.iter().filter(|&&f| f).count()
    }

    pub fn is_free(&self) -> bool {
        self.fixed_count() == 0
    }

    /// Fixity as 0/1 flags, the form solvers expect
    pub fn as_flags(&self) -> [u8; 6] {
        self.0.map(u8::from)
    }

    /// Fixed DOFs in order
    pub fn fixed(&self) -> impl Iterator<Item = Dof> + '_ {
        Dof::ALL.into_iter().filter(|d| self.is_fixed(*d))
    }
}

impl fmt::Display for DofMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fixed().map(Dof::name).collect();
        if names.is_empty() {
            f.write_str("free")
        } else {
            f.write_str(&names.join(" "))
        }
    }
}
