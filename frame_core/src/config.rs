//! # Build Configuration
//!
//! Every knob the pipeline reads lives in [`BuildConfig`]. All fields carry
//! serde defaults, so a configuration file only needs the values it changes:
//!
//! ```rust
//! use frame_core::config::BuildConfig;
//! use frame_core::elements::RigidEndStrategy;
//!
//! let config: BuildConfig = serde_json::from_str(r#"{ "strategy": "split_segments" }"#).unwrap();
//! assert_eq!(config.strategy, RigidEndStrategy::SplitSegments);
//! assert_eq!(config.rigid_end_scale, 1.0e6);
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constraints::DofMask;
use crate::elements::sections::{RectangularSection, SectionProperties};
use crate::elements::RigidEndStrategy;

/// Configuration for one translation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// How rigid end zones are materialized
    pub strategy: RigidEndStrategy,

    /// Factor applied to A, Iy, Iz and J of rigid segments
    pub rigid_end_scale: f64,

    /// Geometric tolerances
    pub tolerances: Tolerances,

    /// Rigid diaphragm settings
    pub diaphragm: DiaphragmSettings,

    /// Section scalars per member kind and per named section
    pub sections: SectionSettings,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            strategy: RigidEndStrategy::default(),
            rigid_end_scale: 1.0e6,
            tolerances: Tolerances::default(),
            diaphragm: DiaphragmSettings::default(),
            sections: SectionSettings::default(),
        }
    }
}

/// Length tolerances, all in model units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Members at or below this length are degenerate
    pub degenerate_length: f64,

    /// Distinct nodes closer than this are duplicates
    pub duplicate_distance: f64,

    /// Maximum |z - story elevation| for a node to sit on the story plane
    pub plane: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances {
            degenerate_length: 1e-6,
            duplicate_distance: 1e-6,
            plane: 1e-6,
        }
    }
}

/// Rigid diaphragm settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiaphragmSettings {
    /// DOFs fixed on every master node (UX, UY, UZ, RX, RY, RZ)
    pub fix_mask: DofMask,

    /// Slab thickness used for the fallback slab mass
    pub slab_thickness: f64,

    /// Slab mass density used for the fallback slab mass
    pub density: f64,
}

impl Default for DiaphragmSettings {
    fn default() -> Self {
        DiaphragmSettings {
            fix_mask: DofMask::new([false, false, true, true, true, false]),
            slab_thickness: 0.10,
            density: 2500.0,
        }
    }
}

/// Section scalars: rectangular defaults per member kind plus named overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionSettings {
    /// Default for beams and other non-column lines
    pub beam: RectangularSection,

    /// Default for columns
    pub column: RectangularSection,

    /// Exact scalars for named sections, keyed by section name
    pub overrides: IndexMap<String, SectionProperties>,
}

impl Default for SectionSettings {
    fn default() -> Self {
        SectionSettings {
            beam: RectangularSection::new(0.40, 0.50),
            column: RectangularSection::new(0.40, 0.40),
            overrides: IndexMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.strategy, RigidEndStrategy::JointOffset);
        assert_eq!(config.diaphragm.fix_mask.fixed_count(), 3);
        assert_eq!(config.sections.column.depth, 0.40);
        assert!(config.sections.overrides.is_empty());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "tolerances": { "plane": 0.01 }, "diaphragm": { "density": 2400.0 } }"#;
        let config: BuildConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.tolerances.plane, 0.01);
        assert_eq!(config.tolerances.degenerate_length, 1e-6);
        assert_eq!(config.diaphragm.density, 2400.0);
        assert_eq!(config.diaphragm.slab_thickness, 0.10);
    }

    #[test]
    fn test_roundtrip() {
        let mut config = BuildConfig::default();
        config.strategy = RigidEndStrategy::SplitSegments;
        config.sections.overrides.insert(
            "W14X90".to_string(),
            SectionProperties {
                area: 0.017,
                elastic_modulus: 2.0e11,
                shear_modulus: 7.7e10,
                torsion: 1.7e-6,
                iy: 4.2e-4,
                iz: 1.5e-4,
            },
        );
        let json = serde_json::to_string(&config).unwrap();
        let back: BuildConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
