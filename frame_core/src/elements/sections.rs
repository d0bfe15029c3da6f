//! Section scalars for frame elements.
//!
//! There is no property catalog. A section name either has configured
//! override scalars or falls back to the rectangular default of its member
//! kind.

use serde::{Deserialize, Serialize};

use crate::config::SectionSettings;
use crate::parser::LineKind;

/// Elastic scalars consumed by a 3D elastic beam-column element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionProperties {
    /// Cross-sectional area
    pub area: f64,
    /// Young's modulus
    pub elastic_modulus: f64,
    /// Shear modulus
    pub shear_modulus: f64,
    /// Torsional constant
    pub torsion: f64,
    /// Second moment about local y
    pub iy: f64,
    /// Second moment about local z
    pub iz: f64,
}

impl SectionProperties {
    /// Copy with A, Iy, Iz and J multiplied by `factor` (rigid end segments).
    ///
    /// Moduli are left alone.
    pub fn stiffened(&self, factor: f64) -> Self {
        SectionProperties {
            area: self.area * factor,
            torsion: self.torsion * factor,
            iy: self.iy * factor,
            iz: self.iz * factor,
            ..*self
        }
    }
}

/// Solid rectangle with isotropic material
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectangularSection {
    /// Width b
    pub width: f64,
    /// Depth h
    pub depth: f64,
    /// Young's modulus
    pub elastic_modulus: f64,
    /// Poisson ratio
    pub poisson: f64,
}

impl RectangularSection {
    /// Rectangle of the given size in the default concrete (E = 2.5e10, nu = 0.2)
    pub fn new(width: f64, depth: f64) -> Self {
        RectangularSection {
            width,
            depth,
            elastic_modulus: 2.5e10,
            poisson: 0.2,
        }
    }

    /// Elastic scalars of the rectangle.
    ///
    /// ```rust
    /// use frame_core::elements::sections::RectangularSection;
    ///
    /// let props = RectangularSection::new(0.4, 0.5).properties();
    /// assert!((props.area - 0.2).abs() < 1e-12);
    /// assert!((props.shear_modulus - 2.5e10 / 2.4).abs() < 1e-3);
    /// ```
    pub fn properties(&self) -> SectionProperties {
        let b = self.width;
        let h = self.depth;
        // Saint-Venant approximation with long side a, short side c
        let (a, c) = if b >= h { (b, h) } else { (h, b) };
        let torsion = a * c.powi(3) * (1.0 / 3.0 - 0.21 * (c / a) * (1.0 - c.powi(4) / (12.0 * a.powi(4))));
        SectionProperties {
            area: b * h,
            elastic_modulus: self.elastic_modulus,
            shear_modulus: self.elastic_modulus / (2.0 * (1.0 + self.poisson)),
            torsion,
            iy: b * h.powi(3) / 12.0,
            iz: h * b.powi(3) / 12.0,
        }
    }
}

impl Default for RectangularSection {
    fn default() -> Self {
        RectangularSection::new(0.40, 0.50)
    }
}

/// Scalars for a member: the named override when configured, else the kind default.
pub fn resolve_section(name: Option<&str>, kind: LineKind, settings: &SectionSettings) -> SectionProperties {
    if let Some(props) = name.and_then(|n| settings.overrides.get(n)) {
        return *props;
    }
    match kind {
        LineKind::Column => settings.column.properties(),
        LineKind::Beam | LineKind::Brace | LineKind::Other => settings.beam.properties(),
    }
}
