//! Typed records, one struct per record keyword.
//!
//! Records hold exactly what the text says. Nothing here looks across
//! tables; that is the story graph's job.

use serde::{Deserialize, Serialize};

use crate::constraints::{Dof, DofMask};
use crate::geometry::{EndOffsetInput, Vec3};

use super::tokens::{Cursor, Token};

// ============================================================================
// Stories and points
// ============================================================================

/// `STORY "name" [HEIGHT h] [ELEV e] [SIMILARTO "s"] [MASTERSTORY "Yes"]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRecord {
    pub name: String,
    pub height: Option<f64>,
    pub elevation: Option<f64>,
    pub similar_to: Option<String>,
    pub master_story: bool,
    pub line: usize,
}

/// `POINT "id" x y [d]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub id: String,
    pub x: f64,
    pub y: f64,
    /// Depth below the story plane of every story the point is placed on
    pub third: Option<f64>,
    pub line: usize,
}

/// `POINTASSIGN "id" "story" [DIAPH "d"] [SPRINGPROP "s"] [RESTRAINT "..."] [MASS m]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointAssignRecord {
    pub point: String,
    pub story: String,
    /// Diaphragm tag; `DISCONNECTED` is normalized to `None`
    pub diaphragm: Option<String>,
    pub spring: Option<String>,
    pub restraint: Option<DofMask>,
    pub mass: Option<f64>,
    pub line: usize,
}

impl PointAssignRecord {
    /// Overlay a later record for the same (point, story)
    pub fn merge(&mut self, later: PointAssignRecord) {
        if later.diaphragm.is_some() {
            self.diaphragm = later.diaphragm;
        }
        if later.spring.is_some() {
            self.spring = later.spring;
        }
        if later.restraint.is_some() {
            self.restraint = later.restraint;
        }
        if later.mass.is_some() {
            self.mass = later.mass;
        }
        self.line = later.line;
    }
}

// ============================================================================
// Lines
// ============================================================================

/// Member kind from the connectivity record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Beam,
    Column,
    Brace,
    Other,
}

impl LineKind {
    /// Stories between the J and I ends when the record gives none
    pub fn default_span(self) -> u32 {
        match self {
            LineKind::Column => 1,
            LineKind::Beam | LineKind::Brace | LineKind::Other => 0,
        }
    }

    fn from_word(word: &str) -> Self {
        match word.to_ascii_uppercase().as_str() {
            "BEAM" => LineKind::Beam,
            "COLUMN" => LineKind::Column,
            "BRACE" => LineKind::Brace,
            _ => LineKind::Other,
        }
    }
}

/// `LINE "name" KIND "i" "j" [span]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    pub name: String,
    pub kind: LineKind,
    pub point_i: String,
    pub point_j: String,
    /// Explicit story span; see [`LineRecord::span`]
    pub span: Option<u32>,
    pub line: usize,
}

impl LineRecord {
    /// Number of stories the I end lies below the assigned story
    pub fn span(&self) -> u32 {
        self.span.unwrap_or_else(|| self.kind.default_span())
    }
}

/// `LINEASSIGN "line" "story" [SECTION "s"] [LENGTHOFFI a] [LENGTHOFFJ b] [OFFSETXI ..]`
///
/// Every attribute is optional so repeated records can be merged field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineAssignRecord {
    pub line_name: String,
    pub story: String,
    pub section: Option<String>,
    pub length_off_i: Option<f64>,
    pub length_off_j: Option<f64>,
    /// OFFSETXI, OFFSETYI, OFFSETZI
    pub offset_i: [Option<f64>; 3],
    /// OFFSETXJ, OFFSETYJ, OFFSETZJ
    pub offset_j: [Option<f64>; 3],
    pub line: usize,
}

impl LineAssignRecord {
    /// Overlay a later record for the same (line, story); later values win
    pub fn merge(&mut self, later: LineAssignRecord) {
        if later.section.is_some() {
            self.section = later.section;
        }
        if later.length_off_i.is_some() {
            self.length_off_i = later.length_off_i;
        }
        if later.length_off_j.is_some() {
            self.length_off_j = later.length_off_j;
        }
        for k in 0..3 {
            if later.offset_i[k].is_some() {
                self.offset_i[k] = later.offset_i[k];
            }
            if later.offset_j[k].is_some() {
                self.offset_j[k] = later.offset_j[k];
            }
        }
        self.line = later.line;
    }

    /// Scalar end-offset parameters with absent values as zero
    pub fn end_offsets(&self) -> EndOffsetInput {
        let vec = |c: &[Option<f64>; 3]| {
            Vec3::new(c[0].unwrap_or(0.0), c[1].unwrap_or(0.0), c[2].unwrap_or(0.0))
        };
        EndOffsetInput {
            length_i: self.length_off_i.unwrap_or(0.0),
            length_j: self.length_off_j.unwrap_or(0.0),
            lateral_i: vec(&self.offset_i),
            lateral_j: vec(&self.offset_j),
        }
    }
}

// ============================================================================
// Diaphragms and springs
// ============================================================================

/// `DIAPHRAGM "name" [KEY value]...`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaphragmRecord {
    pub name: String,
    /// Attributes kept verbatim, e.g. `TYPE RIGID`
    pub attributes: Vec<(String, String)>,
    pub line: usize,
}

/// `POINTSPRING "name" [UX k] [UY k] [UZ k] [RX k] [RY k] [RZ k]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpringPropertyRecord {
    pub name: String,
    /// Stiffness per DOF; unspecified directions are `None`
    pub stiffness: [Option<f64>; 6],
    pub line: usize,
}

impl SpringPropertyRecord {
    pub fn merge(&mut self, later: SpringPropertyRecord) {
        for (mine, theirs) in self.stiffness.iter_mut().zip(later.stiffness) {
            if theirs.is_some() {
                *mine = theirs;
            }
        }
        self.line = later.line;
    }

    /// Stiffness per DOF with unspecified directions as zero
    pub fn values(&self) -> [f64; 6] {
        self.stiffness.map(|k| k.unwrap_or(0.0))
    }
}

// ============================================================================
// Record parsing
// ============================================================================

/// Attribute tail: `KEY value` pairs until the record ends.
///
/// Returns the upper-cased keyword with its raw token; bare flags at the very
/// end of a record (no value) come back with `None`.
fn attributes(cursor: &mut Cursor) -> Result<Vec<(String, Option<Token>)>, String> {
    let mut out = Vec::new();
    while !cursor.is_empty() {
        let keyword = cursor
            .keyword()
            .ok_or_else(|| format!("expected attribute keyword, found {}", describe(cursor.peek())))?;
        out.push((keyword, cursor.next_token()));
    }
    Ok(out)
}

fn describe(token: Option<&Token>) -> String {
    token.map(|t| t.to_string()).unwrap_or_else(|| "end of line".to_string())
}

fn value_text(key: &str, value: Option<Token>) -> Result<String, String> {
    value
        .map(|t| t.text().to_string())
        .ok_or_else(|| format!("{key} has no value"))
}

fn value_number(key: &str, value: Option<Token>) -> Result<f64, String> {
    let token = value.ok_or_else(|| format!("{key} has no value"))?;
    super::tokens::parse_number(token.text()).ok_or_else(|| format!("{key} is not a number: {token}"))
}

fn skip_unknown(record: &str, key: &str) {
    log::debug!(record, attribute = key; "Skipping unknown attribute");
}

pub(super) fn story(cursor: &mut Cursor, line: usize) -> Result<StoryRecord, String> {
    let mut record = StoryRecord {
        name: cursor.text("story name")?,
        height: None,
        elevation: None,
        similar_to: None,
        master_story: false,
        line,
    };
    for (key, value) in attributes(cursor)? {
        match key.as_str() {
            "HEIGHT" => record.height = Some(value_number(&key, value)?),
            "ELEV" | "ELEVATION" => record.elevation = Some(value_number(&key, value)?),
            "SIMILARTO" => record.similar_to = Some(value_text(&key, value)?),
            "MASTERSTORY" => record.master_story = value_text(&key, value)?.eq_ignore_ascii_case("yes"),
            _ => skip_unknown("STORY", &key),
        }
    }
    Ok(record)
}

pub(super) fn point(cursor: &mut Cursor, line: usize) -> Result<PointRecord, String> {
    let id = cursor.text("point id")?;
    let x = cursor.number("x coordinate")?;
    let y = cursor.number("y coordinate")?;
    let third = cursor.optional_number();
    if let Some(extra) = cursor.peek() {
        return Err(format!("unexpected token after coordinates: {extra}"));
    }
    Ok(PointRecord { id, x, y, third, line })
}

pub(super) fn point_assign(cursor: &mut Cursor, line: usize) -> Result<PointAssignRecord, String> {
    let mut record = PointAssignRecord {
        point: cursor.text("point id")?,
        story: cursor.text("story name")?,
        diaphragm: None,
        spring: None,
        restraint: None,
        mass: None,
        line,
    };
    for (key, value) in attributes(cursor)? {
        match key.as_str() {
            "DIAPH" | "DIAPHRAGM" => {
                let name = value_text(&key, value)?;
                record.diaphragm = (!name.eq_ignore_ascii_case("DISCONNECTED")).then_some(name);
            }
            "SPRINGPROP" => record.spring = Some(value_text(&key, value)?),
            "RESTRAINT" => {
                let mask = DofMask::from_names(&value_text(&key, value)?)?;
                record.restraint = Some(mask);
            }
            "MASS" => {
                let mass = value_number(&key, value)?;
                if mass < 0.0 {
                    return Err(format!("MASS must not be negative: {mass}"));
                }
                record.mass = Some(mass);
            }
            _ => skip_unknown("POINTASSIGN", &key),
        }
    }
    Ok(record)
}

pub(super) fn line(cursor: &mut Cursor, line: usize) -> Result<LineRecord, String> {
    let name = cursor.text("line name")?;
    let kind_word = cursor
        .keyword()
        .ok_or_else(|| format!("expected line kind, found {}", describe(cursor.peek())))?;
    let point_i = cursor.text("I-end point")?;
    let point_j = cursor.text("J-end point")?;
    let span = match cursor.next_token() {
        None => None,
        Some(token) => {
            let span = token
                .text()
                .parse::<u32>()
                .map_err(|_| format!("story span is not a non-negative integer: {token}"))?;
            Some(span)
        }
    };
    if let Some(extra) = cursor.peek() {
        return Err(format!("unexpected token after story span: {extra}"));
    }
    Ok(LineRecord {
        name,
        kind: LineKind::from_word(&kind_word),
        point_i,
        point_j,
        span,
        line,
    })
}

pub(super) fn line_assign(cursor: &mut Cursor, line: usize) -> Result<LineAssignRecord, String> {
    let mut record = LineAssignRecord {
        line_name: cursor.text("line name")?,
        story: cursor.text("story name")?,
        line,
        ..Default::default()
    };
    for (key, value) in attributes(cursor)? {
        match key.as_str() {
            "SECTION" | "SECT" | "FRAMEPROP" => record.section = Some(value_text(&key, value)?),
            "LENGTHOFFI" => record.length_off_i = Some(value_number(&key, value)?),
            "LENGTHOFFJ" => record.length_off_j = Some(value_number(&key, value)?),
            "OFFSETXI" => record.offset_i[0] = Some(value_number(&key, value)?),
            "OFFSETYI" => record.offset_i[1] = Some(value_number(&key, value)?),
            "OFFSETZI" => record.offset_i[2] = Some(value_number(&key, value)?),
            "OFFSETXJ" => record.offset_j[0] = Some(value_number(&key, value)?),
            "OFFSETYJ" => record.offset_j[1] = Some(value_number(&key, value)?),
            "OFFSETZJ" => record.offset_j[2] = Some(value_number(&key, value)?),
            _ => skip_unknown("LINEASSIGN", &key),
        }
    }
    Ok(record)
}

pub(super) fn diaphragm(cursor: &mut Cursor, line: usize) -> Result<DiaphragmRecord, String> {
    let name = cursor.text("diaphragm name")?;
    let attributes = attributes(cursor)?
        .into_iter()
        .map(|(key, value)| (key, value.map(|t| t.text().to_string()).unwrap_or_default()))
        .collect();
    Ok(DiaphragmRecord { name, attributes, line })
}

pub(super) fn spring(cursor: &mut Cursor, line: usize) -> Result<SpringPropertyRecord, String> {
    let mut record = SpringPropertyRecord {
        name: cursor.text("spring property name")?,
        stiffness: [None; 6],
        line,
    };
    for (key, value) in attributes(cursor)? {
        match Dof::from_name(&key) {
            Some(dof) => {
                let k = value_number(&key, value)?;
                if k < 0.0 {
                    return Err(format!("{key} stiffness must not be negative: {k}"));
                }
                record.stiffness[dof.index()] = Some(k);
            }
            None => skip_unknown("POINTSPRING", &key),
        }
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokens::tokenize;

    fn cursor(text: &str) -> Cursor {
        Cursor::new(tokenize(text).unwrap())
    }

    #[test]
    fn test_story_attributes() {
        let record = story(&mut cursor(r#""L3" HEIGHT 3.2 SIMILARTO "L2" MASTERSTORY "No""#), 4).unwrap();
        assert_eq!(record.name, "L3");
        assert_eq!(record.height, Some(3.2));
        assert_eq!(record.elevation, None);
        assert_eq!(record.similar_to.as_deref(), Some("L2"));
        assert!(!record.master_story);
    }

    #[test]
    fn test_point_with_third_value() {
        let record = point(&mut cursor(r#""60" 12.5 -3 0.75"#), 9).unwrap();
        assert_eq!(record.id, "60");
        assert_eq!(record.third, Some(0.75));
        assert!(point(&mut cursor(r#""61" 1.0"#), 10).unwrap_err().contains("y coordinate"));
    }

    #[test]
    fn test_point_assign_disconnected() {
        let record = point_assign(
            &mut cursor(r#""7" "Base" DIAPH "DISCONNECTED" RESTRAINT "UX UY UZ" SPRINGPROP "SP1""#),
            2,
        )
        .unwrap();
        assert_eq!(record.diaphragm, None);
        assert_eq!(record.spring.as_deref(), Some("SP1"));
        assert_eq!(record.restraint.map(|m| m.fixed_count()), Some(3));
    }

    #[test]
    fn test_point_assign_bad_restraint() {
        let err = point_assign(&mut cursor(r#""7" "Base" RESTRAINT "UX UW""#), 2).unwrap_err();
        assert!(err.contains("UW"));
    }

    #[test]
    fn test_line_kinds_and_span() {
        let column = line(&mut cursor(r#""C1" COLUMN "1" "1""#), 1).unwrap();
        assert_eq!(column.kind, LineKind::Column);
        assert_eq!(column.span(), 1);

        let tall = line(&mut cursor(r#""C2" COLUMN "2" "2" 2"#), 2).unwrap();
        assert_eq!(tall.span(), 2);

        let link = line(&mut cursor(r#""L1" LINK "3" "4""#), 3).unwrap();
        assert_eq!(link.kind, LineKind::Other);
        assert_eq!(link.span(), 0);

        assert!(line(&mut cursor(r#""C3" COLUMN "5" "5" -1"#), 4).is_err());
    }

    #[test]
    fn test_line_assign_merge() {
        let mut first = line_assign(&mut cursor(r#""B1" "L2" SECTION "B40X50" LENGTHOFFI 0.4"#), 1).unwrap();
        let second = line_assign(&mut cursor(r#""B1" "L2" LENGTHOFFJ 0.2 OFFSETYI 0.1 CARDINALPT 7"#), 2).unwrap();
        first.merge(second);

        let offsets = first.end_offsets();
        assert_eq!(first.section.as_deref(), Some("B40X50"));
        assert_eq!(offsets.length_i, 0.4);
        assert_eq!(offsets.length_j, 0.2);
        assert_eq!(offsets.lateral_i.y, 0.1);
        assert_eq!(first.line, 2);
    }

    #[test]
    fn test_spring_values() {
        let mut record = spring(&mut cursor(r#""SP1" STIFFNESSOPTION "USER" UX 1000 UY 1000"#), 1).unwrap();
        record.merge(spring(&mut cursor(r#""SP1" RZ 50"#), 2).unwrap());
        assert_eq!(record.values(), [1000.0, 1000.0, 0.0, 0.0, 0.0, 50.0]);

        assert!(spring(&mut cursor(r#""SP2" UZ -5"#), 3).unwrap_err().contains("negative"));
    }
}
