//! # Record Parser
//!
//! Turns the story-organized text format into flat typed tables. Sections may
//! appear in any order; within a known section every non-blank line must be a
//! record of that section's keyword. Unknown sections are skipped whole.
//!
//! | Section header              | Record        |
//! |-----------------------------|---------------|
//! | `$ STORIES`                 | `STORY`       |
//! | `$ POINT COORDINATES`       | `POINT`       |
//! | `$ POINT ASSIGNS`           | `POINTASSIGN` |
//! | `$ LINE CONNECTIVITIES`     | `LINE`        |
//! | `$ LINE ASSIGNS`            | `LINEASSIGN`  |
//! | `$ DIAPHRAGM NAMES`         | `DIAPHRAGM`   |
//! | `$ POINT SPRING PROPERTIES` | `POINTSPRING` |
//!
//! ## Example
//!
//! ```rust
//! use frame_core::parser::parse_model;
//!
//! let text = r#"
//! $ STORIES - IN SEQUENCE FROM TOP
//!   STORY "L1"  HEIGHT 3.0
//!   STORY "Base"  ELEV 0
//!
//! $ POINT COORDINATES
//!   POINT "1"  0 0
//! "#;
//!
//! let model = parse_model(text).unwrap();
//! assert_eq!(model.stories.len(), 2);
//! assert_eq!(model.points["1"].x, 0.0);
//! ```

pub mod records;
pub mod tokens;

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{ModelError, ModelResult};

pub use records::{
    DiaphragmRecord, LineAssignRecord, LineKind, LineRecord, PointAssignRecord, PointRecord,
    SpringPropertyRecord, StoryRecord,
};
use tokens::{section_title, tokenize, Cursor};

/// A section this parser understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Stories,
    PointCoordinates,
    PointAssigns,
    LineConnectivities,
    LineAssigns,
    DiaphragmNames,
    PointSpringProperties,
}

impl Section {
    const ALL: [Section; 7] = [
        Section::Stories,
        Section::PointCoordinates,
        Section::PointAssigns,
        Section::LineConnectivities,
        Section::LineAssigns,
        Section::DiaphragmNames,
        Section::PointSpringProperties,
    ];

    /// Header text after the `$`, matched as a case-insensitive prefix
    pub fn header(self) -> &'static str {
        match self {
            Section::Stories => "STORIES",
            Section::PointCoordinates => "POINT COORDINATES",
            Section::PointAssigns => "POINT ASSIGNS",
            Section::LineConnectivities => "LINE CONNECTIVITIES",
            Section::LineAssigns => "LINE ASSIGNS",
            Section::DiaphragmNames => "DIAPHRAGM NAMES",
            Section::PointSpringProperties => "POINT SPRING PROPERTIES",
        }
    }

    /// Keyword every record line of the section starts with
    pub fn keyword(self) -> &'static str {
        match self {
            Section::Stories => "STORY",
            Section::PointCoordinates => "POINT",
            Section::PointAssigns => "POINTASSIGN",
            Section::LineConnectivities => "LINE",
            Section::LineAssigns => "LINEASSIGN",
            Section::DiaphragmNames => "DIAPHRAGM",
            Section::PointSpringProperties => "POINTSPRING",
        }
    }

    /// Recognize a header title; `None` for unknown sections
    fn from_title(title: &str) -> Option<Section> {
        let title = title.to_ascii_uppercase();
        Section::ALL.into_iter().find(|s| title.starts_with(s.header()))
    }
}

/// Flat typed tables, in declaration order, with no cross-referencing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedModel {
    /// Stories, top to bottom as declared
    pub stories: Vec<StoryRecord>,

    /// Coordinate table keyed by point id
    pub points: IndexMap<String, PointRecord>,

    /// Point placements keyed by (point, story)
    pub point_assigns: IndexMap<(String, String), PointAssignRecord>,

    /// Member lines keyed by name
    pub lines: IndexMap<String, LineRecord>,

    /// Line placements keyed by (line, story)
    pub line_assigns: IndexMap<(String, String), LineAssignRecord>,

    /// Declared diaphragm names; `None` when the section is absent
    pub diaphragms: Option<IndexMap<String, DiaphragmRecord>>,

    /// Spring property sets keyed by name
    pub springs: IndexMap<String, SpringPropertyRecord>,
}

/// Parse the full text of a model.
///
/// Fails with [`ModelError::ParseError`] naming the section and 1-based line
/// number of the first malformed record.
pub fn parse_model(text: &str) -> ModelResult<ParsedModel> {
    let mut model = ParsedModel::default();
    let mut current: Option<Section> = None;
    let mut in_unknown = false;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(title) = section_title(line) {
            current = Section::from_title(title);
            in_unknown = current.is_none();
            if in_unknown {
                debug!(line = line_no, header = line; "Skipping unknown section");
            } else if current == Some(Section::DiaphragmNames) && model.diaphragms.is_none() {
                model.diaphragms = Some(IndexMap::new());
            }
            continue;
        }
        let Some(section) = current else {
            if !in_unknown {
                debug!(line = line_no; "Ignoring text before the first section");
            }
            continue;
        };

        parse_record(&mut model, section, line, line_no)?;
    }

    info!(
        stories = model.stories.len(),
        points = model.points.len(),
        lines = model.lines.len(),
        springs = model.springs.len();
        "Parsed model"
    );
    Ok(model)
}

fn parse_record(model: &mut ParsedModel, section: Section, line: &str, line_no: usize) -> ModelResult<()> {
    let fail = |reason: String| ModelError::parse(section.header(), line_no, reason);

    let tokens = tokenize(line).map_err(fail)?;
    let mut cursor = Cursor::new(tokens);
    match cursor.keyword() {
        Some(k) if k == section.keyword() => {}
        _ => return Err(fail(format!("expected record keyword {}", section.keyword()))),
    }

    match section {
        Section::Stories => {
            let record = records::story(&mut cursor, line_no).map_err(fail)?;
            if model.stories.iter().any(|s| s.name == record.name) {
                return Err(fail(format!("duplicate story '{}'", record.name)));
            }
            model.stories.push(record);
        }
        Section::PointCoordinates => {
            let record = records::point(&mut cursor, line_no).map_err(fail)?;
            if model.points.contains_key(&record.id) {
                warn!(point = record.id.as_str(), line = line_no; "Duplicate point definition, keeping the last");
            }
            model.points.insert(record.id.clone(), record);
        }
        Section::PointAssigns => {
            let record = records::point_assign(&mut cursor, line_no).map_err(fail)?;
            let key = (record.point.clone(), record.story.clone());
            match model.point_assigns.get_mut(&key) {
                Some(existing) => existing.merge(record),
                None => {
                    model.point_assigns.insert(key, record);
                }
            }
        }
        Section::LineConnectivities => {
            let record = records::line(&mut cursor, line_no).map_err(fail)?;
            if model.lines.contains_key(&record.name) {
                warn!(line_name = record.name.as_str(), line = line_no; "Duplicate line definition, keeping the last");
            }
            model.lines.insert(record.name.clone(), record);
        }
        Section::LineAssigns => {
            let record = records::line_assign(&mut cursor, line_no).map_err(fail)?;
            let key = (record.line_name.clone(), record.story.clone());
            match model.line_assigns.get_mut(&key) {
                Some(existing) => existing.merge(record),
                None => {
                    model.line_assigns.insert(key, record);
                }
            }
        }
        Section::DiaphragmNames => {
            let record = records::diaphragm(&mut cursor, line_no).map_err(fail)?;
            model
                .diaphragms
                .get_or_insert_with(IndexMap::new)
                .insert(record.name.clone(), record);
        }
        Section::PointSpringProperties => {
            let record = records::spring(&mut cursor, line_no).map_err(fail)?;
            match model.springs.get_mut(&record.name) {
                Some(existing) => existing.merge(record),
                None => {
                    model.springs.insert(record.name.clone(), record);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
$ PROGRAM INFORMATION
  PROGRAM  "ETABS"  VERSION "9.7.4"

$ POINT COORDINATES
  POINT "1"  0 0
  POINT "2"  10 0
  POINT "60" 5 5 0.5

$ STORIES - IN SEQUENCE FROM TOP
  STORY "L2"  HEIGHT 3.0
  STORY "L1"  HEIGHT 4.0
  STORY "Base"  ELEV 0

$ DIAPHRAGM NAMES
  DIAPHRAGM "D1"  TYPE RIGID

$ POINT SPRING PROPERTIES
  POINTSPRING "SP1"  UX 1000 UY 1000

$ LINE CONNECTIVITIES
  LINE "B1"  BEAM  "1"  "2"  0
  LINE "C1"  COLUMN  "1"  "1"  1

$ POINT ASSIGNS
  POINTASSIGN "1" "Base" RESTRAINT "UX UY UZ RX RY RZ"
  POINTASSIGN "1" "L1" DIAPH "D1"
  POINTASSIGN "1" "L1" SPRINGPROP "SP1"

$ LINE ASSIGNS
  LINEASSIGN "B1" "L1" SECTION "B40X50" LENGTHOFFI 0.4
"#;

    #[test]
    fn test_parse_sample() {
        let model = parse_model(SAMPLE).unwrap();
        let names: Vec<&str> = model.stories.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["L2", "L1", "Base"]);
        assert_eq!(model.points.len(), 3);
        assert_eq!(model.points["60"].third, Some(0.5));
        assert_eq!(model.lines["C1"].kind, LineKind::Column);
        assert!(model.diaphragms.as_ref().unwrap().contains_key("D1"));
        assert_eq!(model.springs["SP1"].values()[0], 1000.0);
    }

    #[test]
    fn test_point_assigns_merge() {
        let model = parse_model(SAMPLE).unwrap();
        assert_eq!(model.point_assigns.len(), 2);
        let assign = &model.point_assigns[&("1".to_string(), "L1".to_string())];
        assert_eq!(assign.diaphragm.as_deref(), Some("D1"));
        assert_eq!(assign.spring.as_deref(), Some("SP1"));
    }

    #[test]
    fn test_diaphragm_section_absent() {
        let model = parse_model("$ STORIES\n STORY \"L1\" ELEV 0\n").unwrap();
        assert!(model.diaphragms.is_none());
    }

    #[test]
    fn test_error_names_section_and_line() {
        let text = "$ STORIES\n  STORY \"L1\" HEIGHT 3\n\n$ POINT COORDINATES\n  POINT \"1\" 0 abc\n";
        match parse_model(text).unwrap_err() {
            ModelError::ParseError { section, line, reason } => {
                assert_eq!(section, "POINT COORDINATES");
                assert_eq!(line, 5);
                assert!(reason.contains("y coordinate"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_keyword_in_section() {
        let err = parse_model("$ LINE CONNECTIVITIES\n  POINT \"1\" 0 0\n").unwrap_err();
        assert_eq!(err.error_code(), "PARSE_ERROR");
        assert!(err.to_string().contains("LINE"));
    }

    #[test]
    fn test_duplicate_story_rejected() {
        let err = parse_model("$ STORIES\n STORY \"L1\" HEIGHT 3\n STORY \"L1\" HEIGHT 3\n").unwrap_err();
        assert!(err.to_string().contains("duplicate story"));
    }

    #[test]
    fn test_duplicate_point_keeps_last() {
        let model = parse_model("$ POINT COORDINATES\n POINT \"1\" 0 0\n POINT \"1\" 3 4\n").unwrap();
        assert_eq!(model.points["1"].x, 3.0);
    }

    #[test]
    fn test_unknown_section_skipped() {
        let text = "$ FRAME SECTIONS\n  FRAMESECTION \"B1\" MATERIAL \"C30\" garbage \"\n$ STORIES\n STORY \"L1\" ELEV 0\n";
        let model = parse_model(text).unwrap();
        assert_eq!(model.stories.len(), 1);
    }
}
