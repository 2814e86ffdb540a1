//! Parser for the tab-separated global object file.
//!
//! One record per line: `id  x  y  plane  face  type`. Blank lines and lines
//! starting with `//` are ignored. A bad record is skipped with a warning; it
//! never aborts the load.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{RecordError, RegistryError, RegistryResult};
use crate::object::{Position, WorldObject};

pub const COMMENT_MARKER: &str = "//";

const FIELDS: [&str; 6] = ["id", "x", "y", "plane", "face", "type"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub line: usize,
    pub reason: RecordError,
}

#[derive(Debug, Clone, Default)]
pub struct Definitions {
    pub objects: Vec<WorldObject>,
    pub skipped: Vec<SkippedRecord>,
}

impl Definitions {
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

pub fn read_definitions(path: impl AsRef<Path>) -> RegistryResult<Definitions> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| RegistryError::DefinitionsUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let definitions = parse_definitions(&text);
    if definitions.is_empty() {
        warn!(path = %path.display(), "definition file holds no objects");
    }
    info!(
        path = %path.display(),
        loaded = definitions.len(),
        skipped = definitions.skipped.len(),
        "read object definitions"
    );
    Ok(definitions)
}

pub fn parse_definitions(text: &str) -> Definitions {
    let mut definitions = Definitions::default();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with(COMMENT_MARKER) {
            continue;
        }
        match parse_record(line) {
            Ok(object) => definitions.objects.push(object),
            Err(reason) => {
                warn!(line = index + 1, %reason, "unable to load object from file");
                definitions.skipped.push(SkippedRecord {
                    line: index + 1,
                    reason,
                });
            }
        }
    }
    definitions
}

pub fn parse_record(line: &str) -> Result<WorldObject, RecordError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != FIELDS.len() {
        return Err(RecordError::FieldCount(fields.len()));
    }
    let mut values = [0_i32; 6];
    for (slot, (&name, raw)) in values.iter_mut().zip(FIELDS.iter().zip(&fields)) {
        *slot = raw
            .trim()
            .parse::<i32>()
            .map_err(|_| RecordError::InvalidNumber {
                field: name,
                value: raw.to_string(),
            })?;
    }
    let [id, x, y, plane, face, kind] = values;
    Ok(WorldObject::permanent(id, Position::new(x, y, plane), face, kind))
}
