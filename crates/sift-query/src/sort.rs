use bson::Document;
use serde::Deserialize;

use crate::error::{CompileError, InputKind};
use crate::options::UnknownPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "asc" => Some(SortDirection::Asc),
            "des" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn indicator(self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Deserialize)]
struct SortSpec {
    db_name: String,
    #[serde(default, rename = "type")]
    kind: String,
}

/// Ordered sort keys. Key order decides precedence in a multi-key sort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortStage {
    keys: Vec<Sort>,
}

impl SortStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key. A field that is already present keeps its position and
    /// takes the new direction.
    pub fn push(&mut self, field: String, direction: SortDirection) {
        match self.keys.iter_mut().find(|s| s.field == field) {
            Some(existing) => existing.direction = direction,
            None => self.keys.push(Sort { field, direction }),
        }
    }

    pub fn keys(&self) -> &[Sort] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        for sort in &self.keys {
            doc.insert(sort.field.clone(), sort.direction.indicator());
        }
        doc
    }
}

impl FromIterator<Sort> for SortStage {
    fn from_iter<I: IntoIterator<Item = Sort>>(iter: I) -> Self {
        let mut stage = SortStage::new();
        for sort in iter {
            stage.push(sort.field, sort.direction);
        }
        stage
    }
}

/// Parse and compile a JSON array of `{db_name, type}` entries.
pub fn compile_sort(input: &str, policy: UnknownPolicy) -> Result<SortStage, CompileError> {
    let specs: Vec<SortSpec> =
        serde_json::from_str(input).map_err(|e| CompileError::parse(InputKind::Sort, e))?;

    let mut stage = SortStage::new();
    for spec in specs {
        match SortDirection::parse(&spec.kind) {
            Some(direction) => stage.push(spec.db_name, direction),
            None => match policy {
                UnknownPolicy::Reject => return Err(CompileError::UnknownDirection(spec.kind)),
                UnknownPolicy::Ignore => {
                    tracing::warn!(direction = %spec.kind, field = %spec.db_name, "skipping unknown sort direction");
                }
            },
        }
    }

    tracing::debug!(keys = stage.keys.len(), "compiled sort");
    Ok(stage)
}
