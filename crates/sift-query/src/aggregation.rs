use std::fmt;

use bson::{Bson, Document, doc};
use serde::{Deserialize, Deserializer};

use crate::error::{CompileError, InputKind};
use crate::options::UnknownPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Accumulator {
    Avg,
    Sum,
    /// Counts documents per group, ignoring the field value.
    Count,
    Min,
    Max,
    First,
    Unknown(String),
}

impl Default for Accumulator {
    fn default() -> Self {
        Accumulator::Unknown(String::new())
    }
}

impl From<String> for Accumulator {
    fn from(name: String) -> Self {
        match name.as_str() {
            "avg" => Accumulator::Avg,
            "sum" => Accumulator::Sum,
            "count" => Accumulator::Count,
            "min" => Accumulator::Min,
            "max" => Accumulator::Max,
            "first" => Accumulator::First,
            _ => Accumulator::Unknown(name),
        }
    }
}

impl fmt::Display for Accumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accumulator::Avg => write!(f, "avg"),
            Accumulator::Sum => write!(f, "sum"),
            Accumulator::Count => write!(f, "count"),
            Accumulator::Min => write!(f, "min"),
            Accumulator::Max => write!(f, "max"),
            Accumulator::First => write!(f, "first"),
            Accumulator::Unknown(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AggregatorSpec {
    #[serde(default)]
    pub aggregate: String,
    #[serde(default)]
    pub operation: Accumulator,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AggregationSpec {
    /// Empty groups every document together.
    #[serde(default)]
    pub group_by: String,
    pub group_by_title: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub aggregators: Vec<AggregatorSpec>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<AggregatorSpec>, D::Error> {
    Ok(Option::<Vec<AggregatorSpec>>::deserialize(deserializer)?.unwrap_or_default())
}

const KEY_FIELD: &str = "_id";
const TITLE_FIELD: &str = "group_by_title";

/// A `$group` stage body. Output fields keep the order they were declared in.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStage {
    key: String,
    title: Option<String>,
    outputs: Vec<(String, Accumulator)>,
}

impl GroupStage {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: None,
            outputs: Vec::new(),
        }
    }

    pub fn with_title(mut self, field: impl Into<String>) -> Self {
        self.title = Some(field.into());
        self
    }

    /// Add an output field. Redeclaring a field keeps its position and
    /// replaces the accumulator.
    ///
    /// Output names may not shadow the group key or the title passthrough.
    pub fn push(&mut self, field: String, accumulator: Accumulator) -> Result<(), CompileError> {
        check_field(&field)?;
        if field == KEY_FIELD || (field == TITLE_FIELD && self.title.is_some()) {
            return Err(invalid_field(field, "name is reserved by the group stage"));
        }
        match self.outputs.iter_mut().find(|(f, _)| *f == field) {
            Some(existing) => existing.1 = accumulator,
            None => self.outputs.push((field, accumulator)),
        }
        Ok(())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn outputs(&self) -> &[(String, Accumulator)] {
        &self.outputs
    }

    pub fn to_document(&self) -> Document {
        let key = if self.key.is_empty() {
            Bson::Null
        } else {
            Bson::String(format!("${}", self.key))
        };
        let mut group = Document::new();
        group.insert(KEY_FIELD, key);
        if let Some(title) = &self.title {
            group.insert(TITLE_FIELD, doc! { "$first": format!("${title}") });
        }
        for (field, accumulator) in &self.outputs {
            let reference = Bson::String(format!("${field}"));
            let expr = match accumulator {
                Accumulator::Avg => doc! { "$avg": reference },
                Accumulator::Sum => doc! { "$sum": reference },
                Accumulator::Count => doc! { "$sum": 1 },
                Accumulator::Min => doc! { "$min": reference },
                Accumulator::Max => doc! { "$max": reference },
                Accumulator::First => doc! { "$first": reference },
                Accumulator::Unknown(_) => continue,
            };
            group.insert(field.clone(), expr);
        }
        group
    }
}

/// Parse and compile a grouping spec.
///
/// Blank input means "no grouping" and yields `Ok(None)`. Anything else must
/// parse, so a malformed spec is an error rather than a silently skipped stage.
pub fn compile_aggregation(
    input: &str,
    policy: UnknownPolicy,
) -> Result<Option<GroupStage>, CompileError> {
    if input.trim().is_empty() {
        return Ok(None);
    }

    let spec: AggregationSpec =
        serde_json::from_str(input).map_err(|e| CompileError::parse(InputKind::Aggregation, e))?;
    compile_spec(spec, policy).map(Some)
}

pub fn compile_spec(spec: AggregationSpec, policy: UnknownPolicy) -> Result<GroupStage, CompileError> {
    if !spec.group_by.is_empty() {
        check_field(&spec.group_by)?;
    }
    if let Some(title) = &spec.group_by_title {
        check_field(title)?;
    }

    let mut stage = GroupStage::new(spec.group_by);
    stage.title = spec.group_by_title;

    for aggregator in spec.aggregators {
        if let Accumulator::Unknown(name) = &aggregator.operation {
            match policy {
                UnknownPolicy::Reject => return Err(CompileError::UnknownAccumulator(name.clone())),
                UnknownPolicy::Ignore => {
                    tracing::warn!(operation = %name, field = %aggregator.aggregate, "dropping unknown aggregator");
                    continue;
                }
            }
        }
        stage.push(aggregator.aggregate, aggregator.operation)?;
    }

    tracing::debug!(key = %stage.key, outputs = stage.outputs.len(), "compiled aggregation");
    Ok(stage)
}

/// Field names end up as `$`-references, so they must be plain paths.
fn check_field(field: &str) -> Result<(), CompileError> {
    if field.is_empty() {
        Err(invalid_field(field, "field must not be empty"))
    } else if field.starts_with('$') {
        Err(invalid_field(field, "field must not start with `$`"))
    } else {
        Ok(())
    }
}

fn invalid_field(field: impl Into<String>, reason: &str) -> CompileError {
    CompileError::InvalidField {
        input: InputKind::Aggregation,
        field: field.into(),
        reason: reason.into(),
    }
}
