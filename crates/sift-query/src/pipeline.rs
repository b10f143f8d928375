use bson::{Bson, Document, doc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::aggregation::GroupStage;
use crate::error::{CompileError, InputKind};
use crate::filter::FilterSet;
use crate::sort::SortStage;

/// Field inclusion set for a `$project` stage, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<(String, bool)>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, field: impl Into<String>) -> Self {
        self.set(field.into(), true);
        self
    }

    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.set(field.into(), false);
        self
    }

    fn set(&mut self, field: String, included: bool) {
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some(existing) => existing.1 = included,
            None => self.fields.push((field, included)),
        }
    }

    /// Build from a `{field: flag}` document such as `{"name": 1, "_id": 0}`.
    /// Flags are booleans or numbers; zero and `false` exclude.
    pub fn from_flags(flags: &Document) -> Result<Self, CompileError> {
        let mut projection = Projection::new();
        for (field, flag) in flags {
            let included = match flag {
                Bson::Boolean(b) => *b,
                Bson::Int32(n) => *n != 0,
                Bson::Int64(n) => *n != 0,
                Bson::Double(n) => *n != 0.0,
                other => {
                    return Err(invalid_field(
                        field,
                        &format!("expected 0, 1 or a boolean, got {other}"),
                    ));
                }
            };
            if field.is_empty() || field.starts_with('$') {
                return Err(invalid_field(field, "field must be a plain path"));
            }
            projection.set(field.clone(), included);
        }
        Ok(projection)
    }

    pub fn fields(&self) -> &[(String, bool)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        for (field, included) in &self.fields {
            doc.insert(field.clone(), i32::from(*included));
        }
        doc
    }
}

fn invalid_field(field: &str, reason: &str) -> CompileError {
    CompileError::InvalidField {
        input: InputKind::Projection,
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Accepts either a list of included field names or a `{field: flag}` map.
impl<'de> Deserialize<'de> for Projection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Names(Vec<String>),
            Flags(Document),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Names(names) => Ok(names.into_iter().collect()),
            Wire::Flags(flags) => Projection::from_flags(&flags).map_err(D::Error::custom),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for Projection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Projection::new(), |projection, field| projection.include(field))
    }
}

/// Page number and page size after defaulting.
///
/// Page numbers are 1-based; page 0 means "not given" and skips nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
}

impl Pagination {
    pub fn parse(page: Option<&str>, page_size: Option<&str>, default_page_size: i64) -> Self {
        let page = page
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|p| *p >= 0)
            .unwrap_or(0);
        let page_size = page_size
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(default_page_size);
        Self { page, page_size }
    }

    pub fn skip(&self) -> i64 {
        if self.page == 0 {
            0
        } else {
            (self.page - 1).saturating_mul(self.page_size)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Document),
    Project(Document),
    Group(Document),
    Sort(Document),
    Skip(i64),
    Limit(i64),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Match(_) => "$match",
            Stage::Project(_) => "$project",
            Stage::Group(_) => "$group",
            Stage::Sort(_) => "$sort",
            Stage::Skip(_) => "$skip",
            Stage::Limit(_) => "$limit",
        }
    }

    pub fn to_document(&self) -> Document {
        let body = match self {
            Stage::Match(d) | Stage::Project(d) | Stage::Group(d) | Stage::Sort(d) => {
                Bson::Document(d.clone())
            }
            Stage::Skip(n) | Stage::Limit(n) => Bson::Int64(*n),
        };
        let mut doc = Document::new();
        doc.insert(self.name(), body);
        doc
    }
}

/// Everything the assembler needs besides the caller's base predicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineRequest {
    pub filter: Option<FilterSet>,
    pub projection: Option<Projection>,
    pub group: Option<GroupStage>,
    pub sort: Option<SortStage>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPipeline {
    pub stages: Vec<Stage>,
    /// Predicate for a separate total-count query.
    pub count: Document,
}

impl CompiledPipeline {
    pub fn to_documents(&self) -> Vec<Document> {
        self.stages.iter().map(Stage::to_document).collect()
    }
}

/// Compose the final pipeline.
///
/// Stage order is fixed: base `$match`, client `$match`, `$project`,
/// `$group`, `$sort`, `$skip`, `$limit`. Optional stages that are absent or
/// empty are left out entirely.
pub fn assemble(base: &Document, request: &PipelineRequest, default_page_size: i64) -> CompiledPipeline {
    let pagination = Pagination::parse(
        request.page.as_deref(),
        request.page_size.as_deref(),
        default_page_size,
    );

    let filter = request
        .filter
        .as_ref()
        .filter(|f| !f.is_empty())
        .map(FilterSet::to_document);

    let count = match &filter {
        Some(filter) => doc! { "$and": [base.clone(), filter.clone()] },
        None => base.clone(),
    };

    let mut stages = vec![Stage::Match(base.clone())];
    if let Some(filter) = filter {
        stages.push(Stage::Match(filter));
    }
    if let Some(projection) = request.projection.as_ref().filter(|p| !p.is_empty()) {
        stages.push(Stage::Project(projection.to_document()));
    }
    if let Some(group) = &request.group {
        stages.push(Stage::Group(group.to_document()));
    }
    if let Some(sort) = request.sort.as_ref().filter(|s| !s.is_empty()) {
        stages.push(Stage::Sort(sort.to_document()));
    }
    stages.push(Stage::Skip(pagination.skip()));
    stages.push(Stage::Limit(pagination.page_size));

    tracing::debug!(
        stages = stages.len(),
        page = pagination.page,
        page_size = pagination.page_size,
        "assembled pipeline"
    );
    CompiledPipeline { stages, count }
}
