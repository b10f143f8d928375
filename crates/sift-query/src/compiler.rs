use bson::Document;
use serde::{Deserialize, Deserializer};

use crate::aggregation::{self, GroupStage};
use crate::coerce::{FunctionResolver, NoopResolver};
use crate::error::CompileError;
use crate::filter::{self, FilterSet};
use crate::options::CompilerOptions;
use crate::pipeline::{self, CompiledPipeline, PipelineRequest, Projection};
use crate::sort::{self, SortStage};

/// Client request in its raw wire form: each part is still the JSON string
/// the front end sent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRequest {
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub aggregation: Option<String>,
    pub fields: Option<Projection>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub page: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub page_size: Option<String>,
}

/// Front ends send page numbers both as `"3"` and as `3`.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        String(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Lenient>::deserialize(deserializer)?.map(|v| match v {
        Lenient::String(s) => s,
        Lenient::Int(n) => n.to_string(),
        Lenient::Float(n) => n.to_string(),
    }))
}

/// Entry point tying the resolver and options to each compile step.
///
/// A `Compiler` holds no per-call state and can be shared across threads as
/// long as its resolver can.
#[derive(Debug, Clone, Default)]
pub struct Compiler<R = NoopResolver> {
    resolver: R,
    options: CompilerOptions,
}

impl Compiler<NoopResolver> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: FunctionResolver> Compiler<R> {
    pub fn with_resolver(resolver: R) -> Self {
        Self {
            resolver,
            options: CompilerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn compile_filter(&self, input: &str) -> Result<FilterSet, CompileError> {
        filter::compile_filter(input, &self.resolver, self.options.unknown)
    }

    pub fn compile_sort(&self, input: &str) -> Result<SortStage, CompileError> {
        sort::compile_sort(input, self.options.unknown)
    }

    pub fn compile_aggregation(&self, input: &str) -> Result<Option<GroupStage>, CompileError> {
        aggregation::compile_aggregation(input, self.options.unknown)
    }

    pub fn assemble(&self, base: &Document, request: &PipelineRequest) -> CompiledPipeline {
        pipeline::assemble(base, request, self.options.default_page_size)
    }

    /// Compile every part of a raw request and assemble the pipeline.
    ///
    /// Missing or blank filter and sort strings mean "no stage" here; only a
    /// present but invalid part fails the request.
    pub fn compile_request(
        &self,
        base: &Document,
        raw: &RawRequest,
    ) -> Result<CompiledPipeline, CompileError> {
        let filter = non_blank(&raw.filter)
            .map(|s| self.compile_filter(s))
            .transpose()?;
        let sort = non_blank(&raw.sort)
            .map(|s| self.compile_sort(s))
            .transpose()?;
        let group = match &raw.aggregation {
            Some(s) => self.compile_aggregation(s)?,
            None => None,
        };
        let request = PipelineRequest {
            filter,
            projection: raw.fields.clone(),
            group,
            sort,
            page: raw.page.clone(),
            page_size: raw.page_size.clone(),
        };
        Ok(self.assemble(base, &request))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}
