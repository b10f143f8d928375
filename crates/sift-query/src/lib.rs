//! Compiles client filter, sort and grouping shapes into a document-store
//! aggregation pipeline.

mod aggregation;
mod coerce;
mod compiler;
mod error;
mod filter;
mod operator;
mod options;
mod pipeline;
mod sort;

pub use aggregation::{
    Accumulator, AggregationSpec, AggregatorSpec, GroupStage, compile_aggregation, compile_spec,
};
pub use coerce::{FunctionResolver, NoopResolver, StaticResolver, ValueClass, coerce};
pub use compiler::{Compiler, RawRequest};
pub use error::{CompileError, InputKind};
pub use filter::{Condition, FilterSet, compile_condition, compile_conditions, compile_filter};
pub use operator::Operator;
pub use options::{CompilerOptions, DEFAULT_PAGE_SIZE, UnknownPolicy};
pub use pipeline::{CompiledPipeline, Pagination, PipelineRequest, Projection, Stage, assemble};
pub use sort::{Sort, SortDirection, SortStage, compile_sort};
