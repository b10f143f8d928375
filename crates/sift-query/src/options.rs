use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// What to do with operator, accumulator or direction names the compiler
/// does not recognise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPolicy {
    /// Drop the entry (or emit an always-true predicate) and log a warning.
    #[default]
    Ignore,
    /// Fail the compilation with a `CompileError`.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    pub unknown: UnknownPolicy,
    /// Page size used when the request omits one or sends garbage.
    pub default_page_size: i64,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            unknown: UnknownPolicy::Ignore,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CompilerOptions {
    pub fn strict() -> Self {
        Self {
            unknown: UnknownPolicy::Reject,
            ..Self::default()
        }
    }
}
