use std::collections::HashMap;

use bson::Bson;
use serde::Deserialize;

/// How a raw string condition value should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    /// The string names a function whose result replaces it.
    FunctionRef,
    PlainString,
    Other,
}

/// Extension point for turning identifiers like `"today"` into concrete
/// values at compile time.
///
/// Implementations are shared across concurrent compilations, so they must
/// be `Send + Sync`. Whatever `resolve` returns is used verbatim, including
/// `Bson::Null` for identifiers the resolver cannot handle.
pub trait FunctionResolver: Send + Sync {
    fn classify(&self, raw: &str) -> ValueClass;

    fn resolve(&self, identifier: &str) -> Bson;
}

/// A resolver that treats every string as a plain value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl FunctionResolver for NoopResolver {
    fn classify(&self, _raw: &str) -> ValueClass {
        ValueClass::PlainString
    }

    fn resolve(&self, _identifier: &str) -> Bson {
        Bson::Null
    }
}

/// A resolver backed by a fixed identifier table.
///
/// A string is a function reference exactly when it is a key of the table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct StaticResolver {
    functions: HashMap<String, Bson>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, identifier: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.functions.insert(identifier.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl FromIterator<(String, Bson)> for StaticResolver {
    fn from_iter<I: IntoIterator<Item = (String, Bson)>>(iter: I) -> Self {
        Self {
            functions: iter.into_iter().collect(),
        }
    }
}

impl FunctionResolver for StaticResolver {
    fn classify(&self, raw: &str) -> ValueClass {
        if self.functions.contains_key(raw) {
            ValueClass::FunctionRef
        } else {
            ValueClass::PlainString
        }
    }

    fn resolve(&self, identifier: &str) -> Bson {
        self.functions
            .get(identifier)
            .cloned()
            .unwrap_or(Bson::Null)
    }
}

/// Coerce a raw condition value. Non-strings pass through untouched.
pub fn coerce<R: FunctionResolver + ?Sized>(value: &Bson, resolver: &R) -> Bson {
    match value {
        Bson::String(s) => match resolver.classify(s) {
            ValueClass::FunctionRef => resolver.resolve(s),
            ValueClass::PlainString | ValueClass::Other => value.clone(),
        },
        other => other.clone(),
    }
}
