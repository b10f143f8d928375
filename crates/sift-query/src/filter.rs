use bson::{Bson, Document, doc};
use serde::Deserialize;

use crate::coerce::{FunctionResolver, coerce};
use crate::error::{CompileError, InputKind};
use crate::operator::Operator;
use crate::options::UnknownPolicy;

/// One client filter term.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Condition {
    #[serde(default, alias = "Label")]
    pub label: String,
    #[serde(default, rename = "operation", alias = "Operation")]
    pub operator: Operator,
    #[serde(rename = "condition", alias = "Condition", default = "null")]
    pub value: Bson,
}

fn null() -> Bson {
    Bson::Null
}

/// Compiled client filter: one `{label: predicate}` entry per condition, in
/// input order.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSet {
    entries: Vec<Document>,
}

impl FilterSet {
    pub fn entries(&self) -> &[Document] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the filter constrains nothing, i.e. every entry is `{}`.
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Document::is_empty)
    }

    /// A single condition renders as its own entry; several are joined
    /// under `$and`.
    pub fn to_document(&self) -> Document {
        match self.entries.as_slice() {
            [only] => only.clone(),
            entries => doc! {
                "$and": entries.iter().cloned().map(Bson::Document).collect::<Vec<_>>(),
            },
        }
    }
}

/// Parse and compile a JSON array of conditions.
pub fn compile_filter<R: FunctionResolver + ?Sized>(
    input: &str,
    resolver: &R,
    policy: UnknownPolicy,
) -> Result<FilterSet, CompileError> {
    let conditions: Vec<Condition> =
        serde_json::from_str(input).map_err(|e| CompileError::parse(InputKind::Filter, e))?;
    compile_conditions(&conditions, resolver, policy)
}

/// Compile already-parsed conditions into a filter set.
pub fn compile_conditions<R: FunctionResolver + ?Sized>(
    conditions: &[Condition],
    resolver: &R,
    policy: UnknownPolicy,
) -> Result<FilterSet, CompileError> {
    if conditions.is_empty() {
        return Err(CompileError::EmptyFilter);
    }

    let entries = conditions
        .iter()
        .map(|c| compile_condition(c, resolver, policy))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(conditions = entries.len(), "compiled filter");
    Ok(FilterSet { entries })
}

/// Compile one condition into its filter entry.
///
/// Most operators produce `{label: predicate}`. Text search is a top-level
/// operator in the store and ignores the label. Unknown operators under
/// `UnknownPolicy::Ignore` produce `{}`, which matches everything.
pub fn compile_condition<R: FunctionResolver + ?Sized>(
    condition: &Condition,
    resolver: &R,
    policy: UnknownPolicy,
) -> Result<Document, CompileError> {
    let predicate: Bson = match &condition.operator {
        Operator::Text => {
            let search = expect_str(condition)?;
            return Ok(doc! { "$text": { "$search": search } });
        }
        Operator::StartsWith => {
            regex_predicate(format!("^{}", regex::escape(expect_str(condition)?)))
        }
        Operator::EndsWith => {
            regex_predicate(format!("{}$", regex::escape(expect_str(condition)?)))
        }
        Operator::Contains => regex_predicate(regex::escape(expect_str(condition)?)),
        Operator::Equal => doc! { "$eq": condition.value.clone() }.into(),
        Operator::Eq => match &condition.value {
            Bson::Array(values) => doc! { "$in": values.clone() }.into(),
            value => doc! { "$eq": coerce(value, resolver) }.into(),
        },
        Operator::Absent => doc! { "$exists": false }.into(),
        Operator::Present => doc! { "$exists": true }.into(),
        Operator::Gte => compare("$gte", condition, resolver),
        Operator::Lte => compare("$lte", condition, resolver),
        Operator::Gt => compare("$gt", condition, resolver),
        Operator::Lt => compare("$lt", condition, resolver),
        Operator::Ne => compare("$ne", condition, resolver),
        Operator::Unknown(name) => match policy {
            UnknownPolicy::Reject => return Err(CompileError::UnknownOperator(name.clone())),
            UnknownPolicy::Ignore => {
                tracing::warn!(operator = %name, label = %condition.label, "ignoring unknown filter operator");
                return Ok(Document::new());
            }
        },
    };

    check_label(condition)?;
    let mut entry = Document::new();
    entry.insert(condition.label.clone(), predicate);
    Ok(entry)
}

/// Labels become field names in the store, so they must not be empty or
/// start with `$`, which would let clients write raw query operators.
fn check_label(condition: &Condition) -> Result<(), CompileError> {
    let reason = if condition.label.is_empty() {
        "label must not be empty"
    } else if condition.label.starts_with('$') {
        "label must not start with `$`"
    } else {
        return Ok(());
    };
    Err(CompileError::InvalidCondition {
        label: condition.label.clone(),
        operator: condition.operator.to_string(),
        reason: reason.into(),
    })
}

fn compare<R: FunctionResolver + ?Sized>(key: &str, condition: &Condition, resolver: &R) -> Bson {
    let mut predicate = Document::new();
    predicate.insert(key, coerce(&condition.value, resolver));
    predicate.into()
}

fn regex_predicate(pattern: String) -> Bson {
    doc! { "$regex": pattern, "$options": "i" }.into()
}

fn expect_str(condition: &Condition) -> Result<&str, CompileError> {
    condition
        .value
        .as_str()
        .ok_or_else(|| CompileError::InvalidCondition {
            label: condition.label.clone(),
            operator: condition.operator.to_string(),
            reason: "expected a string value".into(),
        })
}
