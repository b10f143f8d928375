use std::fmt;

use serde::Deserialize;

/// Filter operator as sent by clients in the `operation` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Operator {
    Text,
    StartsWith,
    EndsWith,
    Contains,
    /// Exact match on the raw value, skipping coercion and `$in`.
    Equal,
    Eq,
    Absent,
    Present,
    Gte,
    Lte,
    Gt,
    Lt,
    Ne,
    Unknown(String),
}

impl Operator {
    pub fn parse(name: &str) -> Self {
        match name {
            "text" => Operator::Text,
            "Start With" => Operator::StartsWith,
            "End With" => Operator::EndsWith,
            "Include" => Operator::Contains,
            "Equal" => Operator::Equal,
            "=" => Operator::Eq,
            "Empty" => Operator::Absent,
            "not Empty" => Operator::Present,
            ">=" => Operator::Gte,
            "<=" => Operator::Lte,
            ">" => Operator::Gt,
            "<" => Operator::Lt,
            "!=" => Operator::Ne,
            other => Operator::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Operator::Text => "text",
            Operator::StartsWith => "Start With",
            Operator::EndsWith => "End With",
            Operator::Contains => "Include",
            Operator::Equal => "Equal",
            Operator::Eq => "=",
            Operator::Absent => "Empty",
            Operator::Present => "not Empty",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ne => "!=",
            Operator::Unknown(name) => name,
        }
    }
}

/// A condition without an `operation` is an unknown operator named `""`.
impl Default for Operator {
    fn default() -> Self {
        Operator::Unknown(String::new())
    }
}

impl From<String> for Operator {
    fn from(name: String) -> Self {
        Operator::parse(&name)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
