//! Form schema registry.
//!
//! Static descriptors for the two batch forms, serialized in the shape the
//! form renderer consumes, plus the evaluator for their constraint grammar.

mod batch_run;
mod new_batch;

use std::str::FromStr;

use regex::RegexBuilder;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

pub use batch_run::BATCH_RUN_FORM;
pub use new_batch::NEW_BATCH_FORM;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericKind {
    Integer,
    Number,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Numericality {
    pub greater_than_or_equal_to: f64,
    pub less_than_or_equal_to: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericConstraints {
    pub numericality: Numericality,
    #[serde(rename = "type")]
    pub kind: NumericKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LengthRange {
    pub minimum: usize,
    pub maximum: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Format {
    pub pattern: &'static str,
    pub flags: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextConstraints {
    pub length: LengthRange,
    /// Always `"string"` on the wire.
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub format: Format,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Constraints {
    Numeric(NumericConstraints),
    Text(TextConstraints),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub name: &'static str,
    pub full_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    pub constraints: Constraints,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormSchema {
    fields: Vec<FieldDescriptor>,
}

/// One failed rule. Messages follow the renderer's wording so they can be
/// shown next to the offending input unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("{field} can't be blank")]
    Missing { field: &'static str },
    #[error("{field} is not a number")]
    NotANumber { field: &'static str },
    #[error("{field} must be an integer")]
    NotAnInteger { field: &'static str },
    #[error("{field} must be greater than or equal to {min}")]
    BelowMinimum { field: &'static str, min: f64 },
    #[error("{field} must be less than or equal to {max}")]
    AboveMaximum { field: &'static str, max: f64 },
    #[error("{field} must be a string")]
    NotAString { field: &'static str },
    #[error("{field} is too short (minimum is {min} characters)")]
    TooShort { field: &'static str, min: usize },
    #[error("{field} is too long (maximum is {max} characters)")]
    TooLong { field: &'static str, max: usize },
    #[error("{field} is invalid")]
    Format { field: &'static str },
}

impl Violation {
    pub fn field(&self) -> &'static str {
        match self {
            Self::Missing { field }
            | Self::NotANumber { field }
            | Self::NotAnInteger { field }
            | Self::BelowMinimum { field, .. }
            | Self::AboveMaximum { field, .. }
            | Self::NotAString { field }
            | Self::TooShort { field, .. }
            | Self::TooLong { field, .. }
            | Self::Format { field } => field,
        }
    }
}

impl FormSchema {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Default values keyed by field name; fields without a default are omitted.
    pub fn defaults(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|f| f.default.clone().map(|v| (f.name.to_string(), v)))
            .collect()
    }

    /// Fill absent fields from their defaults. Present values are never replaced.
    pub fn with_defaults(&self, values: &Map<String, Value>) -> Map<String, Value> {
        let mut merged = self.defaults();
        for (k, v) in values {
            merged.insert(k.clone(), v.clone());
        }
        merged
    }

    /// Turn `name=value` text pairs into typed form values: numbers for
    /// numeric fields when they parse, strings otherwise. Unknown names are kept
    /// as strings and ignored by validation.
    pub fn parse_pairs<'a>(
        &self,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Map<String, Value> {
        pairs
            .into_iter()
            .map(|(name, raw)| {
                let value = match self.field(name).map(|f| f.field_type) {
                    Some(FieldType::Number) => parse_number(raw)
                        .map(Value::Number)
                        .unwrap_or_else(|| Value::String(raw.to_string())),
                    _ => Value::String(raw.to_string()),
                };
                (name.to_string(), value)
            })
            .collect()
    }

    /// Check `values` against every field, collecting all violations.
    /// Absent fields fall back to their default before checking.
    pub fn validate(&self, values: &Map<String, Value>) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();
        for field in &self.fields {
            let value = values
                .get(field.name)
                .filter(|v| !v.is_null())
                .or(field.default.as_ref());
            let Some(value) = value else {
                violations.push(Violation::Missing { field: field.name });
                continue;
            };
            match &field.constraints {
                Constraints::Numeric(c) => check_numeric(field.name, c, value, &mut violations),
                Constraints::Text(c) => check_text(field.name, c, value, &mut violations),
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

fn parse_number(raw: &str) -> Option<Number> {
    let raw = raw.trim();
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Number::from(i));
    }
    raw.parse::<f64>().ok().and_then(Number::from_f64)
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s).and_then(|n| n.as_f64()),
        _ => None,
    }
}

fn check_numeric(
    field: &'static str,
    constraints: &NumericConstraints,
    value: &Value,
    out: &mut Vec<Violation>,
) {
    let Some(n) = numeric_value(value).filter(|n| n.is_finite()) else {
        out.push(Violation::NotANumber { field });
        return;
    };
    if constraints.kind == NumericKind::Integer && n.fract() != 0.0 {
        out.push(Violation::NotAnInteger { field });
    }
    let bounds = &constraints.numericality;
    if n < bounds.greater_than_or_equal_to {
        out.push(Violation::BelowMinimum {
            field,
            min: bounds.greater_than_or_equal_to,
        });
    }
    if n > bounds.less_than_or_equal_to {
        out.push(Violation::AboveMaximum {
            field,
            max: bounds.less_than_or_equal_to,
        });
    }
}

fn check_text(
    field: &'static str,
    constraints: &TextConstraints,
    value: &Value,
    out: &mut Vec<Violation>,
) {
    let Value::String(text) = value else {
        out.push(Violation::NotAString { field });
        return;
    };
    let len = text.chars().count();
    if len < constraints.length.minimum {
        out.push(Violation::TooShort {
            field,
            min: constraints.length.minimum,
        });
    }
    if len > constraints.length.maximum {
        out.push(Violation::TooLong {
            field,
            max: constraints.length.maximum,
        });
    }
    // The whole value has to match, not just a substring.
    let anchored = format!("^(?:{})$", constraints.format.pattern);
    let matches = RegexBuilder::new(&anchored)
        .case_insensitive(constraints.format.flags.contains('i'))
        .build()
        .map(|re| re.is_match(text))
        .unwrap_or(false);
    if !matches {
        out.push(Violation::Format { field });
    }
}

/// The two forms the UI renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    BatchRun,
    NewBatch,
}

impl FormKind {
    pub fn schema(self) -> &'static FormSchema {
        match self {
            Self::BatchRun => &BATCH_RUN_FORM,
            Self::NewBatch => &NEW_BATCH_FORM,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BatchRun => "run",
            Self::NewBatch => "new-batch",
        }
    }
}

impl FromStr for FormKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "run" | "batch-run" => Ok(Self::BatchRun),
            "new-batch" | "new" => Ok(Self::NewBatch),
            other => Err(format!("unknown form '{other}' (expected run|new-batch)")),
        }
    }
}

/// Check a submission for `kind` against its schema.
pub fn validate_form(kind: FormKind, values: &Map<String, Value>) -> Result<(), Vec<Violation>> {
    kind.schema().validate(values)
}
