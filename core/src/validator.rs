//! Declarative value validation.
//!
//! # Design
//! A rule set is an immutable tree: constraints, type checks and modifiers,
//! where `Nested` and `Fields` modifiers carry further rule sets. Evaluation is
//! plain recursive descent over a `serde_json::Value`. Rule sets deserialize
//! from JSON so they can ship alongside other configuration.
//!
//! Type checks and modifiers skip "empty" values (null, false, 0, "", "0",
//! empty arrays and objects); use `Constraint::Required` to reject those.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://[^\s/?#@]+(@[^\s/?#]+)?(:\d+)?([/?#]\S*)?$")
        .expect("URL pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Required,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Required => f.write_str("required"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Int,
    Number,
    String,
    Bool,
    Array,
    Object,
}

impl ValueKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            ValueKind::Int => value.is_i64() || value.is_u64(),
            ValueKind::Number => value.is_number(),
            ValueKind::String => value.is_string(),
            ValueKind::Bool => value.is_boolean(),
            ValueKind::Array => value.is_array(),
            ValueKind::Object => value.is_object(),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Int => "int",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Bool => "bool",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    /// Zero or greater.
    Positive,
    /// Strictly below zero.
    Negative,
    Ip,
    Url,
    /// Minimum length in characters (strings) or elements (arrays).
    MinLength(usize),
    MaxLength(usize),
    /// Apply the rules to every element of an array.
    Nested(Box<Rules>),
    /// Apply per-field rules to an object; absent fields validate as null.
    Fields(BTreeMap<String, Rules>),
}

impl Modifier {
    fn name(&self) -> &'static str {
        match self {
            Modifier::Positive => "positive",
            Modifier::Negative => "negative",
            Modifier::Ip => "ip",
            Modifier::Url => "url",
            Modifier::MinLength(_) => "min_length",
            Modifier::MaxLength(_) => "max_length",
            Modifier::Nested(_) => "nested",
            Modifier::Fields(_) => "fields",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConstraintRule {
    pub constraint: Constraint,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypeRule {
    #[serde(rename = "type")]
    pub kind: ValueKind,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
}

/// A complete rule set for one value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Rules {
    pub constraints: Vec<ConstraintRule>,
    pub types: Vec<TypeRule>,
    pub modifiers: Vec<Modifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("constraint `{0}` failed")]
    Constraint(Constraint),

    #[error("value is not of type `{0}`")]
    Type(ValueKind),

    #[error("modifier `{0}` failed")]
    Modifier(&'static str),

    #[error("element {index}: {source}")]
    Element {
        index: usize,
        source: Box<ValidationError>,
    },

    #[error("field `{field}`: {source}")]
    Field {
        field: String,
        source: Box<ValidationError>,
    },
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.constraints.push(ConstraintRule {
            constraint: Constraint::Required,
            modifiers: Vec::new(),
        });
        self
    }

    pub fn of_type(mut self, kind: ValueKind) -> Self {
        self.types.push(TypeRule {
            kind,
            modifiers: Vec::new(),
        });
        self
    }

    pub fn with(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Constraints first, then type checks, then modifiers; the first failure
    /// is reported.
    pub fn check(&self, value: &Value) -> Result<(), ValidationError> {
        for rule in &self.constraints {
            apply_constraint(value, rule.constraint)?;
            apply_modifiers(value, &rule.modifiers)?;
        }
        for rule in &self.types {
            if !is_empty(value) && !rule.kind.matches(value) {
                return Err(ValidationError::Type(rule.kind));
            }
            apply_modifiers(value, &rule.modifiers)?;
        }
        apply_modifiers(value, &self.modifiers)
    }
}

pub fn validate(value: &Value, rules: &Rules) -> bool {
    rules.check(value).is_ok()
}

fn apply_constraint(value: &Value, constraint: Constraint) -> Result<(), ValidationError> {
    match constraint {
        Constraint::Required if is_empty(value) => Err(ValidationError::Constraint(constraint)),
        Constraint::Required => Ok(()),
    }
}

fn apply_modifiers(value: &Value, modifiers: &[Modifier]) -> Result<(), ValidationError> {
    if is_empty(value) {
        return Ok(());
    }
    modifiers
        .iter()
        .try_for_each(|modifier| apply_modifier(value, modifier))
}

fn apply_modifier(value: &Value, modifier: &Modifier) -> Result<(), ValidationError> {
    let failed = || ValidationError::Modifier(modifier.name());
    match modifier {
        Modifier::Positive => as_number(value)
            .filter(|n| *n >= 0.0)
            .map(drop)
            .ok_or_else(failed),
        Modifier::Negative => as_number(value)
            .filter(|n| *n < 0.0)
            .map(drop)
            .ok_or_else(failed),
        Modifier::Ip => value
            .as_str()
            .filter(|s| s.parse::<IpAddr>().is_ok())
            .map(drop)
            .ok_or_else(failed),
        Modifier::Url => value
            .as_str()
            .filter(|s| URL_PATTERN.is_match(s))
            .map(drop)
            .ok_or_else(failed),
        Modifier::MinLength(min) => match length(value) {
            Some(len) if len < *min => Err(failed()),
            _ => Ok(()),
        },
        Modifier::MaxLength(max) => match length(value) {
            Some(len) if len > *max => Err(failed()),
            _ => Ok(()),
        },
        Modifier::Nested(rules) => match value {
            Value::Array(items) => items.iter().enumerate().try_for_each(|(index, item)| {
                rules.check(item).map_err(|source| ValidationError::Element {
                    index,
                    source: Box::new(source),
                })
            }),
            _ => rules.check(&Value::Null),
        },
        Modifier::Fields(fields) => fields.iter().try_for_each(|(field, rules)| {
            let child = value.get(field).unwrap_or(&Value::Null);
            rules.check(child).map_err(|source| ValidationError::Field {
                field: field.clone(),
                source: Box::new(source),
            })
        }),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}
