use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operator vocabulary for tenant rules. Each variant reports whether the
/// claim value violates the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Condition {
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    In,
    NotIn,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rule condition '{0}'")]
pub struct UnknownCondition(pub String);

impl Condition {
    pub const fn name(self) -> &'static str {
        match self {
            Condition::Equals => "equals",
            Condition::NotEquals => "not_equals",
            Condition::LessThan => "less_than",
            Condition::GreaterThan => "greater_than",
            Condition::In => "in",
            Condition::NotIn => "not_in",
            Condition::Contains => "contains",
        }
    }

    pub fn violated_by(self, claim_value: &Value, rule_value: &Value) -> bool {
        match self {
            Condition::Equals => !loosely_equal(claim_value, rule_value),
            Condition::NotEquals => loosely_equal(claim_value, rule_value),
            Condition::LessThan => compare(claim_value, rule_value, |claim, limit| claim < limit),
            Condition::GreaterThan => {
                compare(claim_value, rule_value, |claim, limit| claim > limit)
            }
            Condition::In => member_of(claim_value, rule_value).unwrap_or(false),
            Condition::NotIn => member_of(claim_value, rule_value)
                .map(|found| !found)
                .unwrap_or(true),
            Condition::Contains => render(claim_value).contains(&render(rule_value)),
        }
    }
}

impl FromStr for Condition {
    type Err = UnknownCondition;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "equals" => Ok(Condition::Equals),
            "not_equals" => Ok(Condition::NotEquals),
            "less_than" => Ok(Condition::LessThan),
            "greater_than" => Ok(Condition::GreaterThan),
            "in" => Ok(Condition::In),
            "not_in" => Ok(Condition::NotIn),
            "contains" => Ok(Condition::Contains),
            _ => Err(UnknownCondition(raw.trim().to_string())),
        }
    }
}

impl TryFrom<String> for Condition {
    type Error = UnknownCondition;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Equality where numbers compare by value regardless of integer/float form.
pub(crate) fn loosely_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| loosely_equal(x, y))
        }
        _ => left == right,
    }
}

pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Numeric comparison; a value that cannot be coerced counts as a violation.
fn compare(claim_value: &Value, rule_value: &Value, violated: fn(f64, f64) -> bool) -> bool {
    match (as_number(claim_value), as_number(rule_value)) {
        (Some(claim), Some(limit)) => violated(claim, limit),
        _ => true,
    }
}

/// `None` when the rule value is not a list and membership cannot be decided.
fn member_of(claim_value: &Value, rule_value: &Value) -> Option<bool> {
    match rule_value {
        Value::Array(items) => Some(items.iter().any(|item| loosely_equal(item, claim_value))),
        _ => None,
    }
}

pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
