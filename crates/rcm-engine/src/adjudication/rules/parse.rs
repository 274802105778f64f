use serde_json::Value;
use tracing::warn;

use super::condition::{Condition, UnknownCondition};
use super::Rule;
use crate::adjudication::domain::ErrorType;

#[derive(Debug, thiserror::Error)]
pub enum RuleParseError {
    #[error("rule document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rule document must be a JSON object or array of objects")]
    UnexpectedShape,
    #[error("rule {index} is missing required key '{key}'")]
    MissingKey { index: usize, key: &'static str },
    #[error("rule '{rule_id}': {source}")]
    UnknownCondition {
        rule_id: String,
        #[source]
        source: UnknownCondition,
    },
}

const REQUIRED_KEYS: [&str; 4] = ["rule_id", "field", "condition", "error_type"];

/// Parse a JSON rule upload: either a single rule object or an array of them.
pub fn parse_rule_document(text: &str) -> Result<Vec<Rule>, RuleParseError> {
    let document: Value = serde_json::from_str(text.trim())?;
    let entries = match document {
        Value::Array(entries) => entries,
        object @ Value::Object(_) => vec![object],
        _ => return Err(RuleParseError::UnexpectedShape),
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| rule_from_value(index, entry))
        .collect()
}

fn rule_from_value(index: usize, entry: Value) -> Result<Rule, RuleParseError> {
    let Value::Object(map) = &entry else {
        return Err(RuleParseError::UnexpectedShape);
    };
    for key in REQUIRED_KEYS {
        if !map.contains_key(key) {
            return Err(RuleParseError::MissingKey { index, key });
        }
    }

    let text = |key: &str| match map.get(key) {
        Some(Value::String(value)) => value.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let rule_id = text("rule_id");
    let condition = text("condition")
        .parse::<Condition>()
        .map_err(|source| RuleParseError::UnknownCondition {
            rule_id: rule_id.clone(),
            source,
        })?;

    Ok(Rule {
        field: text("field"),
        condition,
        value: map.get("value").cloned().unwrap_or(Value::Null),
        error_type: ErrorType::from(text("error_type")),
        explanation: text("explanation"),
        recommended_action: text("recommended_action"),
        rule_id,
    })
}

/// Parse delimited rule text, one rule per line:
/// `rule_id|field|condition|value|error_type|explanation|recommended_action`.
///
/// Blank lines, `#` comments and lines with fewer than seven columns are
/// skipped. Values are read as JSON when possible, otherwise as plain text.
pub fn parse_rule_lines(text: &str, delimiter: char) -> Vec<Rule> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(delimiter).map(str::trim).collect();
            if parts.len() < 7 {
                return None;
            }

            let condition = match parts[2].parse::<Condition>() {
                Ok(condition) => condition,
                Err(err) => {
                    warn!(rule_id = parts[0], %err, "skipping rule line");
                    return None;
                }
            };
            let value = serde_json::from_str::<Value>(parts[3])
                .unwrap_or_else(|_| Value::String(parts[3].to_string()));

            Some(Rule {
                rule_id: parts[0].to_string(),
                field: parts[1].to_string(),
                condition,
                value,
                error_type: ErrorType::from(parts[4]),
                explanation: parts[5].to_string(),
                recommended_action: parts[6].to_string(),
            })
        })
        .collect()
}

/// Rule upload in either format: JSON when the text opens with `[` or `{`,
/// pipe-delimited lines otherwise.
pub fn parse_rules(text: &str) -> Result<Vec<Rule>, RuleParseError> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        parse_rule_document(trimmed)
    } else {
        Ok(parse_rule_lines(trimmed, '|'))
    }
}
