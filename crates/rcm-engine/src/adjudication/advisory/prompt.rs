use std::fmt::Write as _;

use serde_json::Value;

use super::AdvisoryContext;
use crate::adjudication::domain::{Claim, ErrorType, Violation};

const CLAIM_KEYS: [&str; 7] = [
    "claim_id",
    "service_code",
    "facility_id",
    "encounter_type",
    "diagnosis_codes",
    "paid_amount_aed",
    "approval_number",
];

const INSTRUCTIONS: &str = "Please list any likely technical or medical errors found in the claim \
given the rules above and a single recommended action for each as a JSON array of objects with \
keys: error_type, explanation, recommended_action.";

/// Compact, line-oriented prompt: claim key fields, then rule context as JSON.
pub(crate) fn build_prompt(claim: &Claim, context: &AdvisoryContext) -> String {
    let mut prompt = String::new();
    for key in CLAIM_KEYS {
        let value = claim
            .field(key)
            .map(|value| match value {
                Value::String(text) => text,
                other => other.to_string(),
            })
            .unwrap_or_else(|| "None".to_string());
        let _ = writeln!(prompt, "{key}: {value}");
    }

    for (label, rules) in [
        ("TECHNICAL_RULES", &context.technical_rules),
        ("MEDICAL_RULES", &context.medical_rules),
    ] {
        if rules.is_empty() {
            continue;
        }
        match serde_json::to_string(rules) {
            Ok(json) => {
                let _ = write!(prompt, "\n{label}:\n{json}\n");
            }
            Err(_) => {
                let _ = write!(prompt, "\n{label}: (unserializable)\n");
            }
        }
    }

    prompt.push('\n');
    prompt.push_str(INSTRUCTIONS);
    prompt
}

/// Read the model's reply as a JSON array of violation-shaped objects.
///
/// Code fences and prose around the array are tolerated. Entries without an
/// explanation are dropped; a missing error type defaults to medical.
pub(crate) fn parse_suggestions(text: &str) -> Vec<Violation> {
    let Some(entries) = locate_array(text) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let object = entry.as_object()?;
            let field = |keys: &[&str]| {
                keys.iter()
                    .find_map(|key| object.get(*key).and_then(Value::as_str))
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
            };

            let explanation = field(&["explanation", "explain"])?;
            let error_type = field(&["error_type", "type"])
                .map(ErrorType::from)
                .unwrap_or(ErrorType::Medical);
            let recommended_action = field(&["recommended_action", "action"]).unwrap_or_default();

            Some(Violation {
                error_type,
                explanation,
                recommended_action,
            })
        })
        .collect()
}

fn locate_array(text: &str) -> Option<Vec<Value>> {
    let trimmed = text.trim();
    if let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(trimmed) {
        return Some(entries);
    }

    let start = trimmed.find('[')?;
    let end = trimmed.rfind(']')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(Value::Array(entries)) => Some(entries),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjudication::rules::{Condition, Rule};
    use serde_json::json;

    #[test]
    fn prompt_lists_claim_fields_and_rule_context() {
        let mut claim = Claim::new("C-77");
        claim.service_code = Some("SRV1001".to_string());
        claim.paid_amount_aed = Some(360.0);
        let context = AdvisoryContext {
            technical_rules: vec![Rule {
                rule_id: "T1".to_string(),
                field: "approval_number".to_string(),
                condition: Condition::NotEquals,
                value: json!(""),
                error_type: ErrorType::Technical,
                explanation: "Approval required".to_string(),
                recommended_action: "Obtain approval".to_string(),
            }],
            medical_rules: Vec::new(),
        };

        let prompt = build_prompt(&claim, &context);

        assert!(prompt.contains("claim_id: C-77"));
        assert!(prompt.contains("service_code: SRV1001"));
        assert!(prompt.contains("approval_number: None"));
        assert!(prompt.contains("TECHNICAL_RULES:"));
        assert!(!prompt.contains("MEDICAL_RULES:"));
        assert!(prompt.ends_with("recommended_action."));
    }

    #[test]
    fn fenced_arrays_are_parsed() {
        let reply = "Here you go:\n```json\n[{\"error_type\":\"Technical error\",\
            \"explanation\":\"Missing approval\",\"recommended_action\":\"Obtain approval\"},\
            {\"explanation\":\"Dx mismatch\"}, 42, {\"error_type\":\"Technical error\"}]\n```";

        let parsed = parse_suggestions(reply);

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].error_type, ErrorType::Technical);
        assert_eq!(parsed[1].error_type, ErrorType::Medical);
        assert_eq!(parsed[1].recommended_action, "");
    }

    #[test]
    fn non_array_replies_yield_nothing() {
        assert!(parse_suggestions("{\"explanation\":\"x\"}").is_empty());
        assert!(parse_suggestions("no issues found").is_empty());
        assert!(parse_suggestions("] oops [").is_empty());
    }
}
