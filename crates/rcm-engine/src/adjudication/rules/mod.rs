mod condition;
mod parse;

pub use condition::{Condition, UnknownCondition};
pub use parse::{parse_rule_document, parse_rule_lines, parse_rules, RuleParseError};

pub(crate) use condition::{as_number, render};

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{Claim, ErrorType, Violation};

/// Tenant-authored rule applied to a single claim field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub rule_id: String,
    pub field: String,
    pub condition: Condition,
    #[serde(default)]
    pub value: Value,
    pub error_type: ErrorType,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub recommended_action: String,
}

impl Rule {
    /// A missing or null field always violates, whatever the condition.
    pub fn is_violated_by(&self, claim: &Claim) -> bool {
        match claim.field(&self.field) {
            None => true,
            Some(claim_value) => self.condition.violated_by(&claim_value, &self.value),
        }
    }

    pub fn violation(&self) -> Violation {
        Violation {
            error_type: self.error_type.clone(),
            explanation: self.explanation.clone(),
            recommended_action: self.recommended_action.clone(),
        }
    }
}

/// Rule sets are uploaded and replaced per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Technical,
    Medical,
}

impl RuleKind {
    pub const fn label(self) -> &'static str {
        match self {
            RuleKind::Technical => "technical",
            RuleKind::Medical => "medical",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Applies a tenant's rule collection to claims, in rule order.
#[derive(Debug, Clone, Default)]
pub struct StaticRuleEvaluator {
    rules: Vec<Rule>,
}

impl StaticRuleEvaluator {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn evaluate(&self, claim: &Claim) -> Vec<Violation> {
        self.rules
            .iter()
            .filter(|rule| rule.is_violated_by(claim))
            .map(Rule::violation)
            .collect()
    }
}
