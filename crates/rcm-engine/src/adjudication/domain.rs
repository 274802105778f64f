use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identifier wrapper for tenants; every store lookup is scoped by it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for claims, unique within a tenant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClaimId(pub String);

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single healthcare billing record submitted for adjudication.
///
/// Known columns are typed; anything else lands in `extra` so tenant rules can
/// still reference it by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: ClaimId,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub encounter_type: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub service_date: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub service_code: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub facility_id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub diagnosis_codes: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub paid_amount_aed: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub approval_number: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub national_id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub member_id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub unique_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Claim {
    pub fn new(claim_id: impl Into<String>) -> Self {
        Self {
            claim_id: ClaimId(claim_id.into()),
            encounter_type: None,
            service_date: None,
            service_code: None,
            facility_id: None,
            diagnosis_codes: None,
            paid_amount_aed: None,
            approval_number: None,
            national_id: None,
            member_id: None,
            unique_id: None,
            extra: BTreeMap::new(),
        }
    }

    /// Look up a field by its column name. Null values are reported as absent.
    pub fn field(&self, name: &str) -> Option<Value> {
        let text = |value: &Option<String>| value.as_ref().map(|v| Value::String(v.clone()));
        match name {
            "claim_id" => Some(Value::String(self.claim_id.0.clone())),
            "encounter_type" => text(&self.encounter_type),
            "service_date" => text(&self.service_date),
            "service_code" => text(&self.service_code),
            "facility_id" => text(&self.facility_id),
            "diagnosis_codes" => text(&self.diagnosis_codes),
            "paid_amount_aed" => self
                .paid_amount_aed
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            "approval_number" => text(&self.approval_number),
            "national_id" => text(&self.national_id),
            "member_id" => text(&self.member_id),
            "unique_id" => text(&self.unique_id),
            other => self.extra.get(other).filter(|v| !v.is_null()).cloned(),
        }
    }

    pub fn service(&self) -> &str {
        self.service_code.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn facility(&self) -> &str {
        self.facility_id.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn encounter(&self) -> &str {
        self.encounter_type.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn is_inpatient(&self) -> bool {
        self.encounter().eq_ignore_ascii_case("inpatient")
    }

    pub fn has_approval(&self) -> bool {
        self.approval_number
            .as_deref()
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false)
    }

    /// Paid amount with absent values treated as zero.
    pub fn paid_or_zero(&self) -> f64 {
        self.paid_amount_aed.unwrap_or(0.0)
    }

    /// Diagnosis codes split on `,`, `;` or `|`, trimmed, empties dropped.
    pub fn diagnoses(&self) -> Vec<&str> {
        self.diagnosis_codes
            .as_deref()
            .unwrap_or("")
            .split([',', ';', '|'])
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .collect()
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let amount = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(amount.filter(|amount| amount.is_finite()))
}

/// Classification carried by a violation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorType {
    Technical,
    Medical,
    Other(String),
}

impl ErrorType {
    pub fn label(&self) -> &str {
        match self {
            ErrorType::Technical => "Technical error",
            ErrorType::Medical => "Medical error",
            ErrorType::Other(label) => label,
        }
    }
}

impl From<&str> for ErrorType {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "technical error" | "technical" => ErrorType::Technical,
            "medical error" | "medical" => ErrorType::Medical,
            _ => ErrorType::Other(value.trim().to_string()),
        }
    }
}

impl From<String> for ErrorType {
    fn from(value: String) -> Self {
        ErrorType::from(value.as_str())
    }
}

impl From<ErrorType> for String {
    fn from(value: ErrorType) -> Self {
        value.label().to_string()
    }
}

/// One detected failure for a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub error_type: ErrorType,
    pub explanation: String,
    pub recommended_action: String,
}

impl Violation {
    pub fn technical(explanation: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Technical,
            explanation: explanation.into(),
            recommended_action: action.into(),
        }
    }

    pub fn medical(explanation: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Medical,
            explanation: explanation.into(),
            recommended_action: action.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    #[serde(rename = "Validated")]
    Validated,
    #[serde(rename = "Not validated")]
    NotValidated,
}

impl ValidationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ValidationStatus::Validated => "Validated",
            ValidationStatus::NotValidated => "Not validated",
        }
    }
}

/// Final per-claim error bucket; also the metrics category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    #[serde(rename = "No error")]
    NoError,
    #[serde(rename = "Medical error")]
    Medical,
    #[serde(rename = "Technical error")]
    Technical,
    #[serde(rename = "Both")]
    Both,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 4] = [
        ErrorCategory::NoError,
        ErrorCategory::Medical,
        ErrorCategory::Technical,
        ErrorCategory::Both,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ErrorCategory::NoError => "No error",
            ErrorCategory::Medical => "Medical error",
            ErrorCategory::Technical => "Technical error",
            ErrorCategory::Both => "Both",
        }
    }
}

/// Outcome written back to the claim store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: ValidationStatus,
    pub error_type: ErrorCategory,
    pub explanation: String,
    pub recommended_action: String,
}

impl Verdict {
    pub fn validated() -> Self {
        Self {
            status: ValidationStatus::Validated,
            error_type: ErrorCategory::NoError,
            explanation: String::new(),
            recommended_action: String::new(),
        }
    }
}

/// Per-tenant rollup for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetric {
    pub category: ErrorCategory,
    pub count: u64,
    pub total_paid: f64,
}

/// PII-free audit row recorded for every adjudicated claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinedEntry {
    pub claim_id: ClaimId,
    pub verdict: Verdict,
    pub processed_at: DateTime<Utc>,
}

pub const APPROVAL_THRESHOLD_KEY: &str = "paid_amount_approval_threshold";
pub const PAID_AMOUNT_CAPS_KEY: &str = "paid_amount_caps";

/// Sparse tenant overrides consumed by the domain checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConfig(pub BTreeMap<String, String>);

impl TenantConfig {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Approval threshold override; `None` when absent, blank, or not numeric.
    pub fn approval_threshold(&self) -> Option<f64> {
        self.get(APPROVAL_THRESHOLD_KEY)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
    }

    /// Per-service caps. Malformed configuration yields an empty list.
    pub fn paid_amount_caps(&self) -> Vec<ServiceCap> {
        let Some(raw) = self.get(PAID_AMOUNT_CAPS_KEY) else {
            return Vec::new();
        };
        let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(raw) else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| {
                let service = match entry.get("service")? {
                    Value::String(service) => service.trim().to_string(),
                    Value::Null => return None,
                    other => other.to_string(),
                };
                let cap = match entry.get("cap") {
                    Some(Value::Number(number)) => number.as_f64()?,
                    Some(Value::String(text)) => text.trim().parse::<f64>().ok()?,
                    None | Some(Value::Null) => 0.0,
                    Some(_) => return None,
                };
                Some(ServiceCap { service, cap })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCap {
    pub service: String,
    pub cap: f64,
}
