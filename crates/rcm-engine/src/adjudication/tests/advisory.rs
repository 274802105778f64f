use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;

use super::common::*;
use crate::adjudication::advisory::{AdvisoryContext, AdvisoryTier, RuleCueTier, TierOutcome};
use crate::adjudication::domain::{Claim, ErrorType};
use crate::adjudication::rules::Condition;
use crate::adjudication::{AdvisoryProvider, CallThrottle};
use crate::config::AdvisoryConfig;

const MODEL_REPLY: &str = r#"Here is my review:
```json
[{"error_type": "Medical error", "explanation": "Procedure unsupported by diagnosis", "recommended_action": "Attach clinical notes"}]
```"#;

fn open_throttle() -> Arc<CallThrottle> {
    Arc::new(CallThrottle::new(Duration::ZERO, Duration::from_secs(60)))
}

fn high_value_claim() -> Claim {
    outpatient_claim("C-1", "SRV2001", 900.0)
}

#[test]
fn ladder_order_depends_on_credentials() {
    let disabled = AdvisoryConfig::disabled();
    let provider = AdvisoryProvider::from_config(&disabled, disabled.throttle());
    assert_eq!(provider.tier_names(), vec!["rule_cues", "heuristic"]);

    let mut configured = AdvisoryConfig::disabled();
    configured.provider = Some("gemini".to_string());
    configured.api_key = Some("test-key".to_string());
    let provider = AdvisoryProvider::from_config(&configured, configured.throttle());
    assert_eq!(provider.tier_names(), vec!["model", "rule_cues", "heuristic"]);
}

#[tokio::test]
async fn model_findings_win_over_fallbacks() {
    let transport = ScriptedTransport::new(Script::Reply(MODEL_REPLY.to_string()));
    let provider = model_provider(transport.clone(), open_throttle(), Duration::from_secs(1));

    let findings = provider
        .advise(&high_value_claim(), &AdvisoryContext::default())
        .await;

    assert_eq!(transport.calls(), 1);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].error_type, ErrorType::Medical);
    assert_eq!(findings[0].explanation, "Procedure unsupported by diagnosis");
}

#[tokio::test]
async fn unusable_model_reply_falls_through_to_heuristics() {
    let transport = ScriptedTransport::new(Script::Reply("no issues found".to_string()));
    let provider = model_provider(transport.clone(), open_throttle(), Duration::from_secs(1));

    let findings = provider
        .advise(&high_value_claim(), &AdvisoryContext::default())
        .await;

    assert_eq!(transport.calls(), 1);
    assert_eq!(findings.len(), 1);
    assert!(findings[0].explanation.contains("typically requires review/approval"));
}

#[tokio::test]
async fn throttle_allows_one_attempt_per_interval() {
    let transport = ScriptedTransport::new(Script::Reply(MODEL_REPLY.to_string()));
    let throttle = Arc::new(CallThrottle::new(
        Duration::from_secs(30),
        Duration::from_secs(60),
    ));
    let provider = model_provider(transport.clone(), throttle, Duration::from_secs(1));
    let context = AdvisoryContext::default();

    let first = provider.advise(&high_value_claim(), &context).await;
    let second = provider.advise(&high_value_claim(), &context).await;

    assert_eq!(transport.calls(), 1);
    assert_eq!(first[0].explanation, "Procedure unsupported by diagnosis");
    assert!(second[0].explanation.contains("typically requires review/approval"));
}

#[tokio::test]
async fn throttled_claim_does_not_wait_for_call_in_flight() {
    let transport = ScriptedTransport::new(Script::Hang(Duration::from_secs(2)));
    let throttle = Arc::new(CallThrottle::new(
        Duration::from_secs(30),
        Duration::from_secs(60),
    ));
    let provider = Arc::new(model_provider(
        transport.clone(),
        throttle,
        Duration::from_secs(5),
    ));
    let context = Arc::new(AdvisoryContext::default());

    let in_flight = {
        let provider = Arc::clone(&provider);
        let context = Arc::clone(&context);
        tokio::spawn(async move { provider.advise(&high_value_claim(), &context).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.calls(), 1);

    let started = Instant::now();
    let second = provider.advise(&high_value_claim(), &context).await;

    assert!(started.elapsed() < Duration::from_millis(500));
    assert!(second[0].explanation.contains("typically requires review/approval"));
    assert_eq!(transport.calls(), 1);

    let first = in_flight.await.expect("in-flight call completes");
    assert!(!first.is_empty());
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn rate_limit_extends_the_throttle_window() {
    let transport = ScriptedTransport::new(Script::RateLimited);
    let throttle = Arc::new(CallThrottle::new(
        Duration::from_millis(10),
        Duration::from_secs(120),
    ));
    let provider = model_provider(transport.clone(), throttle.clone(), Duration::from_secs(1));

    let findings = provider
        .advise(&high_value_claim(), &AdvisoryContext::default())
        .await;

    assert_eq!(transport.calls(), 1);
    assert!(!findings.is_empty());
    assert!(throttle.remaining() > Duration::from_secs(60));
    assert!(!throttle.try_acquire());
}

#[tokio::test]
async fn failing_model_never_surfaces_an_error() {
    let transport = ScriptedTransport::new(Script::Fail);
    let provider = model_provider(transport.clone(), open_throttle(), Duration::from_secs(1));

    let findings = provider
        .advise(&Claim::new("C-1"), &AdvisoryContext::default())
        .await;

    assert_eq!(transport.calls(), 1);
    assert!(findings.is_empty());
}

#[tokio::test]
async fn slow_model_is_abandoned_after_timeout() {
    let transport = ScriptedTransport::new(Script::Hang(Duration::from_secs(30)));
    let provider = model_provider(transport, open_throttle(), Duration::from_millis(50));

    let started = Instant::now();
    let findings = provider
        .advise(&high_value_claim(), &AdvisoryContext::default())
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(findings[0].explanation.contains("typically requires review/approval"));
}

#[tokio::test]
async fn rule_cues_mirror_tenant_rule_text() {
    let mut approval_rule = rule(
        "T-APR",
        "approval_number",
        Condition::NotEquals,
        json!(""),
        ErrorType::Technical,
    );
    approval_rule.explanation = "Prior approval is mandatory".to_string();
    let amount_rule = rule(
        "T-AMT",
        "paid_amount_aed",
        Condition::GreaterThan,
        json!(500),
        ErrorType::Technical,
    );
    let context = AdvisoryContext {
        technical_rules: vec![approval_rule, amount_rule],
        medical_rules: Vec::new(),
    };

    let TierOutcome::Findings(findings) = RuleCueTier.advise(&high_value_claim(), &context).await
    else {
        panic!("expected rule-cue findings");
    };
    let explanations: Vec<&str> = findings.iter().map(|f| f.explanation.as_str()).collect();
    assert_eq!(
        explanations,
        vec![
            "Rule T-APR expects an approval number but none is present",
            "Paid amount AED 900 is above 500 referenced by rule T-AMT",
        ]
    );
    assert_eq!(findings[0].recommended_action, "Correct approval_number");
}

#[tokio::test]
async fn heuristics_flag_inpatient_series_outside_inpatient_encounters() {
    let claim = outpatient_claim("C-1", "SRV1005", 100.0);
    let findings = AdvisoryProvider::offline()
        .advise(&claim, &AdvisoryContext::default())
        .await;
    assert_eq!(findings.len(), 1);
    assert_eq!(
        findings[0].explanation,
        "Service SRV1005 is commonly inpatient; check encounter type."
    );

    let inpatient = Claim {
        encounter_type: Some("Inpatient".to_string()),
        ..claim
    };
    assert!(AdvisoryProvider::offline()
        .advise(&inpatient, &AdvisoryContext::default())
        .await
        .is_empty());
}
