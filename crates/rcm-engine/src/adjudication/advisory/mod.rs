//! Best-effort supplementary checks.
//!
//! The provider walks an ordered ladder of tiers and returns the findings of
//! the first tier that produces any. It has no error path: every failure
//! inside a tier degrades to an empty outcome and the next tier is tried.

mod fallback;
mod model;
mod prompt;
mod throttle;

pub use fallback::{HeuristicTier, RuleCueTier};
pub use model::{CompletionTransport, GeminiTransport, ModelTier, TransportError};
pub use throttle::CallThrottle;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use super::domain::{Claim, Violation};
use super::rules::Rule;
use crate::config::AdvisoryConfig;

/// Tenant rule sets handed to the tiers as reasoning context.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdvisoryContext {
    pub technical_rules: Vec<Rule>,
    pub medical_rules: Vec<Rule>,
}

impl AdvisoryContext {
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.technical_rules.iter().chain(self.medical_rules.iter())
    }
}

/// Result of one rung of the ladder.
#[derive(Debug, Clone, PartialEq)]
pub enum TierOutcome {
    Findings(Vec<Violation>),
    Empty,
}

impl From<Vec<Violation>> for TierOutcome {
    fn from(findings: Vec<Violation>) -> Self {
        if findings.is_empty() {
            TierOutcome::Empty
        } else {
            TierOutcome::Findings(findings)
        }
    }
}

#[async_trait]
pub trait AdvisoryTier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn advise(&self, claim: &Claim, context: &AdvisoryContext) -> TierOutcome;
}

/// Ordered ladder of advisory tiers.
pub struct AdvisoryProvider {
    tiers: Vec<Box<dyn AdvisoryTier>>,
}

impl AdvisoryProvider {
    pub fn new(tiers: Vec<Box<dyn AdvisoryTier>>) -> Self {
        Self { tiers }
    }

    /// Rule-cue and heuristic tiers only.
    pub fn offline() -> Self {
        Self::new(vec![Box::new(RuleCueTier), Box::new(HeuristicTier)])
    }

    /// Model tier on top of the offline ladder, sharing the given throttle.
    pub fn with_model(
        transport: Arc<dyn CompletionTransport>,
        throttle: Arc<CallThrottle>,
        config: &AdvisoryConfig,
    ) -> Self {
        Self::new(vec![
            Box::new(ModelTier::new(transport, throttle, config.request_timeout)),
            Box::new(RuleCueTier),
            Box::new(HeuristicTier),
        ])
    }

    /// Build the ladder from configuration. Without a provider and credential
    /// the ladder starts at the rule-cue tier.
    pub fn from_config(config: &AdvisoryConfig, throttle: Arc<CallThrottle>) -> Self {
        let Some(api_key) = config.credential() else {
            debug!("advisory model not configured; using offline ladder");
            return Self::offline();
        };

        match GeminiTransport::new(config, api_key.to_string()) {
            Ok(transport) => Self::with_model(Arc::new(transport), throttle, config),
            Err(err) => {
                warn!(%err, "advisory transport unavailable; using offline ladder");
                Self::offline()
            }
        }
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|tier| tier.name()).collect()
    }

    pub async fn advise(&self, claim: &Claim, context: &AdvisoryContext) -> Vec<Violation> {
        for tier in &self.tiers {
            if let TierOutcome::Findings(findings) = tier.advise(claim, context).await {
                debug!(
                    claim_id = %claim.claim_id,
                    tier = tier.name(),
                    count = findings.len(),
                    "advisory tier produced findings"
                );
                return findings;
            }
        }
        Vec::new()
    }
}

impl std::fmt::Debug for AdvisoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvisoryProvider")
            .field("tiers", &self.tier_names())
            .finish()
    }
}
