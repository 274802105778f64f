//! Claim adjudication pipeline: tenant rules, domain rule tables, the advisory
//! ladder and verdict aggregation, plus the stores and HTTP surface around them.

pub mod advisory;
pub mod aggregate;
pub mod domain;
pub mod domain_rules;
pub mod import;
pub mod memory;
pub mod repository;
pub mod router;
pub mod rules;
pub mod service;
pub mod tables;

#[cfg(test)]
mod tests;

pub use advisory::{
    AdvisoryContext, AdvisoryProvider, AdvisoryTier, CallThrottle, CompletionTransport,
    GeminiTransport, TierOutcome, TransportError,
};
pub use aggregate::{categorize, CategoryTally, ResultAggregator};
pub use domain::{
    CategoryMetric, Claim, ClaimId, ErrorCategory, ErrorType, RefinedEntry, ServiceCap,
    TenantConfig, TenantId, ValidationStatus, Verdict, Violation,
};
pub use domain_rules::DomainRuleEvaluator;
pub use import::{ClaimImportError, ClaimImporter};
pub use memory::InMemoryTenantStore;
pub use repository::{
    ClaimStore, DeletionCounts, MetricsStore, RepositoryError, RuleStore, StoredClaim,
    TenantAdmin,
};
pub use router::adjudication_router;
pub use rules::{
    parse_rule_document, parse_rule_lines, parse_rules, Condition, Rule, RuleKind,
    RuleParseError, StaticRuleEvaluator,
};
pub use service::{
    AdjudicationError, AdjudicationService, ClaimResultView, ClaimVerdict, TenantStore,
    ValidationReport,
};
