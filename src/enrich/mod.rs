//! Optional semantic enrichment of canonical models, behind a validating guardrail.

pub mod guardrail;
pub mod payload;
pub mod validate;

pub use guardrail::{EnrichmentGuardrail, EnrichmentOutcome, EnrichmentStatus, SkipReason};
pub use validate::{Enrichment, Violation};
