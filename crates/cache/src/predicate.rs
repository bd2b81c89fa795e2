//! The cacheability predicate. Cache-safety is an
//! application-level obligation — the cache store itself is a dumb memo,
//! only ever consulted when the planner has already decided "safe" by
//! evaluating this predicate.

use ceci_domain::conversation::EntityFrame;
use ceci_domain::intent::Intent;

/// Inputs the planner has already computed before it can ask "is this
/// cacheable" — kept as plain booleans so this crate never needs its own
/// copy of the reference-token scanner.
pub struct CacheabilityInputs<'a> {
    pub intent: Intent,
    pub entity_frame: &'a EntityFrame,
    pub has_reference_tokens: bool,
    pub names_time_relative_operator: bool,
}

pub fn is_cacheable(inputs: &CacheabilityInputs<'_>) -> bool {
    inputs.intent.is_cacheable_family()
        && !inputs.has_reference_tokens
        && inputs.entity_frame.decision_number().is_none()
        && !inputs.names_time_relative_operator
}
