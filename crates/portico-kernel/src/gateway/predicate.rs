//! Predicate contract.
//!
//! A predicate is a pure boolean gate over a request snapshot: no side
//! effects, no I/O.  Dynamic filters carry an ANDed predicate list — the
//! filter applies only when every predicate matches (an empty list always
//! matches).

use super::types::RequestContext;

/// A pure boolean test over the current request.
pub trait Predicate: Send + Sync {
    /// Whether the request satisfies this predicate.
    fn matches(&self, ctx: &RequestContext) -> bool;
}

/// ANDed evaluation over a predicate list.  Empty ⇒ always true.
pub fn all_match(predicates: &[Box<dyn Predicate>], ctx: &RequestContext) -> bool {
    predicates.iter().all(|p| p.matches(ctx))
}
