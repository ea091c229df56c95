//! Built-in predicate kinds.
//!
//! Predicates are pure boolean gates over the request snapshot; a dynamic
//! filter runs only when all of its predicates match.  Each kind binds its
//! flat parameter map onto a typed config struct at construction time, so a
//! bad configuration fails fast as a `ConfigurationError` for the owning
//! filter instead of misbehaving at request time.

mod cookie;
mod method;
mod path;
mod remote_addr;
mod time;

pub use cookie::CookiePredicate;
pub use method::MethodPredicate;
pub use path::PathPredicate;
pub use remote_addr::RemoteAddrPredicate;
pub use time::{DailyPredicate, MonthlyPredicate, TimeRangePredicate};

use crate::container::FactoryRegistry;
use portico_kernel::gateway::Predicate;

/// Factory registry for predicate kinds.
pub type PredicateRegistry = FactoryRegistry<dyn Predicate>;

/// Registry with every built-in predicate kind installed.
pub fn builtin_predicates() -> PredicateRegistry {
    let mut registry = PredicateRegistry::new();
    registry.register("method", |p| Ok(Box::new(MethodPredicate::from_params(p)?)));
    registry.register("cookie", |p| Ok(Box::new(CookiePredicate::from_params(p)?)));
    registry.register("daily", |p| Ok(Box::new(DailyPredicate::from_params(p)?)));
    registry.register("monthly", |p| Ok(Box::new(MonthlyPredicate::from_params(p)?)));
    registry.register("time_range", |p| {
        Ok(Box::new(TimeRangePredicate::from_params(p)?))
    });
    registry.register("path", |p| Ok(Box::new(PathPredicate::from_params(p)?)));
    registry.register("remote_addr", |p| {
        Ok(Box::new(RemoteAddrPredicate::from_params(p)?))
    });
    registry
}
