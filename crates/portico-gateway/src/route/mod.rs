//! Route resolution.

mod resolver;

pub use resolver::{resolve, RouteDecision};
