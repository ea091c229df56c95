//! Path prefix predicate.
//!
//! Installed implicitly from every filter descriptor's mount path, and also
//! available as an explicit predicate kind.

use crate::container::{bind_params, BuildError};
use portico_kernel::gateway::{PluginParams, Predicate, RequestContext};
use serde::Deserialize;

#[derive(Deserialize)]
struct PathConfig {
    path: String,
}

/// Matches when the request path equals the configured path or extends it
/// past a segment boundary.  An empty or root path matches everything.
pub struct PathPredicate {
    path: String,
}

impl PathPredicate {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: PathConfig = bind_params(params)?;
        Ok(Self::new(config.path))
    }
}

impl Predicate for PathPredicate {
    fn matches(&self, ctx: &RequestContext) -> bool {
        if self.path.is_empty() || self.path == "/" {
            return true;
        }
        let request_path = ctx.request.path.as_str();
        request_path == self.path
            || request_path.strip_suffix('/') == Some(self.path.as_str())
            || (request_path.starts_with(&self.path)
                && request_path[self.path.len()..].starts_with('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::testing::ctx;
    use portico_kernel::gateway::HttpMethod;

    #[test]
    fn prefix_matches_on_segment_boundaries() {
        let predicate = PathPredicate::new("/portal");

        assert!(predicate.matches(&ctx(HttpMethod::Get, "/portal")));
        assert!(predicate.matches(&ctx(HttpMethod::Get, "/portal/")));
        assert!(predicate.matches(&ctx(HttpMethod::Get, "/portal/home")));
        assert!(!predicate.matches(&ctx(HttpMethod::Get, "/portalx")));
        assert!(!predicate.matches(&ctx(HttpMethod::Get, "/docs")));
    }

    #[test]
    fn root_path_matches_everything() {
        let predicate = PathPredicate::new("/");
        assert!(predicate.matches(&ctx(HttpMethod::Get, "/anything/at/all")));
    }
}
