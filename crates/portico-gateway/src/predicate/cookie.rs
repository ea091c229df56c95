//! Cookie presence / matching predicate.

use crate::container::{bind_params, BuildError};
use portico_kernel::gateway::{PluginParams, Predicate, RequestContext};
use regex::Regex;
use serde::Deserialize;

#[derive(Deserialize)]
struct CookieConfig {
    name: String,
    /// Optional value pattern; without it, presence alone matches.
    #[serde(default)]
    pattern: Option<String>,
}

/// Matches when the named cookie exists and, if a pattern is configured,
/// at least one of its values matches the pattern.
pub struct CookiePredicate {
    name: String,
    pattern: Option<Regex>,
}

impl CookiePredicate {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: CookieConfig = bind_params(params)?;
        if config.name.trim().is_empty() {
            return Err(BuildError::invalid("'name' must not be blank"));
        }
        let pattern = config
            .pattern
            .map(|p| Regex::new(&p).map_err(|e| BuildError::invalid(format!("bad pattern: {e}"))))
            .transpose()?;
        Ok(Self {
            name: config.name,
            pattern,
        })
    }
}

impl Predicate for CookiePredicate {
    fn matches(&self, ctx: &RequestContext) -> bool {
        let values = ctx.request.cookie_values(&self.name);
        if values.is_empty() {
            return false;
        }
        match &self.pattern {
            Some(pattern) => values.iter().any(|v| pattern.is_match(v)),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_kernel::gateway::{GatewayRequest, HttpMethod, OriginUri, RequestContext};

    fn params(value: serde_json::Value) -> PluginParams {
        value.as_object().unwrap().clone()
    }

    fn ctx_with_cookies(cookie_headers: &[&str]) -> RequestContext {
        let mut request = GatewayRequest::new("r1", HttpMethod::Get, "/");
        for header in cookie_headers {
            request = request.with_header("cookie", *header);
        }
        RequestContext::new(
            request,
            OriginUri {
                scheme: "http".into(),
                host: "localhost".into(),
                port: 80,
                path: "/".into(),
                query: None,
            },
        )
    }

    #[test]
    fn presence_alone_matches_without_a_pattern() {
        let predicate =
            CookiePredicate::from_params(&params(serde_json::json!({ "name": "session" }))).unwrap();

        assert!(predicate.matches(&ctx_with_cookies(&["session=abc"])));
        assert!(!predicate.matches(&ctx_with_cookies(&["theme=dark"])));
        assert!(!predicate.matches(&ctx_with_cookies(&[])));
    }

    #[test]
    fn pattern_requires_at_least_one_matching_value() {
        let predicate = CookiePredicate::from_params(&params(serde_json::json!({
            "name": "session",
            "pattern": "^beta-"
        })))
        .unwrap();

        // Two values for the same cookie name — one matching is enough.
        assert!(predicate.matches(&ctx_with_cookies(&["session=abc", "session=beta-1"])));
        assert!(!predicate.matches(&ctx_with_cookies(&["session=abc"])));
    }

    #[test]
    fn invalid_pattern_fails_configuration() {
        assert!(CookiePredicate::from_params(&params(serde_json::json!({
            "name": "session",
            "pattern": "("
        })))
        .is_err());
    }
}
