//! Method-in-set predicate.

use crate::container::{bind_params, BuildError};
use portico_kernel::gateway::{HttpMethod, PluginParams, Predicate, RequestContext};
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Deserialize)]
struct MethodConfig {
    methods: Vec<String>,
}

/// Matches when the request method is in the configured set.
pub struct MethodPredicate {
    methods: HashSet<HttpMethod>,
}

impl MethodPredicate {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: MethodConfig = bind_params(params)?;
        if config.methods.is_empty() {
            return Err(BuildError::invalid("'methods' must not be empty"));
        }
        let methods = config
            .methods
            .iter()
            .map(|m| {
                HttpMethod::from_str_ci(m)
                    .ok_or_else(|| BuildError::invalid(format!("unknown method '{m}'")))
            })
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(Self { methods })
    }
}

impl Predicate for MethodPredicate {
    fn matches(&self, ctx: &RequestContext) -> bool {
        self.methods.contains(&ctx.request.method)
    }
}
