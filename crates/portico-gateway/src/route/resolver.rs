//! Path-specificity route resolver.
//!
//! For each enabled application of the tenant a match score is computed:
//! the path equalling the context path (with or without a trailing slash)
//! scores `u32::MAX`; the path extending the context path past a `/` scores
//! the context-path length; anything else does not match.  The highest
//! positive score wins and ties resolve to the earliest declared binding.
//! The same algorithm then optionally refines the match over the selected
//! application's modules.

use portico_kernel::gateway::{
    Application, GatewayError, GatewayResult, Module, RouteTarget, TargetBase, Tenant,
};
use std::sync::Arc;
use tracing::debug;

/// Outcome of route resolution.
#[derive(Debug)]
pub enum RouteDecision {
    /// Forward to the resolved target.
    Proxy(RouteTarget),
    /// Tell the caller to retry at `location` (trailing-slash fixups and the
    /// primary-application fallback for `/`).
    Redirect(String),
}

/// Match score for `path` against a mount prefix.  `None` means no match.
fn score(path: &str, context_path: &str) -> Option<u32> {
    if path == context_path || path.strip_suffix('/') == Some(context_path) {
        return Some(u32::MAX);
    }
    if path.starts_with(context_path) && path[context_path.len()..].starts_with('/') {
        return Some(context_path.len() as u32);
    }
    None
}

/// Best-scoring item, first declared wins on ties.
fn best_match<'a, T>(
    items: impl Iterator<Item = (&'a T, &'a str)>,
    path: &str,
) -> Option<&'a T> {
    let mut best: Option<(&T, u32)> = None;
    for (item, context_path) in items {
        if let Some(s) = score(path, context_path) {
            if best.map(|(_, b)| s > b).unwrap_or(true) {
                best = Some((item, s));
            }
        }
    }
    best.map(|(item, _)| item)
}

/// Resolve the request path against the tenant's application topology.
///
/// `origin_path` is the path as the caller sent it (before mount-path
/// stripping) and is what redirects and the NotFound message are built from.
pub fn resolve(tenant: &Tenant, path: &str, origin_path: &str) -> GatewayResult<RouteDecision> {
    let binding = best_match(
        tenant
            .applications
            .iter()
            .filter(|b| b.enabled && b.application.enabled)
            .map(|b| (b, b.application.context_path.as_str())),
        path,
    );

    let Some(binding) = binding else {
        if path.is_empty() || path == "/" {
            // Redirect to the primary application, when one is flagged.
            let primary = tenant
                .applications
                .iter()
                .find(|b| b.enabled && b.primary)
                .map(|b| &b.application);
            return match primary {
                Some(app) => {
                    debug!(application = %app.code, "falling back to primary application");
                    Ok(RouteDecision::Redirect(with_trailing_slash(
                        &app.context_path,
                    )))
                }
                None => Err(GatewayError::not_found(origin_path)),
            };
        }
        return Err(GatewayError::not_found(origin_path));
    };

    let application = Arc::new(binding.application.clone());

    // Module refinement is optional and never changes the NotFound/redirect
    // behavior decided above.
    let module = best_match(
        application
            .modules
            .iter()
            .map(|m| (m, m.context_path.as_str())),
        path,
    )
    .map(|m| Arc::new(m.clone()));

    let (context_path, url) = match &module {
        Some(m) => (m.context_path.clone(), m.url.clone()),
        None => (application.context_path.clone(), application.url.clone()),
    };

    if path == context_path && !path.ends_with('/') {
        // An exact hit without the trailing slash redirects so the served
        // application's relative asset URLs resolve correctly.
        return Ok(RouteDecision::Redirect(with_trailing_slash(origin_path)));
    }

    let base = TargetBase::parse(&url)?;
    debug!(
        application = %application.code,
        module = module.is_some(),
        context_path = %context_path,
        target = %format!("{}://{}", base.scheme, base.authority),
        "route resolved"
    );

    Ok(RouteDecision::Proxy(RouteTarget {
        application,
        module,
        context_path,
        base,
    }))
}

fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

// =============================================================================
// Tests
// =============================================================================
