//! Filter implementations.
//!
//! Two populations flow through the pipeline:
//!
//! - **global** filters (fixed, always installed):
//!   [`ResponseWritingFilter`](global::ResponseWritingFilter) and
//!   [`HttpProxyFilter`](global::HttpProxyFilter);
//! - **dynamic** filters (tenant-configured): a [`DynamicFilter`] built from
//!   a [`FilterDescriptor`], gated by its ANDed predicates and ordered by
//!   the descriptor's numeric order.

pub mod global;

mod cors;
mod headers;
mod params;
mod path;
mod refuse;
mod timeout;

pub use cors::CrossOriginFilter;
pub use headers::{
    AddRequestHeaderFilter, AddResponseHeaderFilter, RemoveRequestHeaderFilter,
    RemoveResponseHeaderFilter, SetRequestHeaderFilter, SetResponseHeaderFilter,
};
pub use params::{
    AddRequestParameterFilter, RemoveRequestParameterFilter, SetRequestParameterFilter,
};
pub use path::{PrefixPathFilter, RewritePathFilter, StripPrefixFilter};
pub use refuse::RequestRefuseFilter;
pub use timeout::TimeoutFilter;

use crate::container::FactoryRegistry;
use crate::predicate::{PathPredicate, PredicateRegistry};
use async_trait::async_trait;
use portico_kernel::gateway::{
    predicate::all_match, FilterDescriptor, GatewayError, GatewayFilter, GatewayResult, Headers,
    Next, Plugin, Predicate, RequestContext,
};

/// Factory registry for dynamic filter kinds.
pub type FilterRegistry = FactoryRegistry<dyn GatewayFilter>;

/// Registry with every built-in filter kind installed.
pub fn builtin_filters() -> FilterRegistry {
    let mut registry = FilterRegistry::new();

    registry.register("add_request_header", |p| {
        Ok(Box::new(AddRequestHeaderFilter::from_params(p)?))
    });
    registry.register("set_request_header", |p| {
        Ok(Box::new(SetRequestHeaderFilter::from_params(p)?))
    });
    registry.register("remove_request_header", |p| {
        Ok(Box::new(RemoveRequestHeaderFilter::from_params(p)?))
    });

    registry.register("add_response_header", |p| {
        Ok(Box::new(AddResponseHeaderFilter::from_params(p)?))
    });
    registry.register("set_response_header", |p| {
        Ok(Box::new(SetResponseHeaderFilter::from_params(p)?))
    });
    registry.register("remove_response_header", |p| {
        Ok(Box::new(RemoveResponseHeaderFilter::from_params(p)?))
    });

    registry.register("add_request_parameter", |p| {
        Ok(Box::new(AddRequestParameterFilter::from_params(p)?))
    });
    registry.register("set_request_parameter", |p| {
        Ok(Box::new(SetRequestParameterFilter::from_params(p)?))
    });
    registry.register("remove_request_parameter", |p| {
        Ok(Box::new(RemoveRequestParameterFilter::from_params(p)?))
    });

    registry.register("rewrite_path", |p| {
        Ok(Box::new(RewritePathFilter::from_params(p)?))
    });
    registry.register("prefix_path", |p| {
        Ok(Box::new(PrefixPathFilter::from_params(p)?))
    });
    registry.register("strip_prefix", |p| {
        Ok(Box::new(StripPrefixFilter::from_params(p)?))
    });

    registry.register("request_refuse", |p| {
        Ok(Box::new(RequestRefuseFilter::from_params(p)?))
    });
    registry.register("cross_origin", |p| {
        Ok(Box::new(CrossOriginFilter::from_params(p)?))
    });
    registry.register("timeout", |p| Ok(Box::new(TimeoutFilter::from_params(p)?)));

    registry
}

/// Headers of whatever will be returned to the caller: a short-circuit
/// response if one was produced, otherwise the upstream response.
pub(crate) fn response_headers_mut(ctx: &mut RequestContext) -> Option<&mut Headers> {
    if let Some(response) = ctx.response.as_mut() {
        Some(&mut response.headers)
    } else if let Some(upstream) = ctx.upstream.as_mut() {
        Some(&mut upstream.headers)
    } else {
        None
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DynamicFilter
// ─────────────────────────────────────────────────────────────────────────────

/// A tenant-configured filter: descriptor + predicates + delegate.
///
/// The descriptor's mount path is installed as an implicit path predicate
/// ahead of the configured predicate list; the whole list is ANDed in
/// [`applies`](GatewayFilter::applies).
pub struct DynamicFilter {
    descriptor: FilterDescriptor,
    predicates: Vec<Box<dyn Predicate>>,
    delegate: Box<dyn GatewayFilter>,
}

impl std::fmt::Debug for DynamicFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicFilter")
            .field("descriptor", &self.descriptor)
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

impl DynamicFilter {
    /// Construct from a descriptor, resolving the filter kind and every
    /// predicate kind through the registries.  Any resolution, binding, or
    /// validation failure is a [`GatewayError::Configuration`] tagged with
    /// the descriptor's identity.
    pub fn build(
        descriptor: FilterDescriptor,
        filters: &FilterRegistry,
        predicates: &PredicateRegistry,
    ) -> GatewayResult<Self> {
        let configuration_error = |message: String| GatewayError::Configuration {
            tenant: descriptor.tenant.clone(),
            code: descriptor.code.clone(),
            kind: descriptor.kind.clone(),
            message,
        };

        let mut predicate_list: Vec<Box<dyn Predicate>> = Vec::new();
        predicate_list.push(Box::new(PathPredicate::new(descriptor.path.clone())));
        for spec in &descriptor.predicates {
            let predicate = predicates
                .build(&spec.kind, &spec.params)
                .map_err(|e| configuration_error(format!("predicate '{}': {e}", spec.kind)))?;
            predicate_list.push(predicate);
        }

        let delegate = filters
            .build(&descriptor.kind, &descriptor.params)
            .map_err(|e| configuration_error(e.to_string()))?;

        Ok(Self {
            descriptor,
            predicates: predicate_list,
            delegate,
        })
    }

    pub fn code(&self) -> &str {
        &self.descriptor.code
    }

    pub fn order(&self) -> i32 {
        self.descriptor.order
    }

    pub fn enabled(&self) -> bool {
        self.descriptor.enabled
    }

    pub fn descriptor(&self) -> &FilterDescriptor {
        &self.descriptor
    }
}

#[async_trait]
impl GatewayFilter for DynamicFilter {
    fn name(&self) -> &str {
        &self.descriptor.code
    }

    fn applies(&self, ctx: &RequestContext) -> bool {
        all_match(&self.predicates, ctx)
    }

    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
        self.delegate.run(ctx, next).await
    }
}

#[async_trait]
impl Plugin for DynamicFilter {}
