//! Per-request pipeline assembly.
//!
//! The stage list for a request is: the response-writing stage (outermost),
//! the tenant's enabled dynamic filters sorted by their numeric order (a
//! stable sort, so equal orders keep their declaration sequence from the
//! descriptor table), and the HTTP proxy stage (innermost).

use crate::filter::DynamicFilter;
use portico_kernel::gateway::{GatewayFilter, GatewayResult, Next, RequestContext};
use std::sync::Arc;

/// Fixed global stages plus per-request interleaving of dynamic filters.
pub struct FilterPipeline {
    /// Outermost stage (response writing).
    head: Arc<dyn GatewayFilter>,
    /// Innermost stage (proxy).
    tail: Arc<dyn GatewayFilter>,
}

impl FilterPipeline {
    pub fn new(head: Arc<dyn GatewayFilter>, tail: Arc<dyn GatewayFilter>) -> Self {
        Self { head, tail }
    }

    /// Build the stage list for one request.
    fn assemble(&self, dynamics: &[Arc<DynamicFilter>]) -> Vec<Arc<dyn GatewayFilter>> {
        let mut middle: Vec<&Arc<DynamicFilter>> =
            dynamics.iter().filter(|f| f.enabled()).collect();
        middle.sort_by_key(|f| f.order());

        let mut stages: Vec<Arc<dyn GatewayFilter>> = Vec::with_capacity(middle.len() + 2);
        stages.push(self.head.clone());
        stages.extend(
            middle
                .into_iter()
                .map(|f| f.clone() as Arc<dyn GatewayFilter>),
        );
        stages.push(self.tail.clone());
        stages
    }

    /// Run the chain for one request.
    pub async fn run(
        &self,
        dynamics: &[Arc<DynamicFilter>],
        ctx: &mut RequestContext,
    ) -> GatewayResult<()> {
        let stages = self.assemble(dynamics);
        Next::new(&stages).run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::builtin_filters;
    use crate::predicate::builtin_predicates;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use portico_kernel::gateway::{
        FilterDescriptor, GatewayRequest, HttpMethod, OriginUri, PredicateDescriptor,
    };
    use std::sync::Mutex;

    fn ctx(method: HttpMethod, path: &str) -> RequestContext {
        RequestContext::new(
            GatewayRequest::new("r1", method, path),
            OriginUri {
                scheme: "http".into(),
                host: "localhost".into(),
                port: 80,
                path: path.into(),
                query: None,
            },
        )
    }

    struct Probe {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl GatewayFilter for Probe {
        fn name(&self) -> &str {
            self.label
        }

        async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
            self.log.lock().unwrap().push(self.label);
            next.run(ctx).await
        }
    }

    fn dynamic(code: &str, order: i32, header_value: &str) -> Arc<DynamicFilter> {
        let descriptor = FilterDescriptor {
            tenant: "master".into(),
            code: code.into(),
            kind: "add_request_header".into(),
            order,
            enabled: true,
            path: "/".into(),
            predicates: Vec::new(),
            params: serde_json::json!({ "name": "x-trace", "value": header_value })
                .as_object()
                .cloned()
                .unwrap(),
            modified_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
        };
        Arc::new(
            DynamicFilter::build(descriptor, &builtin_filters(), &builtin_predicates()).unwrap(),
        )
    }

    fn pipeline(log: &Arc<Mutex<Vec<&'static str>>>) -> FilterPipeline {
        FilterPipeline::new(
            Arc::new(Probe {
                label: "head",
                log: log.clone(),
            }),
            Arc::new(Probe {
                label: "tail",
                log: log.clone(),
            }),
        )
    }

    #[tokio::test]
    async fn globals_wrap_the_dynamic_filters() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline(&log);

        let dynamics = vec![dynamic("late", 20, "late"), dynamic("early", 10, "early")];
        let mut c = ctx(HttpMethod::Get, "/portal/");
        pipeline.run(&dynamics, &mut c).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["head", "tail"]);
        // Order 10 ran before order 20.
        assert_eq!(
            c.request.headers.all("x-trace").collect::<Vec<_>>(),
            vec!["early", "late"]
        );
    }

    #[tokio::test]
    async fn equal_orders_keep_declaration_sequence() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline(&log);

        let dynamics = vec![
            dynamic("first", 10, "first"),
            dynamic("second", 10, "second"),
            dynamic("zero", 0, "zero"),
        ];
        let mut c = ctx(HttpMethod::Get, "/portal/");
        pipeline.run(&dynamics, &mut c).await.unwrap();

        assert_eq!(
            c.request.headers.all("x-trace").collect::<Vec<_>>(),
            vec!["zero", "first", "second"]
        );
    }

    #[tokio::test]
    async fn disabled_filters_are_left_out() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline(&log);

        let mut off = dynamic("off", 10, "off");
        {
            // Rebuild with enabled = false.
            let mut descriptor = off.descriptor().clone();
            descriptor.enabled = false;
            off = Arc::new(
                DynamicFilter::build(descriptor, &builtin_filters(), &builtin_predicates())
                    .unwrap(),
            );
        }
        let dynamics = vec![off, dynamic("on", 20, "on")];
        let mut c = ctx(HttpMethod::Get, "/portal/");
        pipeline.run(&dynamics, &mut c).await.unwrap();

        assert_eq!(
            c.request.headers.all("x-trace").collect::<Vec<_>>(),
            vec!["on"]
        );
    }

    #[tokio::test]
    async fn predicated_filter_runs_only_when_predicates_hold() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline(&log);

        let mut descriptor = FilterDescriptor {
            tenant: "master".into(),
            code: "get-only".into(),
            kind: "add_request_header".into(),
            order: 10,
            enabled: true,
            path: "/".into(),
            predicates: vec![PredicateDescriptor {
                kind: "method".into(),
                params: serde_json::json!({ "methods": ["GET"] })
                    .as_object()
                    .cloned()
                    .unwrap(),
            }],
            params: serde_json::json!({ "name": "x-trace", "value": "gated" })
                .as_object()
                .cloned()
                .unwrap(),
            modified_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
        };
        descriptor.predicates.push(PredicateDescriptor {
            kind: "path".into(),
            params: serde_json::json!({ "path": "/portal" })
                .as_object()
                .cloned()
                .unwrap(),
        });
        let gated = Arc::new(
            DynamicFilter::build(descriptor, &builtin_filters(), &builtin_predicates()).unwrap(),
        );
        let dynamics = vec![gated];

        let mut get = ctx(HttpMethod::Get, "/portal/home");
        pipeline.run(&dynamics, &mut get).await.unwrap();
        assert!(get.request.headers.contains("x-trace"));

        let mut post = ctx(HttpMethod::Post, "/portal/home");
        pipeline.run(&dynamics, &mut post).await.unwrap();
        assert!(!post.request.headers.contains("x-trace"));

        let mut elsewhere = ctx(HttpMethod::Get, "/docs/home");
        pipeline.run(&dynamics, &mut elsewhere).await.unwrap();
        assert!(!elsewhere.request.headers.contains("x-trace"));
    }
}
