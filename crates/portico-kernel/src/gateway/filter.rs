//! Gateway filter trait and chain invocation.
//!
//! The pipeline is a chain of responsibility: each stage receives the
//! request context and a [`Next`] handle for the remainder of the chain.  A
//! stage may short-circuit (produce a response or error without invoking the
//! remainder), mutate the context and continue, or wrap the remainder's
//! invocation to run work after downstream stages complete.
//!
//! ```text
//! ResponseWriting ──► dynamic filters (by order) ──► HttpProxy
//!        └── wraps the whole chain and writes the final body ──┘
//! ```

use super::error::GatewayResult;
use super::types::RequestContext;
use async_trait::async_trait;
use std::sync::Arc;

/// A single stage in the gateway pipeline.
///
/// Implementations must be `Send + Sync`; one instance serves arbitrarily
/// many concurrent requests, so per-request state belongs in the
/// [`RequestContext`], never in the filter itself.
#[async_trait]
pub trait GatewayFilter: Send + Sync {
    /// Stable identifier used in logs.
    fn name(&self) -> &str;

    /// Whether this stage applies to the given request.  A stage that does
    /// not apply is skipped and the chain continues with the next stage.
    fn applies(&self, ctx: &RequestContext) -> bool {
        let _ = ctx;
        true
    }

    /// Run this stage.  Call `next.run(ctx)` to invoke the remainder of the
    /// chain; not calling it short-circuits the pipeline.
    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()>;
}

/// Handle to the remaining stages of the chain.
///
/// Consumed by value: a stage can invoke the remainder at most once.
pub struct Next<'a> {
    stages: &'a [Arc<dyn GatewayFilter>],
}

impl<'a> Next<'a> {
    /// Entry point: a handle over the full stage list.
    pub fn new(stages: &'a [Arc<dyn GatewayFilter>]) -> Self {
        Self { stages }
    }

    /// Invoke the remainder of the chain.  Stages whose
    /// [`applies`](GatewayFilter::applies) returns `false` are skipped; an
    /// exhausted chain completes with `Ok(())`.
    pub async fn run(mut self, ctx: &mut RequestContext) -> GatewayResult<()> {
        while let Some((stage, rest)) = self.stages.split_first() {
            if !stage.applies(ctx) {
                self.stages = rest;
                continue;
            }
            return stage.run(ctx, Next { stages: rest }).await;
        }
        Ok(())
    }
}
