//! Response-writing stage — the outermost global filter.
//!
//! Invokes the rest of the chain, then turns the upstream response into the
//! final [`GatewayResponse`]: streamed for streaming content types,
//! buffered otherwise.  Whatever happens downstream — normal completion, a
//! stage error, or the caller dropping the connection mid-stream — the
//! upstream body resource is released exactly once:
//!
//! - error path: disposed here before the error propagates;
//! - buffered path: disposed here after the body is drained;
//! - streamed path: the guard travels inside the [`GuardedStream`] and
//!   fires when the stream is dropped.

use async_trait::async_trait;
use bytes::BytesMut;
use futures::StreamExt;
use portico_kernel::gateway::{
    GatewayError, GatewayFilter, GatewayResponse, GatewayResult, GuardedStream, Next,
    RequestContext, ResponseBody,
};
use tracing::warn;

/// Content types whose bodies are streamed through instead of buffered.
const STREAMING_CONTENT_TYPES: [&str; 1] = ["text/event-stream"];

fn is_streaming(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim();
    STREAMING_CONTENT_TYPES
        .iter()
        .any(|s| essence.eq_ignore_ascii_case(s))
}

/// Terminal response stage.  Logically last, physically outermost: it wraps
/// the whole chain so it can observe errors from any stage.
#[derive(Default)]
pub struct ResponseWritingFilter;

impl ResponseWritingFilter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GatewayFilter for ResponseWritingFilter {
    fn name(&self) -> &str {
        "response-writing"
    }

    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
        if let Err(e) = next.run(ctx).await {
            ctx.dispose_upstream();
            return Err(e);
        }

        if ctx.response.is_some() {
            // A stage short-circuited with its own response; any upstream
            // body that still exists will never be written.
            ctx.dispose_upstream();
            return Ok(());
        }

        let Some(mut upstream) = ctx.upstream.take() else {
            return Err(GatewayError::Upstream(
                "no stage produced a response for this request".into(),
            ));
        };

        let streaming = upstream.content_type().map(is_streaming).unwrap_or(false);
        let body = match upstream.body.take() {
            None => ResponseBody::Empty,
            Some((stream, guard)) if streaming => {
                ResponseBody::Streaming(GuardedStream::new(stream, guard))
            }
            Some((mut stream, mut guard)) => {
                // Buffered: drain fully, then release the resource before
                // the response leaves the pipeline.
                let mut buffer = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    match chunk {
                        Ok(chunk) => buffer.extend_from_slice(&chunk),
                        Err(e) => {
                            drop(stream);
                            guard.dispose();
                            return Err(GatewayError::Upstream(format!(
                                "upstream body failed mid-transfer: {e}"
                            )));
                        }
                    }
                }
                drop(stream);
                guard.dispose();
                ResponseBody::Buffered(buffer.freeze())
            }
        };

        if upstream.status >= 500 {
            warn!(
                request_id = %ctx.request.id,
                status = upstream.status,
                "upstream answered with a server error"
            );
        }

        ctx.response = Some(GatewayResponse {
            status: upstream.status,
            headers: upstream.headers,
            body,
        });
        Ok(())
    }
}
