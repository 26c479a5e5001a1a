//! Request timing middleware (arrival/completion hooks around the router).
//!
//! Install with `axum::middleware::from_fn_with_state` on the router so the
//! `MatchedPath` extension is already set when the arrival hook runs.
//!
//! The inner service returning only means headers are ready. Completion fires
//! when the response body reaches its end, so streamed and slow bodies are
//! timed in full. If the handler future or the body is dropped first (client
//! went away), the guard removes the armed timer; the periodic sweeper is the
//! backstop for anything that slips past.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};

use reqlens_core::lifecycle::{HttpRequest, RequestId};

use crate::app_state::{AppState, HttpInstrumentation};
use crate::request::{CompletedResponse, RequestSnapshot};

/// Armed timer for one request. Dropping it without `complete` abandons the
/// timer.
struct ArmedRequest {
    instrumentation: Arc<HttpInstrumentation>,
    id: RequestId,
    req: RequestSnapshot,
    done: bool,
}

impl ArmedRequest {
    fn new(
        instrumentation: Arc<HttpInstrumentation>,
        id: RequestId,
        req: RequestSnapshot,
    ) -> Self {
        Self {
            instrumentation,
            id,
            req,
            done: false,
        }
    }

    fn complete(mut self, res: &CompletedResponse) {
        self.done = true;
        let outcome = self.instrumentation.on_response(self.id, &self.req, res);
        tracing::trace!(
            request_id = self.id.get(),
            method = self.req.method(),
            route = self.req.route(),
            ?outcome,
            "request completed"
        );
    }
}

impl Drop for ArmedRequest {
    fn drop(&mut self) {
        if !self.done && self.instrumentation.abandon(self.id) {
            tracing::debug!(request_id = self.id.get(), "request dropped before completion");
        }
    }
}

/// Response body that completes the armed request once its last frame has
/// been handed out.
struct TimedBody {
    inner: Body,
    pending: Option<(ArmedRequest, CompletedResponse)>,
}

impl TimedBody {
    fn new(inner: Body, armed: ArmedRequest, res: CompletedResponse) -> Self {
        let mut body = Self {
            inner,
            pending: Some((armed, res)),
        };
        // Empty bodies may never be polled.
        if body.inner.is_end_stream() {
            body.finish();
        }
        body
    }

    fn finish(&mut self) {
        if let Some((armed, res)) = self.pending.take() {
            armed.complete(&res);
        }
    }
}

impl HttpBody for TimedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(None) => this.finish(),
            Poll::Ready(Some(Ok(_))) if this.inner.is_end_stream() => this.finish(),
            // A body error is not a finalized response; the guard abandons on drop.
            _ => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

pub async fn track_request(State(app): State<AppState>, mut req: Request, next: Next) -> Response {
    let instrumentation = app.instrumentation();
    let id = instrumentation.next_request_id();
    req.extensions_mut().insert(id);

    let snapshot = RequestSnapshot::from_request(&req);
    if !instrumentation.on_request(id, &snapshot) {
        return next.run(req).await;
    }
    let armed = ArmedRequest::new(instrumentation, id, snapshot);

    let (parts, body) = next.run(req).await.into_parts();
    let completed = CompletedResponse::from_parts(&parts);
    Response::from_parts(parts, Body::new(TimedBody::new(body, armed, completed)))
}
