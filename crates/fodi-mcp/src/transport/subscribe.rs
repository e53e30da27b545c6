// ABOUTME: SSE subscription endpoint bridging an HTTP response body to the connection registry
// ABOUTME: Each GET /sse registers a bounded channel; dropping the body unregisters the client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::response::IntoResponse;
use futures::Stream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::events::{generate_client_id, ConnectionRegistry};
use crate::server::McpServer;

/// Open a subscription stream for a new client
///
/// The first frame is always the `connected` event carrying the client id.
pub async fn handle_subscribe(State(server): State<Arc<McpServer>>) -> impl IntoResponse {
    let state = server.state();
    let (tx, rx) = mpsc::channel(state.events_config.channel_capacity);
    let client_id = generate_client_id();

    state.events.add_client(client_id.clone(), tx).await;

    let stream = SubscriptionStream {
        inner: ReceiverStream::new(rx),
        client_id,
        registry: Arc::clone(&state.events),
    };

    (
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
            (CONNECTION, "keep-alive"),
        ],
        Body::from_stream(stream),
    )
}

/// Response body stream for one subscriber
///
/// Ends when the registry drops the sending half (removal, eviction, or
/// shutdown). When the HTTP layer drops it because the peer went away,
/// the client is removed from the registry.
pub struct SubscriptionStream {
    inner: ReceiverStream<String>,
    client_id: String,
    registry: Arc<ConnectionRegistry>,
}

impl Stream for SubscriptionStream {
    type Item = Result<String, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner)
            .poll_next(cx)
            .map(|frame| frame.map(Ok))
    }
}

impl Drop for SubscriptionStream {
    fn drop(&mut self) {
        let Ok(handle) = Handle::try_current() else {
            return;
        };
        let registry = Arc::clone(&self.registry);
        let client_id = std::mem::take(&mut self.client_id);
        debug!(client_id = %client_id, "Subscription body dropped");
        handle.spawn(async move {
            registry.remove_client(&client_id).await;
        });
    }
}
