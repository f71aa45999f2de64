//! Response handling.
//!
//! # Responsibilities
//! - Relay backend responses as a stream, without hop-by-hop headers
//! - Keep the admission slot held until the relayed body is finished or dropped
//! - Cut off bodies still streaming when the request deadline passes
//! - Build the proxy's own error responses

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::BoxError;
use hyper::body::{Body as HttpBody, Bytes, Frame, Incoming, SizeHint};
use thiserror::Error;
use tokio::time::{sleep_until, Instant, Sleep};

use crate::admission::AdmissionPermit;
use crate::http::request::remove_hop_by_hop_headers;

/// The relayed body was still streaming at the request deadline.
#[derive(Debug, Error)]
#[error("response deadline elapsed while relaying body")]
pub struct DeadlineElapsed;

/// No backend is configured for the requested host.
pub fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, "Bad Gateway\n").into_response()
}

/// The backend's admission gate is full.
pub fn service_unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable\n").into_response()
}

/// Turn a backend response into the client response.
///
/// The permit moves into the body, so the slot is released when the client
/// has consumed the body, the connection goes away, or `deadline` passes.
pub fn relay(
    response: axum::http::Response<Incoming>,
    permit: AdmissionPermit,
    deadline: Instant,
) -> Response {
    let (mut parts, body) = response.into_parts();
    remove_hop_by_hop_headers(&mut parts.headers);

    let body = RelayBody {
        inner: body,
        deadline: Box::pin(sleep_until(deadline)),
        _permit: permit,
    };
    Response::from_parts(parts, Body::new(body))
}

/// Backend body carrying its admission permit and the request deadline.
struct RelayBody<B> {
    inner: B,
    deadline: Pin<Box<Sleep>>,
    _permit: AdmissionPermit,
}

impl<B> HttpBody for RelayBody<B>
where
    B: HttpBody<Data = Bytes> + Unpin,
    B::Error: Into<BoxError>,
{
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
        let this = self.get_mut();
        if this.deadline.as_mut().poll(cx).is_ready() {
            tracing::warn!("Request deadline passed while relaying body");
            return Poll::Ready(Some(Err(DeadlineElapsed.into())));
        }
        Pin::new(&mut this.inner).poll_frame(cx).map_err(Into::into)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
