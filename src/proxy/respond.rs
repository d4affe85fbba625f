//! Turning a race [`Decision`] into the caller's response.
//!
//! A primary response is passed through: status, every header value
//! (appended, hop-by-hop dropped) and the body, streamed in chunks of at
//! most [`COPY_BUFFER_SIZE`] bytes. If the upstream body breaks halfway,
//! the error text becomes the tail of the body since status and headers
//! are already on the wire. Errors and timeouts are written as plain text.

use std::convert::Infallible;
use std::fmt::Display;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::body::Body as AxumBody;
use axum::response::Response;
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use hyper::body::{Body, Frame, SizeHint};

use super::headers::{append_headers, strip_hop_by_hop};
use super::race::Decision;
use crate::config::model::StatusPolicy;

pub const COPY_BUFFER_SIZE: usize = 32 * 1024;

pub const TIMEOUT_BODY: &str = "Timeout\n";

/// Hop-by-hop headers of a primary response are not copied: hyper frames
/// the body again for the caller's connection.
pub fn into_response<B>(decision: Decision<B>, policy: StatusPolicy) -> Response
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Display,
{
    match decision {
        Decision::PrimaryResponse(upstream) => copy_response(upstream),
        Decision::PrimaryError(err) => text_response(policy.primary_error, format!("{err}\n")),
        Decision::TimedOut => text_response(policy.timeout, TIMEOUT_BODY.to_string()),
    }
}

fn copy_response<B>(upstream: http::Response<B>) -> Response
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Display,
{
    let (parts, body) = upstream.into_parts();
    let mut upstream_headers = parts.headers;
    strip_hop_by_hop(&mut upstream_headers);

    let mut response = Response::new(AxumBody::new(CopyBody::new(body)));
    *response.status_mut() = parts.status;
    append_headers(response.headers_mut(), &upstream_headers);
    response
}

/// Plain-text body; `status` falls back to the server default when unset.
fn text_response(status: Option<StatusCode>, text: String) -> Response {
    let mut response = Response::new(AxumBody::from(text));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    if let Some(status) = status {
        *response.status_mut() = status;
    }
    response
}

/// Re-chunks an upstream body and turns a read error into trailing text.
pub struct CopyBody<B> {
    inner: Pin<Box<B>>,
    pending: Bytes,
    finished: bool,
}

impl<B> CopyBody<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner: Box::pin(inner),
            pending: Bytes::new(),
            finished: false,
        }
    }
}

impl<B> Body for CopyBody<B>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        loop {
            if !this.pending.is_empty() {
                let len = this.pending.len().min(COPY_BUFFER_SIZE);
                return Poll::Ready(Some(Ok(Frame::data(this.pending.split_to(len)))));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match ready!(this.inner.as_mut().poll_frame(cx)) {
                Some(Ok(frame)) => match frame.into_data() {
                    Ok(data) => this.pending = data,
                    Err(frame) => return Poll::Ready(Some(Ok(frame))),
                },
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "upstream body failed mid-transfer");
                    this.pending = Bytes::from(format!("{err}\n"));
                    this.finished = true;
                }
                None => this.finished = true,
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.finished && self.pending.is_empty()
    }

    fn size_hint(&self) -> SizeHint {
        let pending = self.pending.len() as u64;
        if self.finished {
            return SizeHint::with_exact(pending);
        }
        // Never exact while streaming: an error may still append text.
        let mut hint = SizeHint::new();
        hint.set_lower(self.inner.size_hint().lower() + pending);
        hint
    }
}
