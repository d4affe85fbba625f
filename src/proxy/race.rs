//! Primary response vs. deadline.
//!
//! [`race`] waits for whichever comes first: the primary's response, the
//! primary's error, or the response deadline. Exactly one [`Decision`] is
//! made per request. Nothing is cancelled when it resolves; in-flight tasks
//! finish on their own and anything they send afterwards is dropped.

use hyper::body::Incoming;
use tokio::sync::oneshot;
use tokio::time::Instant;

use super::fanout::PrimaryOutcome;
use crate::config::model::EndpointId;
use crate::error::ForwardError;
use crate::metrics::{MetricsReporter, TIMEOUT_COUNT};

#[derive(Debug)]
pub enum Decision<B = Incoming> {
    PrimaryResponse(http::Response<B>),
    PrimaryError(ForwardError),
    TimedOut,
}

pub async fn race<B>(
    primary: oneshot::Receiver<PrimaryOutcome<B>>,
    deadline: Instant,
    primary_id: &EndpointId,
    metrics: &dyn MetricsReporter,
) -> Decision<B> {
    tokio::select! {
        // A ready outcome wins a tie with the deadline.
        biased;

        outcome = primary => match outcome {
            Ok(Ok(response)) => Decision::PrimaryResponse(response),
            Ok(Err(err)) => Decision::PrimaryError(err),
            Err(_) => Decision::PrimaryError(ForwardError::Abandoned {
                endpoint: primary_id.clone(),
            }),
        },
        () = tokio::time::sleep_until(deadline) => {
            metrics.increment(TIMEOUT_COUNT);
            Decision::TimedOut
        }
    }
}
