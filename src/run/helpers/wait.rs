use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::DeviceFarmError;
use crate::prelude::*;

/// Sleeps for `duration`, or fails right away with [`DeviceFarmError::Cancelled`] once
/// `cancellation` fires.
pub async fn sleep_or_cancel(
    cancellation: &CancellationToken,
    duration: Duration,
    waiting_for: &'static str,
) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancellation.cancelled() => {
            warn!("Interrupted while waiting for {waiting_for}");
            Err(DeviceFarmError::Cancelled(waiting_for).into())
        }
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
