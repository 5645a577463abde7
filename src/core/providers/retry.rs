//! Fixed-delay retry for image generation calls.
//!
//! A constant inter-attempt delay, not exponential backoff. Kept exactly as
//! the upstream service contract specifies: up to 3 attempts, 2 seconds
//! apart, then a terminal error carrying the last failure's message.

use std::future::Future;
use std::time::Duration;

use crate::core::error::{GenerationError, Result};

/// Maximum number of attempts for an image generation call.
pub const MAX_RETRIES: u32 = 3;

/// Fixed delay between attempts.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Run `op` up to `attempts` times with a fixed `delay` between failures.
///
/// The closure receives the 1-based attempt number. After the final failure
/// the error is [`GenerationError::Exhausted`] with the last underlying
/// error's message.
pub async fn retry_fixed<T, F, Fut>(attempts: u32, delay: Duration, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last = String::new();
    for attempt in 1..=attempts {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                log::warn!("Attempt {attempt}/{attempts} failed: {e}");
                last = e.to_string();
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(GenerationError::Exhausted { attempts, last })
}
