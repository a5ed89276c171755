//! Token bucket rate limiter.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Gates outgoing requests to at most `bucket_size` per `refill_delay`.
///
/// There is no background refill; an empty bucket refills lazily on the next
/// [`acquire`](Self::acquire). The lock is held across the refill sleep, so
/// all callers serialize behind it: the limit is shared across every task
/// that touches the same limiter.
#[derive(Debug)]
pub struct RateLimit {
    bucket_size: usize,
    refill_delay: Duration,
    state: Mutex<Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: usize,
    last_refill: Instant,
}

impl RateLimit {
    #[must_use]
    pub fn new(bucket_size: usize, refill_delay: Duration) -> Self {
        Self {
            bucket_size,
            refill_delay,
            state: Mutex::new(Bucket {
                tokens: bucket_size,
                last_refill: Instant::now(),
            }),
        }
    }

    #[must_use]
    pub const fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// Consume one token, sleeping through a refill when the bucket is empty.
    pub async fn acquire(&self) {
        let mut bucket = self.state.lock().await;

        if bucket.tokens == 0 {
            // Empty bucket, sleep until refill
            let elapsed = bucket.last_refill.elapsed();
            if elapsed < self.refill_delay {
                sleep(self.refill_delay - elapsed).await;
            }

            bucket.tokens = self.bucket_size - 1;
            bucket.last_refill = Instant::now();
        } else {
            bucket.tokens -= 1;
        }
    }
}
