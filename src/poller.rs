//! Generic polling of asynchronous server-side jobs.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// What a status fetch observed: the job is still in flight, or it finished
/// and produced a payload. Terminal failure is an error from the fetch
/// itself, so it propagates like any other.
#[derive(Debug)]
pub enum PollState<T> {
    Pending,
    Done(T),
}

/// Polls a job-status endpoint until the job is terminal.
///
/// The iteration count is unbounded: vendor jobs may legitimately take
/// minutes, and a caller wanting a deadline can drop the future. Transport
/// errors from the fetch are not retried here; that is the HTTP layer's
/// job.
#[derive(Debug, Clone, Copy)]
pub struct TaskPoller {
    interval: Duration,
    progress_every: u32,
}

impl TaskPoller {
    pub fn new(interval: Duration, progress_every: u32) -> Self {
        Self {
            interval,
            progress_every,
        }
    }

    /// Call `fetch` once per tick until it reports `Done`, sleeping
    /// `interval` between ticks. `on_progress` fires on the first tick and
    /// then every `progress_every` ticks, so long waits stay visible
    /// without logging every second.
    pub async fn poll_until_done<T, F, Fut>(
        &self,
        mut fetch: F,
        mut on_progress: impl FnMut(u32),
    ) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<PollState<T>>>,
    {
        let mut tick: u32 = 0;
        loop {
            match fetch(tick).await? {
                PollState::Done(payload) => return Ok(payload),
                PollState::Pending => {
                    if tick == 0 || (self.progress_every > 0 && tick % self.progress_every == 0) {
                        on_progress(tick);
                    }
                    tokio::time::sleep(self.interval).await;
                    tick += 1;
                }
            }
        }
    }
}
