// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Polling a remote operation until it reaches a terminal state.
//!
//! The engine has no push notifications, so completion is observed by
//! calling a status probe repeatedly:
//!
//! ```text
//!   probe -> still running? -> sleep(next_delay) -> probe -> ... -> terminal
//!                |                    |
//!                |                    +-- cancel token fires -> Cancelled
//!                +-- deadline passed -> PollTimeout
//! ```
//!
//! Only "still running" is retried. An error returned by the probe itself is
//! handed straight back to the caller.

use crate::error::{Error, Result};
use crate::types::query::{QueryExecution, QueryStatus};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Something a status probe returns and that knows whether it is final.
pub trait Terminal {
    fn is_terminal(&self) -> bool;
}

impl Terminal for QueryStatus {
    fn is_terminal(&self) -> bool {
        QueryStatus::is_terminal(self)
    }
}

impl Terminal for QueryExecution {
    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Wait between two consecutive status probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Constant interval.
    Fixed { interval: Duration },
    /// Doubles from `base` on every attempt, never exceeding `max`.
    Exponential { base: Duration, max: Duration },
}

impl BackoffPolicy {
    /// Delay to apply after the `attempt`-th probe (1-based).
    pub fn next_delay(&self, attempt: u32) -> Duration {
        match *self {
            BackoffPolicy::Fixed { interval } => interval,
            BackoffPolicy::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                base.saturating_mul(factor).min(max)
            }
        }
    }
}

/// Bookkeeping of one [`PollingStrategy::wait`] call.
#[derive(Debug)]
struct PollState {
    attempts: u32,
    started: Instant,
    next_delay: Duration,
}

impl PollState {
    fn new() -> Self {
        Self {
            attempts: 0,
            started: Instant::now(),
            next_delay: Duration::ZERO,
        }
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn timeout(&self) -> Error {
        Error::PollTimeout {
            attempts: self.attempts,
            elapsed: self.elapsed(),
        }
    }
}

/// Polls a status probe until it reports a terminal state.
///
/// Every call to [`wait`](Self::wait) starts from a fresh attempt counter,
/// so one strategy never leaks backoff state from one query into another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingStrategy {
    policy: BackoffPolicy,
    deadline: Option<Duration>,
}

impl PollingStrategy {
    pub fn new(policy: BackoffPolicy, deadline: Option<Duration>) -> Self {
        Self { policy, deadline }
    }

    /// Fixed interval, no deadline.
    pub fn fixed(interval: Duration) -> Self {
        Self::new(BackoffPolicy::Fixed { interval }, None)
    }

    /// Capped exponential backoff, no deadline.
    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self::new(BackoffPolicy::Exponential { base, max }, None)
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn policy(&self) -> BackoffPolicy {
        self.policy
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Remaining budget, `None` when there is no deadline.
    fn remaining(&self, state: &PollState) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_sub(state.elapsed()))
    }

    /// Call `probe` until it yields a terminal observation.
    ///
    /// Fails with [`Error::PollTimeout`] once the deadline has passed (no
    /// probe is started after that), with [`Error::Cancelled`] as soon as
    /// `cancel` fires, and with the probe's own error if it returns one.
    pub async fn wait<T, F, Fut>(&self, mut probe: F, cancel: &CancellationToken) -> Result<T>
    where
        T: Terminal,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut state = PollState::new();

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let observation = match self.remaining(&state) {
                Some(remaining) if remaining.is_zero() => return Err(state.timeout()),
                Some(remaining) => tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    result = tokio::time::timeout(remaining, probe()) => match result {
                        Ok(observation) => observation?,
                        Err(_) => {
                            state.attempts += 1;
                            warn!("Status probe did not answer before the deadline");
                            return Err(state.timeout());
                        }
                    },
                },
                None => tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    observation = probe() => observation?,
                },
            };
            state.attempts += 1;

            if observation.is_terminal() {
                debug!(
                    "Terminal state reached after {} probes ({:?})",
                    state.attempts,
                    state.elapsed()
                );
                return Ok(observation);
            }

            state.next_delay = self.policy.next_delay(state.attempts);
            let sleep_for = match self.remaining(&state) {
                Some(remaining) => state.next_delay.min(remaining),
                None => state.next_delay,
            };

            debug!(
                "Not finished after probe {}, waiting {:?}",
                state.attempts, sleep_for
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Polling cancelled after {} probes", state.attempts);
                    return Err(Error::Cancelled);
                }
                _ = tokio::time::sleep(sleep_for) => {}
            }
        }
    }
}
