//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::future::Future;
use std::time::Duration;

use tokio::task;
use tokio::time::Instant;
use tracing::Instrument;

/// A handle to the task created by the [`Task::spawn`] function.
///
/// Dropping this handle cancels the task.
#[derive(Debug)]
pub struct Task<T> {
    join_handle: task::JoinHandle<T>,
}

/// A handle to the single-shot timer created by the [`TimeoutTask::new`]
/// function.
///
/// Dropping this handle cancels the timer if it hasn't fired yet.
#[derive(Debug)]
pub struct TimeoutTask {
    _task: Task<()>,
    deadline: Instant,
}

// ===== impl Task =====

impl<T> Task<T> {
    /// Spawns a new asynchronous task, returning a handle for it.
    pub fn spawn<Fut>(future: Fut) -> Task<T>
    where
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        Task {
            join_handle: task::spawn(future),
        }
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        self.join_handle.abort();
    }
}

// ===== impl TimeoutTask =====

impl TimeoutTask {
    /// Spawns a new task that will call the provided async closure when the
    /// specified timeout expires.
    ///
    /// The timer can't be rearmed: callers that need a new deadline drop the
    /// handle and create a new one.
    pub fn new<F, Fut>(timeout: Duration, cb: F) -> TimeoutTask
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let deadline = Instant::now() + timeout;
        let task = Task::spawn(
            async move {
                tokio::time::sleep_until(deadline).await;
                (cb)().await;
            }
            .in_current_span(),
        );

        TimeoutTask {
            _task: task,
            deadline,
        }
    }

    /// Returns the remaining time before the timeout expires.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}
