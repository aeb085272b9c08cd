use crate::events::RequestEvents;
use crate::task::{TaskSet, UserContext};
use crate::wait::WaitTime;
use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    pub users: usize,
    /// Iterations per virtual user. `None` runs until stopped.
    pub iterations: Option<u64>,
    pub run_time: Option<Duration>,
    pub wait: WaitTime,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            users: 1,
            iterations: None,
            run_time: None,
            wait: WaitTime::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub iterations: u64,
    pub failures: u64,
    pub elapsed: Duration,
}

/// Stops every virtual user of a [`Runner`]. In-flight task runs are
/// abandoned and record no event. A stop requested before `run` starts makes
/// the run end without executing any task.
#[derive(Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

pub struct Runner {
    config: RunnerConfig,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            config,
            stop_tx: Arc::new(stop_tx),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    pub async fn run(&self, tasks: Arc<TaskSet>, events: Arc<RequestEvents>) -> Result<RunSummary> {
        if tasks.is_empty() {
            anyhow::bail!("No tasks registered");
        }
        if self.config.users == 0 {
            anyhow::bail!("At least one virtual user is required");
        }

        let started = Instant::now();
        info!(
            users = self.config.users,
            tasks = ?tasks.task_names(),
            "Spawning virtual users"
        );

        let handles: Vec<_> = (0..self.config.users)
            .map(|user_id| {
                let user = VirtualUser {
                    ctx: UserContext {
                        user_id,
                        events: events.clone(),
                    },
                    tasks: tasks.clone(),
                    iterations: self.config.iterations,
                    wait: self.config.wait,
                    stop: self.stop_tx.subscribe(),
                };
                tokio::spawn(user.run())
            })
            .collect();

        let timer = self.config.run_time.map(|run_time| {
            let stop = self.stop_handle();
            tokio::spawn(async move {
                tokio::time::sleep(run_time).await;
                info!("Run time of {:?} elapsed, stopping users", run_time);
                stop.stop();
            })
        });

        let mut summary = RunSummary::default();
        for (user_id, result) in join_all(handles).await.into_iter().enumerate() {
            match result {
                Ok((iterations, failures)) => {
                    summary.iterations += iterations;
                    summary.failures += failures;
                }
                Err(e) => error!(user_id, "Virtual user aborted: {}", e),
            }
        }
        if let Some(timer) = timer {
            timer.abort();
        }
        summary.elapsed = started.elapsed();

        info!(
            iterations = summary.iterations,
            failures = summary.failures,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Run finished"
        );
        Ok(summary)
    }
}

struct VirtualUser {
    ctx: UserContext,
    tasks: Arc<TaskSet>,
    iterations: Option<u64>,
    wait: WaitTime,
    stop: watch::Receiver<bool>,
}

impl VirtualUser {
    async fn run(mut self) -> (u64, u64) {
        let user_id = self.ctx.user_id;
        let mut completed = 0;
        let mut failures = 0;

        loop {
            if *self.stop.borrow() {
                break;
            }
            if self.iterations.is_some_and(|limit| completed >= limit) {
                break;
            }

            let (task, wait) = {
                let mut rng = rand::thread_rng();
                (self.tasks.pick(&mut rng), self.wait.next(&mut rng))
            };
            let Some(task) = task else {
                break;
            };

            tokio::select! {
                result = task.run(&self.ctx) => {
                    completed += 1;
                    match result {
                        Ok(()) => debug!(user_id, task = task.name(), "Task completed"),
                        Err(e) => {
                            failures += 1;
                            warn!(user_id, task = task.name(), "Task failed: {:#}", e);
                        }
                    }
                }
                _ = self.stop.changed() => break,
            }

            if self.iterations.is_some_and(|limit| completed >= limit) {
                break;
            }
            if !wait.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = self.stop.changed() => break,
                }
            } else {
                tokio::task::yield_now().await;
            }
        }

        debug!(user_id, completed, failures, "Virtual user finished");
        (completed, failures)
    }
}
