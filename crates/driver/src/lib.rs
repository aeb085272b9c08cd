pub mod task;

pub use task::{InvocationResult, LoadTask, REQUEST_NAME, REQUEST_TYPE};

use harness::{RunnerConfig, WaitTime};
use loadtest_core::config::LoadConfig;
use std::time::Duration;

pub fn runner_config(load: &LoadConfig) -> RunnerConfig {
    RunnerConfig {
        users: load.users,
        iterations: load.iterations,
        run_time: load.run_time_secs.map(Duration::from_secs),
        wait: WaitTime::from_millis(load.wait_min_ms, load.wait_max_ms),
    }
}
