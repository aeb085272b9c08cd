//! A small in-process load-testing harness: virtual users repeatedly run
//! registered tasks, and every measured request is fired to event sinks.

pub mod events;
pub mod runner;
pub mod sinks;
pub mod task;
pub mod wait;

pub use events::{EventSink, MeasureSpan, RequestEvent, RequestEvents};
pub use runner::{RunSummary, Runner, RunnerConfig, StopHandle};
pub use sinks::{LogSink, MemorySink};
pub use task::{BoxedTask, Task, TaskSet, UserContext};
pub use wait::WaitTime;
