// ABOUTME: Trace module - step records, the per-run recorder, and stores for
// ABOUTME: persisting finished runs.

mod recorder;
mod step;
mod store;

pub use recorder::TraceRecorder;
pub use step::{Step, StepKind, Trace, TraceEntry};
pub use store::{FileTraceStore, MemoryTraceStore, TraceStore};

#[cfg(test)]
mod step_test;
