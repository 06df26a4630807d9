// ABOUTME: TraceRecorder - collects the steps of in-flight runs in order and
// ABOUTME: seals them into Traces. A pure observer: it never alters a step.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use super::{Step, Trace};
use crate::error::TraceError;

struct OpenTrace {
    input: String,
    started_at: DateTime<Utc>,
    steps: Vec<Step>,
}

/// Per-run ordered step logs, shareable across concurrent runs.
#[derive(Default)]
pub struct TraceRecorder {
    open: Mutex<HashMap<String, OpenTrace>>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a log for a run.
    pub fn begin(&self, run_id: &str, input: &str) -> Result<(), TraceError> {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if open.contains_key(run_id) {
            return Err(TraceError::DuplicateRun(run_id.to_string()));
        }
        open.insert(
            run_id.to_string(),
            OpenTrace {
                input: input.to_string(),
                started_at: Utc::now(),
                steps: Vec::new(),
            },
        );
        Ok(())
    }

    /// Append a step, assigning its 1-based index. Returns the index.
    pub fn record(&self, run_id: &str, mut step: Step) -> Result<usize, TraceError> {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        let trace = open
            .get_mut(run_id)
            .ok_or_else(|| TraceError::UnknownRun(run_id.to_string()))?;
        step.index = trace.steps.len() + 1;
        trace.steps.push(step);
        Ok(trace.steps.len())
    }

    /// Copy of the steps recorded so far for an open run.
    pub fn snapshot(&self, run_id: &str) -> Option<Vec<Step>> {
        let open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        open.get(run_id).map(|t| t.steps.clone())
    }

    /// IDs of runs that have begun but not been finalized.
    pub fn open_runs(&self) -> Vec<String> {
        let open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = open.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Seal a run's log into a Trace and forget it.
    pub fn finalize(&self, run_id: &str) -> Result<Trace, TraceError> {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        let trace = open
            .remove(run_id)
            .ok_or_else(|| TraceError::UnknownRun(run_id.to_string()))?;
        Ok(Trace {
            run_id: run_id.to_string(),
            input: trace.input,
            started_at: trace.started_at,
            finished_at: Utc::now(),
            steps: trace.steps,
        })
    }
}
