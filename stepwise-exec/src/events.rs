use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::report::FailureKind;
use crate::rundown::RunStatus;

#[derive(Debug, Clone)]
pub enum RunEvent {
    RunStarted {
        total_steps: usize,
    },
    StepStarted {
        index: String,
        name: String,
    },
    StepFinished {
        index: String,
        name: String,
        failure: Option<FailureKind>,
        ignored: bool,
    },
    PollAttempt {
        index: String,
        attempt: u32,
        satisfied: bool,
    },
    Halted {
        index: String,
        kind: FailureKind,
    },
    RunFinished {
        status: RunStatus,
        executed: usize,
    },
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: RunEvent);
}

pub struct CompositeEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl Default for CompositeEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn emit(&self, event: RunEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

/// Default sink: one structured log line per event.
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: RunEvent) {
        match event {
            RunEvent::RunStarted { total_steps } => info!(total_steps, "run started"),
            RunEvent::StepStarted { index, name } => info!(%index, %name, "step started"),
            RunEvent::StepFinished {
                index,
                name,
                failure: None,
                ..
            } => info!(%index, %name, "step succeeded"),
            RunEvent::StepFinished {
                index,
                name,
                failure: Some(kind),
                ignored,
            } => warn!(%index, %name, failure = %kind, ignored, "step failed"),
            RunEvent::PollAttempt {
                index,
                attempt,
                satisfied,
            } => info!(%index, attempt, satisfied, "poll attempt"),
            RunEvent::Halted { index, kind } => warn!(%index, failure = %kind, "run halted"),
            RunEvent::RunFinished { status, executed } => {
                info!(status = status.as_str(), executed, "run finished")
            }
        }
    }
}

/// JSON lines on stdout.
pub struct StdoutEventSink;

#[async_trait]
impl EventSink for StdoutEventSink {
    async fn emit(&self, event: RunEvent) {
        let json = match event {
            RunEvent::RunStarted { total_steps } => {
                json!({ "type": "run.started", "total_steps": total_steps })
            }
            RunEvent::StepStarted { index, name } => {
                json!({ "type": "step.started", "index": index, "name": name })
            }
            RunEvent::StepFinished { index, name, failure, ignored } => {
                json!({ "type": "step.finished", "index": index, "name": name, "failure": failure, "ignored": ignored })
            }
            RunEvent::PollAttempt { index, attempt, satisfied } => {
                json!({ "type": "poll.attempt", "index": index, "attempt": attempt, "satisfied": satisfied })
            }
            RunEvent::Halted { index, kind } => {
                json!({ "type": "run.halted", "index": index, "failure": kind })
            }
            RunEvent::RunFinished { status, executed } => {
                json!({ "type": "run.finished", "status": status.as_str(), "executed": executed })
            }
        };
        println!("{}", serde_json::to_string(&json).unwrap_or_default());
    }
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: RunEvent) {}
}
