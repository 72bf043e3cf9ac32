//! Guarded mapper invocation.
//!
//! Every call runs on its own worker thread with panics caught and a
//! wall-clock ceiling. A worker that overruns is detached: the harness
//! records the timeout and moves on, the thread finishes (or not) on its own.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;

use control_kit_common::{DetailMapper, DisplayMapper, MapperError, MapperResult};

/// Why a guarded invocation produced no value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvocationError {
    /// The mapper returned an error.
    #[error("{0}")]
    Mapper(#[from] MapperError),

    /// The mapper panicked.
    #[error("mapper panicked: {0}")]
    Panicked(String),

    /// The mapper did not return within the ceiling.
    #[error("mapper did not return within {0:?}")]
    TimedOut(Duration),

    /// The worker thread could not be started.
    #[error("could not start worker thread: {0}")]
    Spawn(String),
}

impl InvocationError {
    /// Whether this is the narrowly-typed error a mapper may raise on a
    /// wholly-null required input.
    pub fn is_narrow(&self) -> bool {
        matches!(self, Self::Mapper(err) if err.is_narrow())
    }
}

type WorkerResult = (thread::Result<MapperResult<Value>>, Duration);

/// Result of a finished invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub result: Result<Value, InvocationError>,
    /// Time spent inside the mapper. Zero when it never returned.
    pub elapsed: Duration,
}

/// An invocation in flight.
pub struct Pending {
    receiver: Option<Receiver<WorkerResult>>,
    spawn_error: Option<String>,
    started: Instant,
    timeout: Duration,
}

impl Pending {
    /// Block until the mapper returns or the ceiling passes. The ceiling is
    /// measured from spawn, so waiting on a batch in order is fair.
    pub fn wait(self) -> Invocation {
        let receiver = match (self.receiver, self.spawn_error) {
            (Some(receiver), _) => receiver,
            (None, message) => {
                return Invocation {
                    result: Err(InvocationError::Spawn(message.unwrap_or_default())),
                    elapsed: Duration::ZERO,
                }
            }
        };

        let remaining = self.timeout.saturating_sub(self.started.elapsed());
        match receiver.recv_timeout(remaining) {
            Ok((Ok(result), elapsed)) => Invocation {
                result: result.map_err(InvocationError::from),
                elapsed,
            },
            Ok((Err(payload), elapsed)) => Invocation {
                result: Err(InvocationError::Panicked(panic_message(payload.as_ref()))),
                elapsed,
            },
            Err(RecvTimeoutError::Timeout) => Invocation {
                result: Err(InvocationError::TimedOut(self.timeout)),
                elapsed: Duration::ZERO,
            },
            Err(RecvTimeoutError::Disconnected) => Invocation {
                result: Err(InvocationError::Panicked(
                    "worker exited without a result".to_string(),
                )),
                elapsed: Duration::ZERO,
            },
        }
    }
}

/// Spawns guarded mapper invocations under a fixed ceiling.
#[derive(Debug, Clone, Copy)]
pub struct Invoker {
    timeout: Duration,
}

impl Invoker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn spawn_detail(
        &self,
        mapper: &Arc<dyn DetailMapper>,
        occurrence: Value,
        context: Value,
    ) -> Pending {
        let mapper = Arc::clone(mapper);
        self.spawn(move || mapper.map(&occurrence, &context))
    }

    pub fn spawn_display(
        &self,
        mapper: &Arc<dyn DisplayMapper>,
        occurrence: Value,
        attestation: Value,
        context: Value,
    ) -> Pending {
        let mapper = Arc::clone(mapper);
        self.spawn(move || mapper.map(&occurrence, &attestation, &context))
    }

    pub fn detail(
        &self,
        mapper: &Arc<dyn DetailMapper>,
        occurrence: Value,
        context: Value,
    ) -> Invocation {
        self.spawn_detail(mapper, occurrence, context).wait()
    }

    pub fn display(
        &self,
        mapper: &Arc<dyn DisplayMapper>,
        occurrence: Value,
        attestation: Value,
        context: Value,
    ) -> Invocation {
        self.spawn_display(mapper, occurrence, attestation, context)
            .wait()
    }

    fn spawn<F>(&self, call: F) -> Pending
    where
        F: FnOnce() -> MapperResult<Value> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<WorkerResult>();
        let started = Instant::now();
        let spawned = thread::Builder::new()
            .name("mapper-invoke".to_string())
            .spawn(move || {
                let begin = Instant::now();
                let result = panic::catch_unwind(AssertUnwindSafe(call));
                // The receiver is gone if the harness already gave up.
                let _ = sender.send((result, begin.elapsed()));
            });

        match spawned {
            Ok(_) => Pending {
                receiver: Some(receiver),
                spawn_error: None,
                started,
                timeout: self.timeout,
            },
            Err(e) => Pending {
                receiver: None,
                spawn_error: Some(e.to_string()),
                started,
                timeout: self.timeout,
            },
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use control_kit_common::{FnDetailMapper, FnDisplayMapper};
    use serde_json::json;

    fn detail(
        f: impl Fn(&Value, &Value) -> MapperResult<Value> + Send + Sync + 'static,
    ) -> Arc<dyn DetailMapper> {
        Arc::new(FnDetailMapper::new(f))
    }

    #[test]
    fn returns_mapper_value() {
        let invoker = Invoker::new(Duration::from_secs(5));
        let mapper = detail(|occ, _| Ok(json!({"echo": occ.clone()})));
        let invocation = invoker.detail(&mapper, json!(1), Value::Null);
        assert_eq!(invocation.result.unwrap(), json!({"echo": 1}));
    }

    #[test]
    fn captures_panics() {
        let invoker = Invoker::new(Duration::from_secs(5));
        let mapper = detail(|_, _| panic!("boom"));
        let invocation = invoker.detail(&mapper, Value::Null, Value::Null);
        assert_eq!(
            invocation.result,
            Err(InvocationError::Panicked("boom".to_string()))
        );
    }

    #[test]
    fn times_out_slow_mapper() {
        let invoker = Invoker::new(Duration::from_millis(50));
        let mapper = detail(|_, _| {
            thread::sleep(Duration::from_millis(500));
            Ok(json!({}))
        });
        let invocation = invoker.detail(&mapper, Value::Null, Value::Null);
        assert_eq!(
            invocation.result,
            Err(InvocationError::TimedOut(Duration::from_millis(50)))
        );
    }

    #[test]
    fn mapper_errors_keep_their_kind() {
        let invoker = Invoker::new(Duration::from_secs(5));
        let mapper = FnDisplayMapper::new(|_, _, _| Err(MapperError::missing_input("occurrence")));
        let mapper: Arc<dyn DisplayMapper> = Arc::new(mapper);
        let invocation = invoker.display(&mapper, Value::Null, Value::Null, Value::Null);
        let err = invocation.result.unwrap_err();
        assert!(err.is_narrow());
        assert!(!InvocationError::Panicked("x".into()).is_narrow());
    }

    #[test]
    fn batch_waits_share_the_ceiling() {
        let invoker = Invoker::new(Duration::from_secs(5));
        let mapper = detail(|occ, _| Ok(json!({"n": occ.clone()})));
        let pending: Vec<Pending> = (0..4)
            .map(|n| invoker.spawn_detail(&mapper, json!(n), Value::Null))
            .collect();
        let values: Vec<Value> = pending
            .into_iter()
            .map(|p| p.wait().result.unwrap())
            .collect();
        assert_eq!(values[3], json!({"n": 3}));
    }
}
