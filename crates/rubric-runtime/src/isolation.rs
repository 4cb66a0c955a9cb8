//! Concurrency isolation for engine execution.
//!
//! The engine's own scheduling assumptions do not always match the
//! scheduler the caller is already running under. This module captures the
//! ambient scheduler identity once per call and picks one of two fixed
//! strategies: run in place, or hand the whole evaluation to a dedicated
//! worker thread that installs a fresh scheduler, runs to completion,
//! tears it down, and sends the result back.
//!
//! The isolated path additionally mirrors the provider's configuration
//! into the process environment for engines that only read env, under a
//! process-wide lock with guaranteed restore on every exit path.

use std::collections::BTreeMap;
use std::future::Future;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::oneshot;

use rubric_core::params;

/// Environment variables mirrored for the engine during isolated runs.
pub const AZURE_API_KEY_ENV: &str = "AZURE_OPENAI_API_KEY";
pub const AZURE_ENDPOINT_ENV: &str = "AZURE_OPENAI_ENDPOINT";
pub const OPENAI_API_VERSION_ENV: &str = "OPENAI_API_VERSION";

// One set/run/revert window at a time; concurrent isolated calls would
// otherwise race on the process environment.
static ENV_WINDOW: Mutex<()> = Mutex::new(());

/// Errors from the isolation shim itself. The adapter treats these as a
/// total-failure trigger, not an engine failure.
#[derive(Error, Debug)]
pub enum IsolationError {
    #[error("failed to spawn evaluation worker: {0}")]
    Spawn(String),

    #[error("failed to build worker scheduler: {0}")]
    Scheduler(String),

    #[error("evaluation worker terminated without a result")]
    WorkerLost,
}

/// How this call will execute the engine. Chosen once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// The ambient scheduler is compatible; run in place.
    Direct,

    /// Hand off to a dedicated worker with a fresh scheduler.
    IsolatedWorker,
}

/// Identity of the ambient scheduler, captured once per call and never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    /// A multi-thread scheduler the engine can share.
    MultiThread,

    /// A single-thread cooperative scheduler the engine must not block.
    CurrentThread,

    /// No scheduler we can identify.
    Undetected,
}

impl ExecutionContext {
    /// Inspect the scheduler this call is running under.
    pub fn current() -> Self {
        match Handle::try_current() {
            Ok(handle) => match handle.runtime_flavor() {
                RuntimeFlavor::CurrentThread => ExecutionContext::CurrentThread,
                _ => ExecutionContext::MultiThread,
            },
            Err(_) => ExecutionContext::Undetected,
        }
    }

    /// The single compatibility predicate choosing the strategy for this
    /// call. Only a shareable multi-thread scheduler runs direct.
    pub fn strategy(self) -> ExecutionStrategy {
        match self {
            ExecutionContext::MultiThread => ExecutionStrategy::Direct,
            ExecutionContext::CurrentThread | ExecutionContext::Undetected => {
                ExecutionStrategy::IsolatedWorker
            }
        }
    }
}

/// Scoped set-then-restore of provider environment variables.
///
/// Restores the previous state on drop, which also covers the unwind path
/// when the evaluation panics inside the worker.
struct EnvGuard {
    saved: Vec<(&'static str, Option<String>)>,
}

impl EnvGuard {
    fn apply(vars: &[(&'static str, String)]) -> Self {
        let mut saved = Vec::with_capacity(vars.len());
        for (name, value) in vars {
            saved.push((*name, std::env::var(name).ok()));
            std::env::set_var(name, value);
        }
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, previous) in self.saved.drain(..).rev() {
            match previous {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }
}

/// The environment state strictly required by the detected provider.
///
/// Only the Azure family configures through the environment; the other
/// families take configuration explicitly.
fn provider_env(parameters: &BTreeMap<String, String>) -> Vec<(&'static str, String)> {
    let mut vars = Vec::new();

    if let Some(value) = parameters.get(params::AZURE_API_KEY) {
        vars.push((AZURE_API_KEY_ENV, value.clone()));
    }
    if let Some(value) = parameters.get(params::AZURE_ENDPOINT) {
        vars.push((AZURE_ENDPOINT_ENV, value.clone()));
    }
    if let Some(value) = parameters.get(params::MODEL_VERSION) {
        vars.push((OPENAI_API_VERSION_ENV, value.clone()));
    }

    vars
}

/// Run the future produced by `make` to completion on a dedicated worker
/// thread with a fresh scheduler.
///
/// The provider environment is applied for the duration of the run and
/// reverted before the result is sent back; scheduler teardown happens on
/// the worker before the guard releases. The caller suspends until the
/// worker finishes — the call either completes or fails as a unit.
pub(crate) async fn run_isolated<F, Fut, T>(
    parameters: &BTreeMap<String, String>,
    make: F,
) -> Result<T, IsolationError>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = T>,
    T: Send + 'static,
{
    let vars = provider_env(parameters);
    let (sender, receiver) = oneshot::channel();

    std::thread::Builder::new()
        .name("rubric-eval-worker".to_string())
        .spawn(move || {
            // Scheduler teardown and environment restore both happen before
            // the result leaves this scope.
            let result = {
                let _window = ENV_WINDOW.lock();
                let _guard = EnvGuard::apply(&vars);

                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => {
                        tracing::debug!("isolated worker scheduler installed");
                        let value = runtime.block_on(make());
                        drop(runtime);
                        tracing::debug!("isolated worker scheduler torn down");
                        Ok(value)
                    }
                    Err(error) => Err(IsolationError::Scheduler(error.to_string())),
                }
            };

            // A dropped receiver means the caller went away; nothing to do.
            let _ = sender.send(result);
        })
        .map_err(|error| IsolationError::Spawn(error.to_string()))?;

    receiver.await.map_err(|_| IsolationError::WorkerLost)?
}
