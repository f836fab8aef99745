// Unless explicitly stated otherwise all files in this repository are licensed under the Apache License, Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025 Datadog, Inc.

use crate::harness::ExecutableUnit;
use crate::sandbox::channel::MessagePort;
use crate::sandbox::common::SandboxError;
use crate::sandbox::v8_platform::{Initialized, V8Platform};
use common::model::verdict::RunId;
use common::sandbox_options::SandboxOptions;
use deno_core::v8;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

/// An isolation primitive that can host an [`ExecutableUnit`].
///
/// A launched context only talks back through `port`. Dropping the returned context discards it:
/// anything it posts afterwards must not be relied upon.
pub trait Sandbox {
    type Context;

    fn launch(&self, unit: ExecutableUnit, port: MessagePort) -> Result<Self::Context, SandboxError>;
}

/// Runs every unit in a fresh `deno_core` isolate on a dedicated thread.
#[derive(Debug, Clone)]
pub struct V8Sandbox {
    platform: V8Platform<Initialized>,
    options: SandboxOptions,
}

impl V8Sandbox {
    pub fn new(platform: V8Platform<Initialized>, options: SandboxOptions) -> Self {
        Self { platform, options }
    }
}

impl Sandbox for V8Sandbox {
    type Context = IsolatedContext;

    fn launch(&self, unit: ExecutableUnit, port: MessagePort) -> Result<IsolatedContext, SandboxError> {
        let run_id = unit.run_id();
        let platform = self.platform;
        let options = self.options.clone();
        let discarded = Arc::new(AtomicBool::new(false));
        let discarded_clone = Arc::clone(&discarded);
        let (handle_tx, handle_rx) = mpsc::sync_channel::<v8::IsolateHandle>(1);

        // v8 isolates are not `Send`, so the runtime is created and dropped on its own thread.
        let worker = std::thread::Builder::new()
            .name(format!("sandbox-{run_id}"))
            .spawn(move || {
                let mut runtime = platform.new_runtime(run_id, port, &options);
                if handle_tx.send(runtime.isolate_handle()).is_err() {
                    return Err(SandboxError::ContextUnavailable);
                }
                if discarded_clone.load(Ordering::Acquire) {
                    return Err(SandboxError::Terminated);
                }
                let result = runtime.execute(&unit);
                match &result {
                    Ok(()) => tracing::debug!(run = %run_id, "isolated context finished"),
                    Err(err) => tracing::debug!(run = %run_id, "isolated context stopped: {err}"),
                }
                result
            })?;

        let isolate = handle_rx
            .recv()
            .map_err(|_| SandboxError::ContextUnavailable)?;
        tracing::debug!(run = %run_id, "launched isolated context");

        Ok(IsolatedContext {
            run_id,
            isolate,
            discarded,
            worker: Some(worker),
        })
    }
}

/// A running (or finished) unit inside its own isolate.
///
/// Dropping the context terminates any JavaScript still executing in it.
#[derive(Debug)]
pub struct IsolatedContext {
    run_id: RunId,
    isolate: v8::IsolateHandle,
    discarded: Arc<AtomicBool>,
    worker: Option<JoinHandle<Result<(), SandboxError>>>,
}

impl IsolatedContext {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Returns true once the context's thread has exited.
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stops any JavaScript executing in the context.
    pub fn terminate(&self) {
        self.discarded.store(true, Ordering::Release);
        self.isolate.terminate_execution();
    }

    /// Blocks until the context's thread exits, returning how its execution ended.
    pub fn join(mut self) -> Result<(), SandboxError> {
        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| SandboxError::Panicked)?,
            None => Ok(()),
        }
    }
}

impl Drop for IsolatedContext {
    fn drop(&mut self) {
        if !self.is_finished() {
            tracing::debug!(run = %self.run_id, "discarding a running isolated context");
            self.terminate();
        }
    }
}
