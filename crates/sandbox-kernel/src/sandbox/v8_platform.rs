// Unless explicitly stated otherwise all files in this repository are licensed under the Apache License, Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025 Datadog, Inc.

//! Process-wide v8 setup. Holding a [`V8Platform<Initialized>`] proves it has happened.

use crate::sandbox::channel::MessagePort;
use crate::sandbox::runtime::HarnessRuntime;
use common::model::verdict::RunId;
use common::sandbox_options::SandboxOptions;
use deno_core::v8;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

/// Marks a [`V8Platform`] that cannot create runtimes yet.
#[derive(Debug, Copy, Clone)]
pub struct Uninitialized;
/// Marks a [`V8Platform`] that can create runtimes.
#[derive(Debug, Copy, Clone)]
pub struct Initialized;

#[derive(Debug, Copy, Clone)]
pub struct V8Platform<State>(pub(crate) PhantomData<State>);

impl V8Platform<Uninitialized> {
    pub(crate) fn pending() -> Self {
        V8Platform(PhantomData)
    }

    /// Installs the v8 platform for the whole process.
    ///
    /// An unprotected platform lets isolates run on threads that are not descendants of the
    /// initializing thread.
    pub(crate) fn init(self, worker_threads: u32, protected: bool) -> V8Platform<Initialized> {
        let platform = if protected {
            v8::new_default_platform(worker_threads, false)
        } else {
            v8::new_unprotected_default_platform(worker_threads, false)
        };
        deno_core::JsRuntime::init_platform(Some(platform.make_shared()), false);
        V8Platform(PhantomData)
    }
}

impl V8Platform<Initialized> {
    /// Creates a fresh [`HarnessRuntime`] for a single run. Runtimes share no state with one another.
    pub fn new_runtime(
        &self,
        run_id: RunId,
        port: MessagePort,
        options: &SandboxOptions,
    ) -> HarnessRuntime {
        HarnessRuntime::new(run_id, port, options)
    }
}

/// Initializes v8 for the process, with `worker_threads` background threads (zero picks a
/// count from the online processors).
///
/// Returns `None` if v8 was already initialized.
///
/// Call this from the main thread, before any sandbox thread is spawned. With [Memory Protection Keys]
/// only the initializing thread and its descendants may enter an isolate, and anything else segfaults.
///
/// [Memory Protection Keys]: https://docs.kernel.org/core-api/protection-keys.html
pub fn initialize_v8(worker_threads: u32) -> Option<V8Platform<Initialized>> {
    static INITIALIZED: AtomicBool = AtomicBool::new(false);

    INITIALIZED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .ok()
        .map(|_| V8Platform::<Uninitialized>::pending().init(worker_threads, true))
}
