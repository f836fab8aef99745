// Unless explicitly stated otherwise all files in this repository are licensed under the Apache License, Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025 Datadog, Inc.

//! Hosts executable units in isolated V8 contexts, one fresh `deno_core` runtime per run.

pub mod channel;
pub mod common;
pub(crate) mod extension;
pub mod launcher;
pub(crate) mod ops;
pub mod runtime;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod v8_platform;

pub use launcher::{IsolatedContext, Sandbox, V8Sandbox};
