// Unless explicitly stated otherwise all files in this repository are licensed under the Apache License, Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025 Datadog, Inc.

use crate::sandbox::runtime::HostState;
use deno_core::{op2, OpState};
use serde_json::Value;

/// Posts a verdict payload from the harness onto the run's message port.
///
/// The port is only a transport: a payload that isn't JSON is dropped here, and everything else
/// is left for the receiving controller to validate and correlate.
#[op2(fast)]
pub fn op_harness_post(state: &mut OpState, #[string] payload: &str) {
    let host = state.borrow_mut::<HostState>();
    let message = match serde_json::from_str::<Value>(payload) {
        Ok(message) => message,
        Err(err) => {
            tracing::warn!(run = %host.run_id, "dropping a post that isn't JSON: {err}");
            return;
        }
    };
    host.posts += 1;
    if host.posts > 1 {
        tracing::warn!(run = %host.run_id, posts = host.posts, "context posted more than once");
    }
    if !host.port.post(message) {
        tracing::debug!(run = %host.run_id, "nobody is listening for this context's messages");
    }
}

#[op2(fast)]
pub fn op_harness_log(state: &mut OpState, #[string] line: &str) {
    let host = state.borrow::<HostState>();
    if host.log_console {
        tracing::debug!(run = %host.run_id, "console: {line}");
    }
}
