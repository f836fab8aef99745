// Unless explicitly stated otherwise all files in this repository are licensed under the Apache License, Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025 Datadog, Inc.

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("unable to spawn the isolated context: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("the isolated context exited before it was ready")]
    ContextUnavailable,
    #[error("JavaScript error: {reason}")]
    JavaScript { reason: String },
    #[error("execution was terminated")]
    Terminated,
    #[error("the isolated context panicked")]
    Panicked,
}
