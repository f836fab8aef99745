// Unless explicitly stated otherwise all files in this repository are licensed under the Apache License, Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025 Datadog, Inc.

use crate::sandbox::ops;

deno_core::extension!(
    harness_host,
    ops = [ops::op_harness_post, ops::op_harness_log],
);
