// Unless explicitly stated otherwise all files in this repository are licensed under the Apache License, Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025 Datadog, Inc.

use crate::sandbox::v8_platform::{Initialized, Uninitialized, V8Platform};
use std::marker::PhantomData;
use std::sync::Once;

/// Initializes v8 at most once per test process, from whichever test thread gets there first.
pub fn cfg_test_v8() -> V8Platform<Initialized> {
    static INIT: Once = Once::new();

    // The test harness may run any test first, so there is no main thread to own a protected platform.
    INIT.call_once(|| {
        V8Platform::<Uninitialized>::pending().init(0, false);
    });
    V8Platform(PhantomData)
}
