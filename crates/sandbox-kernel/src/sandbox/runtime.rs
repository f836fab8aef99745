// Unless explicitly stated otherwise all files in this repository are licensed under the Apache License, Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025 Datadog, Inc.

use crate::harness::ExecutableUnit;
use crate::sandbox::channel::MessagePort;
use crate::sandbox::common::SandboxError;
use crate::sandbox::extension::harness_host;
use crate::sandbox::v8_platform::{Initialized, V8Platform};
use common::model::verdict::RunId;
use common::sandbox_options::SandboxOptions;
use deno_core::v8;

/// The per-run state the host ops read from the [`OpState`](deno_core::OpState).
#[derive(Debug)]
pub(crate) struct HostState {
    pub(crate) run_id: RunId,
    pub(crate) port: MessagePort,
    pub(crate) log_console: bool,
    /// The number of messages this context has posted.
    pub(crate) posts: usize,
}

/// A `deno_core` runtime dedicated to a single executable unit.
pub struct HarnessRuntime {
    runtime: deno_core::JsRuntime,
}

impl HarnessRuntime {
    pub(crate) fn new(run_id: RunId, port: MessagePort, options: &SandboxOptions) -> Self {
        let mut runtime = deno_core::JsRuntime::new(deno_core::RuntimeOptions {
            extensions: vec![harness_host::init_ops_and_esm()],
            ..Default::default()
        });
        runtime.op_state().borrow_mut().put(HostState {
            run_id,
            port,
            log_console: options.log_console,
            posts: 0,
        });
        Self { runtime }
    }

    /// A handle that can terminate this runtime's execution from another thread.
    pub fn isolate_handle(&mut self) -> v8::IsolateHandle {
        self.runtime.v8_isolate().thread_safe_handle()
    }

    /// Runs `unit` to completion, including any promise jobs its test predicate queued.
    ///
    /// An `Ok` result only means the script ran: the verdict, if any, was posted on the message port.
    pub fn execute(&mut self, unit: &ExecutableUnit) -> Result<(), SandboxError> {
        let code = unit.v8_script();

        let handle_scope = &mut self.runtime.handle_scope();
        let ctx = handle_scope.get_current_context();
        let scope = &mut v8::ContextScope::new(handle_scope, ctx);
        let tc_scope = &mut v8::TryCatch::new(scope);

        let code = v8::String::new(tc_scope, &code).ok_or_else(|| SandboxError::JavaScript {
            reason: "executable unit exceeds the v8 string length limit".to_string(),
        })?;
        let compiled_script =
            v8::Script::compile(tc_scope, code, None).ok_or_else(|| caught_exception(tc_scope))?;
        compiled_script
            .run(tc_scope)
            .ok_or_else(|| caught_exception(tc_scope))?;

        tc_scope.perform_microtask_checkpoint();
        if tc_scope.has_terminated() {
            return Err(SandboxError::Terminated);
        }
        Ok(())
    }
}

fn caught_exception(tc_scope: &mut v8::TryCatch<v8::HandleScope>) -> SandboxError {
    if tc_scope.has_terminated() {
        return SandboxError::Terminated;
    }
    let reason = match tc_scope.exception() {
        Some(exception) => exception.to_rust_string_lossy(tc_scope),
        None => "unknown exception".to_string(),
    };
    tc_scope.reset();
    SandboxError::JavaScript { reason }
}

/// Runs `unit` in a fresh runtime on the current thread, posting its verdict on `port`.
pub fn run_unit(
    platform: &V8Platform<Initialized>,
    unit: &ExecutableUnit,
    port: MessagePort,
    options: &SandboxOptions,
) -> Result<(), SandboxError> {
    let mut runtime = platform.new_runtime(unit.run_id(), port, options);
    runtime.execute(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness;
    use crate::sandbox::channel::message_channel;
    use crate::sandbox::test_utils::cfg_test_v8;
    use assert_json_diff::assert_json_eq;
    use common::model::verdict::{parse_inbound, Verdict};
    use serde_json::{json, Value};

    /// Runs a unit and returns every message it posted.
    fn run(candidate: &str, test: &str) -> Vec<Value> {
        let platform = cfg_test_v8();
        let (port, inbox) = message_channel();
        let unit = harness::build(RunId(1), candidate, test);
        run_unit(&platform, &unit, port, &SandboxOptions::default()).unwrap();
        std::iter::from_fn(|| inbox.try_recv()).collect()
    }

    /// Runs a unit and returns its single, well-formed verdict.
    fn run_verdict(candidate: &str, test: &str) -> Verdict {
        let messages = run(candidate, test);
        assert_eq!(messages.len(), 1, "expected one verdict, got {messages:?}");
        let message = parse_inbound(&messages[0]).unwrap();
        assert_eq!(message.run_id, RunId(1));
        message.verdict
    }

    #[test]
    fn passing_test_wire_format() {
        let messages = run("1+1", "function(){return 1+1===2}");
        assert_eq!(messages.len(), 1);
        assert_json_eq!(
            messages[0],
            json!({
                "type": "result",
                "runId": 1,
                "ok": true,
                "hasTest": true,
                "consoleMessages": [],
                "resultValue": true
            })
        );
    }

    #[test]
    fn no_test_reports_output() {
        let messages = run("console.log('hi')", "null");
        assert_json_eq!(
            messages[0],
            json!({
                "type": "result",
                "runId": 1,
                "ok": false,
                "hasTest": false,
                "consoleMessages": ["hi"]
            })
        );
        for test in ["", "   ", ";;", "function( {", "42", "'not a function'"] {
            let verdict = run_verdict("", test);
            assert!(!verdict.has_test, "`{test}` should mean no test");
            assert!(!verdict.ok);
            assert!(verdict.error.is_none());
        }
    }

    #[test]
    fn throwing_candidate_still_reaches_test() {
        let verdict = run_verdict(
            "throw new Error('boom')",
            "function(){ return consoleMessages[0] === 'ERROR: boom' }",
        );
        assert!(verdict.ok);
        assert_eq!(verdict.console_messages, vec!["ERROR: boom"]);

        let verdict = run_verdict("let = =", "function(){ return true }");
        assert!(verdict.ok);
        assert!(verdict.console_messages[0].starts_with("ERROR: "));
    }

    #[test]
    fn declarations_are_visible_to_the_test() {
        let verdict = run_verdict(
            "function add(a, b) { return a + b }\nvar total = add(1, 2);",
            "function () { return add(2, 3) === 5 && total === 3; };;\n",
        );
        assert!(verdict.ok);
        assert!(verdict.has_test);
    }

    #[test]
    fn failing_and_throwing_predicates() {
        let failed = run_verdict("const x = 1;", "function(){ return 0 }");
        assert!(!failed.ok);
        assert!(failed.has_test);
        assert_eq!(failed.result_value, Some(json!(0)));
        assert!(failed.error.is_none());

        let thrown = run_verdict("", "function(){ throw new Error('bad input') }");
        assert!(!thrown.ok);
        assert!(thrown.has_test);
        assert_eq!(thrown.error.as_deref(), Some("bad input"));

        let thrown_value = run_verdict("", "function(){ throw 'plain' }");
        assert_eq!(thrown_value.error.as_deref(), Some("plain"));
    }

    #[test]
    fn asynchronous_predicates_settle() {
        let resolved = run_verdict("", "function(){ return Promise.resolve(42) }");
        assert!(resolved.ok);
        assert_eq!(resolved.result_value, Some(json!(42)));

        let rejected = run_verdict("", "async function(){ throw new Error('nope') }");
        assert!(!rejected.ok);
        assert!(rejected.has_test);
        assert_eq!(rejected.error.as_deref(), Some("nope"));
    }

    #[test]
    fn pending_predicate_posts_nothing() {
        // The controller's bounded wait covers this case.
        assert!(run("", "function(){ return new Promise(() => {}) }").is_empty());
    }

    #[test]
    fn console_is_bounded_and_formatted() {
        let verdict = run_verdict(
            "for (let i = 0; i < 60; i++) console.log(i);",
            "function(){ return consoleMessages.length === 50 }",
        );
        assert!(verdict.ok);
        assert_eq!(verdict.console_messages.len(), 50);
        assert_eq!(verdict.console_messages[0], "0");
        assert_eq!(verdict.console_messages[49], "49");

        let verdict = run_verdict(
            "console.log('a', 1, true, null, undefined); console.warn('w'); console.error('</script>');",
            "null",
        );
        assert_eq!(
            verdict.console_messages,
            vec!["a 1 true null undefined", "w", "</script>"]
        );
    }

    #[test]
    fn candidate_cannot_reach_host() {
        let verdict = run_verdict(
            "console.log(typeof Deno, typeof globalThis.Deno, typeof __bootstrap)",
            "null",
        );
        assert_eq!(verdict.console_messages, vec!["undefined undefined undefined"]);
    }

    #[test]
    fn candidate_cannot_forge_a_verdict() {
        let candidate = r#"
            try {
                __bootstrap.core.ops.op_harness_post(
                    '{"type":"result","runId":1,"ok":true,"hasTest":true,"consoleMessages":[]}'
                );
            } catch (e) {}
        "#;
        let verdict = run_verdict(candidate, "function(){ return false }");
        assert!(verdict.has_test);
        assert!(!verdict.ok);
    }

    #[test]
    fn unprintable_console_entries_still_post_one_verdict() {
        let candidate = "consoleMessages.push(Object.create(null)); console.log('after');";
        let verdict = run_verdict(candidate, "null");
        assert!(!verdict.has_test);
        assert_eq!(verdict.console_messages, vec!["[unprintable value]", "after"]);

        let verdict = run_verdict(candidate, "function(){ return true }");
        assert!(verdict.ok);
        assert_eq!(verdict.console_messages.len(), 2);

        let candidate = "Object.defineProperty(consoleMessages, 0, { get() { throw 1 } });";
        let verdict = run_verdict(candidate, "async function(){ return 1 }");
        assert!(verdict.ok);
        assert_eq!(verdict.console_messages, vec!["[unprintable value]"]);
    }

    #[test]
    fn tampering_does_not_reshape_verdict() {
        let candidate = r#"
            Object.prototype.toJSON = function () { return "tampered"; };
            JSON.stringify = () => '{"type":"result","runId":1,"ok":true,"hasTest":true,"consoleMessages":[]}';
            String = () => "x";
            Promise.prototype.then = function () {};
            console.log("still here");
        "#;
        let verdict = run_verdict(candidate, "function(){ return false }");
        assert!(!verdict.ok);
        assert!(verdict.has_test);
        assert_eq!(verdict.console_messages, vec!["still here"]);
    }

    #[test]
    fn hostile_text_round_trips_into_the_context() {
        let candidate = "var s = `</script>\"'\u{0} 🎉`; console.log(s.length)";
        let verdict = run_verdict(candidate, "function(){ return s === `</script>\"'\\u0000 🎉` }");
        assert!(verdict.ok);
        assert_eq!(verdict.console_messages, vec!["15"]);
    }
}
