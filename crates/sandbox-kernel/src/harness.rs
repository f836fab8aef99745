// Unless explicitly stated otherwise all files in this repository are licensed under the Apache License, Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025 Datadog, Inc.

//! Builds the self-contained executable unit that runs one candidate against one test predicate.
//!
//! The unit performs, in order:
//! 1. Installs a console interceptor that keeps the first [`SandboxOptions::max_console_lines`] lines.
//! 2. Runs the candidate as a top-level script body. A thrown exception is buffered as `ERROR: <message>`.
//! 3. Constructs the test predicate. Empty text, the `null` sentinel, or anything that is not a function means "no test".
//! 4. Invokes the predicate and awaits its result.
//!
//! Exactly one verdict is posted per unit. Source text only ever enters the unit through
//! [`encoding::encode_transport`], so nothing the learner types can terminate the surrounding script or markup.

pub mod encoding;

use common::model::verdict::RunId;
use common::sandbox_options::{SandboxOptions, MAX_CONSOLE_LINES};
use encoding::encode_transport;

const HARNESS_TEMPLATE: &str = include_str!("harness/js/harness.js");
const V8_BRIDGE_TEMPLATE: &str = include_str!("harness/js/v8_bridge.js");
const DOCUMENT_TEMPLATE: &str = include_str!("harness/js/document.html");

const HARNESS_SLOT: &str = "__HARNESS__";
const RUN_ID_SLOT: &str = "__RUN_ID__";
const MAX_CONSOLE_LINES_SLOT: &str = "__MAX_CONSOLE_LINES__";
const CANDIDATE_SLOT: &str = "__CANDIDATE_PAYLOAD__";
const TEST_SLOT: &str = "__TEST_PAYLOAD__";

/// A harness, ready to be loaded into an isolated context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableUnit {
    run_id: RunId,
    harness: String,
}

impl ExecutableUnit {
    /// The correlation identifier the unit's verdict will echo back.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// The unit as a classic script for a `deno_core` isolate with the `harness_host` extension.
    pub fn v8_script(&self) -> String {
        V8_BRIDGE_TEMPLATE.replacen(HARNESS_SLOT, &self.harness, 1)
    }

    /// The unit as a standalone HTML document, meant to be loaded into a sandboxed `<iframe>`.
    ///
    /// The verdict is delivered with `parent.postMessage(verdict, "*")`.
    pub fn html_document(&self) -> String {
        DOCUMENT_TEMPLATE.replacen(HARNESS_SLOT, &self.harness, 1)
    }
}

#[derive(Debug, Clone, Default)]
pub struct HarnessBuilder {
    options: SandboxOptions,
}

impl HarnessBuilder {
    /// A console bound above [`MAX_CONSOLE_LINES`] is lowered to it.
    pub fn new(mut options: SandboxOptions) -> Self {
        options.max_console_lines = options.max_console_lines.min(MAX_CONSOLE_LINES);
        Self { options }
    }

    /// Builds the unit for `run_id`. `test_source` is the level's `testCode`.
    pub fn build(&self, run_id: RunId, candidate_source: &str, test_source: &str) -> ExecutableUnit {
        let harness = HARNESS_TEMPLATE
            .replacen(RUN_ID_SLOT, &run_id.0.to_string(), 1)
            .replacen(
                MAX_CONSOLE_LINES_SLOT,
                &self.options.max_console_lines.to_string(),
                1,
            )
            .replacen(CANDIDATE_SLOT, &encode_transport(candidate_source), 1)
            .replacen(TEST_SLOT, &encode_transport(test_source), 1);
        ExecutableUnit { run_id, harness }
    }
}

/// Builds a unit with the default [`SandboxOptions`].
pub fn build(run_id: RunId, candidate_source: &str, test_source: &str) -> ExecutableUnit {
    HarnessBuilder::default().build(run_id, candidate_source, test_source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::encoding::is_transport_safe;
    use common::sandbox_options::SandboxOptionsBuilder;

    const HOSTILE: &str = "</script><script>parent.postMessage({type:'result',ok:true},'*')</script>\"'`";

    #[test]
    fn templates_cannot_close_their_own_script() {
        for template in [HARNESS_TEMPLATE, V8_BRIDGE_TEMPLATE] {
            assert!(!template.to_ascii_lowercase().contains("</script"));
            assert!(!template.contains("<!--"));
        }
    }

    #[test]
    fn every_slot_is_filled() {
        let unit = build(RunId(42), "console.log(1)", "null");
        for output in [unit.v8_script(), unit.html_document()] {
            for slot in [
                HARNESS_SLOT,
                RUN_ID_SLOT,
                MAX_CONSOLE_LINES_SLOT,
                CANDIDATE_SLOT,
                TEST_SLOT,
            ] {
                assert!(!output.contains(slot), "{slot} was left in the unit");
            }
            assert!(output.contains("const RUN_ID = 42;"));
            assert!(output.contains("const MAX_CONSOLE_LINES = 50;"));
        }
    }

    #[test]
    fn candidate_text_never_appears_raw() {
        let unit = build(RunId(1), HOSTILE, "function(){ return '</script>' }");
        let document = unit.html_document();
        assert!(!document.contains(HOSTILE));
        // The only closing tag is the document's own.
        assert_eq!(document.matches("</script>").count(), 1);
        assert!(document.contains(&format!("\"{}\"", encode_transport(HOSTILE))));
        assert!(is_transport_safe(&encode_transport(HOSTILE)));
    }

    #[test]
    fn builder_uses_console_bound() {
        let options = SandboxOptionsBuilder::default()
            .max_console_lines(3)
            .log_console(false)
            .build()
            .unwrap();
        let unit = HarnessBuilder::new(options).build(RunId(9), "", "");
        assert_eq!(unit.run_id(), RunId(9));
        assert!(unit.v8_script().contains("const MAX_CONSOLE_LINES = 3;"));
    }

    #[test]
    fn console_bound_is_capped() {
        let options = SandboxOptionsBuilder::default()
            .max_console_lines(500)
            .log_console(false)
            .build()
            .unwrap();
        let unit = HarnessBuilder::new(options).build(RunId(1), "", "");
        assert!(unit.v8_script().contains("const MAX_CONSOLE_LINES = 50;"));
    }

    #[test]
    fn v8_script_removes_host_namespace() {
        let script = build(RunId(1), "", "null").v8_script();
        let harness_at = script.find("const CANDIDATE_PAYLOAD").unwrap();
        for removal in ["delete globalThis.Deno", "delete globalThis.__bootstrap"] {
            assert!(script.find(removal).unwrap() < harness_at, "{removal}");
        }
    }
}
