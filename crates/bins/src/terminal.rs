use common::model::level::Level;
use controller::view::{Editor, LevelEntry, Progress, ResultDisplay, View};
use itertools::Itertools;
use std::io::{self, BufRead, Write};

pub const RESET_PROMPT: &str =
    "Erase all progress? This resets score, badges and completed levels.";
pub const RESET_DONE: &str = "Progress cleared.";
pub const RESET_CANCELLED: &str = "Reset cancelled.";

/// Renders a controller's output as plain lines, holding the candidate source in memory.
///
/// Score, attempts, badges and progress are only kept, and printed by [`TerminalView::print_summary`].
pub struct TerminalView<W: Write> {
    out: W,
    source: String,
    score: u32,
    attempts: u32,
    badges: Vec<String>,
    progress: Progress,
}

impl TerminalView<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            source: String::new(),
            score: 0,
            attempts: 0,
            badges: vec![],
            progress: Progress { done: 0, total: 0 },
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn print_summary(&mut self) {
        let badges = if self.badges.is_empty() {
            "none".to_string()
        } else {
            self.badges.iter().join(", ")
        };
        let summary = format!(
            "Score: {} | Attempts: {} | Progress: {} ({}%) | Badges: {}",
            self.score,
            self.attempts,
            self.progress,
            self.progress.percent(),
            badges
        );
        self.line(&summary);
    }

    fn line(&mut self, text: &str) {
        if let Err(err) = writeln!(self.out, "{text}") {
            tracing::debug!("unable to write to the terminal: {err}");
        }
    }
}

impl<W: Write> View for TerminalView<W> {
    fn show_message(&mut self, message: &str) {
        if !message.is_empty() {
            self.line(&format!("! {message}"));
        }
    }

    fn show_result(&mut self, result: &ResultDisplay) {
        let text = result.to_string();
        if !text.is_empty() {
            self.line(&text);
        }
    }

    fn show_level(&mut self, level: &Level) {
        self.line(&format!("== {level} =="));
        if !level.description.is_empty() {
            self.line(&level.description);
        }
    }

    fn show_levels(&mut self, _entries: &[LevelEntry]) {}

    fn show_attempts(&mut self, attempts: u32) {
        self.attempts = attempts;
    }

    fn show_score(&mut self, score: u32) {
        self.score = score;
    }

    fn show_badges(&mut self, badges: &[&str]) {
        self.badges = badges.iter().map(|b| b.to_string()).collect();
    }

    fn show_progress(&mut self, progress: Progress) {
        self.progress = progress;
    }

    fn show_hint(&mut self, hint: Option<&str>) {
        if let Some(hint) = hint {
            self.line(&format!("Hint: {hint}"));
        }
    }

    fn show_solution_control(&mut self, visible: bool) {
        if visible {
            self.line("A solution is available: run again with --reveal-solution.");
        }
    }

    fn show_solution(&mut self, solution: &str) {
        self.line("Solution:");
        self.line(solution);
    }

    fn celebrate(&mut self) {
        self.line("🏆 Every level is complete. Well done!");
    }
}

impl<W: Write> Editor for TerminalView<W> {
    fn value(&self) -> String {
        self.source.clone()
    }

    fn set_value(&mut self, text: &str) {
        self.source = text.to_string();
    }
}

/// Asks a yes/no question on `out`, reading the answer from `input`. Anything but yes means no.
pub fn confirm(prompt: &str, mut input: impl BufRead, mut out: impl Write) -> bool {
    if write!(out, "{prompt} [y/N] ").and_then(|_| out.flush()).is_err() {
        return false;
    }
    let mut answer = String::new();
    if input.read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::level::LevelBuilder;

    fn output(view: TerminalView<Vec<u8>>) -> String {
        String::from_utf8(view.into_inner()).unwrap()
    }

    #[test]
    fn prints_only_visible_content() {
        let mut view = TerminalView::new(vec![]);
        let level = LevelBuilder::default()
            .id(1)
            .title("Add Numbers".to_string())
            .description("Make 1+1 work".to_string())
            .build()
            .unwrap();
        view.show_level(&level);
        view.show_message("");
        view.show_result(&ResultDisplay::Cleared);
        view.show_hint(None);
        view.show_solution_control(false);
        view.show_result(&ResultDisplay::Output(vec!["hi".to_string()]));
        view.show_hint(Some("Use +"));
        view.show_message("Forbidden token: fetch(");
        assert_eq!(
            output(view),
            "== 1. Add Numbers ==\nMake 1+1 work\nhi\nHint: Use +\n! Forbidden token: fetch(\n"
        );
    }

    #[test]
    fn summary_uses_the_latest_values() {
        let mut view = TerminalView::new(vec![]);
        view.show_score(5);
        view.show_score(15);
        view.show_attempts(2);
        view.show_badges(&["Completed Add Numbers", "Completed Loop"]);
        view.show_progress(Progress { done: 2, total: 3 });
        view.print_summary();
        assert_eq!(
            output(view),
            "Score: 15 | Attempts: 2 | Progress: 2 / 3 (67%) | Badges: Completed Add Numbers, Completed Loop\n"
        );
    }

    #[test]
    fn editor_holds_the_source() {
        let mut view = TerminalView::new(io::sink());
        assert_eq!(view.value(), "");
        view.set_value("1+1");
        assert_eq!(view.value(), "1+1");
    }

    #[test]
    fn confirmation_defaults_to_no() {
        for (answer, expected) in [("y\n", true), ("YES\n", true), ("n\n", false), ("\n", false), ("", false)] {
            let mut out = vec![];
            assert_eq!(confirm(RESET_PROMPT, answer.as_bytes(), &mut out), expected);
            assert!(String::from_utf8(out).unwrap().ends_with("[y/N] "));
        }
    }
}
