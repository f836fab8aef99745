//! The rendering and editing collaborators a [`Controller`](crate::controller::Controller) drives.

use common::model::level::{Level, LevelId};
use itertools::Itertools;
use std::fmt;
use std::time::Duration;

pub const RUNNING: &str = "Running...";
pub const NO_OUTPUT: &str = "No output.";
pub const SOLVED: &str = "✅ Level solved!";
pub const TESTS_FAILED: &str = "❌ Tests failed — try again.";
pub const ALL_LEVELS_FINISHED: &str = " 🎉 You finished all levels!";
pub const PICK_A_LEVEL: &str = "Pick a level first";

/// One row of the level list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelEntry {
    pub id: LevelId,
    pub title: String,
    pub completed: bool,
    pub current: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    /// Completion as a rounded percentage.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.done as f64 / self.total as f64) * 100.0).round() as u32
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.done >= self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.done, self.total)
    }
}

/// The content of the result area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultDisplay {
    Cleared,
    Running,
    /// A run without a test: its console output, shown verbatim.
    Output(Vec<String>),
    Solved { finished: bool },
    Failed { output: Vec<String>, error: Option<String> },
    NoVerdict { waited: Duration },
}

impl fmt::Display for ResultDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultDisplay::Cleared => Ok(()),
            ResultDisplay::Running => f.write_str(RUNNING),
            ResultDisplay::Output(lines) if lines.is_empty() => f.write_str(NO_OUTPUT),
            ResultDisplay::Output(lines) => write!(f, "{}", lines.iter().join("\n")),
            ResultDisplay::Solved { finished } => {
                f.write_str(SOLVED)?;
                if *finished {
                    f.write_str(ALL_LEVELS_FINISHED)?;
                }
                Ok(())
            }
            ResultDisplay::Failed { output, error } => {
                f.write_str(TESTS_FAILED)?;
                let error_line = error.as_ref().map(|e| format!("Test error: {e}"));
                for line in output.iter().chain(error_line.iter()) {
                    write!(f, "\n{line}")?;
                }
                Ok(())
            }
            ResultDisplay::NoVerdict { waited } => write!(
                f,
                "No result after {:.1}s. The run was stopped.",
                waited.as_secs_f32()
            ),
        }
    }
}

/// The sinks a controller renders into. Each call replaces what the sink showed before.
pub trait View {
    /// The inline message line: warnings and rejection reasons. An empty message clears it.
    fn show_message(&mut self, message: &str);
    fn show_result(&mut self, result: &ResultDisplay);
    fn show_level(&mut self, level: &Level);
    fn show_levels(&mut self, entries: &[LevelEntry]);
    fn show_attempts(&mut self, attempts: u32);
    fn show_score(&mut self, score: u32);
    fn show_badges(&mut self, badges: &[&str]);
    fn show_progress(&mut self, progress: Progress);
    /// `None` hides the hint.
    fn show_hint(&mut self, hint: Option<&str>);
    /// Shows or hides the control that reveals the solution.
    fn show_solution_control(&mut self, visible: bool);
    fn show_solution(&mut self, solution: &str);
    /// Shown once, the first time every level is complete.
    fn celebrate(&mut self);
}

/// The text-editing widget holding the candidate source.
pub trait Editor {
    fn value(&self) -> String;
    fn set_value(&mut self, text: &str);
}
