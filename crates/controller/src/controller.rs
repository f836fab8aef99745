use crate::config::ControllerConfig;
use crate::hygiene::{self, Hygiene};
use crate::levels::{LevelRegistry, LoadedLevels};
use crate::persistence::StateStore;
use crate::state::{Award, RunState};
use crate::view::{Editor, LevelEntry, Progress, ResultDisplay, View, PICK_A_LEVEL};
use common::model::level::{Level, LevelId};
use common::model::verdict::{parse_inbound, RunId, Verdict};
use sandbox_kernel::harness::HarnessBuilder;
use sandbox_kernel::sandbox::channel::{message_channel, MessageInbox, MessagePort};
use sandbox_kernel::sandbox::common::SandboxError;
use sandbox_kernel::sandbox::Sandbox;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Failed attempts after which a level's hint is shown.
pub const HINT_AFTER_ATTEMPTS: u32 = 2;
/// Failed attempts after which a level's solution can be revealed.
pub const SOLUTION_AFTER_ATTEMPTS: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("no level is selected")]
    NoLevelSelected,
    #[error("unknown level {0}")]
    UnknownLevel(LevelId),
    #[error("{0}")]
    Rejected(String),
    #[error("unable to launch the sandbox: {0}")]
    Launch(#[from] SandboxError),
}

/// How a run ended, once its verdict was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The level has no test. Nothing but the result area changed.
    NoTest { output: Vec<String> },
    Solved {
        award: Award,
        /// The level that will be selected once the advance delay has passed.
        next: Option<LevelId>,
    },
    Failed {
        attempts: u32,
        hint_revealed: bool,
        solution_revealable: bool,
    },
    /// No verdict arrived in time. The run is treated as the test-absent failure in `verdict`.
    NoVerdict { verdict: Verdict },
}

struct ActiveRun<C> {
    run_id: RunId,
    level: Level,
    deadline: Instant,
    /// Dropping the context discards it.
    _context: C,
}

struct PendingAdvance {
    level_id: LevelId,
    at: Instant,
}

/// Drives runs and owns the learner's progress.
///
/// The controller is the only reader of the message inbox and the only writer of [`RunState`].
pub struct Controller<S: Sandbox, P: StateStore, V: View + Editor> {
    config: ControllerConfig,
    levels: LevelRegistry,
    state: RunState,
    sandbox: S,
    store: P,
    view: V,
    builder: HarnessBuilder,
    port: MessagePort,
    inbox: MessageInbox,
    last_run_id: RunId,
    active: Option<ActiveRun<S::Context>>,
    current: Option<LevelId>,
    level_started: Option<Instant>,
    pending_advance: Option<PendingAdvance>,
    hint_visible: bool,
    solution_revealable: bool,
    finished: bool,
}

impl<S: Sandbox, P: StateStore, V: View + Editor> Controller<S, P, V> {
    /// Creates a controller, restoring any progress `store` holds, and renders every view.
    pub fn new(levels: LoadedLevels, sandbox: S, store: P, view: V, config: ControllerConfig) -> Self {
        let LoadedLevels { registry, warning } = levels;
        let state = match store.load() {
            Ok(Some(snapshot)) => RunState::from_snapshot(snapshot),
            Ok(None) => RunState::default(),
            Err(err) => {
                tracing::warn!("ignoring saved progress: {err}");
                RunState::default()
            }
        };
        let (port, inbox) = message_channel();
        let builder = HarnessBuilder::new(config.sandbox.clone());

        let mut controller = Self {
            config,
            levels: registry,
            state,
            sandbox,
            store,
            view,
            builder,
            port,
            inbox,
            last_run_id: RunId(0),
            active: None,
            current: None,
            level_started: None,
            pending_advance: None,
            hint_visible: false,
            solution_revealable: false,
            finished: false,
        };
        if let Some(warning) = warning {
            controller.view.show_message(&warning);
        }
        controller.render_all();
        controller
    }

    /// Makes `id` the current level, loading its starter code into the editor.
    ///
    /// Any run in flight is discarded.
    pub fn select_level(&mut self, id: LevelId) -> Result<(), SubmitError> {
        let level = self.levels.get(id).cloned().ok_or(SubmitError::UnknownLevel(id))?;
        self.discard_active_run();
        self.pending_advance = None;
        self.current = Some(id);
        self.level_started = Some(Instant::now());

        self.view.show_level(&level);
        self.view.set_value(&level.starter_code);
        self.view.show_result(&ResultDisplay::Cleared);
        self.view.show_attempts(self.state.attempts(id));
        self.show_levels();
        self.refresh_help(&level);
        tracing::debug!(level = id, "selected level");
        Ok(())
    }

    /// Starts a run of `source` against the current level's test.
    ///
    /// Rejected sources never reach a sandbox and leave every piece of state untouched.
    /// Starting a run discards the previous one, so its verdict can no longer be applied.
    pub fn submit(&mut self, source: &str) -> Result<RunId, SubmitError> {
        let Some(level) = self.current_level().cloned() else {
            self.view.show_message(PICK_A_LEVEL);
            return Err(SubmitError::NoLevelSelected);
        };
        self.view.show_message("");
        if let Hygiene::Rejected(reason) = hygiene::check(source) {
            tracing::debug!(level = level.id, "rejected candidate: {reason}");
            self.view.show_message(&reason);
            return Err(SubmitError::Rejected(reason));
        }

        self.discard_active_run();
        self.pending_advance = None;
        let run_id = self.last_run_id.next();
        self.last_run_id = run_id;

        let unit = self.builder.build(run_id, source, &level.test_code);
        self.view.show_result(&ResultDisplay::Running);
        let context = match self.sandbox.launch(unit, self.port.clone()) {
            Ok(context) => context,
            Err(err) => {
                tracing::error!(run = %run_id, "unable to launch the sandbox: {err}");
                self.view.show_result(&ResultDisplay::Cleared);
                self.view.show_message(&format!("Unable to run the code: {err}"));
                return Err(err.into());
            }
        };
        tracing::info!(run = %run_id, level = level.id, "started run");
        self.active = Some(ActiveRun {
            run_id,
            level,
            deadline: Instant::now() + self.config.verdict_timeout,
            _context: context,
        });
        Ok(run_id)
    }

    /// Submits the editor's current content.
    pub fn submit_from_editor(&mut self) -> Result<RunId, SubmitError> {
        let source = self.view.value();
        self.submit(&source)
    }

    /// Processes queued messages without blocking.
    ///
    /// Returns the outcome of the active run once its verdict arrived or its deadline passed.
    pub fn poll(&mut self) -> Option<RunOutcome> {
        while let Some(message) = self.inbox.try_recv() {
            if let Some((run, verdict)) = self.accept(message) {
                return Some(self.apply(run, verdict));
            }
        }
        if self
            .active
            .as_ref()
            .is_some_and(|run| Instant::now() >= run.deadline)
        {
            return Some(self.time_out());
        }
        None
    }

    /// Blocks until the active run has an outcome. Returns `None` if no run is active.
    pub fn await_verdict(&mut self) -> Option<RunOutcome> {
        loop {
            let deadline = self.active.as_ref()?.deadline;
            match self.inbox.recv_until(deadline) {
                Some(message) => {
                    if let Some((run, verdict)) = self.accept(message) {
                        return Some(self.apply(run, verdict));
                    }
                }
                None if Instant::now() >= deadline => return Some(self.time_out()),
                None => {}
            }
        }
    }

    /// Applies a scheduled advance to the next level if it is due at `now`.
    pub fn tick(&mut self, now: Instant) -> Option<LevelId> {
        if !self
            .pending_advance
            .as_ref()
            .is_some_and(|advance| advance.at <= now)
        {
            return None;
        }
        let advance = self.pending_advance.take()?;
        match self.select_level(advance.level_id) {
            Ok(()) => Some(advance.level_id),
            Err(err) => {
                tracing::warn!("unable to advance: {err}");
                None
            }
        }
    }

    /// When the scheduled advance to the next level is due, if one is scheduled.
    pub fn next_advance(&self) -> Option<Instant> {
        self.pending_advance.as_ref().map(|advance| advance.at)
    }

    /// Shows the current level's solution, once enough attempts have failed.
    pub fn reveal_solution(&mut self) -> Option<String> {
        if !self.solution_revealable {
            return None;
        }
        let solution = self.current_level()?.solution()?.to_string();
        self.view.show_solution(&solution);
        Some(solution)
    }

    /// Puts the current level's starter code back into the editor.
    pub fn restore_starter_code(&mut self) -> bool {
        match self.current_level().map(|level| level.starter_code.clone()) {
            Some(starter_code) => {
                self.view.set_value(&starter_code);
                true
            }
            None => false,
        }
    }

    /// Erases all progress if `confirm` agrees. Returns whether a reset happened.
    pub fn reset(&mut self, confirm: impl FnOnce() -> bool) -> bool {
        if !confirm() {
            return false;
        }
        self.discard_active_run();
        self.pending_advance = None;
        if let Err(err) = self.store.clear() {
            tracing::warn!("unable to erase saved progress: {err}");
        }
        self.state.clear();
        self.finished = false;

        self.view.show_result(&ResultDisplay::Cleared);
        self.render_all();
        if let Some(level) = self.current_level().cloned() {
            self.view.set_value(&level.starter_code);
            self.refresh_help(&level);
        }
        tracing::info!("progress was reset");
        true
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn levels(&self) -> &LevelRegistry {
        &self.levels
    }

    pub fn current_level(&self) -> Option<&Level> {
        self.current.and_then(|id| self.levels.get(id))
    }

    /// The correlation identifier of the run awaiting a verdict.
    pub fn active_run(&self) -> Option<RunId> {
        self.active.as_ref().map(|run| run.run_id)
    }

    pub fn hint_visible(&self) -> bool {
        self.hint_visible
    }

    pub fn solution_revealable(&self) -> bool {
        self.solution_revealable
    }

    /// True once the last level has been solved.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The time spent on the current level as of `now`.
    pub fn time_on_level(&self, now: Instant) -> Option<Duration> {
        self.level_started
            .map(|started| now.saturating_duration_since(started))
    }

    pub fn progress(&self) -> Progress {
        Progress {
            done: self
                .levels
                .iter()
                .filter(|level| self.state.is_completed(level.id))
                .count(),
            total: self.levels.len(),
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    /// Validates and correlates an inbound message, taking the active run if the verdict is its own.
    fn accept(&mut self, message: Value) -> Option<(ActiveRun<S::Context>, Verdict)> {
        let message = match parse_inbound(&message) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!("discarding message: {err}");
                return None;
            }
        };
        match &self.active {
            Some(run) if run.run_id == message.run_id => {}
            Some(run) => {
                tracing::debug!(run = %run.run_id, "discarding verdict from {}", message.run_id);
                return None;
            }
            None => {
                tracing::debug!("discarding verdict from {}: no run is active", message.run_id);
                return None;
            }
        }
        self.active.take().map(|run| (run, message.verdict))
    }

    fn apply(&mut self, run: ActiveRun<S::Context>, verdict: Verdict) -> RunOutcome {
        tracing::info!(
            run = %run.run_id,
            ok = verdict.ok,
            has_test = verdict.has_test,
            "received verdict"
        );
        let outcome = if !verdict.has_test {
            self.view
                .show_result(&ResultDisplay::Output(verdict.console_messages.clone()));
            RunOutcome::NoTest {
                output: verdict.console_messages,
            }
        } else if verdict.ok {
            self.solved(&run.level)
        } else {
            self.failed(&run.level, verdict)
        };
        self.persist();
        outcome
    }

    fn solved(&mut self, level: &Level) -> RunOutcome {
        let award = self.state.record_success(level);
        let next = self.levels.next_after(level.id).map(|next| next.id);
        self.finished = next.is_none();

        self.view.show_result(&ResultDisplay::Solved {
            finished: self.finished,
        });
        self.view.show_score(self.state.score());
        self.view.show_attempts(0);
        self.show_badges();
        self.show_levels();
        self.refresh_help(level);
        self.render_progress();

        if let Some(next) = next {
            self.pending_advance = Some(PendingAdvance {
                level_id: next,
                at: Instant::now() + self.config.advance_delay,
            });
        }
        RunOutcome::Solved { award, next }
    }

    fn failed(&mut self, level: &Level, verdict: Verdict) -> RunOutcome {
        let attempts = self.state.record_failure(level.id);
        self.view.show_result(&ResultDisplay::Failed {
            output: verdict.console_messages,
            error: verdict.error,
        });
        self.view.show_attempts(attempts);
        self.refresh_help(level);
        RunOutcome::Failed {
            attempts,
            hint_revealed: self.hint_visible,
            solution_revealable: self.solution_revealable,
        }
    }

    fn time_out(&mut self) -> RunOutcome {
        let verdict = Verdict::no_verdict(self.config.verdict_timeout);
        if let Some(run) = self.active.take() {
            tracing::warn!(run = %run.run_id, "discarding the context: {}", verdict.error.as_deref().unwrap_or_default());
        }
        self.view.show_result(&ResultDisplay::NoVerdict {
            waited: self.config.verdict_timeout,
        });
        self.persist();
        RunOutcome::NoVerdict { verdict }
    }

    fn discard_active_run(&mut self) {
        if let Some(run) = self.active.take() {
            tracing::debug!(run = %run.run_id, "discarding active run");
        }
    }

    /// Shows the hint and the solution control as far as the level's attempt count allows.
    fn refresh_help(&mut self, level: &Level) {
        let attempts = self.state.attempts(level.id);
        self.hint_visible = attempts >= HINT_AFTER_ATTEMPTS && level.hint().is_some();
        self.solution_revealable =
            attempts >= SOLUTION_AFTER_ATTEMPTS && level.solution().is_some();
        self.view
            .show_hint(level.hint().filter(|_| self.hint_visible));
        self.view.show_solution_control(self.solution_revealable);
    }

    fn persist(&mut self) {
        if let Err(err) = self.store.save(&self.state.snapshot()) {
            tracing::warn!("unable to save progress: {err}");
        }
    }

    fn render_all(&mut self) {
        self.view.show_score(self.state.score());
        self.view
            .show_attempts(self.current.map_or(0, |id| self.state.attempts(id)));
        self.show_badges();
        self.show_levels();
        self.render_progress();
    }

    fn show_badges(&mut self) {
        let badges: Vec<&str> = self.state.badges().iter().map(String::as_str).collect();
        self.view.show_badges(&badges);
    }

    fn show_levels(&mut self) {
        let entries: Vec<LevelEntry> = self
            .levels
            .iter()
            .map(|level| LevelEntry {
                id: level.id,
                title: level.title.clone(),
                completed: self.state.is_completed(level.id),
                current: self.current == Some(level.id),
            })
            .collect();
        self.view.show_levels(&entries);
    }

    /// Renders progress, celebrating the first time every level is complete.
    fn render_progress(&mut self) {
        let progress = self.progress();
        self.view.show_progress(progress);
        if progress.is_complete() && self.state.mark_all_complete_shown() {
            tracing::info!("every level is complete");
            self.view.celebrate();
            self.persist();
        }
    }
}
