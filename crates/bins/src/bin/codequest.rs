use anyhow::{Context, Result};
use codequest::cli::{
    get_opts, print_usage, CliConfiguration, EXIT_CODE_INVALID_ARGUMENTS, EXIT_CODE_NO_VERDICT,
    EXIT_CODE_REJECTED, EXIT_CODE_TESTS_FAILED,
};
use codequest::levels_table::print_levels_table;
use codequest::logging::init_tracing;
use codequest::terminal::{confirm, TerminalView, RESET_CANCELLED, RESET_DONE, RESET_PROMPT};
use common::model::level::LevelId;
use controller::controller::{Controller, RunOutcome, SubmitError, SOLUTION_AFTER_ATTEMPTS};
use controller::levels::load_or_fallback;
use controller::persistence::FileStateStore;
use controller::view::Editor;
use sandbox_kernel::constants::{CARGO_VERSION, VERSION};
use sandbox_kernel::sandbox::v8_platform::initialize_v8;
use sandbox_kernel::sandbox::V8Sandbox;
use std::env;
use std::io::{self, Stdout};
use std::process::exit;
use std::time::Instant;

type TerminalController = Controller<V8Sandbox, FileStateStore, TerminalView<Stdout>>;

/// The level to play when none was asked for: the first one not completed yet.
fn default_level(controller: &TerminalController) -> Option<LevelId> {
    let levels = controller.levels();
    levels
        .iter()
        .find(|level| !controller.state().is_completed(level.id))
        .or_else(|| levels.first())
        .map(|level| level.id)
}

/// Runs the editor's content and waits for the verdict, returning the process exit code.
fn run_candidate(controller: &mut TerminalController) -> Result<i32> {
    match controller.submit_from_editor() {
        Ok(run_id) => tracing::debug!(run = %run_id, "waiting for verdict"),
        Err(SubmitError::Rejected(_)) => return Ok(EXIT_CODE_REJECTED),
        Err(err) => return Err(err.into()),
    }
    let exit_code = match controller.await_verdict() {
        Some(RunOutcome::NoTest { .. }) | Some(RunOutcome::Solved { .. }) => 0,
        Some(RunOutcome::Failed { .. }) => EXIT_CODE_TESTS_FAILED,
        Some(RunOutcome::NoVerdict { .. }) | None => EXIT_CODE_NO_VERDICT,
    };
    if let Some(at) = controller.next_advance() {
        std::thread::sleep(at.saturating_duration_since(Instant::now()));
        controller.tick(Instant::now());
    }
    Ok(exit_code)
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();
    let opts = get_opts();

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => {
            eprintln!("error when parsing arguments: {}", f);
            print_usage(&program, &opts);
            exit(EXIT_CODE_INVALID_ARGUMENTS);
        }
    };

    if matches.opt_present("v") {
        println!("Version: {}, revision: {}", CARGO_VERSION, VERSION);
        return Ok(());
    }

    if matches.opt_present("h") {
        print_usage(&program, &opts);
        return Ok(());
    }

    let guard = init_tracing(matches.opt_present("logs"), matches.opt_present("d"));
    let configuration = CliConfiguration::from_matches(&matches)?;

    let levels = load_or_fallback(&configuration.levels_file);
    let platform = initialize_v8(0).context("v8 was already initialized")?;
    let sandbox = V8Sandbox::new(platform, configuration.controller.sandbox.clone());
    let store = FileStateStore::new(&configuration.state_dir);
    tracing::debug!("saving progress to {}", store.path().display());
    let mut controller = Controller::new(
        levels,
        sandbox,
        store,
        TerminalView::stdout(),
        configuration.controller.clone(),
    );

    if configuration.reset {
        let assume_yes = configuration.assume_yes;
        let reset =
            controller.reset(|| assume_yes || confirm(RESET_PROMPT, io::stdin().lock(), io::stdout()));
        println!("{}", if reset { RESET_DONE } else { RESET_CANCELLED });
        if configuration.source.is_none() && !configuration.list {
            return Ok(());
        }
    }

    if configuration.list {
        print_levels_table(controller.levels(), controller.state());
        controller.view_mut().print_summary();
        return Ok(());
    }

    let level = match configuration.level {
        Some(level) => level,
        None => default_level(&controller).context("no level to play")?,
    };
    controller.select_level(level)?;

    if configuration.reveal_solution && controller.reveal_solution().is_none() {
        println!("The solution unlocks after {SOLUTION_AFTER_ATTEMPTS} failed attempts.");
    }

    let exit_code = match &configuration.source {
        Some(source) => {
            let candidate = source.read()?;
            controller.view_mut().set_value(&candidate);
            run_candidate(&mut controller)?
        }
        None => {
            println!("{}", controller.view().value());
            0
        }
    };
    controller.view_mut().print_summary();

    // `exit` skips destructors, and the log writer flushes on drop.
    drop(controller);
    drop(guard);
    exit(exit_code)
}
