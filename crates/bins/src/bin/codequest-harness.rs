use anyhow::{Context, Result};
use codequest::cli::{
    print_usage, Source, DEFAULT_LEVELS_FILE, EXIT_CODE_INVALID_ARGUMENTS, EXIT_CODE_REJECTED,
};
use common::model::level::{LevelId, NO_TEST_SENTINEL};
use common::model::verdict::RunId;
use common::sandbox_options::SandboxOptions;
use controller::hygiene::{self, Hygiene};
use controller::levels::{read_levels, LevelRegistry};
use getopts::Options;
use sandbox_kernel::constants::{CARGO_VERSION, VERSION};
use sandbox_kernel::harness::HarnessBuilder;
use std::env;
use std::path::Path;
use std::process::exit;

fn get_opts() -> Options {
    let mut opts = Options::new();
    opts.optopt(
        "f",
        "file",
        "candidate source, `-` reads it from stdin",
        "/path/to/solution.js",
    );
    opts.optopt("t", "test", "file holding the test predicate", "/path/to/test.js");
    opts.optopt(
        "l",
        "levels",
        "levels file to take the test predicate from, with --level",
        DEFAULT_LEVELS_FILE,
    );
    opts.optopt("", "level", "id of the level whose test is used", "1");
    opts.optopt("r", "run-id", "correlation identifier of the verdict", "1");
    opts.optopt("o", "output", "write the document to a file", "harness.html");
    opts.optflag("h", "help", "print this help");
    opts.optflag("v", "version", "shows the tool version");
    opts
}

fn level_test(levels_file: &Path, id: LevelId) -> Result<String> {
    let registry = read_levels(levels_file)
        .and_then(LevelRegistry::new)
        .with_context(|| format!("cannot load levels from {}", levels_file.display()))?;
    let level = registry
        .get(id)
        .with_context(|| format!("no level with id {id}"))?;
    Ok(level.test_code.clone())
}

/// Prints the standalone HTML document that runs a candidate in a sandboxed browser frame.
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

    if matches.opt_present("h") || !matches.opt_present("f") {
        print_usage(&program, &opts);
        return Ok(());
    }

    let candidate = Source::from_arg(&matches.opt_str("f").unwrap_or_default()).read()?;
    if let Hygiene::Rejected(reason) = hygiene::check(&candidate) {
        eprintln!("{reason}");
        exit(EXIT_CODE_REJECTED);
    }

    let test = match (matches.opt_str("t"), matches.opt_str("level")) {
        (Some(path), _) => std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read test file {path}"))?,
        (None, Some(id)) => {
            let id = id
                .parse::<LevelId>()
                .with_context(|| format!("invalid level id {id:?}"))?;
            let levels_file = matches
                .opt_str("l")
                .unwrap_or_else(|| DEFAULT_LEVELS_FILE.to_string());
            level_test(Path::new(&levels_file), id)?
        }
        (None, None) => NO_TEST_SENTINEL.to_string(),
    };

    let run_id = match matches.opt_str("r") {
        Some(r) => RunId(
            r.parse::<u64>()
                .with_context(|| format!("invalid run id {r:?}"))?,
        ),
        None => RunId(1),
    };

    let document = HarnessBuilder::new(SandboxOptions::default())
        .build(run_id, &candidate, &test)
        .html_document();
    match matches.opt_str("o") {
        Some(path) => {
            std::fs::write(&path, document).with_context(|| format!("cannot write {path}"))?
        }
        None => print!("{document}"),
    }
    Ok(())
}
