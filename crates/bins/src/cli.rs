use anyhow::{Context, Result};
use common::model::level::LevelId;
use controller::config::{read_config_file, ConfigFile, ControllerConfig};
use getopts::{Matches, Options};
use std::io::Read;
use std::path::{Path, PathBuf};

pub const DEFAULT_LEVELS_FILE: &str = "levels.json";
pub const DEFAULT_STATE_DIR: &str = ".codequest";

pub const EXIT_CODE_TESTS_FAILED: i32 = 1;
pub const EXIT_CODE_NO_VERDICT: i32 = 2;
pub const EXIT_CODE_REJECTED: i32 = 3;
pub const EXIT_CODE_INVALID_ARGUMENTS: i32 = 64;

pub fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options] [FILE]", program);
    print!("{}", opts.usage(&brief));
}

pub fn get_opts() -> Options {
    let mut opts = Options::new();
    opts.optopt(
        "l",
        "levels",
        "levels file (JSON, or YAML with a .yml/.yaml extension)",
        DEFAULT_LEVELS_FILE,
    );
    opts.optopt(
        "s",
        "state-dir",
        "directory where progress is saved",
        DEFAULT_STATE_DIR,
    );
    opts.optopt("c", "config", "YAML configuration file", "codequest.yml");
    opts.optopt("", "level", "id of the level to play", "1");
    opts.optopt(
        "f",
        "file",
        "candidate source to run, `-` reads it from stdin",
        "/path/to/solution.js",
    );
    opts.optflag("", "list", "print the levels and exit");
    opts.optflag(
        "",
        "reveal-solution",
        "show the level's solution once enough attempts failed",
    );
    opts.optflag("", "reset", "erase all progress");
    opts.optflag("", "yes", "do not ask for confirmation");
    opts.optflag(
        "",
        "logs",
        "Enables logs to a file. Usually /tmp/codequest/logs",
    );
    opts.optflag("d", "debug", "print debug logs");
    opts.optflag("h", "help", "print this help");
    opts.optflag("v", "version", "shows the tool version");
    opts
}

/// Where the candidate source comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Stdin,
}

impl Source {
    /// `-` means stdin, anything else is a file path.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Source::Stdin
        } else {
            Source::File(PathBuf::from(arg))
        }
    }

    pub fn read(&self) -> Result<String> {
        match self {
            Source::File(path) => std::fs::read_to_string(path)
                .with_context(|| format!("cannot read candidate file {}", path.display())),
            Source::Stdin => {
                let mut source = String::new();
                std::io::stdin()
                    .read_to_string(&mut source)
                    .context("cannot read candidate from stdin")?;
                Ok(source)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliConfiguration {
    pub levels_file: PathBuf,
    pub state_dir: PathBuf,
    pub controller: ControllerConfig,
    pub level: Option<LevelId>,
    pub source: Option<Source>,
    pub list: bool,
    pub reveal_solution: bool,
    pub reset: bool,
    pub assume_yes: bool,
}

impl CliConfiguration {
    /// Reads the configuration file named by `--config`, if any, and applies the flags over it.
    pub fn from_matches(matches: &Matches) -> Result<Self> {
        let file = match matches.opt_str("c") {
            Some(path) => read_config_file(Path::new(&path))
                .with_context(|| format!("cannot load configuration file {path}"))?,
            None => ConfigFile::default(),
        };
        Self::merge(matches, &file)
    }

    /// Command-line flags take precedence over `file`.
    pub fn merge(matches: &Matches, file: &ConfigFile) -> Result<Self> {
        let levels_file = matches
            .opt_str("l")
            .map(PathBuf::from)
            .or_else(|| file.levels.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LEVELS_FILE));
        let state_dir = matches
            .opt_str("s")
            .map(PathBuf::from)
            .or_else(|| file.state_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));
        let level = matches
            .opt_str("level")
            .map(|id| {
                id.parse::<LevelId>()
                    .with_context(|| format!("invalid level id {id:?}"))
            })
            .transpose()?;
        let source = matches
            .opt_str("f")
            .or_else(|| matches.free.first().cloned())
            .map(|arg| Source::from_arg(&arg));

        Ok(Self {
            levels_file,
            state_dir,
            controller: file.controller_config(),
            level,
            source,
            list: matches.opt_present("list"),
            reveal_solution: matches.opt_present("reveal-solution"),
            reset: matches.opt_present("reset"),
            assume_yes: matches.opt_present("yes"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Matches {
        get_opts().parse(args).unwrap()
    }

    #[test]
    fn defaults_without_flags() {
        let configuration = CliConfiguration::merge(&parse(&[]), &ConfigFile::default()).unwrap();
        assert_eq!(configuration.levels_file, PathBuf::from("levels.json"));
        assert_eq!(configuration.state_dir, PathBuf::from(".codequest"));
        assert_eq!(configuration.controller, ControllerConfig::default());
        assert_eq!(configuration.level, None);
        assert_eq!(configuration.source, None);
        assert!(!configuration.list);
        assert!(!configuration.reset);
    }

    #[test]
    fn flags_override_the_configuration_file() {
        let file = ConfigFile {
            levels: Some(PathBuf::from("course.yaml")),
            state_dir: Some(PathBuf::from("/var/lib/codequest")),
            verdict_timeout_ms: Some(250),
            ..Default::default()
        };
        let configuration =
            CliConfiguration::merge(&parse(&["-l", "other.json", "--level", "3", "-"]), &file)
                .unwrap();
        assert_eq!(configuration.levels_file, PathBuf::from("other.json"));
        assert_eq!(configuration.state_dir, PathBuf::from("/var/lib/codequest"));
        assert_eq!(
            configuration.controller.verdict_timeout,
            Duration::from_millis(250)
        );
        assert_eq!(configuration.level, Some(3));
        assert_eq!(configuration.source, Some(Source::Stdin));
    }

    #[test]
    fn file_flag_wins_over_positional_source() {
        let configuration = CliConfiguration::merge(
            &parse(&["--file", "a.js", "b.js", "--reset", "--yes"]),
            &ConfigFile::default(),
        )
        .unwrap();
        assert_eq!(
            configuration.source,
            Some(Source::File(PathBuf::from("a.js")))
        );
        assert!(configuration.reset);
        assert!(configuration.assume_yes);
    }

    #[test]
    fn invalid_level_id() {
        let err = CliConfiguration::merge(&parse(&["--level", "two"]), &ConfigFile::default())
            .unwrap_err();
        assert!(err.to_string().contains("\"two\""));
    }

    #[test]
    fn reads_the_configuration_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "levels: course.json\nadvance_delay_ms: 0").unwrap();
        let path = file.path().to_str().unwrap();
        let configuration = CliConfiguration::from_matches(&parse(&["-c", path])).unwrap();
        assert_eq!(configuration.levels_file, PathBuf::from("course.json"));
        assert_eq!(configuration.controller.advance_delay, Duration::ZERO);

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        writeln!(broken, "timeout: 3").unwrap();
        let path = broken.path().to_str().unwrap();
        assert!(CliConfiguration::from_matches(&parse(&["-c", path])).is_err());
    }

    #[test]
    fn reads_candidate_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "console.log('hi')").unwrap();
        let source = Source::File(file.path().to_path_buf());
        assert_eq!(source.read().unwrap(), "console.log('hi')");
        assert!(Source::File(PathBuf::from("/does/not/exist.js")).read().is_err());
    }

    #[test]
    fn source_from_argument() {
        assert_eq!(Source::from_arg("-"), Source::Stdin);
        assert_eq!(
            Source::from_arg("./solution.js"),
            Source::File(PathBuf::from("./solution.js"))
        );
    }
}
