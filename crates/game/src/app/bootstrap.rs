use std::env;
use std::path::PathBuf;

use ninja_engine::{resolve_app_paths, InputCollector, InputSource, LoopConfig, StartupError};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::assets_manifest::load_assets_manifest;
use super::input_script::ScriptedInput;
use super::loop_runner::HeadlessRenderer;
use super::session::{Session, SessionConfig};

const SEED_ENV_VAR: &str = "NINJA_SEED";
/// Tick cap for `--fast` runs that do not pass `--ticks`.
const FAST_DEFAULT_TICKS: u64 = 3600;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct GameOptions {
    pub(crate) level: usize,
    pub(crate) max_ticks: Option<u64>,
    pub(crate) seed: u64,
    pub(crate) script: Option<PathBuf>,
    pub(crate) fast: bool,
}

pub(crate) enum CliOutcome {
    Run(GameOptions),
    Help,
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) session: Session,
    pub(crate) input: Box<dyn InputSource>,
    pub(crate) renderer: HeadlessRenderer,
}

pub(crate) fn build_app(options: GameOptions) -> Result<AppWiring, String> {
    init_tracing();
    info!("=== Ninja Startup ===");

    let paths = resolve_app_paths().map_err(|error| error.to_string())?;
    let level_count = paths.level_count();
    if level_count == 0 {
        return Err(StartupError::NoLevels(paths.maps_dir.clone()).to_string());
    }
    if options.level >= level_count {
        return Err(format!(
            "--level {} is out of range ({level_count} levels in '{}')",
            options.level,
            paths.maps_dir.display()
        ));
    }

    let assets = load_assets_manifest(&paths.assets_manifest, &paths.data_dir)?;
    let input: Box<dyn InputSource> = match &options.script {
        Some(path) => Box::new(ScriptedInput::load(path)?),
        None => Box::new(InputCollector::new()),
    };

    let config = LoopConfig {
        max_ticks: options
            .max_ticks
            .or(options.fast.then_some(FAST_DEFAULT_TICKS)),
        realtime: !options.fast,
        ..LoopConfig::default()
    };
    info!(
        root = %paths.root.display(),
        levels = level_count,
        start_level = options.level,
        seed = options.seed,
        fast = options.fast,
        "game_options"
    );

    let session = Session::new(
        SessionConfig {
            paths,
            level_count,
            start_level: options.level,
            seed: options.seed,
            view_size: config.view_size,
        },
        assets.table.clone(),
    )
    .map_err(|error| error.to_string())?;

    Ok(AppWiring {
        config,
        session,
        input,
        renderer: HeadlessRenderer::new(assets),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

pub(crate) fn parse_cli() -> Result<CliOutcome, String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    parse_args(&args, env::var(SEED_ENV_VAR).ok())
}

/// `--seed` wins over the seed environment variable.
pub(crate) fn parse_args(args: &[String], env_seed: Option<String>) -> Result<CliOutcome, String> {
    let mut options = GameOptions::default();
    if let Some(raw) = env_seed {
        options.seed = raw
            .trim()
            .parse::<u64>()
            .map_err(|_| format!("invalid {SEED_ENV_VAR} value '{raw}' (expected u64)"))?;
    }

    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => return Ok(CliOutcome::Help),
            "--level" => {
                let value = flag_value(args, index, "--level")?;
                options.level = value
                    .parse::<usize>()
                    .map_err(|_| format!("invalid --level value '{value}' (expected usize)"))?;
                index += 2;
            }
            "--ticks" => {
                let value = flag_value(args, index, "--ticks")?;
                let ticks = value
                    .parse::<u64>()
                    .map_err(|_| format!("invalid --ticks value '{value}' (expected u64)"))?;
                options.max_ticks = Some(ticks);
                index += 2;
            }
            "--seed" => {
                let value = flag_value(args, index, "--seed")?;
                options.seed = value
                    .parse::<u64>()
                    .map_err(|_| format!("invalid --seed value '{value}' (expected u64)"))?;
                index += 2;
            }
            "--script" => {
                let value = flag_value(args, index, "--script")?;
                options.script = Some(PathBuf::from(value));
                index += 2;
            }
            "--fast" => {
                options.fast = true;
                index += 1;
            }
            other => return Err(format!("unknown argument '{other}'\n\n{}", usage_text())),
        }
    }
    Ok(CliOutcome::Run(options))
}

fn flag_value<'a>(args: &'a [String], index: usize, flag: &str) -> Result<&'a str, String> {
    args.get(index + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("missing value for {flag}"))
}

pub(crate) fn usage_text() -> String {
    [
        "ninja_game - headless ninja platformer runner",
        "",
        "Usage:",
        "  ninja_game [--level <n>] [--ticks <n>] [--seed <u64>] [--script <file>] [--fast]",
        "",
        "Options:",
        "  --level <n>      level index to start on (data/maps/<n>.json)",
        "  --ticks <n>      stop after n simulation ticks",
        "  --seed <u64>     rng seed (default: NINJA_SEED or 0)",
        "  --script <file>  replay '<tick> <action> <down|up|tap>' input lines",
        "  --fast           run ticks back to back instead of at 60 per second",
        "",
        "Environment:",
        "  NINJA_ROOT       project root holding data/",
        "  NINJA_SEED       default rng seed",
        "  RUST_LOG         tracing filter (default: info)",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    fn run_options(outcome: CliOutcome) -> GameOptions {
        match outcome {
            CliOutcome::Run(options) => options,
            CliOutcome::Help => panic!("expected run options"),
        }
    }

    #[test]
    fn parses_every_flag() {
        let outcome = parse_args(
            &args(&[
                "--level", "2", "--ticks", "600", "--seed", "9", "--script", "run.txt", "--fast",
            ]),
            None,
        )
        .expect("args");

        assert_eq!(
            run_options(outcome),
            GameOptions {
                level: 2,
                max_ticks: Some(600),
                seed: 9,
                script: Some(PathBuf::from("run.txt")),
                fast: true,
            }
        );
    }

    #[test]
    fn seed_flag_overrides_environment() {
        let from_env = run_options(parse_args(&[], Some("42".to_string())).expect("env"));
        assert_eq!(from_env.seed, 42);

        let flagged =
            run_options(parse_args(&args(&["--seed", "7"]), Some("42".to_string())).expect("flag"));
        assert_eq!(flagged.seed, 7);
    }

    #[test]
    fn rejects_bad_values_and_unknown_flags() {
        assert_eq!(
            parse_args(&args(&["--ticks"]), None).err(),
            Some("missing value for --ticks".to_string())
        );
        assert!(parse_args(&args(&["--level", "-1"]), None)
            .err()
            .is_some_and(|error| error.starts_with("invalid --level value '-1'")));
        assert!(parse_args(&args(&["--jump"]), None)
            .err()
            .is_some_and(|error| error.starts_with("unknown argument '--jump'")));
        assert!(parse_args(&[], Some("abc".to_string())).is_err());
    }

    #[test]
    fn help_short_circuits() {
        assert!(matches!(
            parse_args(&args(&["--fast", "--help", "--bogus"]), None),
            Ok(CliOutcome::Help)
        ));
    }
}
