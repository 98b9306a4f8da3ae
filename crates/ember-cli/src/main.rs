//! Ember command line: run a script file or start the interactive shell.

mod prelude;
mod repl;

use std::process::ExitCode;

use ember_lang::{Config, Interpreter, LexMode};

struct Options {
    config: Config,
    file: Option<String>,
}

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(Some(options)) => options,
        Ok(None) => return ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {msg}");
            eprintln!();
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match options.file {
        Some(path) => run_file(&path, options.config),
        None => match repl::run(options.config) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("error: {err}");
                ExitCode::FAILURE
            }
        },
    }
}

/// Log events go to stderr, filtered by `EMBER_LOG` (default `warn`).
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_env("EMBER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

/// `Ok(None)` when the invocation was fully handled (`--help`, `--version`).
fn parse_args(args: &[String]) -> Result<Option<Options>, String> {
    let mut config = Config::default();
    let mut file = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(None);
            }
            "-V" | "--version" => {
                println!("ember {}", env!("CARGO_PKG_VERSION"));
                return Ok(None);
            }
            "--lenient" => config = config.with_lex_mode(LexMode::Lenient),
            "--max-depth" => {
                let Some(raw) = args.get(i + 1) else {
                    return Err("`--max-depth` needs a value".to_string());
                };
                let depth = raw.parse::<usize>()
                    .map_err(|_| format!("invalid call depth `{raw}`"))?;
                config = config.with_max_call_depth(depth);
                i += 1;
            }
            flag if flag.starts_with('-') => return Err(format!("unknown option `{flag}`")),
            path => {
                if file.is_some() {
                    return Err(format!("unexpected argument `{path}`"));
                }
                file = Some(path.to_string());
            }
        }
        i += 1;
    }

    Ok(Some(Options { config, file }))
}

fn print_usage() {
    println!("Usage: ember [options] [file]");
    println!();
    println!("Runs <file> when given, otherwise starts the interactive shell.");
    println!();
    println!("Options:");
    println!("  --lenient          Skip stray characters instead of failing");
    println!("  --max-depth <n>    Maximum function call depth (default {})", Config::DEFAULT_MAX_CALL_DEPTH);
    println!("  -h, --help         Show this message");
    println!("  -V, --version      Show version");
    println!();
    println!("Set EMBER_LOG (e.g. EMBER_LOG=debug) to control diagnostics.");
}

fn run_file(path: &str, config: Config) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("error: cannot read `{path}`: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut interp = Interpreter::with_config(config);
    prelude::install(&mut interp);

    match interp.execute(&source) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{path}: {err}");
            ExitCode::FAILURE
        }
    }
}
