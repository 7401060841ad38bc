//! CLI for the restringer deobfuscation engine.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::info;
use restringer::error::RestringerError;
use restringer::Restringer;

#[derive(Parser)]
#[command(name = "restringer")]
#[command(author, version, about = "Iterative AST rewriting engine for deobfuscating JavaScript", long_about = None)]
struct Cli {
    /// Script to deobfuscate
    input_filename: PathBuf,

    /// Enable the dead-code pass
    #[arg(short, long)]
    clean: bool,

    /// Suppress stdout banners
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Emit debug-level diagnostics
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Write result to a file (default: `<input>-deob.js`)
    #[arg(short, long, num_args = 0..=1, default_missing_value = "")]
    output: Option<String>,

    /// Positive integer cap on total rule invocations
    #[arg(short, long)]
    max_iterations: Option<u32>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else if cli.quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new().filter_level(level).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("restringer: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), RestringerError> {
    if let Some(max) = cli.max_iterations {
        if max == 0 {
            return Err(RestringerError::InvalidConfig("--max-iterations must be positive".to_string()));
        }
    }

    let source = fs::read_to_string(&cli.input_filename)?;

    if !cli.quiet {
        info!("deobfuscating {}", cli.input_filename.display());
    }

    let mut restringer = Restringer::new(source).clean(cli.clean);
    if let Some(max) = cli.max_iterations {
        restringer = restringer.with_max_iterations(max);
    }

    let changed = restringer.deobfuscate()?;

    if !cli.quiet {
        if changed {
            info!("deobfuscation made changes");
        } else {
            info!("no rule matched; output is unchanged from input");
        }
    }

    let output_path = match cli.output.as_deref() {
        None => None,
        Some("") => Some(default_output_path(&cli.input_filename)),
        Some(name) => Some(PathBuf::from(name)),
    };

    match output_path {
        Some(path) => {
            fs::write(&path, &restringer.script)?;
            if !cli.quiet {
                info!("wrote {}", path.display());
            }
        }
        None => println!("{}", restringer.script),
    }

    Ok(())
}

fn default_output_path(input: &std::path::Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let parent = input.parent().unwrap_or_else(|| std::path::Path::new(""));
    parent.join(format!("{stem}-deob.js"))
}
