//! `jam` - run, check, and build Jam scripts from the command line.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use jam_core::limits::ExecutionOptions;
use jam_core::value::Value;
use jam_engine::Engine;

#[derive(Parser)]
#[command(name = "jam", version, about = "The Jam scripting language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a script against a JSON data payload.
    Run {
        /// Script file (`.jam` source or `.jamc` artifact).
        script: PathBuf,
        /// JSON file providing the `data` value; defaults to `{}`.
        #[arg(long)]
        data: Option<PathBuf>,
        /// Inline JSON for the `data` value (overrides --data).
        #[arg(long)]
        json: Option<String>,
        #[command(flatten)]
        limits: LimitArgs,
    },
    /// Compile a script and report diagnostics without executing it.
    Check {
        script: PathBuf,
    },
    /// Compile a script into a precompiled `.jamc` artifact.
    Build {
        script: PathBuf,
        /// Output path; defaults to the script path with a `.jamc`
        /// extension.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct LimitArgs {
    /// Ceiling on accounted statements.
    #[arg(long)]
    max_statements: Option<u64>,
    /// Ceiling on cumulative loop iterations.
    #[arg(long)]
    max_loop_iterations: Option<u64>,
    /// Ceiling on call depth.
    #[arg(long)]
    max_call_depth: Option<u32>,
    /// Wall-clock budget in milliseconds.
    #[arg(long)]
    max_execution_ms: Option<u64>,
}

impl LimitArgs {
    fn into_options(self) -> ExecutionOptions {
        ExecutionOptions {
            max_statements: self.max_statements,
            max_loop_iterations: self.max_loop_iterations,
            max_call_depth: self.max_call_depth,
            max_execution_time: self.max_execution_ms.map(Duration::from_millis),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Run {
            script,
            data,
            json,
            limits,
        } => {
            let engine = Engine::new().with_options(limits.into_options());
            let compiled = compile(&engine, &script)?;
            let compiled = match compiled {
                Ok(compiled) => compiled,
                Err(code) => return Ok(code),
            };

            let payload = match (json, data) {
                (Some(inline), _) => inline,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => "{}".to_string(),
            };
            let value = Value::parse_json(&payload)
                .map_err(|e| anyhow::anyhow!("invalid data JSON: {e}"))?;

            let report = engine.execute(&compiled, value);
            for diagnostic in &report.diagnostics {
                eprintln!("{diagnostic}");
            }
            if let Some(message) = &report.completion_message {
                eprintln!("completion: {message}");
            }
            match report.value {
                Some(value) => {
                    let json = value
                        .to_json()
                        .map_err(|e| anyhow::anyhow!("result not representable as JSON: {e}"))?;
                    println!("{}", serde_json_pretty(&json));
                    Ok(ExitCode::SUCCESS)
                }
                None => Ok(ExitCode::FAILURE),
            }
        }
        Command::Check { script } => {
            let engine = Engine::new();
            match compile(&engine, &script)? {
                Ok(compiled) => {
                    for warning in &compiled.warnings {
                        eprintln!("{warning}");
                    }
                    eprintln!("ok: {}", script.display());
                    Ok(ExitCode::SUCCESS)
                }
                Err(code) => Ok(code),
            }
        }
        Command::Build { script, output } => {
            let engine = Engine::new();
            let source = std::fs::read_to_string(&script)
                .with_context(|| format!("reading {}", script.display()))?;
            let name = script
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned());
            match engine.compile_to_artifact(&source, name) {
                Ok(bytes) => {
                    let output = output.unwrap_or_else(|| script.with_extension("jamc"));
                    std::fs::write(&output, bytes)
                        .with_context(|| format!("writing {}", output.display()))?;
                    eprintln!("wrote {}", output.display());
                    Ok(ExitCode::SUCCESS)
                }
                Err(diagnostics) => {
                    for diagnostic in &diagnostics {
                        eprintln!("{diagnostic}");
                    }
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

/// Compile a `.jam` source file or load a `.jamc` artifact, printing
/// diagnostics on failure.
fn compile(
    engine: &Engine,
    script: &PathBuf,
) -> Result<std::result::Result<jam_engine::CompiledScript, ExitCode>> {
    let result = if script.extension().is_some_and(|ext| ext == "jamc") {
        let bytes =
            std::fs::read(script).with_context(|| format!("reading {}", script.display()))?;
        engine.compile_from_artifact(&bytes)
    } else {
        let source = std::fs::read_to_string(script)
            .with_context(|| format!("reading {}", script.display()))?;
        engine.compile(&source)
    };
    match result {
        Ok(compiled) => Ok(Ok(compiled)),
        Err(diagnostics) => {
            for diagnostic in &diagnostics {
                eprintln!("{diagnostic}");
            }
            Ok(Err(ExitCode::FAILURE))
        }
    }
}

fn serde_json_pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
