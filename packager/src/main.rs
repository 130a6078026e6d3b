//! Add-on packager CLI entrypoint.
//!
//! This binary packages an add-on tree into a versioned ZIP archive and,
//! for releases, uploads it with its release metadata.

use addon_packager::artefact::upload::{HttpTransport, UploadClient};
use addon_packager::cli::{Cli, Command, DEFAULT_OUTPUT_DIR, GlobalArgs};
use addon_packager::config::ReleaseConfig;
use addon_packager::error::{PipelineError, Result};
use addon_packager::output::write_stderr_line;
use addon_packager::pipeline::{self, PipelineContext, ReleaseOptions};
use addon_packager::tools::SystemCommandExecutor;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use std::io::Write;
use std::time::Duration;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.global);
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Install the `env_logger` backend; `RUST_LOG` overrides `-v`/`-q`.
fn init_logging(global: &GlobalArgs) {
    env_logger::Builder::new()
        .filter_level(global.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let config = ReleaseConfig::from_env()?;
    let cwd = current_dir()?;
    let root = resolve_against(&cwd, cli.global.root.as_deref());
    let output_dir = cli
        .global
        .output_dir
        .as_deref()
        .map_or_else(|| root.join(DEFAULT_OUTPUT_DIR), |dir| resolve_against(&cwd, Some(dir)));

    let context = PipelineContext {
        root: &root,
        output_dir: &output_dir,
        config: &config,
        quiet: cli.global.quiet,
    };

    match &cli.command {
        Command::Build(args) => {
            pipeline::build(&context, args.version.as_deref(), args.dry_run, stderr)?;
        }
        Command::Release(args) => {
            let transport = HttpTransport::new(Duration::from_secs(cli.global.timeout));
            let client = UploadClient::new(transport, &config.api_url);
            let options = ReleaseOptions {
                version_override: args.version.as_deref(),
                skip_checks: args.skip_checks,
            };
            pipeline::release(&context, &SystemCommandExecutor, &client, options, stderr)?;
        }
        Command::Ci => {
            pipeline::ci(&context, &SystemCommandExecutor, stderr)?;
        }
        Command::Lint => {
            pipeline::lint(&context, &SystemCommandExecutor, stderr)?;
        }
        Command::Test(args) => {
            pipeline::test(&context, &SystemCommandExecutor, args.grep.as_deref(), stderr)?;
        }
        Command::Clean => {
            pipeline::clean(&context, stderr)?;
        }
    }
    Ok(())
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().map_err(PipelineError::WorkingDirectory)?;
    Utf8PathBuf::try_from(cwd).map_err(|err| PipelineError::NonUtf8Path {
        path: err.as_path().display().to_string(),
    })
}

/// Resolve an optional path flag against the working directory.
fn resolve_against(cwd: &Utf8Path, path: Option<&Utf8Path>) -> Utf8PathBuf {
    match path {
        Some(path) if path.is_absolute() => path.to_owned(),
        Some(path) => cwd.join(path),
        None => cwd.to_owned(),
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {}", error_chain(&err)));
            1
        }
    }
}

/// Render an error with its `source()` chain on one line.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}
