//! CLI argument definitions for the add-on packager.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Default output directory, relative to the project root.
pub const DEFAULT_OUTPUT_DIR: &str = "dist";

/// Default upload timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Package and publish an add-on release.
#[derive(Parser, Debug)]
#[command(name = "addon-packager")]
#[command(version, about)]
#[command(long_about = concat!(
    "Package and publish an add-on release.\n\n",
    "Walks the project tree, stamps `## Version:` (and optionally ",
    "`## Interface:`) into .toc files, generates manifest.json from ",
    "manifest.template.json when present, and writes ",
    "dist/<ProjectName>-<version>.zip. The release command also uploads the ",
    "archive with its release metadata.",
))]
#[command(after_help = concat!(
    "ENVIRONMENT:\n",
    "  ADDON_VERSION          Release version; takes precedence over -o/--output\n",
    "  INTERFACE_VERSION      Value for ## Interface: lines\n",
    "  GAME_VERSIONS          Comma-separated game versions [default: 1.19.2]\n",
    "  CURSEFORGE_EXCLUDES    Comma-separated extra relative paths to exclude\n",
    "  CURSEFORGE_PROJECT_ID  Project to upload to (release only)\n",
    "  CURSEFORGE_TOKEN       API token (release only)\n",
    "  CURSEFORGE_API_URL     API base URL [default: https://api.curseforge.com/v1]\n",
    "  ADDON_PROJECT_NAME     Archive and display name prefix [default: CommandSage]\n",
    "  RELEASE_TYPE           alpha, beta, or release [default: release]\n",
    "  ALLOWED_EXTENSIONS     Comma-separated extensions eligible for packaging\n",
    "  CHANGELOG              Changelog text; overrides CHANGELOG.md\n\n",
    "EXAMPLES:\n",
    "  Preview the archive contents:\n",
    "    $ addon-packager build --dry-run\n\n",
    "  Run only the tests whose names match \"parser\":\n",
    "    $ addon-packager test -g parser\n\n",
    "  Build version 1.2.3:\n",
    "    $ addon-packager build -o 1.2.3\n\n",
    "  Lint, test, build, and upload:\n",
    "    $ addon-packager release -o 1.2.3",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct GlobalArgs {
    /// Project root to package [default: current directory].
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<Utf8PathBuf>,

    /// Archive output directory [default: <root>/dist].
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<Utf8PathBuf>,

    /// Upload timeout in seconds.
    #[arg(long, global = true, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        global = true,
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only report errors.
    #[arg(short, long, global = true, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self {
            root: None,
            output_dir: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            verbosity: 0,
            quiet: false,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Build the release archive.
    Build(BuildArgs),

    /// Lint, test, build, and upload a release.
    Release(ReleaseArgs),

    /// Lint, test, then build.
    Ci,

    /// Run luacheck over the project.
    Lint,

    /// Run the busted test suite.
    Test(TestArgs),

    /// Remove the output directory.
    Clean,
}

/// Arguments for the build command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildArgs {
    /// List the files that would be packaged without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Release version, used when ADDON_VERSION is unset.
    #[arg(short = 'o', long = "output", value_name = "VERSION")]
    pub version: Option<String>,
}

/// Arguments for the release command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseArgs {
    /// Release version, used when ADDON_VERSION is unset.
    #[arg(short = 'o', long = "output", value_name = "VERSION")]
    pub version: Option<String>,

    /// Skip luacheck and busted.
    #[arg(long)]
    pub skip_checks: bool,
}

/// Arguments for the test command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct TestArgs {
    /// Only run tests whose names match this pattern.
    #[arg(short = 'g', long, value_name = "PATTERN")]
    pub grep: Option<String>,
}

impl GlobalArgs {
    /// The `log` filter implied by `-v`/`-q`.
    ///
    /// # Examples
    ///
    /// ```
    /// use addon_packager::cli::GlobalArgs;
    ///
    /// let args = GlobalArgs { verbosity: 2, ..GlobalArgs::default() };
    /// assert_eq!(args.log_level(), log::LevelFilter::Trace);
    /// ```
    #[must_use]
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbosity {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
