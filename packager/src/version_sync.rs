//! In-memory rewriting of `## Version:` and `## Interface:` lines.
//!
//! Add-on `.toc` files carry their release metadata as `## Key: value`
//! lines. [`synchronize`] rewrites the value of the first matching line for
//! each token, or appends a fresh line when the token is missing. It never
//! touches the filesystem, and applying it twice with the same inputs gives
//! the same text as applying it once.

use regex::{Captures, Regex};
use std::fmt;
use std::sync::OnceLock;

/// A recognized metadata line in a text asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionToken {
    /// `## Version: <release version>`
    Version,
    /// `## Interface: <game interface number>`
    Interface,
}

impl VersionToken {
    /// The keyword as written in a freshly appended line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Version => "Version",
            Self::Interface => "Interface",
        }
    }

    /// Case-insensitive, per-line matcher whose first group is the prefix.
    fn pattern(self) -> &'static Regex {
        static VERSION: OnceLock<Regex> = OnceLock::new();
        static INTERFACE: OnceLock<Regex> = OnceLock::new();
        match self {
            Self::Version => VERSION.get_or_init(|| compile_token_pattern(self)),
            Self::Interface => INTERFACE.get_or_init(|| compile_token_pattern(self)),
        }
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "## {}:", self.name())
    }
}

#[expect(
    clippy::expect_used,
    reason = "the pattern is assembled from a fixed keyword and always compiles"
)]
fn compile_token_pattern(token: VersionToken) -> Regex {
    // `[^\r\n]*` keeps CRLF endings intact; horizontal whitespace only so an
    // empty value never swallows the following line.
    Regex::new(&format!(r"(?im)^(##[ \t]*{}:[ \t]*)[^\r\n]*", token.name()))
        .expect("token pattern compiles")
}

/// A token was missing and a synthetic line was appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingTokenWarning {
    /// The token that was absent.
    pub token: VersionToken,
}

impl fmt::Display for MissingTokenWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no `{}` line found; appended one", self.token)
    }
}

/// Result of synchronizing one text asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// The rewritten text.
    pub content: String,
    /// Tokens that had to be appended.
    pub warnings: Vec<MissingTokenWarning>,
}

/// Rewrite the version (and optionally interface) lines in `content`.
///
/// Only the first matching line per token is rewritten; later duplicates
/// are left as they are. The `## Version:` prefix, including its original
/// casing and spacing, is preserved verbatim.
///
/// # Examples
///
/// ```
/// use addon_packager::version_sync::synchronize;
///
/// let toc = "## Title: CommandSage\n## Version: 0.1.0\n";
/// let outcome = synchronize(toc, "2.3.4", None);
/// assert_eq!(outcome.content, "## Title: CommandSage\n## Version: 2.3.4\n");
/// assert!(outcome.warnings.is_empty());
///
/// let again = synchronize(&outcome.content, "2.3.4", None);
/// assert_eq!(again.content, outcome.content);
/// ```
#[must_use]
pub fn synchronize(content: &str, version: &str, interface_version: Option<&str>) -> SyncOutcome {
    let mut warnings = Vec::new();
    let mut text = apply_token(content, VersionToken::Version, version, &mut warnings);
    if let Some(interface) = interface_version {
        text = apply_token(&text, VersionToken::Interface, interface, &mut warnings);
    }
    SyncOutcome {
        content: text,
        warnings,
    }
}

fn apply_token(
    content: &str,
    token: VersionToken,
    value: &str,
    warnings: &mut Vec<MissingTokenWarning>,
) -> String {
    let pattern = token.pattern();
    if pattern.is_match(content) {
        return pattern
            .replacen(content, 1, |caps: &Captures<'_>| {
                let prefix = caps.get(1).map_or("", |m| m.as_str());
                format!("{prefix}{value}")
            })
            .into_owned();
    }

    warnings.push(MissingTokenWarning { token });
    format!("{content}\n## {}: {value}\n", token.name())
}
