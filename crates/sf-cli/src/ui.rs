//! Terminal presentation preferences, resolved once at startup.
//!
//! Upload bars and the classification spinner draw on stderr; tables and
//! JSON go to stdout. Each stream is checked on its own so `sfw simulate >
//! summary.json` still shows progress while the file stays clean.

use std::io::IsTerminal;
use std::sync::OnceLock;

use crate::cli::{GlobalFlags, OutputFormat};

/// Narrowest `COLUMNS` value honored when fitting step and file tables.
const MIN_TABLE_WIDTH: usize = 40;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UiPrefs {
    /// Color sync statuses and step names in table output.
    pub table_color: bool,
    /// Draw upload and job progress on stderr.
    pub progress: bool,
    pub term_width: Option<usize>,
}

/// What the process can observe about its terminal.
#[derive(Clone, Debug, Default)]
struct Terminal {
    stdout_tty: bool,
    stderr_tty: bool,
    no_color: bool,
    columns: Option<String>,
}

impl Terminal {
    fn detect() -> Self {
        Self {
            stdout_tty: std::io::stdout().is_terminal(),
            stderr_tty: std::io::stderr().is_terminal(),
            no_color: std::env::var_os("NO_COLOR").is_some(),
            columns: std::env::var("COLUMNS").ok(),
        }
    }
}

impl UiPrefs {
    fn resolve(flags: &GlobalFlags, terminal: &Terminal) -> Self {
        Self {
            table_color: terminal.stdout_tty
                && flags.format == OutputFormat::Table
                && !flags.quiet
                && !terminal.no_color,
            progress: terminal.stderr_tty && !flags.quiet,
            term_width: terminal
                .columns
                .as_deref()
                .and_then(|value| value.trim().parse::<usize>().ok())
                .filter(|width| *width >= MIN_TABLE_WIDTH),
        }
    }
}

static UI_PREFS: OnceLock<UiPrefs> = OnceLock::new();

pub fn init(flags: &GlobalFlags) {
    let prefs = UiPrefs::resolve(flags, &Terminal::detect());
    tracing::debug!(?prefs, "ui preferences resolved");
    let _ = UI_PREFS.set(prefs);
}

/// Preferences from [`init`], or plain output if it never ran.
#[must_use]
pub fn prefs() -> UiPrefs {
    UI_PREFS.get().copied().unwrap_or_default()
}
