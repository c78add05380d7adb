// SPDX-License-Identifier: MIT
//
// ked: a single-line editor driven straight over the terminal device.
//
// This binary wires the two crates together:
//
//   ked-term   → tty device, raw mode guard, escape channel, geometry probe
//   ked-editor → key decoding, line buffer, screen, editor loop
//
// The terminal is opened as /dev/tty, not through stdin/stdout. That
// leaves stdout free: when the session ends with the quit key, the
// terminal is restored first and only then is the edited line printed
// there, so `ked > out.txt` captures what was typed.
//
// Logging never goes to the terminal being drawn on. It is off unless
// `--log-file` names a file; `KED_LOG` sets the filter (default `info`).
//
// Exit status: 0 after a quit or a terminating signal, 1 after any error,
// which is printed to stderr as `ked: <error>` once the terminal has been
// put back.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, anyhow};
use clap::{Parser, ValueEnum};
use ked_editor::{Editor, EditorConfig, Key};
use ked_term::device::DEFAULT_DEVICE;
use ked_term::signals::SignalFlags;
use ked_term::{GeometryStrategy, ReadPolicy, TerminalDevice};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "KED_LOG";

// ─── Command line ────────────────────────────────────────────────────────────

/// Edit one line of text on the controlling terminal.
///
/// The finished line is printed to stdout on quit.
#[derive(Debug, Parser)]
#[command(name = "ked", version, about)]
struct Cli {
    /// Terminal device to drive.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DEVICE)]
    device: PathBuf,

    /// Read timeout in tenths of a second.
    #[arg(
        long,
        value_name = "DECISECONDS",
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(1..=255)
    )]
    timeout: u8,

    /// Key that ends the session: a character, ctrl-<letter> or ^<letter>.
    #[arg(long, value_name = "KEY", default_value = "ctrl-q")]
    quit_key: Key,

    /// How to find the screen size.
    #[arg(long, value_enum, default_value_t = GeometryArg::WindowSize)]
    geometry: GeometryArg,

    /// Status line text (defaults to a short help message).
    #[arg(long, value_name = "TEXT")]
    status: Option<String>,

    /// Write logs to this file.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GeometryArg {
    /// Park the cursor in the far corner and ask where it went.
    Probe,
    /// Ask the OS for the window size; probe if that fails.
    WindowSize,
}

impl From<GeometryArg> for GeometryStrategy {
    fn from(arg: GeometryArg) -> Self {
        match arg {
            GeometryArg::Probe => Self::Probe,
            GeometryArg::WindowSize => Self::WindowSizeFirst,
        }
    }
}

impl Cli {
    fn editor_config(&self) -> EditorConfig {
        EditorConfig {
            quit_key: self.quit_key,
            read_policy: ReadPolicy::polling(self.timeout),
            geometry: self.geometry.into(),
            status: self.status.clone(),
        }
    }
}

// ─── Entry point ─────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(path) = &cli.log_file {
        if let Err(e) = init_logging(path) {
            eprintln!("ked: {e:#}");
            return ExitCode::FAILURE;
        }
    }

    match run(&cli) {
        Ok(line) => {
            if !line.is_empty() {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "session failed");
            eprintln!("ked: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Run one session and hand back the edited line.
///
/// Every error path has already restored the terminal by the time it
/// reaches the caller.
fn run(cli: &Cli) -> anyhow::Result<String> {
    let signals = SignalFlags::install().context("cannot install signal handlers")?;

    let mut tty = TerminalDevice::open_path(&cli.device)?;

    let mut editor = Editor::new(cli.editor_config()).with_signals(signals);
    editor.run(&mut tty).context("editor session failed")?;

    Ok(editor.into_buffer().into_string())
}

fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("cannot install logger: {e}"))?;

    info!(version = env!("CARGO_PKG_VERSION"), "ked starting");
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("ked").chain(args.iter().copied()))
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]).unwrap();
        assert_eq!(cli.device, PathBuf::from("/dev/tty"));
        assert_eq!(cli.timeout, 1);
        assert_eq!(cli.quit_key, Key::Ctrl('q'));
        assert_eq!(cli.geometry, GeometryArg::WindowSize);
        assert_eq!(cli.status, None);
        assert_eq!(cli.log_file, None);
        assert_eq!(cli.editor_config(), EditorConfig::default());
    }

    #[test]
    fn all_flags() {
        let cli = parse(&[
            "--device",
            "/dev/pts/3",
            "--timeout",
            "5",
            "--quit-key",
            "q",
            "--geometry",
            "probe",
            "--status",
            "hello",
            "--log-file",
            "/tmp/ked.log",
        ])
        .unwrap();

        let config = cli.editor_config();
        assert_eq!(cli.device, PathBuf::from("/dev/pts/3"));
        assert_eq!(config.quit_key, Key::Char('q'));
        assert_eq!(config.read_policy, ReadPolicy::polling(5));
        assert_eq!(config.geometry, GeometryStrategy::Probe);
        assert_eq!(config.status.as_deref(), Some("hello"));
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/ked.log")));
    }

    #[test]
    fn caret_quit_key() {
        assert_eq!(parse(&["--quit-key", "^x"]).unwrap().quit_key, Key::Ctrl('x'));
    }

    #[test]
    fn bad_quit_key_is_rejected() {
        assert!(parse(&["--quit-key", "ctrl-"]).is_err());
    }

    #[test]
    fn timeout_range() {
        assert!(parse(&["--timeout", "0"]).is_err());
        assert!(parse(&["--timeout", "256"]).is_err());
        assert_eq!(parse(&["--timeout", "255"]).unwrap().timeout, 255);
    }

    #[test]
    fn unknown_geometry_is_rejected() {
        assert!(parse(&["--geometry", "guess"]).is_err());
    }

    #[test]
    fn missing_device_is_an_error() {
        let cli = parse(&["--device", "/nonexistent/ked-tty"]).unwrap();
        let err = run(&cli).unwrap_err();
        assert!(
            matches!(
                err.downcast_ref::<ked_term::Error>(),
                Some(ked_term::Error::DeviceUnavailable { .. })
            ),
            "{err:#}"
        );
    }
}
