//! Progress bar and log output coordination.
//!
//! Log lines are routed through the shared [`MultiProgress`] so they print
//! above an active bar instead of tearing it. When stderr is not a terminal
//! the progress target is hidden and lines go straight to stderr.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::ops::Deref;
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static MULTI_PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

fn multi_progress() -> &'static MultiProgress {
    MULTI_PROGRESS.get_or_init(|| {
        let mp = MultiProgress::new();
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        mp
    })
}

/// Bar counting documents through one sync phase. Cleared when dropped, so
/// an early return does not leave it on screen.
pub struct PhaseProgress {
    bar: ProgressBar,
}

impl Deref for PhaseProgress {
    type Target = ProgressBar;

    fn deref(&self) -> &ProgressBar {
        &self.bar
    }
}

impl Drop for PhaseProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

pub fn phase_progress(len: u64, phase: &str) -> PhaseProgress {
    let bar = multi_progress().add(ProgressBar::new(len));
    if let Ok(style) = ProgressStyle::with_template("{prefix:>12} [{bar:30}] {pos}/{len} {msg}") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_prefix(phase.to_string());
    PhaseProgress { bar }
}

/// Print one log line above the bars, or to `fallback` when the bars are hidden
fn emit_line<W: Write>(progress: &MultiProgress, fallback: &mut W, line: &str) {
    let line = line.trim_end_matches('\r');
    if progress.is_hidden() || progress.println(line).is_err() {
        let _ = writeln!(fallback, "{}", line);
    }
}

/// `MakeWriter` for the fmt layer that prints through the progress bars
#[derive(Default, Clone)]
pub struct LogWriterFactory;

/// Buffers a log event and emits it line by line
pub struct LogWriter {
    buffer: String,
}

impl LogWriter {
    fn emit(line: &str) {
        emit_line(multi_progress(), &mut io::stderr().lock(), line);
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.push_str(&String::from_utf8_lossy(buf));

        while let Some(idx) = self.buffer.find('\n') {
            Self::emit(&self.buffer[..idx]);
            self.buffer.drain(..=idx);
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            Self::emit(&self.buffer);
            self.buffer.clear();
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            buffer: String::new(),
        }
    }
}
