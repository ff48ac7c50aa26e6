//! Terminal front end.
//!
//! [`CodeDisplay`] is what the refresh driver hands its output to.
//! [`TerminalDisplay`] writes codes, QR art and the countdown to any
//! `io::Write`, and keeps the most recent status reports. It can also keep
//! an SVG file of the current code up to date.

use std::{
    io::{self, Write},
    path::PathBuf,
};

use rotor_core::{
    GeneratedCode,
    generator::WindowNotice,
    render::{CodeRenderer, RenderOptions},
    report::{RecentLog, Report, StatusSink},
    scheduler::Countdown,
};

use crate::renderer::{SvgRenderer, TerminalRenderer};

const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Receives the refresh driver's output.
pub trait CodeDisplay {
    /// Show a freshly generated code.
    fn show_code(&mut self, code: &GeneratedCode) -> io::Result<()>;

    /// Update the countdown.
    fn show_countdown(&mut self, countdown: Countdown) -> io::Result<()>;

    /// A new window started.
    fn show_notice(&mut self, notice: &WindowNotice) -> io::Result<()>;
}

/// Writes to a terminal.
#[derive(Debug)]
pub struct TerminalDisplay<W> {
    out: W,
    options: RenderOptions,
    show_qr: bool,
    color: bool,
    mid_line: bool,
    svg_file: Option<PathBuf>,
    log: RecentLog,
}

impl<W: Write> TerminalDisplay<W> {
    /// Create a display writing to `out`.
    pub fn new(out: W, options: RenderOptions) -> Self {
        Self {
            out,
            options,
            show_qr: true,
            color: true,
            mid_line: false,
            svg_file: None,
            log: RecentLog::default(),
        }
    }

    /// Print the code string only, without QR art.
    #[must_use]
    pub fn without_qr(mut self) -> Self {
        self.show_qr = false;
        self
    }

    /// Disable ANSI colors.
    #[must_use]
    pub fn without_color(mut self) -> Self {
        self.color = false;
        self
    }

    /// Rewrite `path` with an SVG symbol of every new code.
    #[must_use]
    pub fn with_svg_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.svg_file = Some(path.into());
        self
    }

    /// Retained status reports, most recent first.
    pub fn log(&self) -> &RecentLog {
        &self.log
    }

    /// The underlying writer.
    pub fn writer(&self) -> &W {
        &self.out
    }
}

impl<W: Write> CodeDisplay for TerminalDisplay<W> {
    fn show_code(&mut self, code: &GeneratedCode) -> io::Result<()> {
        if std::mem::take(&mut self.mid_line) {
            writeln!(self.out)?;
        }
        if self.show_qr {
            match TerminalRenderer.render(&code.code, &self.options) {
                Ok(art) => writeln!(self.out, "{art}")?,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to render QR symbol");
                    self.log.report(&Report::warning(e.to_string()));
                },
            }
        }
        if let Some(path) = &self.svg_file {
            match SvgRenderer.render(&code.code, &self.options) {
                Ok(svg) => std::fs::write(path, svg)?,
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "failed to render SVG");
                    self.log.report(&Report::warning(e.to_string()));
                },
            }
        }
        writeln!(self.out, "{}", code.code)?;
        writeln!(self.out, "window {} ({:?})", code.window.boundary_secs, code.mode)?;
        self.out.flush()
    }

    fn show_countdown(&mut self, countdown: Countdown) -> io::Result<()> {
        let text = countdown.to_string();
        if self.color && countdown.urgent {
            write!(self.out, "\r{RED}{text:>6}{RESET}")?;
        } else {
            write!(self.out, "\r{text:>6}")?;
        }
        self.mid_line = true;
        self.out.flush()
    }

    fn show_notice(&mut self, notice: &WindowNotice) -> io::Result<()> {
        self.log.report(&Report::info(notice.to_string()));
        Ok(())
    }
}

impl<W> StatusSink for TerminalDisplay<W> {
    fn report(&mut self, report: &Report) {
        self.log.report(report);
    }
}
