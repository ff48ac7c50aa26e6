//! Command line and environment configuration.

use std::{fmt, path::PathBuf, time::Duration};

use clap::Parser;
use rotor_core::{
    GeneratorConfig, SessionConfig, WindowMode,
    error::ConfigError,
    render::RenderOptions,
    scheduler::SchedulerConfig,
    session::StartRequest,
    token::DEFAULT_STATIC_KEY,
    window::RefreshInterval,
};

/// Rotor - rotating one-time codes from a DDP account
#[derive(Parser, Clone)]
#[command(name = "rotor")]
#[command(about = "Fetch seed material over DDP and display rotating one-time codes")]
pub struct Args {
    /// DDP WebSocket endpoint (ws:// or wss://)
    #[arg(long, env = "ROTOR_ENDPOINT")]
    pub endpoint: String,

    /// Bearer token used for every login attempt
    #[arg(long, env = "ROTOR_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Length of one code window in seconds
    #[arg(long, env = "ROTOR_INTERVAL_SECS", default_value_t = 10)]
    pub interval_secs: u64,

    /// Static key mixed into every digest
    #[arg(long, env = "ROTOR_STATIC_KEY", default_value = DEFAULT_STATIC_KEY)]
    pub static_key: String,

    /// Show the upcoming window's code instead of the current one
    #[arg(long)]
    pub next_window: bool,

    /// Print one code and exit
    #[arg(long)]
    pub once: bool,

    /// Print the code string without QR art
    #[arg(long)]
    pub no_qr: bool,

    /// Disable ANSI colors in the countdown
    #[arg(long)]
    pub no_color: bool,

    /// Keep an SVG symbol of the current code at this path
    #[arg(long, value_name = "PATH")]
    pub svg: Option<PathBuf>,

    /// Minimum SVG width and height in pixels
    #[arg(long, default_value_t = 300)]
    pub qr_size: u32,

    /// SVG dark module color
    #[arg(long, default_value = "#000000")]
    pub foreground: String,

    /// SVG light module color
    #[arg(long, default_value = "#FFFFFF")]
    pub background: String,

    /// Milliseconds between staggered login attempts
    #[arg(long, env = "ROTOR_LOGIN_STAGGER_MS", default_value_t = 1000)]
    pub login_stagger_ms: u64,

    /// Skip the repair call issued right after login
    #[arg(long)]
    pub no_repair: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "ROTOR_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("endpoint", &self.endpoint)
            .field("token", &format_args!("<redacted {} bytes>", self.token.len()))
            .field("interval_secs", &self.interval_secs)
            .field("static_key", &self.static_key)
            .field("next_window", &self.next_window)
            .field("once", &self.once)
            .field("no_qr", &self.no_qr)
            .field("no_color", &self.no_color)
            .field("svg", &self.svg)
            .field("qr_size", &self.qr_size)
            .field("foreground", &self.foreground)
            .field("background", &self.background)
            .field("login_stagger_ms", &self.login_stagger_ms)
            .field("no_repair", &self.no_repair)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Args {
    /// Endpoint and token as a session start request.
    pub fn start_request(&self) -> StartRequest {
        StartRequest::new(self.endpoint.clone(), self.token.clone())
    }

    /// Session configuration with the CLI overrides applied.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            login_stagger: Duration::from_millis(self.login_stagger_ms),
            repair_on_login: !self.no_repair,
            ..SessionConfig::default()
        }
    }

    /// Generator configuration.
    ///
    /// # Errors
    ///
    /// `ZeroInterval` if `--interval-secs 0` was given.
    pub fn generator_config(&self) -> Result<GeneratorConfig, ConfigError> {
        Ok(GeneratorConfig {
            static_key: self.static_key.clone(),
            interval: RefreshInterval::from_secs(self.interval_secs)?,
        })
    }

    /// Window the displayed codes are taken from.
    pub fn window_mode(&self) -> WindowMode {
        if self.next_window { WindowMode::Next } else { WindowMode::Current }
    }

    /// Scheduler configuration.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig { mode: self.window_mode(), ..SchedulerConfig::default() }
    }

    /// Renderer options. Size and colors only affect the SVG output.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            width: self.qr_size,
            height: self.qr_size,
            foreground: self.foreground.clone(),
            background: self.background.clone(),
            ..RenderOptions::default()
        }
    }
}
