//! rotor - fetch seed material over DDP and display rotating one-time codes

use std::io;

use anyhow::Context;
use clap::Parser;
use rotor_client::{
    Args, CodeDisplay, RefreshDriver, SessionDriver, SystemEnv, TerminalDisplay, WsTransport,
};
use rotor_core::{CodeGenerator, env::Environment, report::RecentLog, scheduler::RefreshScheduler};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let generator_config = args.generator_config().context("invalid generator configuration")?;

    let (mut driver, published) =
        SessionDriver::new(SystemEnv, WsTransport, args.session_config(), RecentLog::default());
    let request = args.start_request();
    let session = tokio::spawn(async move { driver.run(request).await });

    let credentials = match published.await {
        Ok(credentials) => credentials,
        Err(_) => {
            // The driver finished without publishing; its result says why.
            let outcome = session.await.context("session task panicked")?;
            return match outcome {
                Ok(_) => Err(anyhow::anyhow!("session ended without credentials")),
                Err(e) => Err(e).context("session failed"),
            };
        },
    };
    tracing::info!(identity = %credentials.identity, "credentials received");

    let mut generator = CodeGenerator::new(credentials, generator_config);
    let mut display = TerminalDisplay::new(io::stdout(), args.render_options());
    if args.no_qr {
        display = display.without_qr();
    }
    if args.no_color {
        display = display.without_color();
    }
    if let Some(path) = &args.svg {
        display = display.with_svg_file(path);
    }

    if args.once {
        let code = generator.generate_now(args.window_mode(), &SystemEnv).code;
        display.show_code(&code).context("failed to write code")?;
    } else {
        let scheduler = RefreshScheduler::new(generator, args.scheduler_config());
        let mut refresh = RefreshDriver::new(SystemEnv, scheduler, display);
        refresh
            .run_until(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "failed to listen for ctrl-c");
                }
            })
            .await
            .context("failed to write to terminal")?;
    }

    match session.await.context("session task panicked")? {
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::warn!(error = %e, "session ended with an error after publishing");
            Ok(())
        },
    }
}
