use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use screen_recorder::audio::{self, DeviceKind};
use screen_recorder::config::DEFAULT_CONFIG_PATH;
use screen_recorder::{create_router, AppState, Config, RecordingController, StopResponse};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "screen-recorder")]
#[command(about = "Record the screen with microphone and system audio")]
struct Args {
    /// Config file (without extension)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP control API
    Serve,

    /// Record once and print the result
    Record {
        /// Seconds to record; Ctrl+C stops early
        #[arg(short, long, default_value = "10")]
        seconds: u64,

        /// Microphone device id (see `devices`)
        #[arg(short, long)]
        microphone: Option<String>,

        /// Also capture system audio
        #[arg(long)]
        system_audio: bool,
    },

    /// List audio devices
    Devices {
        /// `capture` or `playback`
        #[arg(short, long)]
        kind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    match args.command {
        Command::Serve => serve(cfg).await,
        Command::Record {
            seconds,
            microphone,
            system_audio,
        } => record(cfg, seconds, microphone, system_audio).await,
        Command::Devices { kind } => devices(kind),
    }
}

fn controller(cfg: &Config) -> Arc<RecordingController> {
    Arc::new(RecordingController::new(
        cfg.components(),
        cfg.controller_settings(),
        cfg.recording_config(),
    ))
}

async fn serve(cfg: Config) -> Result<()> {
    let addr = format!("{}:{}", cfg.http.bind, cfg.http.port);
    let state = AppState::new(controller(&cfg));
    let app = create_router(state.clone());

    info!("Screen recorder v{}", env!("CARGO_PKG_VERSION"));
    info!("Capture platform: {:?}", cfg.platform());
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    // Don't leave an encoder or device running behind
    if state.controller.state() == screen_recorder::SessionState::Recording {
        warn!("Shutting down with a recording in progress, finalizing it");
        let result = state.controller.stop().await;
        println!("{}", serde_json::to_string_pretty(&StopResponse::from_result(&result))?);
    }

    Ok(())
}

async fn record(
    cfg: Config,
    seconds: u64,
    microphone: Option<String>,
    system_audio: bool,
) -> Result<()> {
    let controller = controller(&cfg);

    let mut config = controller.config();
    if let Some(microphone) = microphone {
        config.microphone_id = microphone;
    }
    config.system_audio_enabled |= system_audio;

    controller
        .start(config)
        .await
        .context("Failed to start recording")?;

    info!(
        "Recording started! Press Ctrl+C to stop early, or wait {} seconds",
        seconds
    );

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = shutdown_signal() => info!("Interrupted, stopping"),
    }

    let result = controller.stop().await;
    println!("{}", serde_json::to_string_pretty(&StopResponse::from_result(&result))?);

    result.map(|_| ()).context("Recording failed")
}

fn devices(kind: Option<String>) -> Result<()> {
    let kind = match kind.as_deref() {
        None => None,
        Some("capture") => Some(DeviceKind::Capture),
        Some("playback") => Some(DeviceKind::Playback),
        Some(other) => anyhow::bail!("Unknown device kind: {} (capture|playback)", other),
    };

    let devices = audio::list_devices(kind)?;
    println!("{}", serde_json::to_string_pretty(&devices)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
