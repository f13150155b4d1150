//! Chat TTS - speak chat commands through the Azure speech service.
//!
//! Each `!tts <words>` line picks a voice from its first word (a reserved custom model,
//! a catalog voice, or the default voice) and speaks the rest through the speaker.

mod audio;
mod chat;
mod config;
mod speech;

use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

use audio::{AudioSink, NullSink, Player};
use chat::ConsoleChat;
use config::AppConfig;
use speech::{AzureSpeechClient, SpeechBackend, SynthesisDispatcher};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("🛑 Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        error!("Failed to register SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("🛑 Received SIGTERM, shutting down...");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let config = AppConfig::from_args();

    // Respect RUST_LOG env var, fallback to verbose flag, default to info
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| if config.verbose { EnvFilter::try_new("debug") } else { EnvFilter::try_new("info") })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(LocalTime::new(time::macros::format_description!("[hour]:[minute]:[second]")))
        .init();

    info!("🔊 Chat TTS v{}", env!("CARGO_PKG_VERSION"));

    let settings = config.settings();

    if let Err(e) = config.validate(&settings) {
        error!("❌ Configuration error: {}", e);
        std::process::exit(1);
    }

    config.log_config(&settings);

    let backend: Arc<dyn SpeechBackend> = Arc::new(AzureSpeechClient::new(&settings)?);

    let listing_only = config.list_voices || config.voice_info.is_some();
    let sink: Arc<dyn AudioSink> = if config.no_playback || listing_only { Arc::new(NullSink) } else { Arc::new(Player::new()?) };

    // Startup failures are fatal: without a token and a catalog there is nothing to serve
    let dispatcher = match SynthesisDispatcher::start(&settings, backend, sink).await {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            error!("❌ Speech backend initialization failed ({}): {}", e.kind(), e);
            std::process::exit(1);
        }
    };

    if config.list_voices {
        dispatcher.catalog().print_voices();
        return Ok(());
    }

    if let Some(ref selector) = config.voice_info {
        if let Err(e) = dispatcher.catalog().print_voice_info(selector) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    let chat = ConsoleChat::new(Arc::new(dispatcher), config.command_prefix.clone());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());

    info!("Ready. Type chat lines such as '{}tts george hello there'", config.command_prefix);

    tokio::select! {
        result = chat.run(stdin) => {
            let dispatched = result?;
            info!("Dispatched {} tts command(s)", dispatched);
        }
        _ = wait_for_shutdown() => {}
    }

    info!("✅ Chat TTS stopped");
    Ok(())
}
