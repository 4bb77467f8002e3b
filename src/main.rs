//! OCR Relay - Main entry point
//!
//! This binary runs the relay as a long-lived background process: it
//! validates the configuration, starts the subscriber server and the
//! source poll loop, and runs until killed.

use ocr_relay::{
    BroadcastServer, CommandRecognizer, Config, Pipeline, Recognizer, ResultSink, SinkTarget,
    SourceMode, SubscriberRegistry, Watcher,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting OCR relay");

    // Load configuration and fail fast on invalid source/sink values
    let config = Config::load();
    let mode = SourceMode::parse(&config.source)?;
    let target = SinkTarget::parse(&config.sink)?;
    info!("source: {:?}, sink: {}", config.source, target.as_str());

    let registry = Arc::new(SubscriberRegistry::new());
    let server = BroadcastServer::bind(&config.broadcast_addr, Arc::clone(&registry)).await?;

    let binary_path = config
        .ocr_binary
        .clone()
        .unwrap_or_else(CommandRecognizer::default_binary_path);
    let recognizer: Arc<dyn Recognizer> = Arc::new(CommandRecognizer::new(binary_path));

    let sink = ResultSink::new(target, Arc::clone(&registry));
    let pipeline = Arc::new(Pipeline::new(recognizer, sink));
    let watcher = Watcher::new(mode, config.delay(), config.verbose, pipeline);

    tokio::select! {
        result = watcher.run() => {
            if let Err(e) = result {
                error!("watcher error: {}", e);
                return Err(e.into());
            }
        }
        result = server.run() => {
            if let Err(e) = result {
                error!("broadcast server error: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    Ok(())
}
