use anyhow::Result;
use std::sync::{Arc, Mutex};
use tokio::signal;

use lib_stream::core::{StreamClient, Subscription};
use lib_stream::strategy::{OrderExecutor, PaperExecutor, StrategyContext};

mod bot_logic;
use bot_logic::{config, logger, trader};

#[tokio::main]
async fn main() -> Result<()> {
    // Explicitly install the default crypto provider for rustls
    let _ = rustls::crypto::ring::default_provider().install_default();

    // Set up environment variables
    dotenvy::dotenv().ok();

    let (config, notes) = config::load_config();
    logger::setup_logging("bot_meanrev", &config.log_dir(), config.log_level())?;
    for note in &notes {
        note.emit();
    }

    let params = config.strategy_params();
    log::info!("Launching multi-strategy {} bot (size {})", params.coin, params.size);

    let executor: Arc<dyn OrderExecutor> = Arc::new(PaperExecutor::new());
    let ctx = Arc::new(Mutex::new(StrategyContext::new(params)));

    let client = StreamClient::new(config.stream_config());
    client.subscribe(Subscription::AllMids, trader::all_mids_handler(ctx, executor));
    let mut supervisor = client.spawn()?;

    // Wait for shutdown signal, or for the supervisor to give up
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        log::info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        log::warn!("Cannot listen for SIGTERM: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
        result = &mut supervisor => {
            return match result? {
                Ok(()) => Ok(()),
                Err(e) => {
                    log::error!("Stream supervisor stopped: {}", e);
                    Err(e.into())
                }
            };
        }
    }

    client.shutdown();
    supervisor.await??;

    log::info!("Shutdown complete.");
    Ok(())
}
