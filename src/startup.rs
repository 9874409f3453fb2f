use crate::board::Board;
use crate::components::{Calendar, Clock, ComponentManager, Weather};
use crate::config::Config;
use crate::error::Error;
use crate::shutdown;
use std::sync::Arc;
use tokio::sync::{oneshot, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=warn,reqwest=warn")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub async fn load_config() -> miette::Result<Arc<RwLock<Config>>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(RwLock::new(config))),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Start the components and the kiosk server, then wait for shutdown
pub async fn start_board(config: Arc<RwLock<Config>>) -> miette::Result<()> {
    let (tz, pixels_per_minute, bind) = {
        let config_read = config.read().await;
        crate::utils::i18n::set_locale(&config_read.board_locale);
        info!(
            "Timezone {}, locale {}",
            config_read.timezone, config_read.board_locale
        );
        (
            config_read.tz()?,
            config_read.pixels_per_minute,
            config_read.http_bind.clone(),
        )
    };

    let board = Board::new(tz, pixels_per_minute);

    // Initialize component manager
    let mut component_manager = ComponentManager::new(Arc::clone(&config));
    component_manager.register(Calendar::new());
    component_manager.register(Weather::new());
    component_manager.register(Clock::new());
    let component_manager = Arc::new(component_manager);

    component_manager.init_all(board.clone()).await?;

    // Create shutdown channel
    let (shutdown_send, shutdown_recv) = oneshot::channel();
    let shutdown_token = CancellationToken::new();

    // Spawn signal handler task
    {
        let components = Arc::clone(&component_manager);
        let board = board.clone();
        let token = shutdown_token.clone();
        tokio::spawn(async move {
            shutdown::handle_signals(shutdown_send, components, board, token).await;
        });
    }

    #[cfg(feature = "web-interface")]
    {
        let mut server_task = {
            let board = board.clone();
            let token = shutdown_token.clone();
            tokio::spawn(async move { crate::server::serve(&bind, board, token).await })
        };

        // Wait for either the server to end or a shutdown signal
        tokio::select! {
            result = &mut server_task => {
                info!("Web server ended");
                shutdown_token.cancel();
                component_manager.shutdown_all().await?;
                board.teardown().await;
                return match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e.into()),
                    Err(e) => Err(Error::Other(format!("Server task error: {}", e)).into()),
                };
            }
            _ = shutdown_recv => {
                info!("Received shutdown signal, stopping web server...");
                if let Err(e) = server_task.await {
                    error!("Server task error: {:?}", e);
                }
            }
        }
    }

    #[cfg(not(feature = "web-interface"))]
    {
        info!("Web interface disabled, not binding {}", bind);
        let _ = shutdown_recv.await;
    }

    info!("Shutdown complete");
    Ok(())
}
