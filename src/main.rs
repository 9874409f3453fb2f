use statusboard::startup;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting statusboard");

    // Load configuration
    let config = startup::load_config().await?;

    // Start the board
    startup::start_board(config).await
}
