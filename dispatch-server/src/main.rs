use dispatch_server::{Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Environment (dotenv, config, logging)
    let config = setup_environment()?;

    print_banner();

    tracing::info!(
        port = config.http_port,
        environment = %config.environment,
        "Dispatch server starting..."
    );

    // 2. State (opens the job database)
    let state = ServerState::initialize(&config)?;

    // 3. Serve until shutdown (Server::run starts background tasks)
    let server = Server::with_state(config, state);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
