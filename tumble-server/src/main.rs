use tumble_server::{setup_environment, Config, Server, ServerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (dotenv, logging)
    setup_environment();

    tracing::info!("🧺 Tumble server starting...");

    // 2. Configuration
    let config = Config::from_env();

    // 3. Server state (store, processor, notifier, lifecycle)
    let state = ServerState::initialize(&config);

    // 4. Serve until ctrl-c
    let server = Server::with_state(config, state);
    server.run().await
}
