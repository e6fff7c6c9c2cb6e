use mail_relay::config::{RelayConfig, ServerConfig};
use mail_relay::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let relay_config = RelayConfig::from_env();
    let server_config = ServerConfig::from_env()?;

    eprintln!("📧 Mail relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   API endpoint: {}",
        relay_config.endpoint().unwrap_or("(not configured)")
    );
    eprintln!(
        "   API token: {}",
        if relay_config.token_configured() {
            "configured"
        } else {
            "(not configured)"
        }
    );
    eprintln!(
        "   Inbound: http://{}/inbound (max {} bytes)",
        server_config.bind, server_config.max_message_bytes
    );
    eprintln!("   Status:  http://{}/health\n", server_config.bind);

    if relay_config.require().is_err() {
        tracing::warn!("Relay is not fully configured; every message will be rejected");
    }

    let state = AppState::from_config(relay_config, &server_config);
    server::serve(state, server_config.bind).await?;

    Ok(())
}
