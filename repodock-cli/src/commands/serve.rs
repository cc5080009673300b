//! Serve command - run the admin HTTP API

use clap::Args;
use repodock_core::Config;
use repodock_server::{create_router, AppState};

use super::{shutdown_signal, Backends};

/// Run the admin HTTP API
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides config)
    #[arg(long, env = "REPODOCK_BIND_ADDR")]
    bind: Option<String>,
}

impl ServeArgs {
    pub async fn execute(&self, mut config: Config) -> anyhow::Result<()> {
        if let Some(bind) = &self.bind {
            config.server.bind_addr = bind.clone();
        }

        let backends = Backends::open(&config).await?;
        let state = AppState::new(backends.queue.clone(), backends.catalog.clone(), &config);
        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
            .await
            .map_err(|e| {
                anyhow::anyhow!("Failed to bind to {}: {}", config.server.bind_addr, e)
            })?;

        tracing::info!("Listening on {}", config.server.bind_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}
