use chess::Color;
use log::{debug, info, warn};

use super::{EngineClient, SearchLimits};
use crate::config::{EngineConfig, UciOption};
use crate::error::EngineError;
use crate::game::annotation::EngineReply;

/// One engine process for the whole run. Reconnecting the board never
/// restarts it.
pub struct EngineSession {
    client: Box<dyn EngineClient>,
    limits: SearchLimits,
    name: String,
    elo: String,
}

impl EngineSession {
    /// Start the engine, configure its options and wait until it is ready.
    ///
    /// Any failure before the engine answers `uciok`/`readyok` is fatal.
    /// Rejected options are only warned about.
    pub async fn start(
        mut client: Box<dyn EngineClient>,
        config: &EngineConfig,
        limits: SearchLimits,
    ) -> Result<Self, EngineError> {
        info!("Starting chess engine...");
        let id = client.initialize().await?;
        info!("Connected to {}", id.name);

        let name = match config.description.as_deref() {
            Some(description) if !description.is_empty() => {
                format!("{} {}", id.name, description)
            }
            _ => id.name.clone(),
        };
        let mut session = Self {
            client,
            limits,
            name,
            elo: config.elo.clone().unwrap_or_else(|| "?".to_string()),
        };

        for option in &config.options {
            session.configure_option(option).await?;
        }
        if let Some(depth) = limits.depth {
            info!("Loading move setting depth = {}", depth);
        }
        if let Some(nodes) = limits.nodes {
            info!("Loading move setting nodes = {}", nodes);
        }
        if let Some(movetime) = limits.movetime {
            info!("Loading move setting movetime = {}", movetime);
        }
        info!("Engine ready");
        Ok(session)
    }

    /// Send one `setoption`. A rejected option leaves the engine usable, so
    /// only a failing `isready` afterwards is an error.
    pub async fn configure_option(&mut self, option: &UciOption) -> Result<(), EngineError> {
        let value = option.value_string();
        info!("Loading option {} = {}", option.name, value);
        match self.client.set_option(&option.name, &value).await {
            Ok(()) => {}
            Err(EngineError::Command { command, reason }) => {
                warn!("setoption command failed: {} ({})", command, reason);
            }
            Err(e) => return Err(e),
        }
        self.client.is_ready().await
    }

    /// Sync the engine to `fen` and search it.
    pub async fn search(&mut self, fen: &str, human: Color) -> Result<EngineReply, EngineError> {
        self.client.position(fen).await?;
        let output = self.client.go(&self.limits).await?;
        debug!("{} info lines for {}", output.info.len(), output.best_move);
        Ok(EngineReply::from_search(output.best_move, &output.info, human))
    }

    /// Engine id name plus the configured description.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elo(&self) -> &str {
        &self.elo
    }

    pub async fn shutdown(&mut self) {
        if let Err(e) = self.client.quit().await {
            warn!("engine shutdown: {}", e);
        }
    }
}
