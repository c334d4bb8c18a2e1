use std::time::Duration;

use duel::DuelConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub duel: DuelConfig,
    /// Pending challenges older than this are cancelled by the sweeper.
    /// `None` disables expiry entirely.
    pub challenge_timeout: Option<Duration>,
    pub sweep_interval: Duration,
    pub sse_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            duel: DuelConfig::default(),
            challenge_timeout: None,
            sweep_interval: Duration::from_secs(10),
            sse_buffer: 64,
        }
    }
}
