use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::loop_worker::{input_loop, InputEngine};

/// Owns the input loop task: one running loop at a time, cancelled and
/// joined on stop.
pub struct InputController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl InputController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn start(&mut self, engine: InputEngine, sample_interval_ms: u64) -> Result<()> {
        if self.handle.is_some() {
            bail!("input loop already active");
        }

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        let handle = tokio::spawn(input_loop(engine, sample_interval_ms, token_clone));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("input loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for InputController {
    fn default() -> Self {
        Self::new()
    }
}
