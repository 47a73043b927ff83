//! Confirmation prompt

use super::context::UiContext;
use crate::error::{OverlayError, OverlayResult};

/// Ask for confirmation
///
/// Returns `true` under auto-yes and `default` when not interactive.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> OverlayResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(default);
    }

    let message = message.to_string();
    tokio::task::spawn_blocking(move || cliclack::confirm(&message).initial_value(default).interact())
        .await
        .map_err(|e| OverlayError::Internal(format!("prompt task failed: {}", e)))?
        .map_err(|e| OverlayError::io("reading confirmation", e))
}
