//! Resolve command - look up one item's rating through the cache and server

use crate::cache::FileStore;
use crate::cli::args::ResolveArgs;
use crate::config::{Config, ConfigManager};
use crate::context::OverlayContext;
use crate::error::{OverlayError, OverlayResult};
use crate::metadata::JellyfinClient;
use crate::overlay::Badge;
use crate::resolver::RatingResolver;
use crate::ui::{self, TaskSpinner, UiContext};
use std::sync::Arc;
use tracing::debug;

/// Execute the resolve command
pub async fn execute(args: ResolveArgs, config: &Config) -> OverlayResult<()> {
    let ui_ctx = UiContext::detect();
    let item_id = args.item_id.trim().to_lowercase();

    let store = Arc::new(FileStore::new(ConfigManager::store_path(config)));
    let ctx = Arc::new(OverlayContext::new(config.clone(), store).await);

    if !args.refresh {
        if let Some(entry) = ctx.cache().get(&item_id) {
            debug!("Cache hit for {}", item_id);
            print_rating(&ui_ctx, &item_id, &entry.rating, "cache");
            return Ok(());
        }
    }

    let user_id = args
        .user
        .or_else(|| config.server.user_id.clone())
        .filter(|id| !id.is_empty())
        .ok_or(OverlayError::NoUserSession)?;

    let client = JellyfinClient::new(&config.server, config.scheduler.request_timeout())?;
    let server = client.base_url().to_string();
    let resolver = RatingResolver::new(ctx.clone(), Arc::new(client));

    let mut spinner = TaskSpinner::new(&ui_ctx);
    spinner.start(&format!("Resolving {} via {}", item_id, server));

    match resolver.resolve(&user_id, &item_id).await {
        Some(rating) => {
            spinner.stop(&format!("Resolved {}", item_id));
            print_rating(&ui_ctx, &item_id, &rating, "server");
        }
        None => {
            spinner.stop_warn(&format!("No rating for {}", item_id));
            if ctx.backoff().state().error_count > 0 {
                ui::remark(&ui_ctx, "The lookup failed; rerun with -vv for details");
            }
        }
    }

    Ok(())
}

fn print_rating(ctx: &UiContext, item_id: &str, rating: &str, source: &str) {
    let badge = Badge::for_rating(rating);
    ui::key_value(ctx, "item", item_id);
    ui::key_value(ctx, "rating", rating);
    ui::key_value(ctx, "icon", &badge.icon);
    ui::key_value(ctx, "source", source);
}
