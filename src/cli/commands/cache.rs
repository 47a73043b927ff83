//! Cache command - inspect and maintain the rating cache

use crate::cache::{CacheEntry, FileStore, RatingCache};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::error::OverlayResult;
use crate::overlay::icon_name;
use crate::ui::{self, UiContext};
use chrono::Utc;
use console::style;
use std::sync::Arc;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> OverlayResult<()> {
    match args.action {
        CacheAction::List { format } => list_entries(&open(config).await, format),
        CacheAction::Prune => prune(&open(config).await).await,
        CacheAction::Clear { yes } => clear(&open(config).await, yes).await,
        CacheAction::Path => {
            println!("{}", ConfigManager::store_path(config).display());
            Ok(())
        }
    }
}

async fn open(config: &Config) -> RatingCache {
    let store = FileStore::new(ConfigManager::store_path(config));
    RatingCache::load(Arc::new(store), config.cache.ttl()).await
}

fn list_entries(cache: &RatingCache, format: OutputFormat) -> OverlayResult<()> {
    let entries = cache.entries();

    match format {
        OutputFormat::Table => print_table(cache, &entries),
        OutputFormat::Json => print_json(cache, &entries)?,
        OutputFormat::Plain => {
            for (id, entry) in &entries {
                println!("{} {}", id, entry.rating);
            }
        }
    }

    Ok(())
}

fn print_table(cache: &RatingCache, entries: &[(String, CacheEntry)]) {
    if entries.is_empty() {
        println!("No cached ratings.");
        return;
    }

    let now = Utc::now();
    println!(
        "{:<34} {:<10} {:<8} {:<18} {:<8}",
        "ITEM", "RATING", "ICON", "RESOLVED", "STATE"
    );
    println!("{}", "-".repeat(80));

    for (id, entry) in entries {
        let state = if entry.is_expired(cache.ttl(), now) {
            style("expired").yellow().to_string()
        } else {
            style("fresh").green().to_string()
        };

        println!(
            "{:<34} {:<10} {:<8} {:<18} {:<8}",
            id,
            entry.rating,
            icon_name(&entry.rating),
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            state
        );
    }

    println!();
    println!("Total: {} rating(s)", entries.len());
}

fn print_json(cache: &RatingCache, entries: &[(String, CacheEntry)]) -> OverlayResult<()> {
    #[derive(serde::Serialize)]
    struct EntryJson<'a> {
        id: &'a str,
        rating: &'a str,
        icon: String,
        resolved_at: String,
        expired: bool,
    }

    let now = Utc::now();
    let rows: Vec<EntryJson<'_>> = entries
        .iter()
        .map(|(id, entry)| EntryJson {
            id,
            rating: &entry.rating,
            icon: icon_name(&entry.rating),
            resolved_at: entry.timestamp.to_rfc3339(),
            expired: entry.is_expired(cache.ttl(), now),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

async fn prune(cache: &RatingCache) -> OverlayResult<()> {
    let ctx = UiContext::detect();
    let removed = cache.prune_and_persist().await?;

    ui::step_ok_detail(
        &ctx,
        &format!("Pruned {} expired rating(s)", removed),
        &format!("{} remaining", cache.len()),
    );
    Ok(())
}

async fn clear(cache: &RatingCache, yes: bool) -> OverlayResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);

    if cache.is_empty() {
        ui::step_info(&ctx, "Cache is already empty");
        return Ok(());
    }

    let prompt = format!("Remove {} cached rating(s)?", cache.len());
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::step_warn_hint(&ctx, "Cache left untouched", "Pass --yes to skip the prompt");
        return Ok(());
    }

    let removed = cache.clear().await?;
    ui::step_ok(&ctx, &format!("Removed {} cached rating(s)", removed));
    Ok(())
}
