//! Scan command - run the scheduler over a page snapshot
//!
//! The first scan, the listed scroll offsets, and any scripted page events
//! are replayed in order. Events go through the [`Watcher`], so navigations
//! and late renders take their usual settle and debounce delays.

use crate::cache::FileStore;
use crate::cli::args::{OutputFormat, ScanArgs};
use crate::config::{Config, ConfigManager};
use crate::context::OverlayContext;
use crate::error::{OverlayError, OverlayResult};
use crate::host::{self, HostPage, SnapshotPage};
use crate::metadata::{JellyfinClient, MetadataService, OfflineService};
use crate::resolver::RatingResolver;
use crate::scheduler::{ProcessOutcome, Scheduler};
use crate::ui::{self, UiContext};
use crate::watcher::Watcher;
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One badge placed on the page
#[derive(Debug, Serialize)]
struct OverlayRow {
    item_id: String,
    rating: String,
    icon: String,
    src: String,
    class: &'static str,
    style: &'static str,
}

/// Execute the scan command
pub async fn execute(args: ScanArgs, config: &Config) -> OverlayResult<()> {
    let ui_ctx = UiContext::detect();
    let human = matches!(args.format, OutputFormat::Table);

    let page = Arc::new(SnapshotPage::load(&args.snapshot).await?);
    info!(
        "Loaded snapshot {} ({} card(s))",
        args.snapshot.display(),
        page.cards().len()
    );

    let service: Arc<dyn MetadataService> = match config.server.url {
        Some(_) => Arc::new(JellyfinClient::new(
            &config.server,
            config.scheduler.request_timeout(),
        )?),
        None => {
            if human {
                ui::step_warn_hint(
                    &ui_ctx,
                    "No media server configured; only cached ratings will be shown",
                    "Set [server] url in the config file",
                );
            }
            Arc::new(OfflineService)
        }
    };
    if human && page.user_id().is_none() {
        ui::step_warn(&ui_ctx, "Snapshot has no user session; lookups are skipped");
    }

    let store = Arc::new(FileStore::new(ConfigManager::store_path(config)));
    let ctx = OverlayContext::init(config.clone(), store).await;
    let resolver = Arc::new(RatingResolver::new(ctx.clone(), service));
    let scheduler = Arc::new(Scheduler::new(ctx.clone(), resolver, page.clone())?);

    let mut outcomes = settle(scheduler.rescan()).await?;
    let steps = page.scroll_steps().to_vec();
    for top in steps {
        page.scroll_to(top);
        outcomes.extend(settle(scheduler.on_viewport_changed()).await?);
    }

    if !page.events().is_empty() {
        let watcher = Watcher::new(scheduler.clone());
        for event in page.events() {
            let event = page.replay(event);
            debug!("Replaying {:?}", event);
            watcher.handle(event);
            outcomes.extend(watcher.settled().await?);
        }
    }
    let deferred = scheduler.observer().len();
    ctx.teardown().await;

    let rows = overlays(&page);
    match args.format {
        OutputFormat::Table => {
            print_table(&ui_ctx, &rows);
            let resolved = outcomes
                .iter()
                .filter(|o| matches!(o, ProcessOutcome::Resolved(_)))
                .count();
            ui::step_ok_detail(
                &ui_ctx,
                &format!("{} overlay(s) applied", rows.len()),
                &format!("{} resolved, {} never scrolled into view", resolved, deferred),
            );
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Plain => {
            for row in &rows {
                println!("{} {}", row.item_id, row.rating);
            }
        }
    }

    Ok(())
}

async fn settle(tasks: Vec<JoinHandle<ProcessOutcome>>) -> OverlayResult<Vec<ProcessOutcome>> {
    join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.map_err(|e| OverlayError::Internal(format!("scan task failed: {}", e))))
        .collect()
}

fn overlays(page: &SnapshotPage) -> Vec<OverlayRow> {
    page.cards()
        .iter()
        .filter_map(|card| {
            let badge = card.badges().into_iter().next()?;
            Some(OverlayRow {
                item_id: host::item_id(card.as_ref()).unwrap_or_default(),
                src: badge.src(),
                class: badge.class(),
                style: badge.inline_style(),
                rating: badge.rating,
                icon: badge.icon,
            })
        })
        .collect()
}

fn print_table(ctx: &UiContext, rows: &[OverlayRow]) {
    if rows.is_empty() {
        ui::step_info(ctx, "No overlays applied");
        return;
    }

    ui::section(ctx, "Overlays");
    println!("{:<34} {:<10} {:<8}", "ITEM", "RATING", "ICON");
    println!("{}", "-".repeat(54));
    for row in rows {
        println!("{:<34} {:<10} {:<8}", row.item_id, row.rating, row.icon);
    }
    println!();
}
