//! Integration tests for rating-overlay

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};
    use tempfile::TempDir;

    const CACHED: &str = "0123456789abcdef0123456789abcdef";
    const UNCACHED: &str = "fedcba9876543210fedcba9876543210";
    const STALE: &str = "00000000000000000000000000000000";

    fn overlay() -> Command {
        cargo_bin_cmd!("rating-overlay")
    }

    fn now_millis() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis()
    }

    /// Config file pointing the cache at a store seeded with one fresh and
    /// one long-expired rating
    fn workspace() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let store = temp.path().join("store.json");
        let config = temp.path().join("config.toml");

        std::fs::write(
            &config,
            format!("[cache]\npath = '{}'\n", store.display()),
        )
        .unwrap();

        let payload = serde_json::json!({
            CACHED: {"rating": "R", "timestamp": now_millis() as u64},
            STALE: {"rating": "PG", "timestamp": 0},
        });
        let file = serde_json::json!({ "ageRatingOverlayCache-v1": payload.to_string() });
        std::fs::write(&store, file.to_string()).unwrap();

        (temp, config)
    }

    fn write_snapshot(dir: &Path) -> PathBuf {
        let card = |id: &str, top: u32| {
            serde_json::json!({
                "node": "a.cardImageContainer",
                "ancestors": ["div#reactRoot", "div.itemsContainer"],
                "href": format!("#/details?id={}&serverId=abc", id),
                "rect": {"top": top, "left": 0, "width": 200, "height": 300}
            })
        };
        let snapshot = serde_json::json!({
            "url": "https://media.local/web/#/movies",
            "user_id": null,
            "viewport": {"width": 1280, "height": 720},
            "cards": [card(CACHED, 0), card(UNCACHED, 320)],
        });

        let path = dir.join("page.json");
        std::fs::write(&path, snapshot.to_string()).unwrap();
        path
    }

    #[test]
    fn help_displays() {
        overlay()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("rating badges for media-server library cards"));
    }

    #[test]
    fn version_displays() {
        overlay()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("rating-overlay"));
    }

    #[test]
    fn badge_maps_us_tv_rating() {
        overlay()
            .args(["badge", "TV-MA"])
            .assert()
            .success()
            .stdout(predicate::str::contains("15.png"))
            .stdout(predicate::str::contains("/web/agerating/15.png"))
            .stdout(predicate::str::contains("age-rating-overlay"))
            .stdout(predicate::str::contains("pointer-events: none"));
    }

    #[test]
    fn badge_unknown_rating_falls_back() {
        overlay()
            .args(["badge", "XYZ"])
            .assert()
            .success()
            .stdout(predicate::str::contains("nr.png"));
    }

    #[test]
    fn config_path() {
        overlay()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let (_temp, config) = workspace();
        overlay()
            .arg("--config")
            .arg(&config)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[scheduler]"))
            .stdout(predicate::str::contains("max_concurrent_requests = 9"));
    }

    #[test]
    fn config_init_writes_defaults_once() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("nested").join("config.toml");

        overlay()
            .arg("--config")
            .arg(&config)
            .args(["config", "init"])
            .assert()
            .success();
        assert!(config.exists());

        overlay()
            .arg("--config")
            .arg(&config)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        std::fs::write(&config, "[scheduler]\nmax_concurrent_requests = \"lots\"\n").unwrap();

        overlay()
            .arg("--config")
            .arg(&config)
            .args(["badge", "PG"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn cache_path_follows_config() {
        let (temp, config) = workspace();
        overlay()
            .arg("--config")
            .arg(&config)
            .args(["cache", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                temp.path().join("store.json").display().to_string(),
            ));
    }

    #[test]
    fn cache_list_shows_entries() {
        let (_temp, config) = workspace();
        overlay()
            .arg("--config")
            .arg(&config)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("{} R", CACHED)))
            .stdout(predicate::str::contains(format!("{} PG", STALE)));
    }

    #[test]
    fn cache_prune_drops_expired_entries() {
        let (_temp, config) = workspace();
        overlay()
            .arg("--config")
            .arg(&config)
            .args(["cache", "prune"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Pruned 1 expired rating(s)"));

        overlay()
            .arg("--config")
            .arg(&config)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(CACHED))
            .stdout(predicate::str::contains(STALE).not());
    }

    #[test]
    fn cache_clear_requires_confirmation() {
        let (_temp, config) = workspace();
        overlay()
            .arg("--config")
            .arg(&config)
            .args(["cache", "clear"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cache left untouched"));

        overlay()
            .arg("--config")
            .arg(&config)
            .args(["cache", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 2 cached rating(s)"));
    }

    #[test]
    fn scan_serves_cached_ratings_without_session() {
        let (temp, config) = workspace();
        let snapshot = write_snapshot(temp.path());

        overlay()
            .arg("--config")
            .arg(&config)
            .arg("scan")
            .arg(&snapshot)
            .args(["--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("{} R", CACHED)))
            .stdout(predicate::str::contains(UNCACHED).not());
    }

    #[test]
    fn scan_reports_json() {
        let (temp, config) = workspace();
        let snapshot = write_snapshot(temp.path());

        overlay()
            .arg("--config")
            .arg(&config)
            .arg("scan")
            .arg(&snapshot)
            .args(["--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"icon\": \"15.png\""))
            .stdout(predicate::str::contains("/web/agerating/15.png"))
            .stdout(predicate::str::contains("\"class\": \"age-rating-overlay\""))
            .stdout(predicate::str::contains("pointer-events: none"));
    }

    #[test]
    fn scan_replays_navigation_and_late_cards() {
        let (temp, config) = workspace();
        let card = |id: &str, top: u32| {
            serde_json::json!({
                "node": "a.cardImageContainer",
                "href": format!("#/details?id={}", id),
                "rect": {"top": top, "left": 0, "width": 200, "height": 300}
            })
        };
        let snapshot = serde_json::json!({
            "url": "https://media.local/web/#/home",
            "viewport": {"width": 1280, "height": 720},
            "cards": [card(UNCACHED, 0)],
            "events": [
                {"event": "navigate", "url": "https://media.local/web/#/tv"},
                {"event": "add_cards", "cards": [card(CACHED, 0)]},
                {"event": "back"},
            ],
        });
        let path = temp.path().join("scripted.json");
        std::fs::write(&path, snapshot.to_string()).unwrap();

        overlay()
            .arg("--config")
            .arg(&config)
            .arg("scan")
            .arg(&path)
            .args(["--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("{} R", CACHED)))
            .stdout(predicate::str::contains(UNCACHED).not());
    }

    #[test]
    fn scan_missing_snapshot_fails() {
        let (temp, config) = workspace();
        overlay()
            .arg("--config")
            .arg(&config)
            .arg("scan")
            .arg(temp.path().join("missing.json"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("reading snapshot"));
    }

    #[test]
    fn resolve_without_server_fails_with_hint() {
        let (_temp, config) = workspace();
        overlay()
            .arg("--config")
            .arg(&config)
            .args(["resolve", UNCACHED, "--user", "user-1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Media server URL not configured"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn resolve_serves_cached_rating() {
        let (_temp, config) = workspace();
        overlay()
            .arg("--config")
            .arg(&config)
            .args(["resolve", CACHED])
            .assert()
            .success()
            .stdout(predicate::str::contains("15.png"))
            .stdout(predicate::str::contains("cache"));
    }
}
