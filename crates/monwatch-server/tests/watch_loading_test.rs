mod common;

use common::{build_test_context, write_file};
use monwatch_server::watch_loader::{build_watches, load_watch_configs, reload_alert_engine};

#[test]
fn invalid_watches_are_skipped_on_load() {
    let ctx = build_test_context().expect("test context should build");
    let engine = ctx.monitor.engine();

    let names: Vec<&str> = engine.watches().iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["cpu-high", "disk-full"]);
    assert!(engine.watch("broken").is_none());
}

#[test]
fn duplicate_names_keep_the_first_watch() {
    let configs = monwatch_alert::config::parse_watch_configs(
        r#"[
            {"name": "cpu", "series": "cpu", "red": {"start": {"operator": ">", "threshold": 90}}},
            {"name": "cpu", "series": "cpu", "red": {"start": {"operator": ">", "threshold": 10}}}
        ]"#,
    )
    .unwrap();
    let watches = build_watches(&configs);
    assert_eq!(watches.len(), 1);
    assert_eq!(watches[0].red.start.as_ref().unwrap().threshold, 90);
}

#[test]
fn reload_replaces_watches_and_closes_their_alerts() {
    let ctx = build_test_context().expect("test context should build");
    for (time, value) in [(1000, 95), (2000, 96), (3000, 97)] {
        ctx.monitor.ingest("cpu", "web-01", time, value).unwrap();
    }
    ctx.monitor.tick();
    assert_eq!(ctx.monitor.ongoing_alerts().len(), 1);

    let path = write_file(
        ctx.temp_dir.path(),
        "reloaded.json",
        r#"[{"name": "mem-high", "series": "mem", "red": {"start": {"operator": ">", "threshold": 80}}}]"#,
    )
    .unwrap();
    let count = reload_alert_engine(&path, &ctx.monitor.alert_engine, 3500).unwrap();
    assert_eq!(count, 1);

    assert!(ctx.monitor.ongoing_alerts().is_empty());
    let alerts = ctx.monitor.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].is_stopped());
    assert_eq!(alerts[0].end_time(), Some(3500));
    assert_eq!(ctx.monitor.engine().watches().len(), 1);
}

#[test]
fn unreadable_watch_files_are_reported() {
    let ctx = build_test_context().expect("test context should build");
    let missing = ctx.temp_dir.path().join("missing.json");
    let err = load_watch_configs(&missing.to_string_lossy()).unwrap_err();
    assert!(err.to_string().contains("Failed to read watches file"));

    let garbage = write_file(ctx.temp_dir.path(), "garbage.json", "{not json").unwrap();
    let err = load_watch_configs(&garbage).unwrap_err();
    assert!(err.to_string().contains("Failed to parse watches file"));

    // A failed reload leaves the current watches untouched.
    assert!(reload_alert_engine(&garbage, &ctx.monitor.alert_engine, 0).is_err());
    assert_eq!(ctx.monitor.engine().watches().len(), 2);
}
