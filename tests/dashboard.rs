mod common;

use superscript_explorer::app::{App, Step};
use superscript_explorer::config::Config;
use superscript_explorer::params::Parameters;
use superscript_explorer::presets;
use superscript_explorer::server::handle;
use superscript_explorer::storage::SessionStore;
use std::time::Duration;
use tempfile::TempDir;

use common::write_run;

fn config(dir: &TempDir, duration: usize) -> Config {
    Config {
        data_dir: dir.path().to_path_buf(),
        duration,
        frame_ms: 1,
        ..Config::default()
    }
}

#[test]
fn plays_through_a_loaded_run() {
    let dir = TempDir::new().unwrap();
    write_run(dir.path(), &Parameters::default(), 5);
    let mut app = App::new(config(&dir, 5), None);
    assert!(app.data.is_loaded());

    assert!(app.toggle_play().unwrap().is_some());
    let mut frames = 0;
    while let Step::Advanced(_) = app.step() {
        frames += 1;
    }
    assert_eq!(frames, 3);
    assert_eq!(app.session.global_time, 4);
    assert!(!app.session.playing);

    // clicking play at the end restarts from zero
    app.toggle_play().unwrap();
    assert_eq!(app.session.global_time, 0);
    assert!(app.session.playing);

    let frame = app.frame(2);
    assert_eq!(frame.metrics["ActiveProjects"], 2.0);
    assert_eq!(frame.network.unwrap().nodes.len(), 3);
}

#[test]
fn random_replicate_picks_another_run() {
    let dir = TempDir::new().unwrap();
    let params = Parameters::default();
    write_run(dir.path(), &params, 3);
    write_run(dir.path(), &Parameters { replicate: 4, ..params }, 3);

    let mut app = App::new(config(&dir, 3), None);
    assert_eq!(app.replicates(), vec![0, 4]);
    let effect = app.random_replicate();
    app.apply(effect);
    assert_eq!(app.session.params.replicate, 4);
    assert!(app.data.is_loaded());
}

#[test]
fn session_survives_restart() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("session.sqlite");
    let db = db.to_str().unwrap();

    {
        let mut store = SessionStore::new(db).unwrap();
        store.init().unwrap();
        let mut app = App::new(config(&dir, 5), Some(store));
        let effect = app.session.set_preset("C").unwrap();
        app.apply(effect);
        app.session.handle_speed(8).unwrap();
        app.persist();
    }

    let mut store = SessionStore::new(db).unwrap();
    store.init().unwrap();
    let app = App::new(config(&dir, 5), Some(store));
    assert_eq!(app.session.preset.as_deref(), Some("C"));
    assert_eq!(app.session.params, presets::find("C").unwrap().params);
    assert_eq!(app.session.speed, 8);
    assert!(!app.session.playing);
}

#[tokio::test]
async fn http_routes_drive_the_session() {
    let dir = TempDir::new().unwrap();
    write_run(dir.path(), &Parameters::default(), 5);
    let app = App::new(config(&dir, 5), None).shared();

    let page = handle(&app, "GET", "/simulation").await;
    assert_eq!(page.status, 200);
    assert!(page.body.contains("Play simulation"));
    assert!(page.body.contains("<svg"));

    let state = handle(&app, "GET", "/api/seek?t=3").await;
    assert_eq!(state.status, 200);
    let v: serde_json::Value = serde_json::from_str(&state.body).unwrap();
    assert_eq!(v["session"]["global_time"], 3);
    assert_eq!(v["loaded"], true);

    let frame = handle(&app, "GET", "/api/frame").await;
    let f: serde_json::Value = serde_json::from_str(&frame.body).unwrap();
    assert_eq!(f["timestep"], 3);
    assert_eq!(f["metrics"]["ActiveProjects"], 3.0);

    let moved = handle(&app, "GET", "/api/params?project_count=10&back=1").await;
    assert_eq!(moved.status, 303);
    let page = handle(&app, "GET", "/simulation").await;
    assert!(page.body.contains("Sorry, we do not currently have data"));

    let comparison = handle(&app, "GET", "/comparison").await;
    assert_eq!(comparison.status, 200);
    assert!(comparison.body.contains("ROI Comparison"));
}

#[tokio::test]
async fn unchanged_replicate_keeps_playback_running() {
    let dir = TempDir::new().unwrap();
    write_run(dir.path(), &Parameters::default(), 200);
    let app = App::new(Config { frame_ms: 20, ..config(&dir, 200) }, None).shared();

    assert_eq!(handle(&app, "GET", "/api/play").await.status, 200);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(handle(&app, "GET", "/api/replicate?value=0").await.status, 200);
    // only replicate 0 exists, so a random pick changes nothing either
    assert_eq!(handle(&app, "GET", "/api/replicate?value=random").await.status, 200);
    let before = app.lock().await.session.global_time;

    tokio::time::sleep(Duration::from_millis(100)).await;
    let a = app.lock().await;
    assert!(a.session.playing);
    assert!(a.session.global_time > before);
}

#[tokio::test]
async fn seek_stops_playback() {
    let dir = TempDir::new().unwrap();
    write_run(dir.path(), &Parameters::default(), 200);
    let app = App::new(Config { frame_ms: 20, ..config(&dir, 200) }, None).shared();

    handle(&app, "GET", "/api/play").await;
    handle(&app, "GET", "/api/seek?t=10").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let a = app.lock().await;
    assert!(!a.session.playing);
    assert_eq!(a.session.global_time, 10);
}
