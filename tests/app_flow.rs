mod common;

use std::sync::Arc;

use common::FakeShell;
use incident_sync::{
    spawn_connectivity_bridge, App, ConnectivityMonitor, DisasterType, EngineConfig, Event,
    IdentifierMode, LatLon, MapRegion, NetworkAccess, NetworkStatus,
};
use tempfile::TempDir;
use tokio::sync::mpsc;

fn config(dir: &TempDir, mode: IdentifierMode) -> EngineConfig {
    EngineConfig {
        database_path: dir.path().join("incident_logs.db3"),
        identifier_mode: mode,
        ..EngineConfig::default()
    }
}

fn drag_to(lat: f64, lon: f64) -> Event {
    Event::VisibleRegionChanged {
        region: MapRegion::from_center_and_radius(LatLon::new(lat, lon).unwrap(), 1.0),
    }
}

#[tokio::test]
async fn log_offline_then_restart_and_delete() {
    let dir = TempDir::new().unwrap();
    let shell = FakeShell::with_location(12.97, 77.59);
    let monitor = Arc::new(ConnectivityMonitor::new());
    let mut app = App::open(
        config(&dir, IdentifierMode::Generated),
        Arc::clone(&monitor),
        shell.capabilities(),
    )
    .unwrap();

    app.update(Event::Appeared).await;
    let start = shell.moves();
    assert_eq!(start.len(), 1);
    assert_eq!(start[0].center, LatLon::new(12.97, 77.59).unwrap());

    monitor.report(NetworkAccess::None);
    app.update(Event::DisasterTypeSelected {
        disaster_type: DisasterType::Flood,
    })
    .await;
    app.update(drag_to(12.97, 77.59)).await;
    let id = app.view().await.draft.identifier;
    assert!(id.starts_with("SOS-"));
    app.update(Event::SubmitRequested).await;

    assert_eq!(
        shell.notifications(),
        vec![("Saved".to_string(), "Incident Logged".to_string())]
    );
    drop(app);

    let shell = FakeShell::with_location(0.0, 0.0);
    let mut app = App::open(
        config(&dir, IdentifierMode::Generated),
        Arc::new(ConnectivityMonitor::new()),
        shell.capabilities(),
    )
    .unwrap();
    app.update(Event::Appeared).await;

    let view = app.view().await;
    assert_eq!(view.history.len(), 1);
    let item = &view.history[0];
    assert_eq!(item.id, id);
    assert_eq!(item.disaster_type, "Flood");
    assert_eq!(item.network_status, "OFFLINE");
    assert_eq!(item.location_text, "12.97000,77.59000");
    assert_eq!(view.pins.len(), 1);

    let record_id = app.registry().history().await[0].id.clone();
    app.update(Event::HistoryItemSelected {
        id: record_id.clone(),
    })
    .await;
    shell.answer_confirm(true);
    app.update(Event::DeleteRequested { id: record_id }).await;

    let view = app.view().await;
    assert!(view.history.is_empty());
    assert!(view.pins.is_empty());
    assert!(view.detail.is_none());
}

#[tokio::test]
async fn missing_location_is_reported_and_draft_kept() {
    let dir = TempDir::new().unwrap();
    let shell = Arc::new(FakeShell::default());
    let mut app = App::open(
        config(&dir, IdentifierMode::UserSupplied),
        Arc::new(ConnectivityMonitor::new()),
        shell.capabilities(),
    )
    .unwrap();
    app.update(Event::Appeared).await;

    app.update(Event::IdentifierEdited {
        text: "trip1".into(),
    })
    .await;
    app.update(Event::DisasterTypeSelected {
        disaster_type: DisasterType::Fire,
    })
    .await;
    app.update(Event::SubmitRequested).await;

    assert_eq!(
        shell.notifications(),
        vec![("Error".to_string(), "Drag map to location".to_string())]
    );
    let view = app.view().await;
    assert!(view.history.is_empty());
    assert_eq!(view.draft.identifier, "trip1");
    assert_eq!(view.draft.disaster_type.as_deref(), Some("Fire"));
}

#[tokio::test]
async fn duplicate_user_identifier_is_refused() {
    let dir = TempDir::new().unwrap();
    let shell = Arc::new(FakeShell::default());
    let mut app = App::open(
        config(&dir, IdentifierMode::UserSupplied),
        Arc::new(ConnectivityMonitor::new()),
        shell.capabilities(),
    )
    .unwrap();
    app.update(Event::Appeared).await;

    for text in ["trip1", "TRIP1"] {
        app.update(Event::IdentifierEdited { text: text.into() }).await;
        app.update(Event::DisasterTypeSelected {
            disaster_type: DisasterType::Medical,
        })
        .await;
        app.update(drag_to(1.0, 1.0)).await;
        app.update(Event::SubmitRequested).await;
    }

    let notes = shell.notifications();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].0, "Saved");
    assert_eq!(notes[1].0, "Error");
    assert_eq!(app.registry().len().await, 1);
    assert_eq!(app.view().await.draft.identifier, "TRIP1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn connectivity_reports_reach_the_event_loop() {
    let dir = TempDir::new().unwrap();
    let shell = Arc::new(FakeShell::default());
    let monitor = Arc::new(ConnectivityMonitor::new());
    let mut app = App::open(
        config(&dir, IdentifierMode::Generated),
        Arc::clone(&monitor),
        shell.capabilities(),
    )
    .unwrap();

    let (tx, rx) = mpsc::channel(16);
    let bridge = spawn_connectivity_bridge(&monitor, tx.clone());

    let reporter = Arc::clone(&monitor);
    std::thread::spawn(move || {
        reporter.report(NetworkAccess::Internet);
    })
    .join()
    .unwrap();

    let mut rx = rx;
    let event = rx.recv().await.unwrap();
    assert_eq!(
        event,
        Event::NetworkStatusChanged {
            status: NetworkStatus::Online
        }
    );

    tx.send(Event::DisasterTypeSelected {
        disaster_type: DisasterType::Earthquake,
    })
    .await
    .unwrap();
    tx.send(drag_to(-33.86, 151.2)).await.unwrap();
    tx.send(Event::SubmitRequested).await.unwrap();
    drop(tx);
    bridge.abort();

    app.update(event).await;
    app.run(rx).await;

    let history = app.registry().history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].network_status, NetworkStatus::Online);
    assert_eq!(app.view().await.connectivity_label, "ONLINE");
}
