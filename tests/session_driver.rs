//! Integration tests for the session driver
//!
//! The driver owns the session on one task; handles queue dispatches and
//! lifecycle commands that are applied between refreshes.

use stateful::runtime::{Lifecycle, MemoryStore, SessionDriver, SharedContext, StateConfig};
use stateful::{Session, SessionConfig};
use std::time::Duration;

fn quiet_config() -> SessionConfig {
    SessionConfig {
        refresh_interval_ms: 60_000,
        journal: false,
        ..SessionConfig::default()
    }
}

#[tokio::test]
async fn test_dispatch_refreshes_context_before_reply() {
    let context = SharedContext::new();
    let config = quiet_config();
    let slot_id = config.slot_id.clone();
    let session = Session::load(MemoryStore::new());
    let (driver, handle) = SessionDriver::new(session, context.clone(), config);
    let task = tokio::spawn(driver.run());

    handle
        .apply(Lifecycle::Activate("Simple Counter".to_string()))
        .await
        .unwrap();
    let record = handle.dispatch("Okay!<!-- increment -->").await.unwrap();
    assert_eq!(record.applied.len(), 1);

    let text = context.text(&slot_id).unwrap();
    assert!(text.contains("The number is 7."));

    drop(handle);
    let session = task.await.unwrap();
    assert_eq!(session.list()[0].value, Some(serde_json::json!(7)));
}

#[tokio::test]
async fn test_lifecycle_commands_are_serialized() {
    let context = SharedContext::new();
    let session = Session::load(MemoryStore::new());
    let (driver, handle) = SessionDriver::new(session, context, quiet_config());
    let task = tokio::spawn(driver.run());

    handle
        .apply(Lifecycle::Create(StateConfig::template("Fuel")))
        .await
        .unwrap();
    let duplicate = handle
        .apply(Lifecycle::Create(StateConfig::template("Fuel")))
        .await;
    assert!(duplicate.is_err());

    let names: Vec<String> = handle
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|summary| summary.name)
        .collect();
    assert_eq!(names, vec!["Simple Counter".to_string(), "Fuel".to_string()]);

    let detail = handle.select("Fuel").await.unwrap();
    assert_eq!(detail.status_line(), "Currently Disabled");

    handle.apply(Lifecycle::Remove("Fuel".to_string())).await.unwrap();
    assert!(handle.select("Fuel").await.is_err());

    handle.apply(Lifecycle::Reset).await.unwrap();
    assert_eq!(handle.list().await.unwrap().len(), 1);

    drop(handle);
    task.await.unwrap();
}

#[tokio::test]
async fn test_refresh_on_demand_matches_synthesis() {
    let context = SharedContext::new();
    let config = quiet_config();
    let slot_id = config.slot_id.clone();
    let mut seed = Session::load(MemoryStore::new());
    seed.activate("Simple Counter").unwrap();
    let expected = seed.synthesize();

    let (driver, handle) = SessionDriver::new(seed, context.clone(), config);
    let task = tokio::spawn(driver.run());

    let text = handle.refresh().await.unwrap();
    assert_eq!(text, expected);
    assert_eq!(context.text(&slot_id), Some(expected));

    drop(handle);
    task.await.unwrap();
}

#[tokio::test]
async fn test_periodic_refresh_installs_context() {
    let context = SharedContext::new();
    let config = SessionConfig {
        refresh_interval_ms: 10,
        journal: false,
        ..SessionConfig::default()
    };
    let slot_id = config.slot_id.clone();
    let session = Session::load(MemoryStore::new());
    let (driver, handle) = SessionDriver::new(session, context.clone(), config);
    let task = tokio::spawn(driver.run());

    tokio::time::sleep(Duration::from_millis(100)).await;
    let slot = context.slot(&slot_id).unwrap();
    assert!(slot.writes >= 2);
    assert!(slot.text.starts_with("<StateInstructions>"));

    drop(handle);
    task.await.unwrap();
}

#[tokio::test]
async fn test_handle_reports_stopped_driver() {
    let session = Session::load(MemoryStore::new());
    let (driver, handle) = SessionDriver::new(session, SharedContext::new(), quiet_config());
    drop(driver);

    assert!(handle.dispatch("<!-- increment -->").await.is_err());
}

#[tokio::test]
async fn test_shutdown_returns_session_while_handles_live() {
    let session = Session::load(MemoryStore::new());
    let (driver, handle) = SessionDriver::new(session, SharedContext::new(), quiet_config());
    let task = tokio::spawn(driver.run());
    let spare = handle.clone();

    handle
        .apply(Lifecycle::Activate("Simple Counter".to_string()))
        .await
        .unwrap();
    handle.shutdown().await.unwrap();
    let session = task.await.unwrap();

    assert!(session.list()[0].active);
    assert!(spare.list().await.is_err());
}
