use std::path::PathBuf;

use pretty_assertions::assert_eq;
use trek_core::alerts::Locale;
use trek_core::config::AppConfig;
use trek_core::currency::catalog;
use trek_core::remote::RemoteStore;
use trek_core::services::{KindReport, PhaseFailure, SyncPhase, SyncReport};
use trek_core::{Category, Entity, EntityId, EntityKind, Expense, SyncState, Trip};

use crate::cli::{CurrencyCommands, TripCommands};
use crate::commands::category::format_category_line;
use crate::commands::common::{
    format_relative_time, join_words, parse_id, resolve_data_dir, resolve_user_id, sync_marker,
    RemoteBackend, Session, SessionOptions,
};
use crate::commands::currency::{currency_item, format_currency_line, run_currency};
use crate::commands::expense::format_expense_line;
use crate::commands::sync::{format_report_lines, kind_summary, run_sync};
use crate::commands::trip::run_trip;
use crate::error::CliError;

fn offline_options(data_dir: PathBuf) -> SessionOptions {
    SessionOptions {
        offline: true,
        data_dir: Some(data_dir),
        user: Some("traveler-1".to_string()),
        locale: Locale::Es,
        json: false,
    }
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
}

#[test]
fn resolve_user_id_prefers_flag_over_config() {
    assert_eq!(
        resolve_user_id(Some(" alice ".to_string()), Some("bob".to_string())).unwrap(),
        "alice"
    );
    assert_eq!(
        resolve_user_id(Some("  ".to_string()), Some("bob".to_string())).unwrap(),
        "bob"
    );
    assert!(matches!(
        resolve_user_id(None, None),
        Err(CliError::UserNotConfigured)
    ));
}

#[test]
fn resolve_data_dir_prefers_flag_over_config() {
    let resolved = resolve_data_dir(
        Some(PathBuf::from("/tmp/flag")),
        Some(PathBuf::from("/tmp/env")),
    )
    .unwrap();
    assert_eq!(resolved, PathBuf::from("/tmp/flag"));

    let resolved = resolve_data_dir(None, Some(PathBuf::from("/tmp/env"))).unwrap();
    assert_eq!(resolved, PathBuf::from("/tmp/env"));
}

#[test]
fn join_words_rejects_blank_names() {
    assert_eq!(
        join_words(&["Lisbon".to_string(), "2024".to_string()]).unwrap(),
        "Lisbon 2024"
    );
    assert!(matches!(
        join_words(&[" ".to_string()]),
        Err(CliError::EmptyName)
    ));
}

#[test]
fn parse_id_keeps_origin() {
    assert!(parse_id("local-0190a").unwrap().is_local());
    assert!(!parse_id("AbCdEfGhIjKlMnOpQrSt").unwrap().is_local());
    assert!(matches!(parse_id("  "), Err(CliError::EmptyId)));
}

#[test]
fn sync_marker_labels() {
    assert_eq!(sync_marker(SyncState::LocalUnsynced), "local");
    assert_eq!(sync_marker(SyncState::RemoteDirty), "edited");
    assert_eq!(sync_marker(SyncState::RemoteSynced), "synced");
}

#[test]
fn expense_line_shows_original_amount_when_converted() {
    let mut expense = Expense::new(EntityId::remote("cat1"), "Coffee", 3.85, "USD");
    expense.original_amount = Some(3.5);
    expense.original_currency = Some("EUR".to_string());

    let line = format_expense_line(&expense, expense.meta.created_at);
    assert!(line.contains("Coffee"));
    assert!(line.contains("$ 3.85"));
    assert!(line.contains("(from € 3.50)"));
    assert!(line.contains("local"));
}

#[test]
fn category_line_falls_back_when_uncolored() {
    let category = Category::new(EntityId::remote("trip1"), "Food");
    let line = format_category_line(&category);
    assert!(line.contains("Food"));
    assert!(line.contains(" - "));
}

#[test]
fn currency_line_marks_base_currency() {
    let euro = catalog::find("EUR").unwrap();
    let item = currency_item(euro, "EUR", Locale::Es);
    assert!(item.base);
    assert!(format_currency_line(&item).starts_with("* EUR"));

    let item = currency_item(euro, "USD", Locale::En);
    assert!(format_currency_line(&item).starts_with("  EUR"));
}

#[test]
fn report_lines_list_failures_after_counts() {
    let report = SyncReport {
        kinds: vec![KindReport {
            kind: EntityKind::Category,
            created: 2,
            adopted: 0,
            deferred: 1,
            deleted: 0,
            updated: 0,
            orphaned: 0,
            failures: vec![PhaseFailure {
                phase: SyncPhase::Delete,
                message: "timeout".to_string(),
            }],
        }],
    };

    let lines = format_report_lines(&report);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("created=2"));
    assert!(lines[0].contains("deferred=1"));
    assert!(lines[1].contains("timeout"));
    assert_eq!(kind_summary(&report.kinds[0]).failures.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn disconnected_backend_reports_remote_errors() {
    let backend = RemoteBackend::Disconnected;
    assert!(!backend.is_connected());
    assert!(matches!(
        backend.query("users/u/travels", None).await,
        Err(trek_core::Error::Remote(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_session_queues_records_across_invocations() {
    let dir = tempfile::tempdir().unwrap();

    {
        let session = Session::open(offline_options(dir.path().to_path_buf()), AppConfig::default())
            .await
            .unwrap();
        assert!(!session.is_online());
        run_trip(
            &session,
            TripCommands::Add {
                name: vec!["Lisbon".to_string()],
                color: None,
            },
        )
        .await
        .unwrap();
    }

    let session = Session::open(offline_options(dir.path().to_path_buf()), AppConfig::default())
        .await
        .unwrap();
    let trips = session.manager::<Trip>().load_data().await.unwrap();
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].name, "Lisbon");
    assert_eq!(trips[0].sync_state(), SyncState::LocalUnsynced);
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_session_rejects_sync_and_localizes_errors() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::open(offline_options(dir.path().to_path_buf()), AppConfig::default())
        .await
        .unwrap();

    assert!(matches!(run_sync(&session).await, Err(CliError::Offline)));

    let added = run_trip(
        &session,
        TripCommands::Add {
            name: vec!["Porto".to_string()],
            color: Some("#ff0000".to_string()),
        },
    )
    .await;
    assert!(added.is_ok());

    let missing = run_trip(
        &session,
        TripCommands::Delete {
            id: "local-missing".to_string(),
        },
    )
    .await;
    match missing {
        Err(CliError::Alert(alert)) => assert_eq!(alert.message, "No se encontró el viaje"),
        other => panic!("expected alert, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn base_currency_preference_persists() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::open(offline_options(dir.path().to_path_buf()), AppConfig::default())
        .await
        .unwrap();

    assert_eq!(session.base_currency().await.unwrap(), "USD");
    run_currency(
        &session,
        CurrencyCommands::Set {
            code: "eur".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(session.base_currency().await.unwrap(), "EUR");

    let invalid = run_currency(
        &session,
        CurrencyCommands::Set {
            code: "XYZ".to_string(),
        },
    )
    .await;
    assert!(matches!(
        invalid,
        Err(CliError::Core(trek_core::Error::Validation(_)))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn session_without_user_fails() {
    let dir = tempfile::tempdir().unwrap();
    let options = SessionOptions {
        user: None,
        ..offline_options(dir.path().to_path_buf())
    };
    assert!(matches!(
        Session::open(options, AppConfig::default()).await,
        Err(CliError::UserNotConfigured)
    ));
}
