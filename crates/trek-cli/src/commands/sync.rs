use serde::Serialize;
use trek_core::alerts::UserAlert;
use trek_core::services::{KindReport, SyncReport};
use trek_core::Trip;

use crate::commands::common::{print_json, Session};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct KindSummary {
    pub kind: String,
    pub created: usize,
    pub adopted: usize,
    pub deferred: usize,
    pub deleted: usize,
    pub updated: usize,
    pub orphaned: usize,
    pub failures: Vec<String>,
}

pub async fn run_sync(session: &Session) -> Result<(), CliError> {
    if !session.is_online() {
        return Err(CliError::Offline);
    }

    let report = session.manager::<Trip>().handle_sync().await?;
    if session.json {
        let summaries = report.kinds.iter().map(kind_summary).collect::<Vec<_>>();
        print_json(&summaries)?;
    } else {
        for line in format_report_lines(&report) {
            println!("{line}");
        }
    }

    let alert = UserAlert::sync_summary(&report, session.locale);
    if report.is_complete() {
        eprintln!("{}: {}", alert.title, alert.message);
        Ok(())
    } else {
        Err(CliError::Alert(alert))
    }
}

pub fn kind_summary(report: &KindReport) -> KindSummary {
    KindSummary {
        kind: report.kind.to_string(),
        created: report.created,
        adopted: report.adopted,
        deferred: report.deferred,
        deleted: report.deleted,
        updated: report.updated,
        orphaned: report.orphaned,
        failures: report
            .failures
            .iter()
            .map(|failure| format!("{}: {}", failure.phase, failure.message))
            .collect(),
    }
}

pub fn format_report_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = report
        .kinds
        .iter()
        .map(|kind| {
            format!(
                "{:<9} created={} adopted={} deferred={} deleted={} updated={} orphaned={}",
                kind.kind,
                kind.created,
                kind.adopted,
                kind.deferred,
                kind.deleted,
                kind.updated,
                kind.orphaned
            )
        })
        .collect::<Vec<_>>();
    lines.extend(
        report
            .failures()
            .map(|(kind, failure)| format!("{kind} {} failed: {}", failure.phase, failure.message)),
    );
    lines
}
