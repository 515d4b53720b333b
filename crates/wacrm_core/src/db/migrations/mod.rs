//! Ordered schema steps for the CRM tables.
//!
//! # Invariants
//! - Step versions run `1..=n` without gaps.
//! - Pending steps apply in one transaction; `PRAGMA user_version` always
//!   names the last step whose SQL ran.

use crate::db::{DbError, DbResult};
use log::{debug, error, info};
use rusqlite::{Connection, Transaction};
use std::time::Instant;

/// One numbered schema step.
#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    /// Short label used in migration logs.
    label: &'static str,
    sql: &'static str,
}

const STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        label: "contacts",
        sql: include_str!("0001_contacts.sql"),
    },
    SchemaStep {
        version: 2,
        label: "lead_board",
        sql: include_str!("0002_lead_board.sql"),
    },
    SchemaStep {
        version: 3,
        label: "messaging",
        sql: include_str!("0003_messaging.sql"),
    },
];

pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Schema version recorded on `conn`; 0 for a fresh database.
pub fn current_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

fn pending_steps(current: u32) -> impl Iterator<Item = &'static SchemaStep> {
    STEPS.iter().filter(move |step| step.version > current)
}

/// Brings `conn` up to `latest_version()`.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file was written by a newer build.
/// - `Sqlite` when a step fails; nothing from the run is kept.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = current_version(conn)?;
    let to = latest_version();
    if from > to {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: to,
        });
    }
    if from == to {
        debug!("event=db_migrate module=db status=skip version={from}");
        return Ok(());
    }

    let started = Instant::now();
    let tx = conn.transaction()?;
    if let Err(err) = run_steps(&tx, from) {
        error!("event=db_migrate module=db status=error from_version={from} error={err}");
        return Err(err);
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={from} to_version={to} duration_ms={}",
        started.elapsed().as_millis()
    );
    Ok(())
}

fn run_steps(tx: &Transaction<'_>, from: u32) -> DbResult<()> {
    for step in pending_steps(from) {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        debug!(
            "event=db_migrate_step module=db version={} label={}",
            step.version, step.label
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{latest_version, pending_steps, STEPS};

    #[test]
    fn step_versions_are_contiguous_from_one() {
        for (index, step) in STEPS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "step {}", step.label);
        }
        assert_eq!(latest_version() as usize, STEPS.len());
    }

    #[test]
    fn pending_steps_skip_applied_versions() {
        let labels = pending_steps(1).map(|step| step.label).collect::<Vec<_>>();
        assert_eq!(labels, vec!["lead_board", "messaging"]);
        assert_eq!(pending_steps(latest_version()).count(), 0);
    }
}
