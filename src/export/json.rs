//! JSON backup of one learner's review cards.
//! Saves and loads `CardBackup` documents to/from files.

use crate::error::ExportError;
use crate::models::{ReviewCard, ScheduleInput};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardBackup {
    pub owner_id: String,
    pub exported_at: DateTime<Utc>,
    pub cards: Vec<ReviewCard>,
}

/// Writes a backup as pretty-printed JSON.
pub fn export_backup_to_path(backup: &CardBackup, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let json_string = serde_json::to_string_pretty(backup)?;
    fs::write(path.as_ref(), json_string)?;
    info!(
        "Exported {} cards of '{}' to {}",
        backup.cards.len(),
        backup.owner_id,
        path.as_ref().display()
    );
    Ok(())
}

/// Reads a backup file. Cards whose scheduling state breaks the invariants are rejected.
pub fn import_backup(path: impl AsRef<Path>) -> Result<CardBackup, ExportError> {
    let contents = fs::read_to_string(path.as_ref())?;
    let backup: CardBackup = serde_json::from_str(&contents)?;

    for card in &backup.cards {
        ScheduleInput::from(card.schedule()).validate()?;
    }

    info!(
        "Backup of '{}' ({} cards) imported from {}",
        backup.owner_id,
        backup.cards.len(),
        path.as_ref().display()
    );
    Ok(backup)
}
