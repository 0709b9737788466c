//! Show recent exports.

use wmark_common::config::AppConfig;
use wmark_editor::{ActivityKind, ActivityLog, JsonFileStore};

pub fn run(config: &AppConfig, limit: usize, clear: bool) -> anyhow::Result<()> {
    let mut store = JsonFileStore::open(config.store_path());
    let mut log = ActivityLog::new(&mut store);

    if clear {
        log.clear()?;
        println!("Activity log cleared.");
        return Ok(());
    }

    let entries = log.entries();
    if entries.is_empty() {
        println!("No exports yet.");
        return Ok(());
    }

    for entry in entries.iter().take(limit) {
        let kind = match entry.kind {
            ActivityKind::Single => "single",
            ActivityKind::Batch => "batch",
        };
        println!(
            "{}  {:<6}  {:<32}  {} q{}  {} object(s)",
            entry.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            kind,
            entry.label,
            entry.format.extension(),
            entry.quality,
            entry.object_count,
        );
    }
    if entries.len() > limit {
        println!("... {} more", entries.len() - limit);
    }
    Ok(())
}
