//! Static CSV occupancy snapshot
//!
//! Last-resort source: a file written by an earlier export or by hand.
//! Columns (case-insensitive): `name`, `capacity`/`max`, `free`/`free spots`.

use super::{parse_count, SourceAdapter};
use crate::error::{AdapterFailure, FailureCause};
use async_trait::async_trait;
use parkcast_common::{LiveObservation, OccupancyRecords};
use std::path::PathBuf;
use tracing::debug;

const NAME_COLUMNS: &[&str] = &["name", "parking lot", "parking lots"];
const CAPACITY_COLUMNS: &[&str] = &["capacity", "max"];
const FREE_COLUMNS: &[&str] = &["free", "free spots"];

pub struct StaticFileSource {
    path: PathBuf,
}

impl StaticFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SourceAdapter for StaticFileSource {
    type Output = OccupancyRecords;

    fn source_id(&self) -> &str {
        "static-file"
    }

    async fn fetch(&self) -> Result<OccupancyRecords, AdapterFailure> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| {
                AdapterFailure::new(
                    self.source_id(),
                    FailureCause::Io(format!("{}: {}", self.path.display(), e)),
                )
            })?;
        parse_snapshot_csv(&content).map_err(|cause| AdapterFailure::new(self.source_id(), cause))
    }
}

/// Parse a snapshot; `;` or `,` delimited
pub fn parse_snapshot_csv(content: &str) -> Result<OccupancyRecords, FailureCause> {
    let header_line = content.lines().next().unwrap_or_default();
    let delimiter = if header_line.contains(';') { b';' } else { b',' };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| FailureCause::Parse(e.to_string()))?
        .iter()
        .map(str::to_lowercase)
        .collect();
    let column = |aliases: &[&str], label: &str| {
        headers
            .iter()
            .position(|h| aliases.contains(&h.as_str()))
            .ok_or_else(|| FailureCause::MissingKey(format!("{} column", label)))
    };
    let name_col = column(NAME_COLUMNS, "name")?;
    let capacity_col = column(CAPACITY_COLUMNS, "capacity")?;
    let free_col = column(FREE_COLUMNS, "free")?;

    let mut observations = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "Skipping unreadable snapshot row");
                continue;
            }
        };
        let name = record.get(name_col).unwrap_or_default();
        let capacity = record.get(capacity_col).and_then(parse_count);
        let free = record.get(free_col).and_then(parse_count);
        match (capacity, free) {
            (Some(capacity), Some(free)) if !name.is_empty() => {
                observations.push(LiveObservation::new(name, capacity, free));
            }
            _ => debug!(lot = name, "Skipping malformed snapshot row"),
        }
    }

    if observations.is_empty() {
        return Err(FailureCause::Empty);
    }
    Ok(OccupancyRecords::new(observations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_semicolon_snapshot() {
        let csv = "Name;Capacity;Free Spots\nAltmarkt;400;100\nCentrum;x;3\n";
        let records = parse_snapshot_csv(csv).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records.find("ALTMARKT").unwrap().free, 100);
    }

    #[test]
    fn test_parse_max_alias() {
        let csv = "name,max,free\nAltmarkt,400,100\n";
        assert_eq!(parse_snapshot_csv(csv).unwrap().find("altmarkt").unwrap().capacity, 400);
    }

    #[test]
    fn test_missing_free_column() {
        let err = parse_snapshot_csv("name,capacity\nAltmarkt,400\n").unwrap_err();
        assert_eq!(err, FailureCause::MissingKey("free column".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.csv");
        std::fs::write(&path, "name;capacity;free\nAltmarkt;400;100\n").unwrap();

        let records = StaticFileSource::new(&path).fetch().await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_missing_file_is_io_failure() {
        let dir = TempDir::new().unwrap();
        let err = StaticFileSource::new(dir.path().join("missing.csv"))
            .fetch()
            .await
            .unwrap_err();
        assert_eq!(err.source_id, "static-file");
        assert!(matches!(err.cause, FailureCause::Io(_)));
    }
}
