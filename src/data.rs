//! Recorded market files
//!
//! A recording is what a polling collector writes while watching one
//! exchange market: a JSON-lines file whose first line is the market
//! definition and whose remaining lines are timed runner snapshots in
//! arrival order.

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::snapshot::TimedRunnerSnapshot;
use crate::types::MarketDefinition;

/// One recorded market: immutable definition plus its snapshot stream
#[derive(Debug, Clone)]
pub struct MarketRecording {
    pub definition: MarketDefinition,
    pub snapshots: Vec<TimedRunnerSnapshot>,
}

/// Parse a recording from JSON-lines content
pub fn parse_recording(contents: &str) -> Result<MarketRecording> {
    let mut lines = contents.lines().filter(|line| !line.trim().is_empty());

    let header = match lines.next() {
        Some(line) => line,
        None => bail!("recording is empty"),
    };
    let definition: MarketDefinition =
        serde_json::from_str(header).context("Failed to parse market definition header")?;

    let mut snapshots = Vec::new();
    for (idx, line) in lines.enumerate() {
        let snapshot: TimedRunnerSnapshot = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse snapshot on line {}", idx + 2))?;
        snapshots.push(snapshot);
    }

    // the driver applies snapshots in arrival order; a non-monotonic
    // timestamp usually means a corrupted recording
    for window in snapshots.windows(2) {
        if window[1].time < window[0].time {
            warn!(
                market_id = definition.market_id,
                "Recording timestamps not monotonic at {}", window[1].time
            );
            break;
        }
    }

    Ok(MarketRecording {
        definition,
        snapshots,
    })
}

/// Load a recording from a file
pub fn load_recording(path: impl AsRef<Path>) -> Result<MarketRecording> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read recording {}", path.display()))?;
    parse_recording(&contents)
        .with_context(|| format!("Failed to parse recording {}", path.display()))
}

/// Write a recording as JSON lines
pub fn write_recording(path: impl AsRef<Path>, recording: &MarketRecording) -> Result<()> {
    let path = path.as_ref();
    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create recording {}", path.display()))?;

    writeln!(file, "{}", serde_json::to_string(&recording.definition)?)?;
    for snapshot in &recording.snapshots {
        writeln!(file, "{}", serde_json::to_string(snapshot)?)?;
    }
    Ok(())
}

/// All recording files (`*.json`) in a directory, sorted by name
pub fn find_recordings(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read data directory {}", dir.display()))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::RunnerSnapshot;
    use crate::types::{Runner, RunnerPrice};
    use chrono::{TimeZone, Utc};

    fn sample_recording() -> MarketRecording {
        MarketRecording {
            definition: MarketDefinition {
                market_id: 100,
                market_name: "Match Odds".to_string(),
                event_name: "Home vs Away".to_string(),
                num_of_winners: 1,
                market_time: Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap(),
                runners: vec![Runner {
                    runner_id: 10,
                    runner_name: "Home".to_string(),
                }],
            },
            snapshots: vec![TimedRunnerSnapshot {
                time: Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap(),
                runner_id: 10,
                snapshot: RunnerSnapshot {
                    prices: vec![RunnerPrice::new(1.9, 5.0, 0.0)],
                    traded_volume: vec![],
                },
            }],
        }
    }

    #[test]
    fn test_parse_round_trip() {
        let recording = sample_recording();
        let mut contents = serde_json::to_string(&recording.definition).unwrap();
        contents.push('\n');
        contents.push_str(&serde_json::to_string(&recording.snapshots[0]).unwrap());
        contents.push('\n');

        let parsed = parse_recording(&contents).unwrap();
        assert_eq!(parsed.definition.market_id, 100);
        assert_eq!(parsed.definition.runners.len(), 1);
        assert_eq!(parsed.snapshots, recording.snapshots);
    }

    #[test]
    fn test_parse_rejects_empty_and_garbage() {
        assert!(parse_recording("").is_err());
        assert!(parse_recording("\n\n").is_err());
        assert!(parse_recording("not json\n").is_err());

        let header = serde_json::to_string(&sample_recording().definition).unwrap();
        let bad = format!("{header}\n{{\"broken\": true}}\n");
        assert!(parse_recording(&bad).is_err());
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let recording = sample_recording();
        let contents = format!(
            "\n{}\n\n{}\n\n",
            serde_json::to_string(&recording.definition).unwrap(),
            serde_json::to_string(&recording.snapshots[0]).unwrap()
        );

        let parsed = parse_recording(&contents).unwrap();
        assert_eq!(parsed.snapshots.len(), 1);
    }

    #[test]
    fn test_file_round_trip() {
        let recording = sample_recording();
        let path = std::env::temp_dir().join("betsim_test_recording.json");

        write_recording(&path, &recording).unwrap();
        let loaded = load_recording(&path).unwrap();
        assert_eq!(loaded.definition.market_name, "Match Odds");
        assert_eq!(loaded.snapshots, recording.snapshots);

        std::fs::remove_file(&path).ok();
    }
}
