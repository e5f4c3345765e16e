//! Feed newline-delimited `EventEnvelope`s from a file through the indexer.

use super::indexer::Indexer;
use crate::domain::EventEnvelope;
use crate::error::IndexerError;
use std::path::Path;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Failed to read events file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Line {line}: invalid event envelope: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
    #[error("Line {line}: {source}")]
    Event { line: usize, source: IndexerError },
}

/// Apply every envelope in order, halting on the first failure.
///
/// Blank lines are skipped. Returns the number of events applied.
pub async fn replay_file(indexer: &Indexer, path: impl AsRef<Path>) -> Result<usize, ReplayError> {
    let path = path.as_ref();
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut line_no = 0;
    let mut applied = 0;

    info!(path = %path.display(), "Replaying events");

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let envelope: EventEnvelope = match serde_json::from_str(&line) {
            Ok(envelope) => envelope,
            Err(source) => {
                error!(line = line_no, error = %source, "Invalid event envelope");
                return Err(ReplayError::Parse {
                    line: line_no,
                    source,
                });
            }
        };

        if let Err(source) = indexer.process(&envelope).await {
            error!(
                line = line_no,
                block = envelope.block.number,
                event = envelope.event.name(),
                error = %source,
                "Event failed, halting replay"
            );
            return Err(ReplayError::Event {
                line: line_no,
                source,
            });
        }
        applied += 1;
    }

    info!(applied, "Replay finished");
    Ok(applied)
}
