//! Tail — follow a growing log file.
//!
//! Waits for the file to appear, analyses what is already there line by
//! line, then polls its length and feeds every appended byte range. An
//! unterminated last line stays buffered until a later poll completes it;
//! only shutdown or truncation flushes it as a line of its own. Only a byte
//! offset is tracked, not the file's identity: rotation goes unnoticed and
//! truncation only resets the offset to the new end.

use std::future::Future;
use std::io::SeekFrom;
use std::path::Path;
use std::time::Duration;

use engine::LogEngine;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::conf::WatchConfig;
use crate::error::{DetectorError, DetectorResult};
use crate::render::Renderer;

/// Tail `path` until `shutdown` resolves.
pub async fn tail_file<F>(
    path: &Path,
    config: &WatchConfig,
    engine: &mut LogEngine,
    renderer: &Renderer,
    shutdown: F,
) -> DetectorResult<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    if !exists(path).await {
        renderer.print_waiting_for_file(path);
        let mut wait = interval(Duration::from_millis(config.wait_interval_ms));
        loop {
            tokio::select! {
                _ = wait.tick() => {
                    if exists(path).await {
                        break;
                    }
                }
                () = &mut shutdown => return Ok(()),
            }
        }
        info!("Log file appeared: {}", path.display());
    }

    let (lines, mut offset) = read_existing(path, engine).await?;
    renderer.print_watch_started(lines);
    info!(lines, offset, "Existing log analysed, watching {}", path.display());

    let mut poll = interval(Duration::from_millis(config.poll_interval_ms));
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = poll.tick() => match read_appended(path, offset, engine).await {
                Ok(next) => offset = next,
                Err(e) => warn!("{}", e),
            },
            () = &mut shutdown => {
                engine.flush();
                return Ok(());
            }
        }
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Feed the current content line by line and close the open event. A
/// trailing partial line is kept for the first poll.
/// Returns the complete line count and the byte offset reached.
async fn read_existing(path: &Path, engine: &mut LogEngine) -> DetectorResult<(usize, u64)> {
    let bytes = tokio::fs::read(path).await.map_err(|source| DetectorError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let complete = bytes.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
    let (head, partial) = bytes.split_at(complete);

    let text = String::from_utf8_lossy(head);
    let mut lines = 0;
    for line in text.lines() {
        engine.feed_line(line);
        lines += 1;
    }
    engine.feed_bytes(partial);
    engine.close_open_event();

    Ok((lines, bytes.len() as u64))
}

/// Feed whatever was appended past `offset` and close the open event.
/// Returns the new offset.
async fn read_appended(path: &Path, offset: u64, engine: &mut LogEngine) -> DetectorResult<u64> {
    let len = match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(e) => {
            debug!("Cannot stat {}: {}", path.display(), e);
            return Ok(offset);
        }
    };

    if len < offset {
        warn!(
            "{} shrank from {} to {} bytes, continuing from the new end",
            path.display(),
            offset,
            len
        );
        engine.flush();
        return Ok(len);
    }
    if len == offset {
        return Ok(offset);
    }

    let read_err = |source| DetectorError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut file = tokio::fs::File::open(path).await.map_err(read_err)?;
    file.seek(SeekFrom::Start(offset)).await.map_err(read_err)?;

    let mut appended = Vec::new();
    file.take(len - offset)
        .read_to_end(&mut appended)
        .await
        .map_err(read_err)?;

    debug!(bytes = appended.len(), "Read appended output");
    engine.feed_bytes(&appended);
    engine.close_open_event();

    Ok(offset + appended.len() as u64)
}
