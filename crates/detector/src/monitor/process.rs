//! Process — run a command and feed its output to the engine.
//!
//! stdout and stderr are read by two independent tasks that echo each chunk
//! unchanged and forward it over one channel to the engine owner. The order
//! in which chunks from the two streams arrive is not deterministic, so a
//! stack trace on one stream interrupted by a line on the other may be split
//! into two events.

use std::future::Future;
use std::process::Stdio;

use engine::LogEngine;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{DetectorError, DetectorResult};

const READ_BUFFER: usize = 8 * 1024;

/// Build the child command. The command line is split on whitespace; quoting
/// is not interpreted. On Windows it runs through `cmd /C`.
pub fn build_command(command_line: &str) -> DetectorResult<Command> {
    let mut parts = command_line.split_whitespace();
    let program = parts.next().ok_or(DetectorError::EmptyCommand)?;

    let mut command = if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(program);
        cmd
    } else {
        Command::new(program)
    };
    command
        .args(parts)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    Ok(command)
}

/// Run `command_line` until it exits or `shutdown` resolves.
///
/// Returns the child's exit code, or 0 when interrupted.
pub async fn run_command<F>(
    command_line: &str,
    engine: &mut LogEngine,
    shutdown: F,
) -> DetectorResult<i32>
where
    F: Future<Output = ()>,
{
    let mut child = build_command(command_line)?
        .spawn()
        .map_err(|source| DetectorError::Spawn {
            command: command_line.to_string(),
            source,
        })?;
    info!(pid = ?child.id(), "Started: {}", command_line);

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    if let Some(stdout) = child.stdout.take() {
        spawn_reader("stdout", stdout, tokio::io::stdout(), tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_reader("stderr", stderr, tokio::io::stderr(), tx.clone());
    }
    drop(tx);

    tokio::pin!(shutdown);

    // Both readers finish once the child closes its pipes
    loop {
        tokio::select! {
            chunk = rx.recv() => match chunk {
                Some(bytes) => engine.feed_bytes(&bytes),
                None => break,
            },
            () = &mut shutdown => return Ok(interrupt(&mut child, engine)),
        }
    }

    let status = tokio::select! {
        status = child.wait() => status?,
        () = &mut shutdown => return Ok(interrupt(&mut child, engine)),
    };
    engine.flush();

    // None means the child was killed by a signal
    let code = status.code().unwrap_or(1);
    info!(code, "Process exited");
    Ok(code)
}

fn interrupt(child: &mut Child, engine: &mut LogEngine) -> i32 {
    if let Err(e) = child.start_kill() {
        warn!("Failed to stop child process: {}", e);
    }
    engine.flush();
    0
}

fn spawn_reader<R, W>(name: &'static str, reader: R, echo: W, tx: mpsc::UnboundedSender<Vec<u8>>)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = forward(reader, echo, tx).await {
            warn!("Reading child {} failed: {}", name, e);
        }
        debug!("Child {} closed", name);
    });
}

/// Copy `reader` to `echo` chunk by chunk, forwarding each chunk to `tx`.
async fn forward<R, W>(
    mut reader: R,
    echo: W,
    tx: mpsc::UnboundedSender<Vec<u8>>,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut echo = Some(echo);
    let mut buf = vec![0u8; READ_BUFFER];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        let chunk = &buf[..n];

        if let Some(ref mut out) = echo {
            let written = async {
                out.write_all(chunk).await?;
                out.flush().await
            };
            if let Err(e) = written.await {
                warn!("Echo failed, continuing without it: {}", e);
                echo = None;
            }
        }

        if tx.send(chunk.to_vec()).is_err() {
            return Ok(());
        }
    }
}
