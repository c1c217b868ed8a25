//! Output plumbing shared by sessions and processes

use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::logs::{LogBuffer, LogLevel};

/// Drain worker: read `reader` line by line into `buffer` until EOF or
/// until `cancel` fires. Invalid UTF-8 is replaced, not dropped.
pub(crate) async fn drain_lines<R>(
    reader: R,
    level: LogLevel,
    buffer: Arc<LogBuffer>,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::with_capacity(256);
    let source = level.as_str();

    loop {
        line.clear();
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            read = reader.read_until(b'\n', &mut line) => read,
        };

        match read {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                let text = text.trim_end_matches(['\n', '\r']);
                buffer.append(level, source, text).await;
            }
            Err(e) => {
                buffer
                    .append(
                        LogLevel::Error,
                        "system",
                        format!("{source} read failed: {e}"),
                    )
                    .await;
                break;
            }
        }
    }

    debug!(target_id = %buffer.target_id(), stream = source, "Drain worker finished");
}

/// Wait up to `limit` for drain workers to finish. Returns false when some
/// stream is still open, e.g. held by a backgrounded grandchild.
pub(crate) async fn await_drains(drains: Vec<JoinHandle<()>>, limit: Duration) -> bool {
    tokio::time::timeout(limit, futures::future::join_all(drains))
        .await
        .is_ok()
}

/// Read a whole stream into a string, replacing invalid UTF-8
pub(crate) async fn read_all<R>(reader: Option<R>) -> String
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return String::new();
    };
    let mut bytes = Vec::new();
    if let Err(e) = reader.read_to_end(&mut bytes).await {
        debug!(error = %e, "Output read ended early");
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Human-readable exit description, e.g. `exit code 1` or `signal 15`
pub(crate) fn describe_exit(status: &ExitStatus) -> String {
    match (status.code(), status.signal()) {
        (Some(code), _) => format!("exit code {code}"),
        (None, Some(signal)) => format!("signal {signal}"),
        (None, None) => "unknown status".to_string(),
    }
}
