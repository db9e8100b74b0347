//! The stdout record sink: one JSON object per line.

use crossfire::AsyncRx;
use hark_parser::Record;
use tokio::io::AsyncWriteExt;

/// Drain records to stdout until the upstream channel closes. Consuming
/// from the bounded channel is what renews the decoder's demand.
pub async fn write_json_lines(records: AsyncRx<Record>) {
    let mut stdout = tokio::io::stdout();

    while let Ok(record) = records.recv().await {
        match serde_json::to_vec(&record) {
            Ok(mut line) => {
                line.push(b'\n');
                if let Err(error) = stdout.write_all(&line).await {
                    tracing::error!(%error, "stdout sink write failed");
                    break;
                }
            }
            Err(error) => {
                tracing::warn!(%error, "failed to serialize record");
            }
        }
    }

    let _ = stdout.flush().await;
    tracing::debug!("stdout sink stopped");
}
