//! Minimal liveness endpoint for container health checks.

use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const RESPONSE: &[u8] =
    b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\nConnection: close\r\n\r\nOK";

pub async fn bind(port: u16) -> Result<TcpListener> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "Health endpoint listening");
    Ok(listener)
}

/// Answers every connection with `200 OK`, regardless of the request.
pub async fn serve(listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                tokio::spawn(async move {
                    let mut buf = [0u8; 512];
                    let _ = stream.read(&mut buf).await;
                    let _ = stream.write_all(RESPONSE).await;
                });
            }
            Err(err) => {
                // A persistent failure (e.g. fd exhaustion) must not spin
                // the loop hot.
                tracing::warn!(error = %err, "Health accept failed");
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}
