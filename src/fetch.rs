//! Bounded-timeout image download.
//!
//! The fetcher accumulates body bytes as they arrive; intermediaries are
//! free to fragment the body, so a single-chunk response is never
//! assumed. The returned byte sequence is the only signal: a transport
//! error or an expired deadline yields whatever arrived so far (possibly
//! nothing), and the decoder downstream rejects incomplete payloads.

use crate::core::constants::FETCH_TIMEOUT_SECS;
use std::time::Duration;
use tracing::debug;

/// Fetches a URL with the default 10 second transfer bound.
pub async fn fetch_image(url: &str) -> Vec<u8> {
    fetch_image_with_timeout(url, Duration::from_secs(FETCH_TIMEOUT_SECS)).await
}

/// Fetches a URL, bounding the entire transfer by `timeout`.
pub async fn fetch_image_with_timeout(url: &str, timeout: Duration) -> Vec<u8> {
    let mut stream: Vec<u8> = Vec::new();

    let transfer = async {
        let mut response = reqwest::get(url).await?;
        while let Some(chunk) = response.chunk().await? {
            stream.extend_from_slice(&chunk);
        }
        Ok::<(), reqwest::Error>(())
    };

    match tokio::time::timeout(timeout, transfer).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(url, "image fetch failed: {e}"),
        Err(_) => debug!(url, "image fetch timed out after {timeout:?}"),
    }

    stream
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn local_listener() -> (TcpListener, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr)
    }

    #[tokio::test]
    async fn test_unreachable_host_returns_empty() {
        // Bind then drop to get a port nothing listens on.
        let (listener, addr) = local_listener().await;
        drop(listener);

        let bytes =
            fetch_image_with_timeout(&format!("http://{addr}/img.jpg"), Duration::from_secs(2))
                .await;
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_complete_response_returns_all_bytes() {
        let (listener, addr) = local_listener().await;
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 9\r\n\r\nimagedata")
                .await
                .unwrap();
        });

        let bytes =
            fetch_image_with_timeout(&format!("http://{addr}/img.jpg"), Duration::from_secs(5))
                .await;
        assert_eq!(bytes, b"imagedata");
    }

    #[tokio::test]
    async fn test_timeout_returns_partial_bytes() {
        let (listener, addr) = local_listener().await;
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            // Announce more bytes than are sent, then stall.
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial")
                .await
                .unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let bytes =
            fetch_image_with_timeout(&format!("http://{addr}/img.jpg"), Duration::from_millis(500))
                .await;
        assert_eq!(bytes, b"partial");
    }
}
