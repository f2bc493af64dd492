//! One-shot loopback listener for the OAuth redirect.
//!
//! The listener serves a single route (the path of the redirect URI). The
//! first request on that route resolves the [`PendingCallback`] with either
//! the authorization code or an error, after which the listener shuts down.
//! Requests to other paths get a 404 and are otherwise ignored.
//!
//! Connections are served concurrently, so a browser preconnect that never
//! sends a request cannot hold up the real redirect.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::error::{FitbitError, FitbitResult};

const SUCCESS_PAGE: &str = "<html><body><h1>Authorization Successful</h1>\
    <p>You can close this window and return to the terminal.</p></body></html>";

const FAILURE_PAGE: &str = "<html><body><h1>Authorization Failed</h1>\
    <p>Authorization failed. Please try again.</p></body></html>";

const NOT_FOUND_PAGE: &str = "<html><body><h1>Not Found</h1></body></html>";

/// How long a connection may take to send its request head.
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// A bound, not yet serving, callback listener.
#[derive(Debug)]
pub struct CallbackListener {
    listener: TcpListener,
    path: String,
}

impl CallbackListener {
    /// Binds `127.0.0.1:port`. Port 0 picks a free port.
    pub async fn bind(port: u16, path: impl Into<String>) -> FitbitResult<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await.map_err(|e| {
            FitbitError::auth(format!("failed to start callback listener on port {}: {}", port, e))
        })?;
        let path = path.into();
        debug!(port, path = %path, "callback listener bound");
        Ok(Self { listener, path })
    }

    /// The port actually bound.
    pub fn local_port(&self) -> FitbitResult<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    /// Starts serving in the background.
    pub fn spawn(self) -> PendingCallback {
        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(serve(self.listener, self.path, tx));
        PendingCallback { rx, task }
    }
}

/// The single result slot of a running listener.
///
/// Dropping it stops the listener.
#[derive(Debug)]
pub struct PendingCallback {
    rx: oneshot::Receiver<FitbitResult<String>>,
    task: JoinHandle<()>,
}

impl PendingCallback {
    /// Waits for the authorization code.
    pub async fn wait(mut self) -> FitbitResult<String> {
        match (&mut self.rx).await {
            Ok(result) => result,
            Err(_) => Err(FitbitError::auth("callback listener stopped unexpectedly")),
        }
    }
}

impl Drop for PendingCallback {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(listener: TcpListener, path: String, tx: oneshot::Sender<FitbitResult<String>>) {
    let route: Arc<str> = Arc::from(path);
    // Dropping the set on return aborts connections still in flight.
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "callback connection");
                    connections.spawn(handle_connection(stream, Arc::clone(&route)));
                }
                Err(e) => error!("failed to accept callback connection: {}", e),
            },
            Some(joined) = connections.join_next() => {
                if let Ok(Some(result)) = joined {
                    let _ = tx.send(result);
                    info!("callback received, listener closed");
                    return;
                }
            }
        }
    }
}

/// Answers one request. Returns `None` if it was not for the callback route.
async fn handle_connection(stream: TcpStream, route: Arc<str>) -> Option<FitbitResult<String>> {
    let mut reader = BufReader::new(stream);
    let request_line = match tokio::time::timeout(READ_TIMEOUT, read_head(&mut reader)).await {
        Ok(Some(line)) => line,
        Ok(None) => return None,
        Err(_) => {
            debug!("dropping callback connection that sent no request");
            return None;
        }
    };
    let mut stream = reader.into_inner();

    // GET /?code=...&state=... HTTP/1.1
    let mut parts = request_line.split_whitespace();
    let (Some("GET"), Some(target)) = (parts.next(), parts.next()) else {
        respond(&mut stream, "405 Method Not Allowed", NOT_FOUND_PAGE).await;
        return None;
    };

    let (request_path, query) = target.split_once('?').unwrap_or((target, ""));
    if request_path != &*route {
        debug!(path = request_path, "ignoring request outside the callback route");
        respond(&mut stream, "404 Not Found", NOT_FOUND_PAGE).await;
        return None;
    }

    let params = CallbackParams::parse(query);
    let result = params.into_result();
    match &result {
        Ok(_) => respond(&mut stream, "200 OK", SUCCESS_PAGE).await,
        Err(e) => {
            warn!("authorization callback failed: {}", e);
            respond(&mut stream, "400 Bad Request", FAILURE_PAGE).await;
        }
    }
    Some(result)
}

/// Reads the request line and drains the headers after it.
async fn read_head(reader: &mut BufReader<TcpStream>) -> Option<String> {
    let mut request_line = String::new();
    match reader.read_line(&mut request_line).await {
        Ok(0) | Err(_) => return None,
        Ok(_) => {}
    }

    // Drain headers so closing the socket does not reset the connection.
    let mut header = String::new();
    loop {
        header.clear();
        match reader.read_line(&mut header).await {
            Ok(0) | Err(_) => break,
            Ok(_) if header.trim().is_empty() => break,
            Ok(_) => {}
        }
    }
    Some(request_line)
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.flush().await;
    let _ = stream.shutdown().await;
}

#[derive(Debug, Default, PartialEq, Eq)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CallbackParams {
    fn parse(query: &str) -> Self {
        let mut params = Self::default();
        for pair in query.split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = urlencoding::decode(&value.replace('+', " "))
                .map(|v| v.into_owned())
                .unwrap_or_default();
            match key {
                "code" => params.code = Some(value),
                "error" => params.error = Some(value),
                "error_description" => params.error_description = Some(value),
                _ => {}
            }
        }
        params
    }

    fn into_result(self) -> FitbitResult<String> {
        if let Some(error) = self.error {
            let detail = self
                .error_description
                .map(|d| format!(" ({})", d))
                .unwrap_or_default();
            return Err(FitbitError::auth(format!(
                "authorization denied: {}{}",
                error, detail
            )));
        }
        match self.code {
            Some(code) if !code.is_empty() => Ok(code),
            _ => Err(FitbitError::auth("missing authorization code in callback")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn start(path: &str) -> (u16, PendingCallback) {
        let listener = CallbackListener::bind(0, path).await.unwrap();
        let port = listener.local_port().unwrap();
        (port, listener.spawn())
    }

    #[test]
    fn parses_code_and_error() {
        let params = CallbackParams::parse("code=abc%20123&state=x");
        assert_eq!(params.code.as_deref(), Some("abc 123"));
        assert_eq!(params.into_result().unwrap(), "abc 123");

        let denied = CallbackParams::parse("error=access_denied&error_description=user+said+no");
        let err = denied.into_result().unwrap_err();
        assert_eq!(
            err.to_string(),
            "authorization failed: authorization denied: access_denied (user said no)"
        );

        assert!(CallbackParams::parse("").into_result().is_err());
        assert!(CallbackParams::parse("code=").into_result().is_err());
    }

    #[tokio::test]
    async fn delivers_code_and_answers_browser() {
        let (port, pending) = start("/").await;

        let response = reqwest::get(format!("http://127.0.0.1:{}/?code=abc123", port))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.text().await.unwrap().contains("Authorization Successful"));

        assert_eq!(pending.wait().await.unwrap(), "abc123");
    }

    #[tokio::test]
    async fn missing_code_fails_instead_of_hanging() {
        let (port, pending) = start("/").await;

        let response = reqwest::get(format!("http://127.0.0.1:{}/?state=only", port))
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        assert!(
            response
                .text()
                .await
                .unwrap()
                .contains("Authorization failed. Please try again.")
        );

        let err = pending.wait().await.unwrap_err();
        assert!(matches!(err, FitbitError::Auth(ref m) if m.contains("missing authorization code")));
    }

    #[tokio::test]
    async fn other_paths_do_not_resolve() {
        let (port, pending) = start("/callback").await;

        let favicon = reqwest::get(format!("http://127.0.0.1:{}/favicon.ico", port))
            .await
            .unwrap();
        assert_eq!(favicon.status(), 404);

        let ok = reqwest::get(format!("http://127.0.0.1:{}/callback?code=xyz", port))
            .await
            .unwrap();
        assert_eq!(ok.status(), 200);
        assert_eq!(pending.wait().await.unwrap(), "xyz");
    }

    #[tokio::test]
    async fn listener_closes_after_result() {
        let (port, pending) = start("/").await;
        reqwest::get(format!("http://127.0.0.1:{}/?code=once", port))
            .await
            .unwrap();
        pending.wait().await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let again = reqwest::get(format!("http://127.0.0.1:{}/?code=twice", port)).await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn idle_connection_does_not_block_the_redirect() {
        let (port, pending) = start("/").await;

        let _idle = tokio::net::TcpStream::connect(("127.0.0.1", port))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let response = tokio::time::timeout(
            std::time::Duration::from_secs(3),
            reqwest::get(format!("http://127.0.0.1:{}/?code=abc", port)),
        )
        .await
        .expect("redirect was not answered")
        .unwrap();
        assert_eq!(response.status(), 200);

        let code = tokio::time::timeout(std::time::Duration::from_secs(3), pending.wait())
            .await
            .expect("code was not delivered")
            .unwrap();
        assert_eq!(code, "abc");
    }

    #[tokio::test]
    async fn bind_conflict_is_auth_error() {
        let first = CallbackListener::bind(0, "/").await.unwrap();
        let port = first.local_port().unwrap();
        let err = CallbackListener::bind(port, "/").await.unwrap_err();
        assert!(matches!(err, FitbitError::Auth(_)));
    }
}
