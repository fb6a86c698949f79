//! System-browser driver for the interactive sign-in flows.
//!
//! Popup flow: bind a loopback listener, open the authorize URL in the
//! user's browser with `redirect_to` pointing back at us, and wait for the
//! provider to call back. The app keeps running the whole time.
//!
//! Redirect flow: open the authorize URL over the primary surface and let
//! the provider return the reply through the app's registered return URL.
//! The host records that launch URL on startup; we consume it here.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, error, info};
use url::Url;

use crate::codes;
use crate::error::{BackendError, IdentityResult};
use crate::flows::{AuthorizeRequest, CallbackReply, FlowDriver};

/// How long a popup flow waits for the provider before giving up.
pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 300;

/// Loopback HTTP listener that receives one provider callback.
pub struct CallbackServer {
    listener: TcpListener,
    port: u16,
}

impl CallbackServer {
    /// Bind the loopback listener. `None` lets the OS pick a free port.
    ///
    /// Binding happens before the browser opens so the callback URL is
    /// known up front.
    pub async fn bind(port: Option<u16>) -> IdentityResult<Self> {
        let addr = format!("127.0.0.1:{}", port.unwrap_or(0));
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            BackendError::new(
                codes::POPUP_BLOCKED,
                format!("could not listen on {}: {}", addr, e),
            )
        })?;
        let port = listener
            .local_addr()
            .map_err(|e| {
                BackendError::new(codes::POPUP_BLOCKED, format!("no local address: {}", e))
            })?
            .port();
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Where the provider should send the user back to.
    pub fn callback_url(&self) -> String {
        format!("http://localhost:{}/callback", self.port)
    }

    /// Serve until the first `/callback` hit, then hand back its reply.
    ///
    /// The reply is returned as-is even when it carries a provider error;
    /// classifying it is the backend's job. Timing out means the user
    /// closed or abandoned the window.
    pub async fn wait_for_reply(self, timeout_secs: u64) -> IdentityResult<CallbackReply> {
        let (tx, rx) = oneshot::channel::<CallbackReply>();
        let tx = Arc::new(tokio::sync::Mutex::new(Some(tx)));
        let listener = self.listener;

        let server_handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((mut socket, _)) => {
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(&mut socket, tx).await {
                                error!("callback connection failed: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("callback accept failed: {}", e);
                        break;
                    }
                }
            }
        });

        let timeout = tokio::time::Duration::from_secs(timeout_secs);
        let result = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(BackendError::new(
                codes::POPUP_CLOSED_BY_USER,
                "sign-in window went away before replying",
            )),
            Err(_) => Err(BackendError::new(
                codes::POPUP_CLOSED_BY_USER,
                format!("no provider reply within {}s", timeout_secs),
            )),
        };

        server_handle.abort();
        result
    }
}

/// Parse one HTTP request; forward the reply if it hit `/callback`.
async fn handle_connection(
    socket: &mut tokio::net::TcpStream,
    tx: Arc<tokio::sync::Mutex<Option<oneshot::Sender<CallbackReply>>>>,
) -> std::io::Result<()> {
    let (reader, mut writer) = socket.split();
    let mut reader = BufReader::new(reader);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    debug!(request = %request_line.trim(), "callback request");

    if !request_line.starts_with("GET ") {
        send_response(&mut writer, 405, "Method Not Allowed", "Method Not Allowed").await?;
        return Ok(());
    }

    let path_end = request_line.find(" HTTP/").unwrap_or(request_line.len());
    let path = &request_line[4..path_end];

    // Browsers also ask for favicons; only /callback may consume the reply.
    if !path.starts_with("/callback") {
        send_response(&mut writer, 404, "Not Found", "Not Found").await?;
        return Ok(());
    }

    let query = path.find('?').map(|idx| &path[idx + 1..]).unwrap_or("");
    let reply = CallbackReply::from_pairs(
        url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned())),
    );

    let body = if let Some(error) = &reply.error {
        error_page(reply.error_description.as_deref().unwrap_or(error))
    } else if reply.access_token.is_some() {
        success_page()
    } else {
        error_page("the provider reply is missing its sign-in parameters")
    };
    send_response(&mut writer, 200, "OK", &body).await?;

    if let Some(tx) = tx.lock().await.take() {
        let _ = tx.send(reply);
    }

    Ok(())
}

async fn send_response(
    writer: &mut tokio::net::tcp::WriteHalf<'_>,
    status_code: u16,
    status_text: &str,
    body: &str,
) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_code,
        status_text,
        body.len(),
        body
    );
    writer.write_all(response.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

fn success_page() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>Felt - Signed in</title></head>
<body style="font-family: system-ui; text-align: center; padding: 48px; background: #faf7f2;">
<div style="max-width: 420px; margin: 0 auto; background: white; padding: 40px; border-radius: 12px;">
<h1 style="color: #e0578a; margin-bottom: 16px;">You're signed in</h1>
<p style="color: #666;">You can close this window and head back to Felt.</p>
</div>
<script>setTimeout(() => window.close(), 2000);</script>
</body>
</html>"#
        .to_string()
}

fn error_page(detail: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Felt - Sign-in failed</title></head>
<body style="font-family: system-ui; text-align: center; padding: 48px; background: #faf7f2;">
<div style="max-width: 420px; margin: 0 auto; background: white; padding: 40px; border-radius: 12px;">
<h1 style="color: #b3404a; margin-bottom: 16px;">Sign-in didn't finish</h1>
<p style="color: #666;">{}</p>
<p style="color: #888; font-size: 14px;">You can close this window and try again from Felt.</p>
</div>
</body>
</html>"#,
        detail
    )
}

/// Pull a callback reply out of the URL the app was launched with.
///
/// Providers return tokens in the query or, for implicit grants, in the
/// fragment; both are checked. A launch URL with neither tokens nor an
/// error is an ordinary app open, not a reply.
pub fn parse_launch_reply(url: &Url) -> Option<CallbackReply> {
    let query_pairs = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()));
    let fragment_pairs = url
        .fragment()
        .map(|fragment| {
            url::form_urlencoded::parse(fragment.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let reply = CallbackReply::from_pairs(query_pairs.chain(fragment_pairs));
    reply.is_meaningful().then_some(reply)
}

/// [`FlowDriver`] backed by the user's default browser.
pub struct SystemBrowserFlows {
    callback_port: Option<u16>,
    timeout_secs: u64,
    return_url: Option<Url>,
    launch_url: StdMutex<Option<Url>>,
}

impl SystemBrowserFlows {
    pub fn new() -> Self {
        Self {
            callback_port: None,
            timeout_secs: DEFAULT_CALLBACK_TIMEOUT_SECS,
            return_url: None,
            launch_url: StdMutex::new(None),
        }
    }

    /// Pin the loopback callback to a fixed port instead of an OS-picked
    /// one. Needed when the provider allowlists exact redirect URLs.
    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = Some(port);
        self
    }

    pub fn callback_port(&self) -> Option<u16> {
        self.callback_port
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Where redirect-based sign-in should land. Without one the service
    /// falls back to the app's registered return URL.
    pub fn with_return_url(mut self, url: Url) -> Self {
        self.return_url = Some(url);
        self
    }

    /// Record the URL this process was launched with, so a redirect reply
    /// riding on it can be consumed later.
    pub fn record_launch_url(&self, url: Url) {
        *self.launch_url.lock().expect("lock poisoned") = Some(url);
    }
}

impl Default for SystemBrowserFlows {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FlowDriver for SystemBrowserFlows {
    async fn run_popup(&self, request: &AuthorizeRequest) -> IdentityResult<CallbackReply> {
        let server = CallbackServer::bind(self.callback_port).await?;

        let mut url = request.url.clone();
        url.query_pairs_mut()
            .append_pair("redirect_to", &server.callback_url());

        info!(port = server.port(), "opening browser for interactive sign-in");
        open::that(url.as_str()).map_err(|e| {
            BackendError::new(
                codes::POPUP_BLOCKED,
                format!("could not open a browser window: {}", e),
            )
        })?;

        server.wait_for_reply(self.timeout_secs).await
    }

    async fn begin_redirect(&self, request: &AuthorizeRequest) -> IdentityResult<()> {
        let mut url = request.url.clone();
        if let Some(return_url) = &self.return_url {
            url.query_pairs_mut()
                .append_pair("redirect_to", return_url.as_str());
        }

        debug!("handing the primary surface to the provider");
        open::that(url.as_str()).map_err(|e| {
            BackendError::new(
                codes::POPUP_BLOCKED,
                format!("could not open a browser window: {}", e),
            )
        })
    }

    async fn take_redirect_reply(&self) -> IdentityResult<Option<CallbackReply>> {
        let url = self.launch_url.lock().expect("lock poisoned").take();
        let Some(url) = url else {
            return Ok(None);
        };
        match parse_launch_reply(&url) {
            Some(reply) => {
                debug!("consumed a provider reply from the launch URL");
                Ok(Some(reply))
            }
            None => Ok(None),
        }
    }
}
