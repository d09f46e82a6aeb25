//! Mock HTTP servers bound to ephemeral local ports.
//!
//! Each server answers from a script of replies: the n-th data request gets the n-th reply,
//! and the last reply repeats once the script runs out. Every request is counted and
//! recorded so tests can check retries, headers and query strings.

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// One scripted HTTP answer.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(value: serde_json::Value) -> Self {
        Reply::json_status(200, value)
    }

    pub fn json_status(status: u16, value: serde_json::Value) -> Self {
        Reply {
            status,
            content_type: "application/json",
            body: value.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Reply {
            status,
            content_type: "text/plain",
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    /// A chat-completion response whose assistant message is `content`.
    pub fn completion(content: &str) -> Self {
        Reply::json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        }))
    }

    /// The same reply, sent only after `delay`.
    pub fn after(self, delay: Duration) -> Self {
        Reply { delay, ..self }
    }

    async fn send(self) -> Response {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

/// What a mock server saw of one request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Path and query, exactly as sent.
    pub uri: String,
    pub authorization: Option<String>,
    pub accept: Option<String>,
    pub body: Option<serde_json::Value>,
}

impl RecordedRequest {
    /// The path and query with percent-encoding undone.
    pub fn decoded_uri(&self) -> String {
        percent_encoding::percent_decode_str(&self.uri)
            .decode_utf8_lossy()
            .into_owned()
    }
}

#[derive(Debug, Default)]
struct Script {
    replies: Vec<Reply>,
    reject_json_mode: bool,
    metadata: Option<String>,
    served: AtomicUsize,
    hits: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl Script {
    fn record(&self, uri: &Uri, headers: &HeaderMap, body: Option<serde_json::Value>) {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let header = |name| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        self.requests.lock().unwrap().push(RecordedRequest {
            uri: uri
                .path_and_query()
                .map_or_else(|| uri.path().to_string(), ToString::to_string),
            authorization: header(header::AUTHORIZATION),
            accept: header(header::ACCEPT),
            body,
        });
    }

    fn next_reply(&self) -> Reply {
        let index = self.served.fetch_add(1, Ordering::SeqCst);
        self.replies
            .get(index)
            .or(self.replies.last())
            .cloned()
            .unwrap_or_else(|| Reply::text(500, "no reply scripted"))
    }
}

/// A running mock server. It stops when dropped.
#[derive(Debug)]
pub struct MockServer {
    address: SocketAddr,
    script: Arc<Script>,
    task: tokio::task::JoinHandle<()>,
}

impl MockServer {
    /// A chat-completion backend answering `POST /v1/chat/completions`.
    pub fn llm(replies: Vec<Reply>) -> Self {
        MockServer::start_llm(Script {
            replies,
            ..Script::default()
        })
    }

    /// A chat-completion backend that answers 400 to every request asking for JSON
    /// response mode, and follows the script otherwise.
    pub fn llm_rejecting_json_mode(replies: Vec<Reply>) -> Self {
        MockServer::start_llm(Script {
            replies,
            reject_json_mode: true,
            ..Script::default()
        })
    }

    /// An OData service answering `GET /odata/standard.odata/<entity>`.
    pub fn odata(replies: Vec<Reply>) -> Self {
        MockServer::start_odata(Script {
            replies,
            ..Script::default()
        })
    }

    /// An OData service that also serves `metadata_xml` as its `$metadata` document.
    pub fn odata_with_metadata(replies: Vec<Reply>, metadata_xml: String) -> Self {
        MockServer::start_odata(Script {
            replies,
            metadata: Some(metadata_xml),
            ..Script::default()
        })
    }

    fn start_llm(script: Script) -> Self {
        let router = Router::new().route("/v1/chat/completions", post(chat_completions));
        MockServer::start(script, router)
    }

    fn start_odata(script: Script) -> Self {
        let router = Router::new().route("/odata/standard.odata/:entity", get(odata_entity));
        MockServer::start(script, router)
    }

    /// Serve `router` on an ephemeral port. Must be called within a tokio runtime.
    fn start(script: Script, router: Router<Arc<Script>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("cannot bind mock server");
        listener
            .set_nonblocking(true)
            .expect("cannot make mock listener non-blocking");
        let address = listener.local_addr().expect("mock server has no address");

        let script = Arc::new(script);
        let app = router.with_state(script.clone());
        let server = axum::Server::from_tcp(listener)
            .expect("cannot serve mock listener")
            .serve(app.into_make_service());
        let task = tokio::spawn(async move {
            if let Err(err) = server.await {
                tracing::error!(error = %err, "mock server stopped");
            }
        });

        MockServer {
            address,
            script,
            task,
        }
    }

    /// `http://127.0.0.1:<port>`
    pub fn root_url(&self) -> String {
        format!("http://{}", self.address)
    }

    /// The base URL to configure for the chat-completion backend.
    pub fn llm_url(&self) -> String {
        format!("{}/v1", self.root_url())
    }

    /// The base URL to configure for the OData service.
    pub fn odata_url(&self) -> String {
        format!("{}/odata", self.root_url())
    }

    /// Number of requests received, of any kind.
    pub fn hits(&self) -> usize {
        self.script.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.requests.lock().unwrap().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A URL nothing listens on, so connecting to it is refused.
pub fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("cannot bind probe listener");
    let address = listener.local_addr().expect("probe listener has no address");
    drop(listener);
    format!("http://{address}")
}

/// A server answering every request with `status` and a body that ends before its declared
/// length.
pub async fn truncated_body_url(status: u16) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("cannot bind truncating listener");
    let address = listener
        .local_addr()
        .expect("truncating listener has no address");
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            if read_request(&mut stream).await.is_err() {
                continue;
            }
            let head = format!(
                "HTTP/1.1 {status} Error\r\ncontent-type: text/plain\r\ncontent-length: 100\r\n\r\npartial"
            );
            let _ = stream.write_all(head.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });
    format!("http://{address}")
}

/// Read one request, headers and body, from `stream`.
async fn read_request(stream: &mut tokio::net::TcpStream) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Ok(());
        }
        buffer.extend_from_slice(&chunk[..read]);
        let text = String::from_utf8_lossy(&buffer);
        let Some(header_end) = text.find("\r\n\r\n") else {
            continue;
        };
        let content_length = text[..header_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buffer.len() >= header_end + 4 + content_length {
            return Ok(());
        }
    }
}

async fn chat_completions(
    State(script): State<Arc<Script>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: Option<serde_json::Value> = serde_json::from_slice(&body).ok();
    let json_mode = body
        .as_ref()
        .is_some_and(|body| body.get("response_format").is_some());
    script.record(&uri, &headers, body);

    if script.reject_json_mode && json_mode {
        return Reply::json_status(
            400,
            json!({"error": {"message": "response_format is not supported by this model"}}),
        )
        .send()
        .await;
    }
    script.next_reply().send().await
}

async fn odata_entity(
    State(script): State<Arc<Script>>,
    Path(entity): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    script.record(&uri, &headers, None);

    if entity == "$metadata" {
        return match &script.metadata {
            Some(xml) => Reply {
                content_type: "application/xml",
                ..Reply::text(200, xml.clone())
            }
            .send()
            .await,
            None => Reply::text(404, "no metadata").send().await,
        };
    }
    script.next_reply().send().await
}
