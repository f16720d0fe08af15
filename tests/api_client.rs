//! End-to-end tests of the HTTP client against a local stub server

use std::time::Duration;

use edubot::api::{ApiClient, ApiErrorKind, ChatService};
use edubot::config::ApiConfig;
use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// What the stub saw for a single request
#[derive(Debug)]
struct Captured {
    request_line: String,
    body: String,
}

/// Canned answer served by the stub
struct Canned {
    status: &'static str,
    body: String,
    delay: Duration,
}

impl Canned {
    fn json(status: &'static str, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }
}

/// Serve exactly one request, returning the base URL and what was received
async fn serve_once(canned: Canned) -> (String, oneshot::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut socket).await;
        let _ = tx.send(captured);

        tokio::time::sleep(canned.delay).await;

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            canned.status,
            canned.body.len(),
            canned.body
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    (format!("http://{}", addr), rx)
}

async fn read_request(socket: &mut TcpStream) -> Captured {
    let mut data = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        data.extend_from_slice(&chunk[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while data.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..n]);
    }

    Captured {
        request_line: head.lines().next().unwrap_or_default().to_string(),
        body: String::from_utf8_lossy(&data[header_end..]).to_string(),
    }
}

fn client(base_url: &str, timeout_secs: u64) -> ApiClient {
    ApiClient::new(&ApiConfig {
        base_url: base_url.to_string(),
        timeout_secs,
    })
    .unwrap()
}

#[tokio::test]
async fn successful_reply_returns_text_and_posts_expected_body() {
    let (url, captured) = serve_once(Canned::json(
        "200 OK",
        r#"{"response":"Una variable guarda un valor.","conversation_id":null}"#,
    ))
    .await;

    let reply = client(&url, 5).send("¿Qué es una variable?").await.unwrap();
    assert_eq!(reply.text, "Una variable guarda un valor.");
    assert_eq!(reply.conversation_id, None);

    let captured = captured.await.unwrap();
    assert!(captured.request_line.starts_with("POST /chat "));
    let body: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "message": "¿Qué es una variable?", "conversation_id": null })
    );
}

#[tokio::test]
async fn rate_limit_uses_fixed_message() {
    let (url, _captured) =
        serve_once(Canned::json("429 Too Many Requests", r#"{"detail":"slow down"}"#)).await;

    let err = client(&url, 5).send("hola").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::RateLimited);
    assert_eq!(err.message, "Demasiadas solicitudes. Por favor, espera un momento.");
}

#[tokio::test]
async fn unavailable_service_is_classified() {
    let (url, _captured) = serve_once(Canned::json("503 Service Unavailable", "{}")).await;

    let err = client(&url, 5).send("hola").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::ServiceUnavailable);
    assert_eq!(err.message, "Servicio no disponible temporalmente.");
}

#[tokio::test]
async fn internal_error_is_classified() {
    let (url, _captured) =
        serve_once(Canned::json("500 Internal Server Error", r#"{"detail":"boom"}"#)).await;

    let err = client(&url, 5).send("hola").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::InternalServiceError);
    assert_eq!(err.message, "Error interno del servidor.");
}

#[tokio::test]
async fn other_status_surfaces_server_detail() {
    let (url, _captured) = serve_once(Canned::json(
        "400 Bad Request",
        r#"{"detail":"El mensaje es demasiado largo"}"#,
    ))
    .await;

    let err = client(&url, 5).send("hola").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::RequestRejected);
    assert_eq!(err.message, "El mensaje es demasiado largo");
}

#[tokio::test]
async fn other_status_without_detail_uses_generic_message() {
    let (url, _captured) = serve_once(Canned::json("404 Not Found", "not json")).await;

    let err = client(&url, 5).send("hola").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::RequestRejected);
    assert_eq!(err.message, "Error en la solicitud.");
}

#[tokio::test]
async fn success_status_with_wrong_shape_is_rejected() {
    let (url, _captured) = serve_once(Canned::json("200 OK", r#"{"answer":"?"}"#)).await;

    let err = client(&url, 5).send("hola").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::RequestRejected);
}

#[tokio::test]
async fn refused_connection_is_connectivity_failure() {
    // Bind then drop to get a port with nothing listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{}", addr), 5)
        .send("hola")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::ConnectivityFailure);
    assert_eq!(err.message, "No se pudo conectar con el servidor. Verifica tu conexión.");
}

#[tokio::test]
async fn timeout_is_connectivity_failure() {
    let (url, _captured) = serve_once(Canned {
        status: "200 OK",
        body: r#"{"response":"tarde"}"#.to_string(),
        delay: Duration::from_secs(3),
    })
    .await;

    let err = client(&url, 1).send("hola").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::ConnectivityFailure);
}

#[tokio::test]
async fn health_reports_readiness() {
    let (url, captured) = serve_once(Canned::json(
        "200 OK",
        r#"{"status":"healthy","edubot_initialized":true}"#,
    ))
    .await;

    let status = client(&url, 5).health().await.unwrap();
    assert!(status.is_ready());

    let captured = captured.await.unwrap();
    assert!(captured.request_line.starts_with("GET /health "));
}

#[tokio::test]
async fn health_failure_is_classified() {
    let (url, _captured) = serve_once(Canned::json("503 Service Unavailable", "{}")).await;

    let err = client(&url, 5).health().await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::ServiceUnavailable);
}
