/// Report HTTP endpoint
/// Minimal HTTP/1.1 surface for triggering reports and fetching their results

use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::registry::{ReportService, ReportStatus};

/// Timeout for reading HTTP request (prevents slow-loris attacks)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Filename offered to clients downloading a finished report
pub const REPORT_FILENAME: &str = "report.csv";

/// A fully rendered HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl Response {
    fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            headers: Vec::new(),
            body: body.to_string().into_bytes(),
        }
    }

    fn csv(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: "text/csv",
            headers: vec![(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", REPORT_FILENAME),
            )],
            body,
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            500 => "Internal Server Error",
            _ => "Unknown",
        }
    }

    /// Serialize status line, headers and body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len()
        );
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("Connection: close\r\n\r\n");

        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

/// Run the report HTTP server until cancelled
pub async fn run_server(listener: TcpListener, service: ReportService, cancel_token: CancellationToken) {
    match listener.local_addr() {
        Ok(addr) => info!("Report server listening on http://{}", addr),
        Err(e) => warn!("Report server listening on unknown address: {}", e),
    }

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((mut socket, peer_addr)) => {
                        let service = service.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(&mut socket, &service).await {
                                debug!("Error handling request from {}: {}", peer_addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                info!("Report server shutting down");
                break;
            }
        }
    }
}

/// Bind on all interfaces and serve
pub async fn serve(port: u16, service: ReportService, cancel_token: CancellationToken) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind report server on port {}: {}", port, e);
        e
    })?;
    run_server(listener, service, cancel_token).await;
    Ok(())
}

async fn handle_connection(
    socket: &mut tokio::net::TcpStream,
    service: &ReportService,
) -> std::io::Result<()> {
    let mut buf = [0u8; 2048];

    // Apply timeout to prevent slow-loris attacks
    let n = match timeout(REQUEST_TIMEOUT, socket.read(&mut buf)).await {
        Ok(result) => result?,
        Err(_) => {
            debug!("Request timeout after {:?}", REQUEST_TIMEOUT);
            return Ok(());
        }
    };

    if n == 0 {
        return Ok(());
    }

    let request = String::from_utf8_lossy(&buf[..n]);
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("GET");
    let target = parts.next().unwrap_or("/");

    let response = route(method, target, service).await;

    socket.write_all(&response.to_bytes()).await?;
    socket.flush().await?;

    Ok(())
}

/// Dispatch a request line to its handler
pub async fn route(method: &str, target: &str, service: &ReportService) -> Response {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    match (method, path) {
        ("POST", "/trigger_report") | ("POST", "/trigger_report/") => {
            let (report_id, _) = service.trigger_report();
            Response::json(200, json!({ "report_id": report_id }))
        }
        ("GET", "/get_report") | ("GET", "/get_report/") => match query_param(query, "report_id") {
            Some(report_id) => get_report(service, &report_id).await,
            None => Response::json(400, json!({ "error": "Missing report_id" })),
        },
        ("GET", "/health") | ("GET", "/healthz") => Response::json(
            200,
            json!({ "status": "healthy", "reports": service.registry().len() }),
        ),
        (_, "/trigger_report") | (_, "/get_report") | (_, "/health") => {
            Response::json(405, json!({ "error": "Method Not Allowed" }))
        }
        _ => Response::json(404, json!({ "error": "Not Found" })),
    }
}

async fn get_report(service: &ReportService, report_id: &str) -> Response {
    match service.fetch_report(report_id) {
        None => Response::json(404, json!({ "error": "Report not found" })),
        Some(ReportStatus::Running) => Response::json(200, json!({ "status": "Running" })),
        Some(ReportStatus::Failed { cause }) => {
            Response::json(500, json!({ "status": "Failed", "error": cause }))
        }
        Some(ReportStatus::Complete { location }) => match tokio::fs::read(&location).await {
            Ok(body) => Response::csv(body),
            Err(e) => {
                error!("Report {} artifact unreadable at {}: {}", report_id, location.display(), e);
                Response::json(500, json!({ "status": "Failed", "error": "report artifact unavailable" }))
            }
        },
    }
}

/// Extract and percent-decode a query parameter
fn query_param(query: &str, name: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| {
            urlencoding::decode(&value.replace('+', " "))
                .ok()
                .map(|decoded| decoded.into_owned())
        })
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hours::BusinessHoursTable;
    use crate::ingest::Dataset;
    use crate::model::{Poll, PollStatus};
    use crate::registry::ReportRegistry;
    use crate::timezone::TimezoneTable;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn service() -> (ReportService, PathBuf) {
        let dir = std::env::temp_dir().join(format!("store-uptime-server-{}", uuid::Uuid::new_v4()));
        let polls = vec![(
            "1".to_string(),
            Poll::new(Utc.with_ymd_and_hms(2023, 1, 16, 12, 0, 0).unwrap(), PollStatus::Active),
        )];
        let dataset = Dataset::from_parts(polls, BusinessHoursTable::new(), TimezoneTable::new("America/Chicago"));
        (
            ReportService::new(Arc::new(ReportRegistry::new()), Arc::new(dataset), &dir),
            dir,
        )
    }

    fn body_json(response: &Response) -> serde_json::Value {
        serde_json::from_slice(&response.body).unwrap()
    }

    #[test]
    fn test_query_param() {
        assert_eq!(query_param("report_id=abc", "report_id"), Some("abc".to_string()));
        assert_eq!(query_param("x=1&report_id=a%2Db", "report_id"), Some("a-b".to_string()));
        assert_eq!(query_param("report_id=", "report_id"), None);
        assert_eq!(query_param("", "report_id"), None);
        assert_eq!(query_param("other=1", "report_id"), None);
    }

    #[test]
    fn test_response_serialization() {
        let response = Response::json(404, json!({ "error": "Report not found" }));
        let text = String::from_utf8(response.to_bytes()).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Content-Type: application/json"));
        assert!(text.ends_with("{\"error\":\"Report not found\"}"));
    }

    #[test]
    fn test_csv_response_has_fixed_filename() {
        let response = Response::csv(b"store_id\n".to_vec());
        let text = String::from_utf8(response.to_bytes()).unwrap();
        assert!(text.contains("Content-Type: text/csv"));
        assert!(text.contains("filename=\"report.csv\""));
        assert!(text.contains("Content-Length: 9"));
    }

    #[tokio::test]
    async fn test_unknown_report_is_not_found() {
        let (service, _) = service();
        let response = route("GET", "/get_report?report_id=missing", &service).await;
        assert_eq!(response.status, 404);
        assert_eq!(body_json(&response)["error"], "Report not found");
    }

    #[tokio::test]
    async fn test_missing_report_id_is_bad_request() {
        let (service, _) = service();
        let response = route("GET", "/get_report", &service).await;
        assert_eq!(response.status, 400);
    }

    #[tokio::test]
    async fn test_running_report() {
        let (service, _) = service();
        let id = service.registry().create();
        let response = route("GET", &format!("/get_report?report_id={}", id), &service).await;
        assert_eq!(response.status, 200);
        assert_eq!(body_json(&response)["status"], "Running");
    }

    #[tokio::test]
    async fn test_failed_report() {
        let (service, _) = service();
        let id = service.registry().create();
        service.registry().finish(&id, Err("unknown timezone 'X'".to_string())).unwrap();
        let response = route("GET", &format!("/get_report?report_id={}", id), &service).await;
        assert_eq!(response.status, 500);
        let body = body_json(&response);
        assert_eq!(body["status"], "Failed");
        assert_eq!(body["error"], "unknown timezone 'X'");
    }

    #[tokio::test]
    async fn test_trigger_then_fetch_csv() {
        let (service, dir) = service();
        let response = route("POST", "/trigger_report", &service).await;
        assert_eq!(response.status, 200);
        let id = body_json(&response)["report_id"].as_str().unwrap().to_string();

        // Wait for the background worker
        let mut fetched = route("GET", &format!("/get_report?report_id={}", id), &service).await;
        for _ in 0..100 {
            if fetched.content_type == "text/csv" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            fetched = route("GET", &format!("/get_report?report_id={}", id), &service).await;
        }

        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.content_type, "text/csv");
        let text = String::from_utf8(fetched.body).unwrap();
        assert!(text.starts_with("store_id,uptime_last_hour"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_health_and_unknown_paths() {
        let (service, _) = service();
        assert_eq!(route("GET", "/health", &service).await.status, 200);
        assert_eq!(route("GET", "/nope", &service).await.status, 404);
        assert_eq!(route("GET", "/trigger_report", &service).await.status, 405);
    }

    #[tokio::test]
    async fn test_server_starts_and_stops() {
        let (service, _) = service();
        let cancel_token = CancellationToken::new();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let handle = tokio::spawn(run_server(listener, service, cancel_token.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel_token.cancel();

        tokio::time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("Server should shutdown within timeout")
            .expect("Server should complete without panic");
    }
}
