//! HTTP request handler.
//!
//! Routes:
//! - `GET <path>?<form>`: table request decoded from the query string
//! - `POST <path>`: JSON body when `Content-Type` is `application/json`,
//!   urlencoded form body otherwise
//! - `GET /health`: liveness check

use crate::config::{NetworkConfig, HEALTH_PATH};
use crate::error::ServerError;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use tablewire_protocol::{Decoder, Encoder, Request as TableRequest};
use tablewire_store::TableService;

const JSON_MIME: &str = "application/json";

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub requests_total: AtomicU64,
    pub errors_total: AtomicU64,
}

/// Decodes table requests and answers them from a [`TableService`].
pub struct TableHandler {
    service: TableService,
    path: String,
    max_body_bytes: usize,
    stats: ServerStats,
}

impl TableHandler {
    pub fn new(config: &NetworkConfig, service: TableService) -> Self {
        Self {
            service,
            path: config.path.clone(),
            max_body_bytes: config.max_body_bytes,
            stats: ServerStats::default(),
        }
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Handles one HTTP request. Never fails: every error maps to a status.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.stats.requests_total.fetch_add(1, Ordering::Relaxed);

        let path = req.uri().path();
        if path == HEALTH_PATH {
            return text_response(StatusCode::OK, "OK");
        }
        if path != self.path {
            return text_response(StatusCode::NOT_FOUND, "Not Found");
        }

        let method = req.method().clone();
        let decoded = match method {
            Method::GET => decode_query(req.uri().query()),
            Method::POST => self.decode_body(req).await,
            _ => {
                let mut response =
                    text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
                response
                    .headers_mut()
                    .insert(ALLOW, HeaderValue::from_static("GET, POST"));
                return response;
            }
        };

        let request = match decoded {
            Ok(request) => request,
            Err(e) => {
                self.stats.errors_total.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Rejected {} {}: {}", method, self.path, e);
                return text_response(e.status_code(), &e.to_string());
            }
        };

        tracing::debug!(
            draw = request.draw,
            start = request.start,
            length = request.length,
            columns = request.columns.len(),
            "Table request"
        );

        let response = self.service.respond(&request);
        if response.is_error() {
            self.stats.errors_total.fetch_add(1, Ordering::Relaxed);
        }

        match Encoder::encode_response(&response) {
            Ok(body) => json_response(body),
            Err(e) => {
                self.stats.errors_total.fetch_add(1, Ordering::Relaxed);
                tracing::error!("Failed to encode response draw={}: {}", request.draw, e);
                text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }

    async fn decode_body<B>(&self, req: Request<B>) -> Result<TableRequest, ServerError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(is_json_content_type)
            .unwrap_or(false);

        let limit = self.max_body_bytes;
        let body = Limited::new(req.into_body(), limit)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    ServerError::BodyTooLarge { limit }
                } else {
                    ServerError::Body(e.to_string())
                }
            })?
            .to_bytes();

        let request = if is_json {
            Decoder::decode_request(&body)?
        } else {
            Decoder::decode_form_urlencoded(&body)?
        };
        Ok(request)
    }
}

fn decode_query(query: Option<&str>) -> Result<TableRequest, ServerError> {
    let query = query.unwrap_or("");
    Ok(Decoder::decode_form_urlencoded(query.as_bytes())?)
}

/// Matches `application/json` with or without parameters.
fn is_json_content_type(value: &str) -> bool {
    value
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case(JSON_MIME))
        .unwrap_or(false)
}

fn json_response(body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));
    response
}

fn text_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tablewire_store::MemoryStore;

    fn row(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn handler_with_limit(max_body_bytes: usize) -> TableHandler {
        let store = MemoryStore::with_rows(vec![
            row(&[("id", "1"), ("name", "Airi"), ("office", "Tokyo")]),
            row(&[("id", "2"), ("name", "Angelica"), ("office", "London")]),
            row(&[("id", "3"), ("name", "Bradley"), ("office", "London")]),
        ]);
        let service = TableService::new(Arc::new(store)).with_row_id("id", "row_");
        let config = NetworkConfig {
            max_body_bytes,
            ..NetworkConfig::default()
        };
        TableHandler::new(&config, service)
    }

    fn handler() -> TableHandler {
        handler_with_limit(1024 * 1024)
    }

    /// Builds a GET request, percent-encoding brackets the way browsers do.
    fn get(uri: &str) -> Request<Full<Bytes>> {
        let uri = uri.replace('[', "%5B").replace(']', "%5D");
        Request::get(uri).body(Full::new(Bytes::new())).unwrap()
    }

    fn post(content_type: &str, body: &str) -> Request<Full<Bytes>> {
        Request::post("/data")
            .header(CONTENT_TYPE, content_type)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn read_body(response: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    const PEOPLE_FORM: &str = "draw=4&start=0&length=2\
        &columns[0][data]=name&columns[1][data]=office\
        &order[0][column]=0&order[0][dir]=desc\
        &search[value]=London&search[regex]=false";

    #[tokio::test]
    async fn test_get_query_string() {
        let handler = handler();
        let response = handler.handle(get(&format!("/data?{}", PEOPLE_FORM))).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], JSON_MIME);

        let body = read_body(response).await;
        assert_eq!(body["draw"], 4);
        assert_eq!(body["recordsTotal"], 3);
        assert_eq!(body["recordsFiltered"], 2);
        assert_eq!(body["data"][0]["DT_RowId"], "row_3");
        assert_eq!(body["data"][0]["name"], "Bradley");
        assert_eq!(body["data"][1]["name"], "Angelica");
        assert!(body.get("error").is_none());
        assert_eq!(handler.stats().requests_total.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_post_form_body() {
        let response = handler()
            .handle(post("application/x-www-form-urlencoded", PEOPLE_FORM))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_body(response).await;
        assert_eq!(body["recordsFiltered"], 2);
    }

    #[tokio::test]
    async fn test_post_json_body() {
        let json = r#"{"draw":9,"start":1,"length":-1,
            "search":{"value":"","regex":false},
            "order":[{"column":0,"dir":"asc"}],
            "columns":[{"data":"name","name":"","searchable":true,"orderable":true,
                        "search":{"value":"","regex":false}}]}"#;
        let response = handler()
            .handle(post("application/json; charset=utf-8", json))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = read_body(response).await;
        assert_eq!(body["draw"], 9);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"][0]["name"], "Angelica");
    }

    #[tokio::test]
    async fn test_empty_query_returns_everything() {
        let response = handler().handle(get("/data")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_body(response).await;
        assert_eq!(body["draw"], 0);
        assert_eq!(body["recordsTotal"], 3);
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_form_is_bad_request() {
        let handler = handler();
        let response = handler.handle(get("/data?columns[x][data]=name")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = handler.handle(get("/data?draw=many")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = handler.handle(post(JSON_MIME, "{\"draw\":")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(handler.stats().errors_total.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_invalid_search_pattern_reported_in_body() {
        let uri = "/data?columns[0][data]=name&columns[0][search][value]=%28&columns[0][search][regex]=true";
        let response = handler().handle(get(uri)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("invalid search pattern"));
        assert_eq!(body["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let response = handler_with_limit(16)
            .handle(post("application/x-www-form-urlencoded", PEOPLE_FORM))
            .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_routing() {
        let handler = handler();

        let response = handler.handle(get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = handler.handle(get("/other")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let request = Request::delete("/data")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = handler.handle(request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET, POST");
    }

    #[test]
    fn test_is_json_content_type() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("Application/JSON; charset=utf-8"));
        assert!(!is_json_content_type("application/x-www-form-urlencoded"));
        assert!(!is_json_content_type("text/plain"));
    }
}
