use may_minihttp::Request;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Read;
use tracing::debug;

/// Parsed HTTP request data used by `AppService`.
#[derive(Debug, PartialEq)]
pub struct ParsedRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Request path without the query string
    pub path: String,
    /// HTTP headers (lowercase keys)
    pub headers: HashMap<String, String>,
    /// Query string parameters in encounter order
    pub query_params: Vec<(String, String)>,
    /// Parsed request body, if any
    pub body: Option<Value>,
}

/// Parse query string parameters from a URL path.
///
/// Extracts everything after the `?` character, URL-decodes names and
/// values, and preserves encounter order (duplicates included - request
/// accessors resolve them last-write-wins).
pub fn parse_query_params(path: &str) -> Vec<(String, String)> {
    match path.find('?') {
        Some(pos) => url::form_urlencoded::parse(path[pos + 1..].as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        None => Vec::new(),
    }
}

/// Parse a request body according to its content type.
///
/// `application/x-www-form-urlencoded` bodies become a JSON object of
/// strings; everything else is attempted as JSON. JSON parsing is
/// non-strict: bare primitives (`42`, `"text"`, `true`) are accepted.
fn parse_body(raw: &str, content_type: &str) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    if content_type.starts_with("application/x-www-form-urlencoded") {
        let mut form = Map::new();
        for (k, v) in url::form_urlencoded::parse(raw.as_bytes()) {
            form.insert(k.to_string(), Value::String(v.to_string()));
        }
        Some(Value::Object(form))
    } else {
        serde_json::from_str(raw).ok()
    }
}

/// Extract method, path, headers, query parameters, and body from a raw
/// `may_minihttp` request.
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let raw_path = req.path().to_string();
    let path = raw_path.split('?').next().unwrap_or("/").to_string();

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    let query_params = parse_query_params(&raw_path);

    let body = {
        let mut body_str = String::new();
        match req.body().read_to_string(&mut body_str) {
            Ok(size) if size > 0 => {
                let content_type = headers
                    .get("content-type")
                    .map(|s| s.as_str())
                    .unwrap_or("");
                parse_body(&body_str, content_type)
            }
            _ => None,
        }
    };

    debug!(
        method = %method,
        path = %path,
        header_count = headers.len(),
        query_param_count = query_params.len(),
        has_body = body.is_some(),
        "HTTP request parsed"
    );

    ParsedRequest {
        method,
        path,
        headers,
        query_params,
        body,
    }
}
