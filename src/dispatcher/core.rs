//! Dispatcher core - hot path for request dispatch.
//!
//! Each registered handler runs in its own `may` coroutine and receives
//! requests over a channel. The dispatcher owns the handler registry, the
//! middleware chain, and the optional per-request error hook.

use crate::ids::RequestId;
use crate::middleware::Middleware;
use crate::router::{ParamVec, RouteMatch};
use crate::runtime_config::RuntimeConfig;
use http::Method;
use may::coroutine;
use may::sync::mpsc;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Maximum inline headers before heap allocation. Most requests carry well
/// under 16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path.
///
/// Header names use `Arc<str>` because names repeat across requests
/// (`content-type`, `authorization`, ...) and `Arc::clone` is an O(1)
/// atomic increment; values are per-request data and stay `String`.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Per-request error callback, invoked by the error boundary before the
/// default fault handling runs.
///
/// This is an explicit field on [`HandlerRequest`] rather than an ad-hoc
/// attribute attached to the request at runtime; it observes faults (for
/// reporting) and never produces the HTTP response itself.
#[derive(Clone)]
pub struct ErrorHook(Arc<dyn Fn(&anyhow::Error) + Send + Sync>);

impl ErrorHook {
    pub fn new(hook: impl Fn(&anyhow::Error) + Send + Sync + 'static) -> Self {
        Self(Arc::new(hook))
    }

    pub fn call(&self, err: &anyhow::Error) {
        (self.0)(err);
    }
}

impl fmt::Debug for ErrorHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorHook")
    }
}

/// Request data passed to a handler coroutine.
///
/// Contains the matched route's extracted parameters, headers, and parsed
/// body, plus a reply channel for sending the response. All per-request
/// state lives here; nothing is shared between requests.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The matched route's path pattern (e.g. `/user/{id}`)
    pub path: String,
    /// Name of the handler that should process this request
    pub handler_name: String,
    /// Path parameters extracted from the URL (stack-allocated for ≤8 params)
    pub path_params: ParamVec,
    /// Query string parameters in encounter order (stack-allocated for ≤8 params)
    pub query_params: ParamVec,
    /// HTTP headers with lowercase names (stack-allocated for ≤16 headers)
    pub headers: HeaderVec,
    /// Request body parsed as JSON (if present)
    pub body: Option<Value>,
    /// Optional per-request fault observer, consumed by the error boundary
    pub error_hook: Option<ErrorHook>,
    /// Channel for sending the response back to the dispatcher
    pub reply_tx: mpsc::Sender<HandlerResponse>,
}

impl HandlerRequest {
    /// Get a path parameter by name.
    ///
    /// Uses "last write wins" semantics: if duplicate parameter names exist
    /// at different path depths, returns the last occurrence.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name (last write wins for duplicates).
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response data sent back from a handler coroutine.
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// HTTP response headers (stack-allocated for ≤16 headers)
    pub headers: HeaderVec,
    /// Response body as JSON; `Value::Null` means no body bytes are written
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a JSON response with a `content-type: application/json` header.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create an error response with a JSON `{ "error": message }` body.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// Create a response with the given status and no body at all.
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: Value::Null,
        }
    }

    /// Get a header by name (case-insensitive).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

/// Channel sender that delivers requests to a handler coroutine.
pub type HandlerSender = mpsc::Sender<HandlerRequest>;

/// Dispatcher that routes matched requests to registered handler coroutines.
///
/// Maintains a registry of handler names to channel senders, an ordered
/// middleware chain, and the per-request error hook stamped onto every
/// request it builds.
#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: HashMap<String, HandlerSender>,
    middlewares: Vec<Arc<dyn Middleware>>,
    error_hook: Option<ErrorHook>,
}

impl Dispatcher {
    /// Create a new empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a handler with the given name has been registered.
    #[must_use]
    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Add middleware to the processing chain.
    ///
    /// Middleware runs in the order it was added: every `before` ahead of the
    /// handler (the first early response short-circuits the handler), every
    /// `after` once the response exists.
    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    /// Set the error hook stamped onto every dispatched request.
    pub fn set_error_hook(&mut self, hook: ErrorHook) {
        self.error_hook = Some(hook);
    }

    /// Register a handler function under the given name.
    ///
    /// Spawns a coroutine that processes requests from a channel. The handler
    /// is wrapped in last-resort panic recovery so a panicking handler sends
    /// a 500 instead of silently dropping the request. If a handler with the
    /// same name already exists it is replaced; the old sender is dropped,
    /// which closes its channel and lets the old coroutine exit.
    ///
    /// # Safety
    ///
    /// Calls `may::coroutine::Builder::spawn`, which is unsafe in the `may`
    /// runtime. The caller must ensure the runtime is initialized and that
    /// the handler sends a response through the reply channel for every
    /// request it consumes.
    pub unsafe fn register_handler<F>(&mut self, name: &str, handler_fn: F)
    where
        F: Fn(HandlerRequest) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<HandlerRequest>();
        let name = name.to_string();

        if let Some(old_sender) = self.handlers.remove(&name) {
            drop(old_sender);
            warn!(
                handler_name = %name,
                "Replaced existing handler - old coroutine will exit"
            );
        }

        let stack_size = RuntimeConfig::from_env().stack_size;
        let coroutine_name = name.clone();

        // SAFETY: spawn is unsafe because of the may runtime's requirements,
        // not this function's logic. Registration happens during startup,
        // the handler is Send + 'static, and faults are reported through the
        // reply channel rather than by unwinding out of the coroutine.
        let spawn_result = unsafe {
            coroutine::Builder::new()
                .stack_size(stack_size)
                .spawn(move || {
                    debug!(
                        handler_name = %coroutine_name,
                        stack_size = stack_size,
                        "Handler coroutine start"
                    );

                    for req in rx.iter() {
                        let reply_tx = req.reply_tx.clone();
                        let handler_name = req.handler_name.clone();
                        let request_id = req.request_id;

                        let started = Instant::now();
                        if let Err(panic) =
                            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                                handler_fn(req);
                            }))
                        {
                            error!(
                                request_id = %request_id,
                                handler_name = %handler_name,
                                panic_message = ?panic,
                                "Handler panicked"
                            );
                            let _ = reply_tx.send(HandlerResponse::error(500, "Handler panicked"));
                        } else {
                            debug!(
                                request_id = %request_id,
                                handler_name = %handler_name,
                                execution_time_ms = started.elapsed().as_millis() as u64,
                                "Handler execution complete"
                            );
                        }
                    }
                })
        };

        match spawn_result {
            Ok(_) => {
                info!(
                    handler_name = %name,
                    total_handlers = self.handlers.len() + 1,
                    "Handler registered"
                );
                self.handlers.insert(name, tx);
            }
            Err(e) => {
                // Leave the handler unregistered rather than crash; dispatch
                // will answer 500 for its routes.
                error!(
                    handler_name = %name,
                    error = %e,
                    stack_size = stack_size,
                    "Failed to spawn handler coroutine"
                );
            }
        }
    }

    /// Dispatch a request to the handler named by the route match.
    ///
    /// Runs the middleware chain, sends the request to the handler coroutine,
    /// and waits for the reply. Returns `None` when no handler is registered
    /// under the matched name.
    ///
    /// # Arguments
    ///
    /// * `route_match` - Matched route with extracted path/query parameters
    /// * `body` - Optional parsed JSON request body
    /// * `headers` - Request headers with lowercase names
    /// * `request_id` - Correlation id for this request
    #[must_use]
    pub fn dispatch(
        &self,
        route_match: RouteMatch,
        body: Option<Value>,
        headers: HeaderVec,
        request_id: RequestId,
    ) -> Option<HandlerResponse> {
        let tx = match self.handlers.get(&route_match.handler_name) {
            Some(tx) => tx,
            None => {
                error!(
                    handler_name = %route_match.handler_name,
                    available_handlers = self.handlers.len(),
                    "Handler not found"
                );
                return None;
            }
        };

        let (reply_tx, reply_rx) = mpsc::channel();
        let request = HandlerRequest {
            request_id,
            method: route_match.route.method.clone(),
            path: route_match.route.path_pattern.clone(),
            handler_name: route_match.handler_name,
            path_params: route_match.path_params,
            query_params: route_match.query_params,
            headers,
            body,
            error_hook: self.error_hook.clone(),
            reply_tx,
        };

        let mut early_resp: Option<HandlerResponse> = None;
        for mw in &self.middlewares {
            if early_resp.is_none() {
                early_resp = mw.before(&request);
            } else {
                mw.before(&request);
            }
        }

        let start = Instant::now();
        let mut resp = match early_resp {
            Some(r) => r,
            None => {
                info!(
                    request_id = %request_id,
                    handler_name = %request.handler_name,
                    method = %request.method,
                    path = %request.path,
                    "Request dispatched to handler"
                );

                if let Err(e) = tx.send(request.clone()) {
                    error!(
                        request_id = %request_id,
                        handler_name = %request.handler_name,
                        error = %e,
                        "Failed to send request to handler"
                    );
                    return None;
                }

                match reply_rx.recv() {
                    Ok(response) => response,
                    Err(e) => {
                        // The handler coroutine dropped its reply sender
                        // without responding - most likely a crash.
                        error!(
                            request_id = %request_id,
                            handler_name = %request.handler_name,
                            error = %e,
                            "Handler channel closed without a response"
                        );
                        return Some(HandlerResponse::error(503, "Handler is not responding"));
                    }
                }
            }
        };
        let latency = start.elapsed();

        for mw in &self.middlewares {
            mw.after(&request, &mut resp, latency);
        }

        debug!(
            request_id = %request_id,
            status = resp.status,
            latency_ms = latency.as_millis() as u64,
            "Dispatch complete"
        );

        Some(resp)
    }
}
