//! Router core - hot path for request routing.

use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maximum number of path/query parameters before heap allocation.
/// Most REST routes carry ≤4 path params.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names use `Arc<str>` because they come from the static route table
/// and `Arc::clone` is an O(1) atomic increment; values are per-request data
/// from the URL and stay `String`.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A registered route: method, path pattern, and the handler that serves it.
///
/// Built from [`TypedRouter`](super::TypedRouter) registrations at startup;
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct RouteMeta {
    /// HTTP method this route answers
    pub method: Method,
    /// Path pattern with `{name}` placeholders (e.g. `/user/{id}`)
    pub path_pattern: String,
    /// Name of the handler registered for this route
    pub handler_name: String,
}

/// Result of successfully matching a request path to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route (Arc to avoid cloning the table entry)
    pub route: Arc<RouteMeta>,
    /// Path parameters extracted from the URL, in pattern order
    pub path_params: ParamVec,
    /// Name of the handler that should process this request
    pub handler_name: String,
    /// Query string parameters (populated by the server)
    pub query_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name (last write wins for duplicate names).
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
}

/// First-match router over the registered route table.
///
/// Routes are tried in registration order and the first pattern whose method
/// and path both match wins. The table is built once at startup and is
/// read-only during dispatch, so it is safe to share behind an `Arc` without
/// further synchronization.
#[derive(Clone)]
pub struct Router {
    routes: Vec<(Regex, Arc<RouteMeta>, Vec<Arc<str>>)>,
}

impl Router {
    /// Compile the route table.
    ///
    /// Each `{name}` placeholder becomes a single-segment capture; the rest
    /// of the pattern is matched literally.
    #[must_use]
    pub fn new(routes: Vec<RouteMeta>) -> Self {
        let routes: Vec<_> = routes
            .into_iter()
            .map(|route| {
                let (regex, param_names) = path_to_regex(&route.path_pattern);
                (regex, Arc::new(route), param_names)
            })
            .collect();

        let routes_summary: Vec<String> = routes
            .iter()
            .take(10)
            .map(|(_, meta, _)| format!("{} {}", meta.method, meta.path_pattern))
            .collect();
        info!(
            routes_count = routes.len(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Self { routes }
    }

    /// Match an HTTP request to a route.
    ///
    /// # Returns
    ///
    /// * `Some(RouteMatch)` - the first registered route whose method and
    ///   path match, with extracted path parameters
    /// * `None` - no route matches (results in 404)
    #[must_use]
    pub fn route(&self, method: Method, path: &str) -> Option<RouteMatch> {
        for (regex, meta, param_names) in &self.routes {
            if meta.method != method {
                continue;
            }
            let Some(caps) = regex.captures(path) else {
                continue;
            };

            let mut path_params = ParamVec::new();
            for (i, name) in param_names.iter().enumerate() {
                if let Some(m) = caps.get(i + 1) {
                    path_params.push((Arc::clone(name), m.as_str().to_string()));
                }
            }

            debug!(
                method = %method,
                path = %path,
                handler_name = %meta.handler_name,
                route_pattern = %meta.path_pattern,
                "Route matched"
            );

            return Some(RouteMatch {
                route: Arc::clone(meta),
                path_params,
                handler_name: meta.handler_name.clone(),
                query_params: ParamVec::new(),
            });
        }

        warn!(method = %method, path = %path, "No route matched");
        None
    }
}

/// Convert a path pattern to a regex and extract parameter names.
///
/// `/user/{id}` becomes `^/user/([^/]+)$` with parameter names `["id"]`.
/// Literal segments are escaped, so metacharacters in paths match verbatim.
pub(crate) fn path_to_regex(path: &str) -> (Regex, Vec<Arc<str>>) {
    if path == "/" {
        return (
            Regex::new(r"^/$").expect("Failed to compile path regex"),
            Vec::new(),
        );
    }

    let mut pattern = String::with_capacity(path.len() + 8);
    pattern.push('^');
    let mut param_names = Vec::with_capacity(path.matches('{').count());

    for segment in path.split('/') {
        if segment.starts_with('{') && segment.ends_with('}') {
            let name = segment.trim_start_matches('{').trim_end_matches('}');
            pattern.push_str("/([^/]+)");
            param_names.push(Arc::from(name));
        } else if !segment.is_empty() {
            pattern.push('/');
            pattern.push_str(&regex::escape(segment));
        }
    }

    pattern.push('$');
    let regex = Regex::new(&pattern).expect("Failed to compile path regex");

    (regex, param_names)
}
