//! Validated-handler adapter.
//!
//! Wraps a (checker, success handler, optional failure handler) triple into a
//! plain request handler. Validation runs synchronously per request; failure
//! is answered with `400 { "errors": [...] }` (messages verbatim, in the
//! order the validator produced them) unless a custom failure handler was
//! supplied, in which case that handler alone determines the response.

use serde::de::DeserializeOwned;
use serde_json::json;

use crate::checker::RequestChecker;
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Wrap a success handler behind a request checker.
///
/// On a valid request the success handler receives the narrowed value and
/// owns the response; the adapter adds, removes, and reorders nothing. On an
/// invalid request the adapter itself replies `400` with the checker's
/// message list.
pub fn checked<T, H>(
    checker: RequestChecker<T>,
    handler: H,
) -> impl Fn(HandlerRequest) + Send + 'static
where
    T: DeserializeOwned + Send + 'static,
    H: Fn(HandlerRequest, T) + Send + 'static,
{
    move |req: HandlerRequest| match checker.check(&req) {
        Ok(value) => handler(req, value),
        Err(messages) => {
            let _ = req
                .reply_tx
                .send(HandlerResponse::json(400, json!({ "errors": messages })));
        }
    }
}

/// Like [`checked`], but with a custom failure handler.
///
/// On an invalid request `on_invalid` receives the request and the ordered
/// message list and alone determines the response; the adapter sends nothing
/// itself.
pub fn checked_or<T, H, E>(
    checker: RequestChecker<T>,
    handler: H,
    on_invalid: E,
) -> impl Fn(HandlerRequest) + Send + 'static
where
    T: DeserializeOwned + Send + 'static,
    H: Fn(HandlerRequest, T) + Send + 'static,
    E: Fn(HandlerRequest, Vec<String>) + Send + 'static,
{
    move |req: HandlerRequest| match checker.check(&req) {
        Ok(value) => handler(req, value),
        Err(messages) => on_invalid(req, messages),
    }
}
