use std::time::Duration;

use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Request/response middleware.
///
/// `before` runs ahead of the handler; returning `Some` short-circuits the
/// handler and uses that response instead. `after` runs once a response
/// exists and may modify it.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &HandlerRequest) -> Option<HandlerResponse> {
        None
    }
    fn after(&self, _req: &HandlerRequest, _res: &mut HandlerResponse, _latency: Duration) {}
}

/// Middleware that proves a request capability when it admits a request.
///
/// The capability is a zero-sized marker type with no runtime representation;
/// it exists only so [`TypedRouter`](crate::router::TypedRouter) can track,
/// at the type level, which guarantees hold for handlers registered after
/// this middleware in a chain.
pub trait Establish: Middleware {
    type Capability: Send + Sync + 'static;
}
