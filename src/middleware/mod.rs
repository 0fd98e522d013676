mod auth;
mod core;
mod tracing;

pub use auth::{Authenticated, BearerAuth};
pub use core::{Establish, Middleware};
pub use tracing::TracingMiddleware;
