use super::{Establish, Middleware};
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Capability marker proving a request carried a valid bearer token.
///
/// Never constructed at runtime - it exists purely as a type-level fact
/// established by [`BearerAuth`].
pub struct Authenticated;

/// Rejects requests whose `authorization` header does not carry the expected
/// bearer token.
pub struct BearerAuth {
    expected: String,
}

impl BearerAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            expected: format!("Bearer {}", token.into()),
        }
    }
}

impl Middleware for BearerAuth {
    fn before(&self, req: &HandlerRequest) -> Option<HandlerResponse> {
        match req.get_header("authorization") {
            Some(h) if h == self.expected => None,
            _ => Some(HandlerResponse::error(401, "Unauthorized")),
        }
    }
}

impl Establish for BearerAuth {
    type Capability = Authenticated;
}
