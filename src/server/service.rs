use super::request::{parse_request, ParsedRequest};
use super::response::{write_handler_response, write_json_error};
use crate::dispatcher::{Dispatcher, HeaderVec};
use crate::ids::RequestId;
use crate::router::{ParamVec, Router};
use http::Method;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::io;
use std::sync::Arc;

/// HTTP service gluing the router and dispatcher to `may_minihttp`.
///
/// Both the route table and the handler registry are built at startup and
/// read-only afterwards, so clones of the service (one per connection) share
/// them behind plain `Arc`s.
#[derive(Clone)]
pub struct AppService {
    pub router: Arc<Router>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppService {
    #[must_use]
    pub fn new(router: Router, dispatcher: Dispatcher) -> Self {
        Self {
            router: Arc::new(router),
            dispatcher: Arc::new(dispatcher),
        }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let ParsedRequest {
            method,
            path,
            headers,
            query_params,
            body,
        } = parse_request(req);

        let parsed_method: Method = match method.parse() {
            Ok(m) => m,
            Err(_) => {
                write_json_error(
                    res,
                    404,
                    json!({ "error": "Not Found", "method": method, "path": path }),
                );
                return Ok(());
            }
        };

        let Some(mut route_match) = self.router.route(parsed_method, &path) else {
            write_json_error(
                res,
                404,
                json!({ "error": "Not Found", "method": method, "path": path }),
            );
            return Ok(());
        };

        let mut query_vec = ParamVec::new();
        for (name, value) in query_params {
            query_vec.push((Arc::from(name.as_str()), value));
        }
        route_match.query_params = query_vec;

        let request_id =
            RequestId::from_header_or_new(headers.get("x-request-id").map(|s| s.as_str()));

        let mut header_vec = HeaderVec::new();
        for (name, value) in headers {
            header_vec.push((Arc::from(name.as_str()), value));
        }

        match self
            .dispatcher
            .dispatch(route_match, body, header_vec, request_id)
        {
            Some(hr) => write_handler_response(res, hr.status, hr.body, &hr.headers),
            None => write_json_error(
                res,
                500,
                json!({ "error": "Handler failed or not registered", "method": method, "path": path }),
            ),
        }
        Ok(())
    }
}
