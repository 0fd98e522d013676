//! Tests for the typed router facade.
//!
//! Runtime behavior only - the compile-time rejection of handlers whose
//! capability is missing is covered by the `compile_fail` doctest on
//! [`checkroute::requires`].

use checkroute::middleware::{Authenticated, BearerAuth, TracingMiddleware};
use checkroute::{requires, HandlerRequest, HandlerResponse, TypedRouter};
use http::Method;
use serde_json::json;

mod common;
mod tracing_util;
use common::test_server::setup_may_runtime;
use tracing_util::TestTracing;

fn ok_handler(req: HandlerRequest) {
    let _ = req
        .reply_tx
        .send(HandlerResponse::json(200, json!({ "ok": true })));
}

#[test]
fn test_child_mounts_routes_under_prefix() {
    setup_may_runtime();
    let _tracing = TestTracing::init();

    let root = TypedRouter::new();
    let api = root.child("/api");
    api.post("/user", ok_handler);

    let (router, _dispatcher) = unsafe { root.build() };
    assert!(router.route(Method::POST, "/api/user").is_some());
    assert!(
        router.route(Method::POST, "/user").is_none(),
        "unprefixed path must not reach a child route"
    );
}

#[test]
fn test_children_nest() {
    setup_may_runtime();
    let _tracing = TestTracing::init();

    let root = TypedRouter::new();
    root.child("/api").child("/v1").get("/ping", ok_handler);

    let (router, _dispatcher) = unsafe { root.build() };
    assert!(router.route(Method::GET, "/api/v1/ping").is_some());
    assert!(router.route(Method::GET, "/v1/ping").is_none());
    assert!(router.route(Method::GET, "/ping").is_none());
}

#[test]
fn test_each_verb_registers_its_own_route() {
    setup_may_runtime();
    let _tracing = TestTracing::init();

    let root = TypedRouter::new();
    root.get("/thing", ok_handler)
        .put("/thing", ok_handler)
        .post("/thing", ok_handler)
        .patch("/thing", ok_handler)
        .delete("/thing", ok_handler);

    let (router, dispatcher) = unsafe { root.build() };
    for method in [
        Method::GET,
        Method::PUT,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
    ] {
        let m = router
            .route(method.clone(), "/thing")
            .unwrap_or_else(|| panic!("{method} /thing should match"));
        assert!(dispatcher.has_handler(&m.handler_name));
    }
}

#[test]
fn test_guarded_route_registers_once_capability_established() {
    setup_may_runtime();
    let _tracing = TestTracing::init();

    let root = TypedRouter::new();
    let authed = root.with(BearerAuth::new("secret"));
    authed.get(
        "/admin",
        requires::<Authenticated, _>(|req: HandlerRequest| {
            let _ = req
                .reply_tx
                .send(HandlerResponse::json(200, json!({ "admin": true })));
        }),
    );

    let (router, dispatcher) = unsafe { root.build() };
    let m = router.route(Method::GET, "/admin").expect("route");
    assert!(dispatcher.has_handler(&m.handler_name));
}

#[test]
fn test_capability_survives_child_and_passive_middleware() {
    setup_may_runtime();
    let _tracing = TestTracing::init();

    let root = TypedRouter::new();
    let authed = root.with(BearerAuth::new("secret"));
    let admin = authed.child("/admin");
    admin.use_middleware(TracingMiddleware);
    admin.get(
        "/settings",
        requires::<Authenticated, _>(|req: HandlerRequest| {
            let _ = req
                .reply_tx
                .send(HandlerResponse::json(200, json!({ "settings": {} })));
        }),
    );

    let (router, _dispatcher) = unsafe { root.build() };
    assert!(router.route(Method::GET, "/admin/settings").is_some());
}

#[test]
fn test_build_drains_registrations() {
    setup_may_runtime();
    let _tracing = TestTracing::init();

    let root = TypedRouter::new();
    root.get("/once", ok_handler);
    let keep = root.clone();

    let (router, _dispatcher) = unsafe { root.build() };
    assert!(router.route(Method::GET, "/once").is_some());

    // Registrations after build land in a fresh table; the first build's
    // routes are gone from it.
    keep.get("/late", ok_handler);
    let (router, _dispatcher) = unsafe { keep.build() };
    assert!(router.route(Method::GET, "/once").is_none());
    assert!(router.route(Method::GET, "/late").is_some());
}
