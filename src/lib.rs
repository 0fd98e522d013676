//! # checkroute
//!
//! **checkroute** is a thin, compile-time-typed request validation and routing
//! layer for Rust services running on the [`may`] coroutine runtime.
//!
//! ## Overview
//!
//! checkroute sits between `may_minihttp` (which owns the server loop, HTTP
//! parsing, and response framing) and your handlers. Routes declare the shape
//! of the request they accept — query parameters, path parameters, body, and
//! headers — and the layer validates each incoming request against compiled
//! JSON Schemas before the handler runs. A request that matches is narrowed
//! into a typed value and handed to the handler; a request that does not is
//! answered with `400 { "errors": [...] }` without the handler ever running.
//!
//! The validation engine itself is the [`jsonschema`] crate and the HTTP
//! machinery is `may_minihttp`; checkroute implements neither. It is glue —
//! deliberately small glue with a typed surface.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`shape`]** - Composable request-shape primitives and the four-facet
//!   request descriptor
//! - **[`checker`]** - Compiled per-facet validators producing an ordered
//!   error list or a narrowed, typed value
//! - **[`handler`]** - The validated-handler adapter and the error-boundary
//!   wrapper
//! - **[`router`]** - First-match route table plus the [`TypedRouter`] facade
//!   with compile-time context tracking
//! - **[`dispatcher`]** - Coroutine-based request handler dispatch with a
//!   middleware chain
//! - **[`middleware`]** - Pluggable middleware (request logging, bearer auth)
//! - **[`server`]** - HTTP service built on `may_minihttp` with
//!   request/response helpers
//! - **[`ids`]** - ULID-backed request correlation ids
//! - **[`runtime_config`]** - Environment-driven coroutine runtime settings
//!
//! ### Request Handling Flow
//!
//! ```text
//! Client → may_minihttp → parse_request → Router (first match)
//!        → Dispatcher (middleware before → handler coroutine → middleware after)
//!        → handler chain: RequestChecker → (400 | narrowed value → handler)
//!        → reply channel → write response
//! ```
//!
//! Exactly one response is produced per request: handlers reply through a
//! per-request channel and the service consumes the first message, so a late
//! error response after a handler already replied is dropped rather than
//! written to the transport.
//!
//! ## Compile-time request context
//!
//! [`TypedRouter`] threads a type-level list of capability markers through
//! `with(...)` calls. A handler wrapped in [`requires`] only registers when
//! the capability it names has been established earlier in the chain; there
//! is no runtime representation and no runtime failure mode — a missing
//! capability is a compile error.
//!
//! ## Quick Start
//!
//! ```no_run
//! use checkroute::{
//!     catch_checked, checked, field, number, object, string,
//!     server::{AppService, HttpServer},
//!     HandlerRequest, HandlerResponse, RequestShape, TypedRouter,
//! };
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Debug, Deserialize)]
//! struct CreateUser {
//!     body: NewUser,
//! }
//!
//! #[derive(Debug, Deserialize)]
//! struct NewUser {
//!     name: String,
//!     age: serde_json::Number,
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let shape = RequestShape::new()
//!         .body(object([field("name", string()), field("age", number())]));
//!
//!     let router = TypedRouter::new();
//!     router.post(
//!         "/user",
//!         checked(
//!             shape.checker::<CreateUser>()?,
//!             catch_checked(|req: HandlerRequest, user: CreateUser| {
//!                 let _ = req.reply_tx.send(HandlerResponse::json(
//!                     201,
//!                     json!({ "id": 42, "name": user.body.name, "age": user.body.age }),
//!                 ));
//!                 Ok(())
//!             }),
//!         ),
//!     );
//!
//!     let (router, dispatcher) = unsafe { router.build() };
//!     let service = AppService::new(router, dispatcher);
//!     let handle = HttpServer(service).start("0.0.0.0:8080")?;
//!     handle.join().ok();
//!     Ok(())
//! }
//! ```
//!
//! ## Runtime Considerations
//!
//! checkroute uses the `may` coroutine runtime, not tokio or async-std:
//!
//! - Each handler runs in a coroutine and replies through a channel
//! - Stack size is configurable via the `CHECKROUTE_STACK_SIZE` environment
//!   variable (decimal or `0x` hex)
//! - The route table is built during startup and is read-only during dispatch

pub mod checker;
pub mod dispatcher;
pub mod handler;
pub mod ids;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod shape;

pub use checker::RequestChecker;
pub use dispatcher::{Dispatcher, ErrorHook, HandlerRequest, HandlerResponse};
pub use handler::{catch, catch_checked, checked, checked_or};
pub use router::{requires, RouteMatch, RouteMeta, Router, TypedRouter};
pub use shape::{array, boolean, field, number, object, optional, string, RequestShape, Shape};
