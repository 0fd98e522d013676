//! Typed router facade with compile-time request-context tracking.
//!
//! [`TypedRouter`] delegates everything at runtime - registrations land in a
//! shared route table, middleware lands on the dispatcher chain - and adds
//! exactly one runtime-visible operation, [`TypedRouter::child`], which
//! mounts registrations under a path prefix.
//!
//! Its real purpose is the `Ctx` parameter: a type-level list of capability
//! markers (nested tuples) with no runtime representation. Middleware
//! attached through [`TypedRouter::with`] extends the list with the
//! capability it [`Establish`]es; a handler wrapped in [`requires`] only
//! registers when its capability is provably in the list. A missing
//! capability is a compile error, never a runtime check.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use http::Method;
use tracing::debug;

use super::core::{RouteMeta, Router};
use crate::dispatcher::{Dispatcher, ErrorHook, HandlerRequest};
use crate::middleware::{Establish, Middleware};

/// A registered route handler, ready to be spawned into a coroutine.
pub type RouteHandlerFn = Box<dyn Fn(HandlerRequest) + Send + 'static>;

/// Index marker: the capability is the head of the context list.
pub struct Here;

/// Index marker: the capability is somewhere in the tail of the context list.
pub struct There<Index>(PhantomData<Index>);

/// Type-level proof that capability `C` is present in a context list.
///
/// The `Index` parameter is inferred; it steers the search through the
/// nested-tuple list so the two impls never overlap.
pub trait Has<C, Index> {}

impl<C, Rest> Has<C, Here> for (C, Rest) {}

impl<C, Head, Rest, Index> Has<C, There<Index>> for (Head, Rest) where Rest: Has<C, Index> {}

/// A handler bundled with the capability it requires.
///
/// Constructed with [`requires`]; carries no runtime data beyond the handler
/// itself.
pub struct Guarded<C, F> {
    handler: F,
    _capability: PhantomData<fn() -> C>,
}

/// Declare that `handler` must only run where capability `C` has been
/// established earlier in the chain.
///
/// ```compile_fail
/// use checkroute::middleware::Authenticated;
/// use checkroute::{requires, HandlerRequest, HandlerResponse, TypedRouter};
///
/// let root = TypedRouter::new();
/// // No middleware established `Authenticated`, so this does not compile.
/// root.get("/admin", requires::<Authenticated, _>(|req: HandlerRequest| {
///     let _ = req.reply_tx.send(HandlerResponse::json(200, serde_json::json!({ "ok": true })));
/// }));
/// ```
pub fn requires<C, F>(handler: F) -> Guarded<C, F>
where
    F: Fn(HandlerRequest) + Send + 'static,
{
    Guarded {
        handler,
        _capability: PhantomData,
    }
}

/// Anything registrable as a route handler under context `Ctx`.
///
/// The `Marker` parameter disambiguates the plain-closure impl from the
/// guarded impl; it is always inferred.
pub trait RouteEntry<Ctx, Marker> {
    fn into_route_handler(self) -> RouteHandlerFn;
}

/// Marker for entries with no capability requirement.
pub struct Direct;

impl<Ctx, F> RouteEntry<Ctx, Direct> for F
where
    F: Fn(HandlerRequest) + Send + 'static,
{
    fn into_route_handler(self) -> RouteHandlerFn {
        Box::new(self)
    }
}

/// Marker for guarded entries, carrying the inferred capability index.
pub struct GuardedBy<Index>(PhantomData<Index>);

impl<Ctx, C, F, Index> RouteEntry<Ctx, GuardedBy<Index>> for Guarded<C, F>
where
    Ctx: Has<C, Index>,
    F: Fn(HandlerRequest) + Send + 'static,
{
    fn into_route_handler(self) -> RouteHandlerFn {
        Box::new(self.handler)
    }
}

#[derive(Default)]
struct FacadeState {
    routes: Vec<RouteMeta>,
    handlers: Vec<(String, RouteHandlerFn)>,
    middlewares: Vec<Arc<dyn Middleware>>,
    error_hook: Option<ErrorHook>,
}

/// Facade over the route table and dispatcher with a compile-time-tracked
/// request context.
///
/// All facades created from one root (via [`child`](Self::child) or
/// [`with`](Self::with)) share a single route table; [`build`](Self::build)
/// on any of them finalizes the whole tree.
///
/// ```no_run
/// use checkroute::middleware::{Authenticated, BearerAuth};
/// use checkroute::{requires, HandlerRequest, HandlerResponse, TypedRouter};
///
/// let root = TypedRouter::new();
/// let authed = root.with(BearerAuth::new("secret"));
/// authed.get("/admin", requires::<Authenticated, _>(|req: HandlerRequest| {
///     let _ = req.reply_tx.send(HandlerResponse::json(200, serde_json::json!({ "ok": true })));
/// }));
/// let (router, dispatcher) = unsafe { root.build() };
/// ```
pub struct TypedRouter<Ctx = ()> {
    state: Arc<Mutex<FacadeState>>,
    prefix: String,
    _context: PhantomData<fn() -> Ctx>,
}

impl<Ctx> Clone for TypedRouter<Ctx> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            prefix: self.prefix.clone(),
            _context: PhantomData,
        }
    }
}

impl TypedRouter<()> {
    /// Create a root facade with an empty context.
    #[must_use]
    pub fn new() -> Self {
        TypedRouter {
            state: Arc::default(),
            prefix: String::new(),
            _context: PhantomData,
        }
    }
}

impl Default for TypedRouter<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx> TypedRouter<Ctx> {
    fn derived<NewCtx>(&self, prefix: String) -> TypedRouter<NewCtx> {
        TypedRouter {
            state: Arc::clone(&self.state),
            prefix,
            _context: PhantomData,
        }
    }

    /// Create a sub-facade mounted under `prefix`.
    ///
    /// Routes registered on the child resolve at `prefix + path` and only
    /// there; the child shares the parent's route table and context.
    #[must_use]
    pub fn child(&self, prefix: &str) -> TypedRouter<Ctx> {
        self.derived(join_paths(&self.prefix, prefix))
    }

    /// Attach passive middleware to the dispatch chain.
    ///
    /// Middleware runs for every dispatched request in attachment order.
    pub fn use_middleware<M: Middleware + 'static>(&self, mw: M) -> &Self {
        self.state.lock().unwrap().middlewares.push(Arc::new(mw));
        self
    }

    /// Attach middleware that establishes a capability, extending the
    /// compile-time context of the returned facade.
    #[must_use]
    pub fn with<M: Establish + 'static>(&self, mw: M) -> TypedRouter<(M::Capability, Ctx)> {
        self.state.lock().unwrap().middlewares.push(Arc::new(mw));
        self.derived(self.prefix.clone())
    }

    /// Set the per-request error hook stamped onto every dispatched request.
    pub fn on_error(&self, hook: ErrorHook) -> &Self {
        self.state.lock().unwrap().error_hook = Some(hook);
        self
    }

    pub fn get<E, M>(&self, path: &str, entry: E) -> &Self
    where
        E: RouteEntry<Ctx, M>,
    {
        self.register(Method::GET, path, entry)
    }

    pub fn put<E, M>(&self, path: &str, entry: E) -> &Self
    where
        E: RouteEntry<Ctx, M>,
    {
        self.register(Method::PUT, path, entry)
    }

    pub fn post<E, M>(&self, path: &str, entry: E) -> &Self
    where
        E: RouteEntry<Ctx, M>,
    {
        self.register(Method::POST, path, entry)
    }

    pub fn patch<E, M>(&self, path: &str, entry: E) -> &Self
    where
        E: RouteEntry<Ctx, M>,
    {
        self.register(Method::PATCH, path, entry)
    }

    pub fn delete<E, M>(&self, path: &str, entry: E) -> &Self
    where
        E: RouteEntry<Ctx, M>,
    {
        self.register(Method::DELETE, path, entry)
    }

    fn register<E, M>(&self, method: Method, path: &str, entry: E) -> &Self
    where
        E: RouteEntry<Ctx, M>,
    {
        let path_pattern = join_paths(&self.prefix, path);
        let handler_name = handler_name(&method, &path_pattern);
        debug!(
            method = %method,
            path = %path_pattern,
            handler_name = %handler_name,
            "Route registered"
        );

        let mut state = self.state.lock().unwrap();
        state.routes.push(RouteMeta {
            method,
            path_pattern,
            handler_name: handler_name.clone(),
        });
        state.handlers.push((handler_name, entry.into_route_handler()));
        drop(state);
        self
    }

    /// Finalize the facade tree into a [`Router`] and [`Dispatcher`].
    ///
    /// Spawns one coroutine per registered handler. The returned route table
    /// is immutable; further registrations through leftover facade clones go
    /// nowhere.
    ///
    /// # Safety
    ///
    /// Spawns `may` coroutines via `Dispatcher::register_handler`; the caller
    /// must ensure the May runtime is initialized (e.g. stack size configured)
    /// before calling this.
    #[must_use]
    pub unsafe fn build(self) -> (Router, Dispatcher) {
        let state = {
            let mut guard = self.state.lock().unwrap();
            std::mem::take(&mut *guard)
        };

        let mut dispatcher = Dispatcher::new();
        for mw in state.middlewares {
            dispatcher.add_middleware(mw);
        }
        if let Some(hook) = state.error_hook {
            dispatcher.set_error_hook(hook);
        }
        for (name, handler) in state.handlers {
            // SAFETY: same contract as this function; forwarded to the caller.
            unsafe { dispatcher.register_handler(&name, handler) };
        }

        (Router::new(state.routes), dispatcher)
    }
}

fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }
    } else {
        format!("{prefix}/{path}")
    }
}

fn handler_name(method: &Method, path: &str) -> String {
    let slug = path.trim_matches('/').replace(['{', '}'], "").replace('/', "_");
    if slug.is_empty() {
        format!("{}_root", method.as_str().to_ascii_lowercase())
    } else {
        format!("{}_{}", method.as_str().to_ascii_lowercase(), slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("", "/user"), "/user");
        assert_eq!(join_paths("/api", "/user"), "/api/user");
        assert_eq!(join_paths("/api/", "user"), "/api/user");
        assert_eq!(join_paths("/api", "/"), "/api");
        assert_eq!(join_paths("", "/"), "/");
    }

    #[test]
    fn test_handler_name() {
        assert_eq!(handler_name(&Method::POST, "/user"), "post_user");
        assert_eq!(handler_name(&Method::GET, "/user/{id}"), "get_user_id");
        assert_eq!(handler_name(&Method::GET, "/"), "get_root");
    }
}
