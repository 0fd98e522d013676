mod core;
mod typed;

pub use core::{ParamVec, RouteMatch, RouteMeta, Router, MAX_INLINE_PARAMS};
pub use typed::{requires, Direct, Guarded, GuardedBy, Has, Here, RouteEntry, There, TypedRouter};
