//! Error-boundary wrappers for fallible handlers.
//!
//! A wrapped handler that returns `Err` or panics is funneled through the
//! request's optional [`ErrorHook`](crate::dispatcher::ErrorHook) (side
//! effect only), logged to the process diagnostic stream, and answered with
//! an empty `500`. The wrapper never re-throws.
//!
//! Handlers respond through a per-request channel and the service consumes
//! the first message, so a boundary `500` sent after the handler already
//! replied is dropped rather than written to the transport.

use std::panic::{catch_unwind, AssertUnwindSafe};

use anyhow::anyhow;
use tracing::error;

use crate::dispatcher::{ErrorHook, HandlerRequest, HandlerResponse};
use crate::ids::RequestId;

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn report_fault(
    request_id: RequestId,
    handler_name: &str,
    error_hook: Option<&ErrorHook>,
    reply_tx: &may::sync::mpsc::Sender<HandlerResponse>,
    fault: &anyhow::Error,
) {
    if let Some(hook) = error_hook {
        hook.call(fault);
    }
    error!(
        request_id = %request_id,
        handler_name = %handler_name,
        error = %fault,
        "Unhandled handler fault"
    );
    let _ = reply_tx.send(HandlerResponse::empty(500));
}

/// Wrap a fallible handler `(request) -> Result<()>`.
pub fn catch<F>(handler: F) -> impl Fn(HandlerRequest) + Send + 'static
where
    F: Fn(HandlerRequest) -> anyhow::Result<()> + Send + 'static,
{
    move |req: HandlerRequest| {
        let reply_tx = req.reply_tx.clone();
        let error_hook = req.error_hook.clone();
        let handler_name = req.handler_name.clone();
        let request_id = req.request_id;

        let fault = match catch_unwind(AssertUnwindSafe(|| handler(req))) {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(panic) => anyhow!("handler panicked: {}", panic_message(panic.as_ref())),
        };
        report_fault(
            request_id,
            &handler_name,
            error_hook.as_ref(),
            &reply_tx,
            &fault,
        );
    }
}

/// Wrap a fallible post-validation handler `(request, value) -> Result<()>`.
///
/// Composes inside [`checked`](crate::handler::checked): the checker narrows
/// the request, this boundary guards the handler body.
pub fn catch_checked<T, F>(handler: F) -> impl Fn(HandlerRequest, T) + Send + 'static
where
    F: Fn(HandlerRequest, T) -> anyhow::Result<()> + Send + 'static,
{
    move |req: HandlerRequest, value: T| {
        let reply_tx = req.reply_tx.clone();
        let error_hook = req.error_hook.clone();
        let handler_name = req.handler_name.clone();
        let request_id = req.request_id;

        let fault = match catch_unwind(AssertUnwindSafe(|| handler(req, value))) {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(panic) => anyhow!("handler panicked: {}", panic_message(panic.as_ref())),
        };
        report_fault(
            request_id,
            &handler_name,
            error_hook.as_ref(),
            &reply_tx,
            &fault,
        );
    }
}
