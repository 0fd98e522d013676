use anyhow::Result;
use checkroute::middleware::TracingMiddleware;
use checkroute::runtime_config::RuntimeConfig;
use checkroute::server::{AppService, HttpServer};
use checkroute::{
    catch_checked, checked, field, number, object, string, HandlerRequest, HandlerResponse,
    RequestShape, TypedRouter,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct CreateUser {
    body: NewUser,
}

#[derive(Debug, Deserialize)]
struct NewUser {
    name: String,
    age: serde_json::Number,
}

fn create_user(req: HandlerRequest, user: CreateUser) -> Result<()> {
    let NewUser { name, age } = user.body;
    // Persistence lives elsewhere; the id is a placeholder.
    let _ = req.reply_tx.send(HandlerResponse::json(
        201,
        json!({ "id": 42, "name": name, "age": age }),
    ));
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = RuntimeConfig::from_env();
    may::config().set_stack_size(config.stack_size);

    let shape =
        RequestShape::new().body(object([field("name", string()), field("age", number())]));

    let root = TypedRouter::new();
    root.use_middleware(TracingMiddleware);
    root.post(
        "/user",
        checked(shape.checker::<CreateUser>()?, catch_checked(create_user)),
    );

    // SAFETY: the may runtime is configured above; handlers reply exactly
    // once through their channel.
    let (router, dispatcher) = unsafe { root.build() };
    let service = AppService::new(router, dispatcher);

    let handle = HttpServer(service).start("0.0.0.0:8080")?;
    info!("user service listening on 0.0.0.0:8080");
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server failed: {e:?}"))?;
    Ok(())
}
