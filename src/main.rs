use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;

use axum::{
    http::{Request, Uri},
    middleware::Next,
    response::Response,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use pix_webhook::{db_service, env_utils, get_main_router, AppState};

struct RequestUri(Uri);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::debug!("initializing app state ...");

    let store = db_service::get_db_service().await;
    store.init_tables().await;

    let state = Arc::new(AppState {
        webhook_secret: env_utils::get_webhook_secret(),
        store,
    });

    let port = env_utils::get_port();
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let host_uri = env_utils::get_host_uri();

    tracing::info!("Starting server at host: {}", host_uri);

    axum::Server::bind(&addr)
        .serve(
            get_main_router(state)
                .layer(axum::middleware::from_fn(
                    |request: Request<_>, next: Next<_>| async move {
                        let uri = request.uri().clone();

                        let mut response = next.run(request).await;

                        response.extensions_mut().insert(RequestUri(uri));

                        response
                    },
                ))
                .layer(TraceLayer::new_for_http().on_response(
                    |response: &Response, latency: std::time::Duration, _span: &tracing::Span| {
                        let url = match response.extensions().get::<RequestUri>().map(|r| &r.0) {
                            Some(uri) => uri.to_string(),
                            None => "unknown".to_string(),
                        };
                        let status = response.status();
                        let latency = format!("{}ms", latency.as_millis());

                        if url == "/healthcheck" {
                            tracing::trace!("{} {} {}", url, status, latency);
                            return;
                        }

                        tracing::debug!("{} {} {}", url, status, latency);
                    },
                ))
                .into_make_service(),
        )
        .await
        .context("error while starting API server")?;

    Ok(())
}
