use std::net::SocketAddr;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use sqlx::PgPool;
use tower_sessions::{cookie::SameSite, Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::{auth, categories, products, state::AppState};

pub const SESSION_COOKIE: &str = "storefront_admin_session";

/// Sessions persisted in Postgres (`tower_sessions.session`). The table is
/// created by [`PostgresStore::migrate`] at start-up.
pub fn session_store(db: PgPool) -> PostgresStore {
    PostgresStore::new(db)
}

pub fn build_app<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let sessions = session_layer(&state, session_store);
    let cors = cors_layer(&state);

    Router::new()
        .merge(auth::router())
        .merge(categories::router())
        .merge(products::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(sessions)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

fn session_layer<S>(state: &AppState, store: S) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    let cfg = &state.config.session;
    let same_site = if cfg.cross_site {
        SameSite::None
    } else {
        SameSite::Lax
    };
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE)
        .with_http_only(true)
        .with_path("/")
        .with_secure(cfg.cross_site)
        .with_same_site(same_site)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(cfg.ttl_hours)))
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
