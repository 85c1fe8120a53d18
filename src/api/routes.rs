use axum::http::{header, HeaderValue, Method};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

#[cfg(not(test))]
use {
    std::net::IpAddr,
    std::sync::Arc,
    tower_governor::{governor::GovernorConfigBuilder, key_extractor::KeyExtractor, GovernorLayer},
};

use crate::api::handlers::{self as api_handlers, AppState};
use crate::config::Settings;
use crate::web::handlers as web_handlers;

/// Create the router with all endpoints (API + Web UI)
#[cfg_attr(test, allow(unused_variables))]
pub fn create_router(state: AppState, settings: &Settings) -> Router {
    #[cfg_attr(test, allow(unused_mut))]
    let mut api_routes = Router::new()
        // GitHub data
        .route("/users/:username/repos", get(api_handlers::list_user_repos))
        .route("/repos", get(api_handlers::get_repository))
        .route("/repos/contents", get(api_handlers::get_contents))
        .route("/repos/tree", get(api_handlers::get_tree))
        .route("/search", get(api_handlers::search_repositories))
        // AI flows
        .route("/analyze", post(api_handlers::analyze))
        .route("/docs", post(api_handlers::document_file))
        .route("/ask", post(api_handlers::ask))
        .route("/suggest", post(api_handlers::suggest))
        // Sessions
        .route("/sessions", post(api_handlers::create_session))
        .route(
            "/sessions/:id",
            get(api_handlers::get_session).delete(api_handlers::delete_session),
        )
        .route("/sessions/:id/username", put(api_handlers::set_username))
        .route("/sessions/:id/tree", post(api_handlers::open_tree))
        .route("/sessions/:id/docs", post(api_handlers::document_node))
        .route(
            "/sessions/:id/chat",
            post(api_handlers::start_chat).delete(api_handlers::clear_chat),
        )
        .route(
            "/sessions/:id/chat/messages",
            post(api_handlers::post_question),
        )
        .with_state(state.clone());

    // Every API call fans out to GitHub or the AI service, so limit per client IP.
    // Disabled in tests, where requests carry no peer address.
    #[cfg(not(test))]
    {
        // Falls back to localhost when the peer address is unavailable
        #[derive(Clone, Copy, Debug)]
        struct FallbackIpKeyExtractor;

        impl KeyExtractor for FallbackIpKeyExtractor {
            type Key = IpAddr;

            fn extract<B>(
                &self,
                req: &axum::http::Request<B>,
            ) -> Result<Self::Key, tower_governor::GovernorError> {
                if let Some(axum::extract::ConnectInfo(addr)) = req
                    .extensions()
                    .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
                {
                    return Ok(addr.ip());
                }

                Ok(IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)))
            }
        }

        if let Some(governor_conf) = GovernorConfigBuilder::default()
            .key_extractor(FallbackIpKeyExtractor)
            .per_second(settings.server.api_rate_limit)
            .burst_size((settings.server.api_rate_limit as u32).saturating_mul(2))
            .finish()
        {
            api_routes = api_routes.layer(GovernorLayer {
                config: Arc::new(governor_conf),
            });
        } else {
            tracing::warn!("Invalid API rate limit configuration, rate limiting disabled");
        }
    }

    let api_routes = api_routes;

    // Web UI routes
    let web_routes = Router::new()
        .route("/", get(web_handlers::index))
        .route("/dashboard", get(web_handlers::dashboard_page))
        .route("/analyze", get(web_handlers::analyze_page))
        .route("/docs", get(web_handlers::docs_page))
        .route("/docs/file", get(web_handlers::file_docs_page))
        .route("/suggest", get(web_handlers::suggest_page))
        .route("/qa", get(web_handlers::qa_page).post(web_handlers::qa_ask))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(api_handlers::health_check))
        .route("/ready", get(api_handlers::readiness_check))
        .with_state(state);

    Router::new()
        .merge(web_routes)
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(RequestBodyLimitLayer::new(
            settings.server.max_request_body_size,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .allow_origin(tower_http::cors::Any)
                .max_age(Duration::from_secs(3600)),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(
                "default-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data: https:; object-src 'none'; base-uri 'self'",
            ),
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
