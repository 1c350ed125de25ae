use anyhow::{Context, Result};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::{
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use reqwest::Client;
use rhythm90_backend::config::{Config, LedgerBackend};
use rhythm90_backend::db::{
    in_memory_usage_repository::InMemoryUsageLedger,
    postgres_saved_response_repository::PostgresSavedResponseRepository,
    postgres_settings_repository::PostgresSettingsRepository,
    postgres_stripe_event_log_repository::PostgresStripeEventLogRepository,
    postgres_subscription_repository::PostgresSubscriptionRepository,
    postgres_usage_repository::PostgresUsageLedger, subscription_repository::SubscriptionRepository,
    usage_repository::UsageLedger,
};
use rhythm90_backend::responses::JsonResponse;
use rhythm90_backend::routes::{
    saved_responses::{
        create_saved_response, delete_saved_response, get_shared_response, list_saved_responses,
        list_team_responses, set_favorite, set_sharing,
    },
    settings::{get_settings, update_settings},
    stripe::webhook,
    subscription::get_subscription,
    tools::run_tool,
    usage::{check_tool_limit, record_tool_usage, usage_summary},
};
use rhythm90_backend::services::{
    settings_cache::SettingsCache,
    stripe::LiveStripeService,
    tools::HttpToolInvoker,
    usage::{plan_catalog::StaticPlanCatalog, UsageGate},
};
use rhythm90_backend::state::AppState;
use rhythm90_backend::utils::jwt::SessionTokens;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rhythm90_backend=info,tower_http=info"));
    let builder = FmtSubscriber::builder().with_env_filter(filter);
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing::subscriber::set_global_default(builder.json().flatten_event(true).finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing().context("failed to install tracing subscriber")?;

    let config = Config::from_env().context("invalid configuration")?;
    let session_tokens = Arc::new(
        SessionTokens::from_env(&config.jwt_issuer, &config.jwt_audience)
            .context("invalid JWT_SECRET")?,
    );

    let global_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(config.rate_limit.global_per_millisecond)
            .burst_size(config.rate_limit.global_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .context("invalid global rate limiter settings")?,
    );

    // Stricter limiter for tool runs, which cost provider calls.
    let tools_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit.tools_per_second)
            .burst_size(config.rate_limit.tools_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many tool runs. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .context("invalid tool rate limiter settings")?,
    );

    let limiters = [
        global_governor_conf.limiter().clone(),
        tools_governor_conf.limiter().clone(),
    ];
    std::thread::spawn(move || {
        let interval = std::time::Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            for limiter in &limiters {
                limiter.retain_recent();
            }
        }
    });

    let pg_pool = establish_connection(&config.database_url).await?;
    sqlx::migrate!("./migrations")
        .run(&pg_pool)
        .await
        .context("failed to run database migrations")?;
    info!("database migrations completed");

    let plan_catalog = match &config.usage.plan_limits_path {
        Some(path) => {
            let catalog = StaticPlanCatalog::from_path(path)
                .with_context(|| format!("failed to load plan limits from {}", path.display()))?;
            info!(path = %path.display(), "loaded plan limits");
            catalog
        }
        None => {
            info!("using built-in plan limits");
            StaticPlanCatalog::builtin()
        }
    };

    let usage_ledger: Arc<dyn UsageLedger> = match config.usage.ledger_backend {
        LedgerBackend::Postgres => Arc::new(PostgresUsageLedger {
            pool: pg_pool.clone(),
        }),
        LedgerBackend::Memory => {
            warn!("usage ledger is in memory; counts reset on restart");
            Arc::new(InMemoryUsageLedger::new())
        }
    };

    let subscriptions = Arc::new(PostgresSubscriptionRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn SubscriptionRepository>;

    let usage_gate = UsageGate::new(
        usage_ledger,
        Arc::new(plan_catalog),
        subscriptions.clone(),
        config.usage.lookup_timeout,
    );

    let settings = SettingsCache::new(
        Arc::new(PostgresSettingsRepository {
            pool: pg_pool.clone(),
        }),
        config.settings_cache_ttl,
    );

    let http_client = Client::new();

    let state = AppState {
        usage_gate: Arc::new(usage_gate),
        subscriptions,
        stripe_events: Arc::new(PostgresStripeEventLogRepository {
            pool: pg_pool.clone(),
        }),
        saved_responses: Arc::new(PostgresSavedResponseRepository {
            pool: pg_pool.clone(),
        }),
        settings: Arc::new(settings),
        stripe: Arc::new(LiveStripeService::from_settings(&config.stripe)),
        tool_invoker: Arc::new(HttpToolInvoker::from_settings(
            &http_client,
            &config.ai_upstream,
        )),
        session_tokens,
    };

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .frontend_origin
                .parse::<HeaderValue>()
                .context("FRONTEND_ORIGIN is not a valid header value")?,
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let tool_routes = Router::new()
        .route("/{tool}", post(run_tool))
        .layer(GovernorLayer {
            config: tools_governor_conf.clone(),
        });

    let usage_routes = Router::new()
        .route("/", get(usage_summary))
        .route("/{tool}", get(check_tool_limit).post(record_tool_usage));

    let saved_response_routes = Router::new()
        .route("/", get(list_saved_responses).post(create_saved_response))
        .route("/{id}", axum::routing::delete(delete_saved_response))
        .route("/{id}/favorite", post(set_favorite))
        .route("/{id}/share", post(set_sharing));

    let app = Router::new()
        .route("/", get(root))
        .nest("/api/usage", usage_routes)
        .nest("/api/tools", tool_routes)
        .nest("/api/saved-responses", saved_response_routes)
        .route("/api/team/saved-responses", get(list_team_responses))
        .route("/api/shared/{slug}", get(get_shared_response))
        .route("/api/subscription", get(get_subscription))
        .route("/api/billing/webhook", post(webhook))
        .route("/api/settings", get(get_settings))
        .route("/api/admin/settings", put(update_settings))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer {
            config: global_governor_conf.clone(),
        })
        .layer(cors);

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");
    axum::serve(listener, make_service)
        .await
        .context("server error")?;
    Ok(())
}

/// A simple root route.
async fn root() -> Response {
    JsonResponse::success("Rhythm90 API").into_response()
}

/// Establish a connection to the database and verify it.
async fn establish_connection(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(database_url)
        .await
        .context("failed to connect to the database")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("failed to verify database connection")?;

    info!("connected to the database");
    Ok(pool)
}
