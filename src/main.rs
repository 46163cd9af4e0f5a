use honor_guard_site::{
    AppState, Repositories,
    auth::{CognitoVerifier, SharedSecretVerifier, VerifierState},
    config::{AppConfig, Env},
    create_router,
    identity::{CognitoIdentityProvider, DisabledIdentityProvider, IdentityState},
    notifications::{LogNotifier, NotifierState, SmtpNotifier},
    storage::{S3StorageClient, StorageService, StorageState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Startup: config, logging, database (with migrations), external clients,
/// then the HTTP server. Any failure here aborts the process.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "honor_guard_site=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // Database
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Database migrations failed.");
    tracing::info!("Database migrations applied");

    let repos = Repositories::postgres(pool);

    // Object storage
    let s3_client = S3StorageClient::new(
        &config.s3_endpoint,
        &config.s3_region,
        &config.s3_key,
        &config.s3_secret,
        &config.s3_bucket,
        &config.s3_public_url,
    )
    .await;

    if config.env == Env::Local {
        s3_client.ensure_bucket_exists().await;
    }
    let storage = Arc::new(s3_client) as StorageState;

    // Identity provider and token verification
    let (identity, verifier): (IdentityState, VerifierState) = match &config.cognito {
        Some(cognito) => {
            tracing::info!(pool = %cognito.user_pool_id, "Using Cognito user pool");
            (
                Arc::new(CognitoIdentityProvider::new(
                    &cognito.region,
                    &cognito.user_pool_id,
                    &cognito.access_key,
                    &cognito.secret_key,
                )),
                Arc::new(CognitoVerifier::new(cognito)),
            )
        }
        None => {
            tracing::warn!("COGNITO_USER_POOL_ID not set, using HS256 tokens and no identity sync");
            (
                Arc::new(DisabledIdentityProvider),
                Arc::new(SharedSecretVerifier::new(&config.jwt_secret)),
            )
        }
    };

    // Email
    let notifier: NotifierState = match &config.smtp {
        Some(smtp) => Arc::new(
            SmtpNotifier::new(
                &smtp.host,
                smtp.port,
                &smtp.username,
                &smtp.password,
                &smtp.from_address,
                &config.public_site_url,
            )
            .expect("FATAL: Invalid SMTP configuration."),
        ),
        None => {
            tracing::warn!("SMTP_HOST not set, welcome emails are only logged");
            Arc::new(LogNotifier::new(&config.public_site_url))
        }
    };

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(repos, identity, notifier, storage, verifier, config);
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: Cannot bind {bind_addr}: {e}"));

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
