use std::{process, sync::Arc};

use peaklife::{
    application::{
        error::AppError,
        identity::{IdentityProvider, SessionVerifier},
        render::render_service,
        uploads::ImageStore,
    },
    cache::{CacheConfig, QueryCache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, Collaborators, HttpState},
        identity::{
            DisabledIdentityProvider, DisabledSessions, IdentityToolkitClient, JwtSessionVerifier,
        },
        memory::MemoryRepositories,
        telemetry,
        uploads::{DisabledImageStore, HttpImageStore},
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let collaborators = build_collaborators(&settings)?;
    let upload_limit = usize::try_from(settings.uploads.max_request_bytes.get()).map_err(|_| {
        InfraError::configuration("uploads.max_request_bytes does not fit in memory")
    })?;

    let state = match init_database(&settings).await? {
        Some(db) => HttpState::assemble(db.clone(), collaborators, &settings.site, upload_limit)
            .with_database(db),
        None => {
            warn!(
                "database.url is not set; serving from the in-memory store, nothing will persist"
            );
            HttpState::assemble(
                Arc::new(MemoryRepositories::new()),
                collaborators,
                &settings.site,
                upload_limit,
            )
        }
    };

    serve_http(&settings, state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let database_url = settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    info!("database migrations applied");
    Ok(())
}

async fn init_database(
    settings: &config::Settings,
) -> Result<Option<Arc<PostgresRepositories>>, AppError> {
    let Some(database_url) = settings.database.url.as_deref() else {
        return Ok(None);
    };

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    if settings.database.run_migrations {
        PostgresRepositories::run_migrations(&pool)
            .await
            .map_err(|err| InfraError::database(err.to_string()))?;
    }

    Ok(Some(Arc::new(PostgresRepositories::new(pool))))
}

fn build_collaborators(settings: &config::Settings) -> Result<Collaborators, AppError> {
    let identity: Arc<dyn IdentityProvider> =
        match IdentityToolkitClient::from_settings(&settings.identity)? {
            Some(client) => Arc::new(client),
            None => {
                warn!("identity provider is not configured; account endpoints will fail");
                Arc::new(DisabledIdentityProvider)
            }
        };

    let sessions: Arc<dyn SessionVerifier> =
        match JwtSessionVerifier::from_settings(&settings.session)? {
            Some(verifier) => Arc::new(verifier),
            None => {
                warn!("session key is not configured; every authenticated route will refuse");
                Arc::new(DisabledSessions)
            }
        };

    let images: Arc<dyn ImageStore> = match HttpImageStore::from_settings(&settings.uploads)? {
        Some(store) => Arc::new(store),
        None => {
            warn!("image storage is not configured; uploads will fail");
            Arc::new(DisabledImageStore)
        }
    };

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = cache_config
        .enabled
        .then(|| Arc::new(QueryCache::new(cache_config)));

    Ok(Collaborators {
        identity,
        images,
        sessions,
        renderer: render_service(),
        cache,
    })
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(addr = %settings.server.addr, "listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
