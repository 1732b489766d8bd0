mod blob;
mod config;
mod db;
mod entities;
mod error;
mod forms;
mod models;
mod repository;
mod routes;
mod session;
mod templates;


use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    routing::get,
};
use axum_extra::extract::cookie::Key;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    blob::{BlobStore, FsBlobStore},
    config::Config,
    repository::Repository,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repo: Repository,
    pub blobs: Arc<dyn BlobStore>,
    pub cookie_key: Key,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    let max_upload = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(routes::home))
        .route("/register", get(routes::register_form).post(routes::register))
        .route("/login", get(routes::login_form).post(routes::login))
        .route("/logout", get(routes::logout))
        .route("/admin", get(routes::admin))
        .route("/admin/add_movie", get(routes::add_movie_form).post(routes::add_movie))
        .route("/user", get(routes::user_home))
        .route("/movies", get(routes::movies))
        .route("/movie/{id}", get(routes::movie))
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(routes::not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_upload)),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,marquee=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let cookie_key =
        Key::try_from(config.secret_key.as_bytes()).context("SECRET_KEY must be at least 64 bytes")?;

    let db = db::connect_and_migrate(&config.database_url).await?;
    let blobs = FsBlobStore::new(config.upload_dir.clone(), "movie");

    let state = AppState {
        config: config.clone(),
        repo: Repository::new(db),
        blobs: Arc::new(blobs),
        cookie_key,
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, admin_policy = ?config.admin_policy, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
