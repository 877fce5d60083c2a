use std::sync::Arc;

use anyhow::{bail, Context};
use axum::{
    extract::FromRef,
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, options, post, MethodRouter},
    Router,
};
use dotenv::dotenv;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod auth;
mod comments;
mod config;
mod error;
mod extract;
mod follows;
mod groups;
mod pagination;
mod permissions;
mod posts;
mod response;
mod store;


use auth::Actor;
use config::settings::Settings;
use error::AppError;
use permissions::Access;
use store::{memory::MemoryStore, postgres::PgStore, DynStore};

#[derive(Clone)]
pub struct AppState {
    store: DynStore,
    settings: Settings,
}

impl FromRef<AppState> for DynStore {
    fn from_ref(app_state: &AppState) -> DynStore {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for Settings {
    fn from_ref(app_state: &AppState) -> Settings {
        app_state.settings.clone()
    }
}

/// OPTIONS on a resource path: passes the path's request-level check and
/// lists the methods it serves.
fn preflight(access: Access, allow: &'static str) -> MethodRouter<AppState> {
    options(move |method: Method, actor: Actor| async move {
        permissions::authorize(access, &method, &actor)?;
        Ok::<_, AppError>((StatusCode::NO_CONTENT, [(header::ALLOW, allow)]).into_response())
    })
}

pub fn app(app_state: AppState) -> Router {
    const ITEM: &str = "GET, PUT, PATCH, DELETE, HEAD, OPTIONS";
    const COLLECTION: &str = "GET, POST, HEAD, OPTIONS";
    const READ_ONLY: &str = "GET, HEAD, OPTIONS";
    const WRITE_ONLY: &str = "POST, OPTIONS";

    let post_routes = Router::new()
        .route(
            "/v1/posts/",
            get(posts::handler::list_posts)
                .post(posts::handler::create_post)
                .merge(preflight(Access::AuthenticatedOrReadOnly, COLLECTION)),
        )
        .route(
            "/v1/posts/:id/",
            get(posts::handler::get_post)
                .put(posts::handler::replace_post)
                .patch(posts::handler::patch_post)
                .delete(posts::handler::delete_post)
                .merge(preflight(Access::AuthenticatedOrReadOnly, ITEM)),
        );

    let comment_routes = Router::new()
        .route(
            "/v1/posts/:post_id/comments/",
            get(comments::handler::list_comments)
                .post(comments::handler::create_comment)
                .merge(preflight(Access::AuthenticatedOrReadOnly, COLLECTION)),
        )
        .route(
            "/v1/posts/:post_id/comments/:id/",
            get(comments::handler::get_comment)
                .put(comments::handler::replace_comment)
                .patch(comments::handler::patch_comment)
                .delete(comments::handler::delete_comment)
                .merge(preflight(Access::AuthenticatedOrReadOnly, ITEM)),
        );

    let group_routes = Router::new()
        .route(
            "/v1/groups/",
            get(groups::handler::list_groups).merge(preflight(Access::AllowAny, READ_ONLY)),
        )
        .route(
            "/v1/groups/:id/",
            get(groups::handler::get_group).merge(preflight(Access::AllowAny, READ_ONLY)),
        );

    let follow_routes = Router::new().route(
        "/v1/follow/",
        get(follows::handler::list_follows)
            .post(follows::handler::create_follow)
            .merge(preflight(Access::Authenticated, COLLECTION)),
    );

    let auth_routes = Router::new()
        .route(
            "/v1/users/",
            post(auth::handler::signup).merge(preflight(Access::AllowAny, WRITE_ONLY)),
        )
        .route(
            "/v1/jwt/create/",
            post(auth::handler::obtain_token).merge(preflight(Access::AllowAny, WRITE_ONLY)),
        )
        .route(
            "/v1/jwt/refresh/",
            post(auth::handler::refresh_token).merge(preflight(Access::AllowAny, WRITE_ONLY)),
        )
        .route(
            "/v1/jwt/verify/",
            post(auth::handler::verify_token).merge(preflight(Access::AllowAny, WRITE_ONLY)),
        );

    Router::new()
        .merge(post_routes)
        .merge(comment_routes)
        .merge(group_routes)
        .merge(follow_routes)
        .merge(auth_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn open_store(settings: &Settings) -> anyhow::Result<DynStore> {
    if settings.uses_memory_store() {
        info!("using in-memory store; data is lost on exit");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = PgStore::connect(&settings.database_url, settings.database_max_connections)
        .await
        .context("connecting to the database")?;
    info!("database connected");

    store.migrate().await.context("applying migrations")?;
    info!("migrations applied");

    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let settings = Settings::from_env()?;
    let store = open_store(&settings).await?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("serve") => {}
        Some("add-group") => {
            let Some(title) = args.get(1) else {
                bail!("usage: blog-api add-group <title> [description]");
            };
            let description = args.get(2).map(String::as_str).unwrap_or("");
            let group = groups::add_group(store.as_ref(), title, description).await?;
            info!(group_id = group.id, slug = %group.slug, "group created");
            return Ok(());
        }
        Some(other) => bail!("unknown command '{}'", other),
    }

    let app_state = AppState {
        store,
        settings: settings.clone(),
    };

    info!("Server running on http://localhost:{}", settings.port);

    let listener = tokio::net::TcpListener::bind(settings.addr).await?;
    axum::serve(listener, app(app_state)).await?;

    Ok(())
}
