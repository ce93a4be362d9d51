use axum::{Router, response::Html, routing::get};

use ilog_session::{
    DataStore, DataStoreConfig, SessionConfig, StorageError, User, UserStore, UnitOfWorkError,
    spawn_query_logger, spawn_session_sweeper, with_unit_of_work,
};
use ilog_session_axum::{AxumConfig, AuthMind, PersistentSessionWrapper, ilog_session_router};

mod server;

use server::{init_tracing, spawn_http_server};

const DEFAULT_PORT: u16 = 3001;

async fn index(auth: AuthMind, prefix: &str) -> (AuthMind, Html<String>) {
    let body = if auth.is_authenticated() {
        format!(
            "<p>Hello, {}!</p><p><a href=\"{prefix}/logout\">Logout</a></p>",
            auth.mind.display_name
        )
    } else {
        format!(
            concat!(
                "<p>Hello, anonymous user</p>",
                "<form method=\"post\" action=\"{prefix}/login\">",
                "<input name=\"username\" placeholder=\"username\">",
                "<input name=\"password\" type=\"password\" placeholder=\"password\">",
                "<label><input name=\"rememberMe\" type=\"checkbox\"> Remember me</label>",
                "<button type=\"submit\">Login</button>",
                "</form>"
            ),
            prefix = prefix
        )
    };
    (auth, Html(body))
}

/// Create or update the demo account from `ILOG_DEMO_USERNAME` and `ILOG_DEMO_PASSWORD`
async fn seed_demo_user(store: &DataStore) -> Result<(), Box<dyn std::error::Error>> {
    let Ok(password) = std::env::var("ILOG_DEMO_PASSWORD") else {
        tracing::info!("ILOG_DEMO_PASSWORD not set, skipping demo user");
        return Ok(());
    };
    let username =
        std::env::var("ILOG_DEMO_USERNAME").unwrap_or_else(|_| "demo@localhost".to_string());
    tracing::info!("Seeding demo user {}", username);

    let user = User::new(username).with_password(&password)?.confirmed();
    with_unit_of_work::<_, StorageError, _>(store, move |uow| {
        Box::pin(async move {
            UserStore::upsert_user(uow, &user).await?;
            uow.commit().await?;
            Ok(())
        })
    })
    .await
    .map_err(UnitOfWorkError::flatten)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing("demo_ilog");

    let store = DataStore::connect_lazy(&DataStoreConfig::from_env())?;
    ilog_session::init(&store).await?;
    seed_demo_user(&store).await?;

    if let Some(bus) = store.events() {
        spawn_query_logger(bus);
    }

    let session_config = SessionConfig::from_env();
    let wrapper = PersistentSessionWrapper::new(store.clone(), session_config.clone());
    spawn_session_sweeper(store, wrapper.sessions().clone(), &session_config);

    let axum_config = AxumConfig::from_env();
    let prefix = axum_config.route_prefix.clone();
    let app = Router::new()
        .route(
            "/",
            get(move |auth: AuthMind| {
                let prefix = prefix.clone();
                async move { index(auth, &prefix).await }
            }),
        )
        .with_state(wrapper.clone())
        .nest(&axum_config.route_prefix, ilog_session_router(wrapper));

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    spawn_http_server(port, app).await?;
    Ok(())
}
