pub mod api;
pub mod card_key;
pub mod config;
pub mod db;
pub mod entities;
pub mod models;
pub mod services;
pub mod state;
pub mod token;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use config::Config;
use db::Store;
use state::SharedState;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        None | Some("serve") => run_server(config).await,

        Some("init") => {
            let path = Config::create_default_if_missing()?;
            println!("Config file ready at {}", path.display());
            Ok(())
        }

        Some("create-admin") => {
            if args.len() < 4 {
                println!("Usage: cardgate create-admin <username> <password>");
                return Ok(());
            }
            cmd_create_admin(&config, &args[2], &args[3]).await
        }

        Some("create-app") => {
            if args.len() < 3 {
                println!("Usage: cardgate create-app <name> [description]");
                return Ok(());
            }
            cmd_create_app(&config, &args[2], args.get(3).map(String::as_str)).await
        }

        Some("gen-cards") => {
            if args.len() < 5 {
                println!("Usage: cardgate gen-cards <app_id> <count> <valid_days> [perm,perm,...]");
                println!("Example: cardgate gen-cards 1 10 365 wechat,ximalaya");
                return Ok(());
            }
            cmd_gen_cards(&config, &args[2], &args[3], &args[4], args.get(5)).await
        }

        Some("help" | "-h" | "--help") => {
            print_help();
            Ok(())
        }

        Some(other) => {
            println!("Unknown command: {other}");
            println!();
            print_help();
            Ok(())
        }
    }
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    let store = Store::new(&config.general.database_path)
        .await
        .context("Failed to open database")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = SharedState::new(config, store);
    let router = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Listening on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("Shutdown signal received");
}

async fn cmd_create_admin(config: &Config, username: &str, password: &str) -> anyhow::Result<()> {
    use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

    let store = Store::new(&config.general.database_path).await?;

    let existing = entities::users::Entity::find()
        .filter(entities::users::Column::Username.eq(username))
        .one(&store.conn)
        .await?;

    if existing.is_some() {
        println!("User '{username}' already exists");
        return Ok(());
    }

    let hash = db::repositories::user::hash_password(password, Some(&config.security))?;
    let now = chrono::Utc::now();

    let admin = entities::users::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(hash),
        status: Set(entities::users::UserStatus::Normal),
        role: Set(entities::users::UserRole::Admin),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let admin = admin.insert(&store.conn).await?;

    println!("Admin user '{}' created (id {})", admin.username, admin.id);

    Ok(())
}

async fn cmd_create_app(
    config: &Config,
    name: &str,
    description: Option<&str>,
) -> anyhow::Result<()> {
    use services::AppService;

    let store = Store::new(&config.general.database_path).await?;
    let service = services::SeaOrmAppService::new(store);

    let app = service
        .create_app(name, description)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    println!("App '{}' created (id {})", app.app_name, app.id);
    println!("App key: {}", app.app_key);

    Ok(())
}

async fn cmd_gen_cards(
    config: &Config,
    app_id: &str,
    count: &str,
    valid_days: &str,
    permissions: Option<&String>,
) -> anyhow::Result<()> {
    use services::{AdminService, GenerateCardsRequest};

    let app_id: i32 = app_id.parse().context("app_id must be a number")?;
    let count: u32 = count.parse().context("count must be a number")?;
    let valid_days: i64 = valid_days.parse().context("valid_days must be a number")?;

    let permissions: Vec<String> = permissions
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    let store = Store::new(&config.general.database_path).await?;
    let service = services::SeaOrmAdminService::new(store);

    let cards = service
        .generate_cards(GenerateCardsRequest {
            app_id,
            count,
            valid_days,
            max_device_count: 1,
            permissions,
            remark: None,
        })
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    println!("Generated {} cards:", cards.len());
    for card in cards {
        println!("  {}", card.card_key);
    }

    Ok(())
}

fn print_help() {
    println!("Cardgate - Card-key activation backend");
    println!();
    println!("USAGE:");
    println!("  cardgate [COMMAND]");
    println!();
    println!("COMMANDS:");
    println!("  serve                Run the HTTP server (default)");
    println!("  init                 Create default config file");
    println!("  create-admin <u> <p> Create an admin user");
    println!("  create-app <name>    Register an app and print its key");
    println!("  gen-cards <app_id> <count> <days> [perms]");
    println!("                       Generate a batch of cards");
    println!("  help                 Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("  cardgate init");
    println!("  cardgate create-app \"My App\"");
    println!("  cardgate gen-cards 1 10 365 wechat,ximalaya");
    println!("  cardgate serve");
}
