use clap::{Args, Parser, Subcommand};
use std::sync::Arc;

use directory_favorites::application::services::{FavoritesService, LikeController};
use directory_favorites::domain::entities::{FavoriteRecord, ItemKind, User};
use directory_favorites::infrastructure::adapters::ConsoleNotifier;
use directory_favorites::infrastructure::auth::Session;
use directory_favorites::infrastructure::config::Config;
use directory_favorites::FavoritesError;

#[derive(Parser)]
#[command(name = "favorites")]
#[command(about = "Manage saved businesses, products and services", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "favorites.yaml")]
    config: String,

    /// Signed-in user id (overrides config)
    #[arg(short, long)]
    user: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Favorite an item, or unfavorite it if already saved
    Toggle(ItemArgs),
    /// Show whether an item is saved
    Status {
        id: String,
        /// Expected item type (product, service, business)
        #[arg(short, long)]
        kind: Option<String>,
    },
    /// List saved items
    List {
        /// Only this bucket (product, service, business)
        #[arg(short, long)]
        kind: Option<String>,
    },
    /// Move misfiled entries back into their own bucket
    Repair,
    /// Remove every saved item for the user
    Clear,
    /// Generate default config
    InitConfig,
    /// Show version
    Version,
}

#[derive(Args)]
struct ItemArgs {
    /// product, service or business
    kind: String,
    id: String,
    name: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long, default_value = "USD")]
    currency: String,
    #[arg(long)]
    business_id: Option<String>,
    #[arg(long)]
    business_name: Option<String>,
    #[arg(long)]
    rating: Option<f64>,
    #[arg(long, default_value_t = 0)]
    reviews: u32,
}

impl ItemArgs {
    fn into_record(self) -> Result<FavoriteRecord, String> {
        let kind = parse_kind(&self.kind)?;
        let mut record = FavoriteRecord::new(kind, self.id, self.name);

        if let Some(description) = self.description {
            record = record.with_description(description);
        }
        if let Some(price) = self.price {
            record = record.with_price(price, self.currency);
        }
        if let Some(business_id) = self.business_id {
            let business_name = self.business_name.unwrap_or_default();
            record = record.with_business(business_id, business_name);
        }
        if let Some(rating) = self.rating {
            record = record.with_rating(rating, self.reviews);
        }

        Ok(record)
    }
}

fn parse_kind(s: &str) -> Result<ItemKind, String> {
    ItemKind::parse(s).ok_or_else(|| format!("Unknown item type: {} (expected product, service or business)", s))
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("favorites v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config(&cli.config);
        }
        command => {
            let config = load_config(&cli.config);
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!("Failed to start runtime: {}", e);
                    std::process::exit(1);
                }
            };

            if let Err(e) = rt.block_on(run(command, config, cli.user)) {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
    }
}

fn load_config(path: &str) -> Config {
    if !std::path::Path::new(path).exists() {
        return Config::load_env().unwrap_or_else(|e| {
            tracing::warn!("Ignoring environment overrides: {}", e);
            Config::default()
        });
    }

    let config = Config::load(path).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}, using defaults", e);
        Config::default()
    });

    config.with_env().unwrap_or_else(|e| {
        tracing::warn!("Ignoring environment overrides: {}", e);
        config
    })
}

async fn run(command: Commands, config: Config, user_override: Option<String>) -> Result<(), String> {
    let store = config.open_store().await.map_err(|e| e.to_string())?;
    let service = Arc::new(
        FavoritesService::new(store).with_key_prefix(config.storage.key_prefix.clone()),
    );

    let user = user_override.map(User::new).or_else(|| config.session_user());
    let user_id = user.as_ref().map(|u| u.id.clone());

    match command {
        Commands::Toggle(item) => {
            let record = item.into_record()?;
            let session = match user {
                Some(user) => Session::signed_in(user),
                None => Session::anonymous(),
            };

            let mut controller = LikeController::new(service, session, ConsoleNotifier::new(), record);
            controller.load().await;
            match controller.toggle().await {
                Ok(_) | Err(FavoritesError::AuthRequired) => Ok(()),
                Err(e) => Err(e.to_string()),
            }
        }
        Commands::Status { id, kind } => {
            let expected = kind.as_deref().map(parse_kind).transpose()?;
            let liked = service.is_favorited(user_id.as_deref(), &id, expected).await;
            println!("{}: {}", id, if liked { "saved" } else { "not saved" });
            Ok(())
        }
        Commands::List { kind } => {
            let user_id = user_id.ok_or("Sign in required: pass --user or set FAVORITES_USER")?;
            let kinds = match kind {
                Some(kind) => vec![parse_kind(&kind)?],
                None => ItemKind::ALL.to_vec(),
            };

            for kind in kinds {
                let records = service.favorites(&user_id, kind).await;
                println!("{} ({})", kind.bucket_name(), records.len());
                for record in records {
                    println!("  {}  {}  saved {}", record.id, record.name, record.created_at.format("%Y-%m-%d"));
                }
            }
            Ok(())
        }
        Commands::Repair => {
            let user_id = user_id.ok_or("Sign in required: pass --user or set FAVORITES_USER")?;
            let changed = service.repair(&user_id).await.map_err(|e| e.to_string())?;
            println!("Repaired {} entries", changed);
            Ok(())
        }
        Commands::Clear => {
            let user_id = user_id.ok_or("Sign in required: pass --user or set FAVORITES_USER")?;
            service.clear(&user_id).await.map_err(|e| e.to_string())?;
            println!("Cleared favorites for {}", user_id);
            Ok(())
        }
        Commands::InitConfig | Commands::Version => Ok(()),
    }
}

fn init_config(path: &str) {
    if std::path::Path::new(path).exists() {
        tracing::warn!("{} already exists, not overwriting", path);
        return;
    }

    let config = Config::default();
    match serde_yaml::to_string(&config) {
        Ok(yaml) => match std::fs::write(path, yaml) {
            Ok(()) => println!("Wrote default config to {}", path),
            Err(e) => tracing::error!("Failed to write config: {}", e),
        },
        Err(e) => tracing::error!("Failed to serialize config: {}", e),
    }
}
