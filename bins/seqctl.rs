use std::sync::Arc;

use anyhow::{bail, Result};
use dotenvy::dotenv;
use migration::MigratorTrait;
use models::SequenceKey;
use sea_orm::DatabaseConnection;
use service::sequence::SeaOrmCounterStore;
use service::SequenceAllocator;
use tracing::info;

const USAGE: &str = "usage: seqctl <migrate | show [key] | next <key> | release <key>>";

async fn connect() -> Result<DatabaseConnection> {
    // config.toml when present, DATABASE_URL / .env otherwise
    match configs::AppConfig::load_or_env() {
        Ok(cfg) => models::db::connect_with_config(&cfg.database).await,
        Err(_) => models::db::connect().await,
    }
}

async fn allocator() -> Result<SequenceAllocator<SeaOrmCounterStore>> {
    let db = connect().await?;
    Ok(SequenceAllocator::new(Arc::new(SeaOrmCounterStore::new(db))))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    common::utils::logging::init_logging_default();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("migrate") => {
            let db = connect().await?;
            migration::Migrator::up(&db, None).await?;
            info!("migrations applied");
        }
        Some("show") => {
            let alloc = allocator().await?;
            let keys: Vec<SequenceKey> = match args.get(1) {
                Some(raw) => vec![raw.parse()?],
                None => SequenceKey::ALL.to_vec(),
            };
            for key in keys {
                println!("{:<12} {}", key, alloc.current(key).await?);
            }
        }
        Some("next") => {
            let Some(raw) = args.get(1) else { bail!(USAGE) };
            let alloc = allocator().await?;
            println!("{}", alloc.next_named(raw).await?);
        }
        Some("release") => {
            let Some(raw) = args.get(1) else { bail!(USAGE) };
            let key: SequenceKey = raw.parse()?;
            let alloc = allocator().await?;
            alloc.previous(key).await;
            println!("{:<12} {}", key, alloc.current(key).await?);
        }
        _ => bail!(USAGE),
    }
    Ok(())
}
