use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wishlist_store::{
    DEFAULT_STORAGE_KEY, FileStore, IdEquality, ItemId, PersistFormat, Toggled, WishlistConfig,
    WishlistItem, WishlistStore,
};

const DATA_DIR_ENV: &str = "WISHLIST_DATA_DIR";
const DEFAULT_DATA_DIR: &str = "./wishlist-data";

#[derive(Parser)]
#[command(name = "wishlist")]
#[command(about = "Inspect and edit a persisted wishlist")]
struct Cli {
    /// Directory holding the durable wishlist (defaults to $WISHLIST_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Durable key the wishlist is stored under
    #[arg(long, global = true, default_value = DEFAULT_STORAGE_KEY)]
    key: String,

    /// Treat numeric and string ids with the same text as one id
    #[arg(long, global = true)]
    canonical_ids: bool,

    /// Write a bare JSON array instead of the versioned envelope
    #[arg(long, global = true)]
    bare_array: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every item in order
    List,
    /// Add an item unless its id is already present
    Add(ItemArgs),
    /// Remove the item if present, otherwise add it
    Toggle(ItemArgs),
    /// Remove the item with the given id
    Remove(IdArgs),
    /// Exit with status 0 if the id is present, 1 otherwise
    Has(IdArgs),
    /// Remove every item
    Clear,
    /// Print the load outcome and store statistics
    Inspect,
}

#[derive(Args)]
struct IdArgs {
    #[arg(long)]
    id: String,

    /// Keep the id as a string even if it looks like a number
    #[arg(long)]
    text_id: bool,
}

impl IdArgs {
    fn item_id(&self) -> ItemId {
        if self.text_id {
            return ItemId::Text(self.id.clone());
        }
        match self.id.parse::<ItemId>() {
            Ok(id) => id,
            Err(never) => match never {},
        }
    }
}

#[derive(Args)]
struct ItemArgs {
    #[command(flatten)]
    id: IdArgs,

    #[arg(long)]
    name: String,

    #[arg(long, default_value_t = 0.0)]
    price: f64,

    #[arg(long)]
    image: Option<String>,

    #[arg(long)]
    description: Option<String>,
}

impl ItemArgs {
    fn item(&self) -> WishlistItem {
        let mut item = WishlistItem::new(self.id.item_id(), self.name.clone(), self.price);
        item.image = self.image.clone();
        item.description = self.description.clone();
        item
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir = data_dir(cli.data_dir.clone());

    let mut config = WishlistConfig::new().storage_key(&cli.key);
    if cli.canonical_ids {
        config = config.id_equality(IdEquality::Canonical);
    }
    if cli.bare_array {
        config = config.persist_format(PersistFormat::BareArray);
    }

    let storage = Arc::new(FileStore::new(&data_dir));
    let store = WishlistStore::new(storage, config).context("invalid wishlist configuration")?;
    let outcome = store.initialize().await;

    let mut exit_code = 0;
    match &cli.command {
        Command::List => {
            let snapshot = store.snapshot();
            println!("{}", serde_json::to_string_pretty(snapshot.items())?);
        }
        Command::Add(args) => {
            if store.add(args.item()) {
                println!("added {}", args.id.item_id());
            } else {
                println!("{} already in wishlist", args.id.item_id());
            }
        }
        Command::Toggle(args) => match store.toggle(args.item()) {
            Toggled::Added => println!("added {}", args.id.item_id()),
            Toggled::Removed => println!("removed {}", args.id.item_id()),
            Toggled::Ignored => println!("ignored"),
        },
        Command::Remove(args) => {
            let id = args.item_id();
            if store.remove(&id) {
                println!("removed {}", id);
            } else {
                println!("{} not in wishlist", id);
            }
        }
        Command::Has(args) => {
            let present = store.has(&args.item_id());
            println!("{}", present);
            if !present {
                exit_code = 1;
            }
        }
        Command::Clear => {
            store.clear();
            println!("cleared");
        }
        Command::Inspect => {
            let report = json!({
                "data_dir": data_dir.display().to_string(),
                "outcome": format!("{:?}", outcome),
                "stats": store.stats(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    store.shutdown().await;
    let stats = store.stats();
    if stats.writes_failed > 0 {
        bail!(
            "failed to persist wishlist to {}: {}",
            data_dir.display(),
            stats.last_write_error.unwrap_or_default()
        );
    }

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

fn data_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| env::var_os(DATA_DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}
