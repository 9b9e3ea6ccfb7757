use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use lifesync::config::{Overrides, Settings};
use lifesync::sync::SyncDirection;
use lifesync_common::{
    Cuisine, Difficulty, EntityKind, Ingredient, MealStatus, Priority, ShoppingCategory,
    StoreType, TodoStatus,
};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "lifesync")]
#[command(
    version,
    about = "Local-first household organizer with web app sync and a server watchdog"
)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Answer yes to confirmation prompts
    #[arg(long, global = true)]
    pub yes: bool,

    /// Web app base URL. Overrides config.json and LIFESYNC_API_URL.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Data directory. Overrides config.json and LIFESYNC_DATA_PATH.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Shopping list
    Shop {
        #[command(subcommand)]
        command: ShopCommands,
    },
    /// Recipe book
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Meal planning
    Meal {
        #[command(subcommand)]
        command: MealCommands,
    },
    /// Grocery stores and ratings
    Store {
        #[command(subcommand)]
        command: StoreCommands,
    },
    /// Todo list
    Todo {
        #[command(subcommand)]
        command: TodoCommands,
    },
    /// Sync shopping, recipes and meals with the web app
    Sync {
        /// pull, push or both
        #[arg(default_value = "both")]
        direction: SyncDirection,

        /// Sync a single collection: shopping, recipes or meals
        #[arg(long)]
        only: Option<EntityKind>,
    },
    /// Export shopping, recipes and meals to a JSON file
    Export { path: PathBuf },
    /// Import a file written by `export`
    Import { path: PathBuf },
    /// View or change configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Run the web app server under the watchdog
    Monitor {
        /// Path to monitor.toml (defaults to the config directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write a default monitor.toml and exit
        #[arg(long)]
        init: bool,
    },
    /// Check configuration, local data files and the web app
    Diagnose,
}

#[derive(Subcommand, Clone)]
pub enum ShopCommands {
    /// List items still to buy
    List {
        /// Include purchased items
        #[arg(long)]
        all: bool,
    },
    /// Add an item
    Add {
        name: String,
        #[arg(short, long, default_value = "1")]
        quantity: u32,
        #[arg(short, long)]
        unit: Option<String>,
        #[arg(short, long)]
        category: Option<ShoppingCategory>,
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        store: Option<String>,
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Mark an item purchased
    Done {
        id: String,
        /// Mark it as not purchased instead
        #[arg(long)]
        undo: bool,
    },
    /// Change fields, e.g. `quantity=3 notes="organic"`
    Update {
        id: String,
        #[arg(required = true, value_name = "FIELD=VALUE")]
        fields: Vec<String>,
    },
    /// Delete an item
    Remove { id: String },
}

#[derive(Subcommand, Clone)]
pub enum RecipeCommands {
    List,
    Show {
        id: String,
    },
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        cuisine: Option<Cuisine>,
        #[arg(long)]
        difficulty: Option<Difficulty>,
        /// Preparation time in minutes
        #[arg(long)]
        prep: Option<u32>,
        /// Cooking time in minutes
        #[arg(long)]
        cook: Option<u32>,
        #[arg(long)]
        servings: Option<u32>,
        /// "amount unit name", repeatable
        #[arg(long = "ingredient")]
        ingredients: Vec<Ingredient>,
        /// Instruction step, repeatable and kept in order
        #[arg(long = "step")]
        steps: Vec<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    Remove {
        id: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum MealCommands {
    /// List planned meals
    List {
        /// Only this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Plan a meal for a date (YYYY-MM-DD)
    Plan {
        date: NaiveDate,
        /// breakfast, lunch, dinner, snack...
        #[arg(long = "type")]
        meal_type: Option<String>,
        /// Recipe id
        #[arg(long)]
        recipe: Option<String>,
        #[arg(long)]
        servings: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Set a meal's status: planned, prepped, cooked, eaten
    Status { id: String, status: MealStatus },
    Remove { id: String },
}

#[derive(Subcommand, Clone)]
pub enum StoreCommands {
    List,
    Add {
        name: String,
        #[arg(long = "type", default_value = "supermarket")]
        store_type: StoreType,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Rate a store from 1 to 5 on each aspect
    Rate {
        id: String,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        price: Option<u8>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        quality: Option<u8>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        service: Option<u8>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        selection: Option<u8>,
    },
    /// Toggle a store's favorite flag
    Favorite { id: String },
    Remove { id: String },
}

#[derive(Subcommand, Clone)]
pub enum TodoCommands {
    List {
        #[arg(long)]
        status: Option<TodoStatus>,
    },
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(short, long)]
        priority: Option<Priority>,
        /// Category name or id
        #[arg(short, long)]
        category: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Set status: need-to-start, currently-working, pending-others, done
    Status { id: String, status: TodoStatus },
    Remove { id: String },
    /// List todo categories
    Categories,
    /// Create a todo category
    CategoryAdd {
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the config file and effective values
    Show,
    /// Set a key in config.json (empty value unsets it)
    Set { key: String, value: String },
    /// Delete config.json
    Reset,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let settings = Settings::resolve(&Overrides {
        api_url: cli.api_url.clone(),
        data_dir: cli.data_dir.clone(),
    })?;

    // monitor installs its own subscriber with a file layer
    if !matches!(cli.command, Commands::Monitor { .. }) {
        lifesync::logging::init(cli.verbose);
        settings.warn_config_error();
    }

    match &cli.command {
        Commands::Shop { command } => cmd::cmd_shop(&settings, command.clone(), cli.yes)?,
        Commands::Recipe { command } => cmd::cmd_recipe(&settings, command.clone(), cli.yes)?,
        Commands::Meal { command } => cmd::cmd_meal(&settings, command.clone(), cli.yes)?,
        Commands::Store { command } => cmd::cmd_store(&settings, command.clone(), cli.yes)?,
        Commands::Todo { command } => cmd::cmd_todo(&settings, command.clone(), cli.yes)?,
        Commands::Sync { direction, only } => cmd::cmd_sync(&settings, *direction, *only).await?,
        Commands::Export { path } => cmd::cmd_export(&settings, path)?,
        Commands::Import { path } => cmd::cmd_import(&settings, path)?,
        Commands::Config { command } => cmd::cmd_config(&settings, command.clone(), cli.yes)?,
        Commands::Monitor { config, init } => {
            cmd::cmd_monitor(&settings, config.as_deref(), *init, cli.verbose).await?
        }
        Commands::Diagnose => cmd::cmd_diagnose(&settings).await?,
    }

    Ok(())
}
