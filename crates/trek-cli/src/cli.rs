use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use trek_core::alerts::Locale;

#[derive(Parser)]
#[command(name = "trek")]
#[command(about = "Track travel expenses offline and sync them when connected")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Work from the local cache only, queueing changes for the next sync
    #[arg(long, global = true)]
    pub offline: bool,

    /// Directory holding the local database
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// User id owning the records (defaults to TREK_USER_ID)
    #[arg(long, global = true, value_name = "ID")]
    pub user: Option<String>,

    /// Language for alerts and currency names
    #[arg(long, global = true, value_enum, default_value_t = LocaleArg::En)]
    pub locale: LocaleArg,

    /// Output lists as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage trips
    #[command(alias = "travel")]
    Trip {
        #[command(subcommand)]
        command: TripCommands,
    },
    /// Manage categories of a trip
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Manage expenses of a category
    Expense {
        #[command(subcommand)]
        command: ExpenseCommands,
    },
    /// Push queued offline changes to the remote store
    Sync,
    /// Convert an amount between currencies
    Convert {
        /// Source currency code
        from: String,
        /// Target currency code
        to: String,
        /// Amount in the source currency
        amount: f64,
    },
    /// Show or change the base currency
    Currency {
        #[command(subcommand)]
        command: CurrencyCommands,
    },
}

#[derive(Subcommand)]
pub enum TripCommands {
    /// Create a trip
    Add {
        /// Trip name
        name: Vec<String>,
        /// Display color
        #[arg(long)]
        color: Option<String>,
    },
    /// List trips
    List,
    /// Rename or recolor a trip
    Update {
        /// Trip id
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a trip
    Delete {
        /// Trip id
        id: String,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Create a category in a trip
    Add {
        /// Owning trip id
        #[arg(long, value_name = "ID")]
        trip: String,
        /// Category name
        name: Vec<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// List the categories of a trip
    List {
        /// Owning trip id
        #[arg(long, value_name = "ID")]
        trip: String,
    },
    /// Rename or recolor a category
    Update {
        /// Category id
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a category
    Delete {
        /// Category id
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense, converted to the base currency when possible
    Add {
        /// Owning category id
        #[arg(long, value_name = "ID")]
        category: String,
        /// Trip of the category, kept for trip-wide totals
        #[arg(long, value_name = "ID")]
        trip: Option<String>,
        /// Amount spent
        #[arg(allow_negative_numbers = true)]
        amount: f64,
        /// What the money was spent on
        description: Vec<String>,
        /// Currency code (defaults to the base currency)
        #[arg(long)]
        currency: Option<String>,
    },
    /// List expenses, optionally of one category
    List {
        #[arg(long, value_name = "ID")]
        category: Option<String>,
    },
    /// Change an expense
    Update {
        /// Expense id
        id: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        amount: Option<f64>,
        #[arg(long)]
        currency: Option<String>,
    },
    /// Delete an expense
    Delete {
        /// Expense id
        id: String,
    },
}

#[derive(Subcommand)]
pub enum CurrencyCommands {
    /// Print the base currency
    Show,
    /// Change the base currency
    Set {
        /// Currency code, e.g. EUR
        code: String,
    },
    /// List supported currencies, popular ones first
    List,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum LocaleArg {
    En,
    Es,
}

impl From<LocaleArg> for Locale {
    fn from(value: LocaleArg) -> Self {
        match value {
            LocaleArg::En => Self::En,
            LocaleArg::Es => Self::Es,
        }
    }
}
