use anyhow::Result;
use clap::{Parser, Subcommand};

use gigamesh_i18n::{Command, Config};

#[derive(Parser, Debug)]
#[command(
    name = "gigamesh-i18n",
    version,
    about = "Inspect, check and maintain GigaMesh translation catalogs"
)]
struct Cli {
    /// TS catalog to use instead of picking one by language
    #[arg(short = 'c', long = "catalog", global = true)]
    catalog: Option<String>,

    /// UI language (e.g. de or de_DE); defaults to settings, then the system locale
    #[arg(short = 'l', long = "lang", global = true)]
    lang: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate one UI string the way the application would
    Lookup {
        context: String,
        source: String,
        /// Disambiguation comment
        #[arg(long)]
        comment: Option<String>,
        /// Value for %1, %2, ... (repeatable, in marker order)
        #[arg(short = 'a', long = "arg")]
        args: Vec<String>,
        /// Plural count; selects the numerus form and fills %n
        #[arg(short = 'n', long = "count", allow_negative_numbers = true)]
        count: Option<i64>,
    },
    /// Validate placeholders, accelerators, punctuation and whitespace
    Check {
        /// Output format: text or json
        #[arg(short = 'f', long, default_value = "text")]
        format: String,
        /// Context glob to include (prefix with ! to exclude; repeatable)
        #[arg(long = "context")]
        contexts: Vec<String>,
    },
    /// Show completion statistics per context
    Stats {
        /// Output format: text, json or html
        #[arg(short = 'f', long, default_value = "text")]
        format: String,
        #[arg(long = "context")]
        contexts: Vec<String>,
    },
    /// List entries as tab-separated lines
    List {
        #[arg(long = "context")]
        contexts: Vec<String>,
        /// Only entries with this status: finished, unfinished or vanished
        #[arg(long)]
        status: Option<String>,
    },
    /// Show the catalogs available for selection
    Languages,
    /// Merge the current application strings (JSON) into the catalog
    Merge {
        /// JSON file with the strings the application currently uses
        #[arg(short = 's', long = "strings")]
        strings: String,
        /// Drop vanished entries instead of keeping them
        #[arg(long = "drop-vanished")]
        drop_vanished: bool,
        /// Write the result here instead of over the catalog
        #[arg(short = 'o', long)]
        output: Option<String>,
        /// Only report what would change
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Set the translation of one entry
    Set {
        context: String,
        source: String,
        translation: String,
        #[arg(long)]
        comment: Option<String>,
        /// Keep the entry marked unfinished
        #[arg(long)]
        unfinished: bool,
        #[arg(short = 'o', long)]
        output: Option<String>,
    },
    /// Compile the servable entries into a JSON lookup table
    Release {
        #[arg(short = 'o', long)]
        output: Option<String>,
        /// Leave out unfinished translations even if settings include them
        #[arg(long = "exclude-unfinished")]
        exclude_unfinished: bool,
    },
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Lookup {
                context,
                source,
                comment,
                args,
                count,
            } => Command::Lookup {
                context,
                source,
                comment,
                args,
                count,
            },
            Commands::Check { format, contexts } => Command::Check { format, contexts },
            Commands::Stats { format, contexts } => Command::Stats { format, contexts },
            Commands::List { contexts, status } => Command::List { contexts, status },
            Commands::Languages => Command::Languages,
            Commands::Merge {
                strings,
                drop_vanished,
                output,
                dry_run,
            } => Command::Merge {
                strings,
                drop_vanished,
                output,
                dry_run,
            },
            Commands::Set {
                context,
                source,
                translation,
                comment,
                unfinished,
                output,
            } => Command::Set {
                context,
                source,
                translation,
                comment,
                unfinished,
                output,
            },
            Commands::Release {
                output,
                exclude_unfinished,
            } => Command::Release {
                output,
                include_unfinished: exclude_unfinished.then_some(false),
            },
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    gigamesh_i18n::logging::init(cli.verbose)?;

    let config = Config {
        catalog: cli.catalog,
        lang: cli.lang,
        settings_path: cli.read_settings,
        command: cli.command.into(),
    };
    let output = gigamesh_i18n::run(config)?;
    if !output.text.is_empty() {
        println!("{}", output.text);
    }
    if !output.success {
        std::process::exit(1);
    }
    Ok(())
}
