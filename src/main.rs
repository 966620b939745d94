//! Robomodel CLI - inspect the databases robomodel record types are saved in

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use clap::{Parser, Subcommand, ValueEnum};
use robomodel::config::{default_config_path, ensure_gitignore, write_config, RoboConfig};
use robomodel::storage::{display_value, drop_table_sql, Location, Row, ID_COLUMN};
use robomodel::ui::{self, ColorMode, Icons};
use robomodel::{Context, Query, SqliteStore};
use rusqlite::types::Value;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "robomodel")]
#[command(version)]
#[command(about = "Inspect robomodel databases - tables, columns and stored records")]
#[command(long_about = r#"
Robomodel saves plain Rust structs into SQLite and grows their tables as the
structs gain fields. This tool looks at the resulting databases.

Example usage:
  robomodel init
  robomodel tables
  robomodel columns --table Note
  robomodel dump --table Note --where "pinned = 1" --format json
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to robomodel.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// When to color the output
    #[arg(long, global = true, value_enum, default_value = "auto")]
    color: ColorMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a robomodel.toml with the default settings
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// List the tables of a database
    Tables {
        /// Database name (defaults to the configured one)
        #[arg(short, long)]
        database: Option<String>,
    },

    /// Show the columns of a table
    Columns {
        #[arg(short, long)]
        database: Option<String>,

        #[arg(short, long)]
        table: String,
    },

    /// Count the rows of a table
    Count {
        #[arg(short, long)]
        database: Option<String>,

        #[arg(short, long)]
        table: String,
    },

    /// Print the rows of a table
    Dump {
        #[arg(short, long)]
        database: Option<String>,

        #[arg(short, long)]
        table: String,

        /// SQL predicate rows must match
        #[arg(short, long = "where")]
        predicate: Option<String>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Drop a table
    Drop {
        #[arg(short, long)]
        database: Option<String>,

        #[arg(short, long)]
        table: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
    ui::theme::init(cli.color);

    match run(cli.command, cli.config.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: Option<&Path>) -> anyhow::Result<()> {
    match command {
        Commands::Init { force } => run_init(config, force)?,

        Commands::Tables { database } => {
            let (name, store) = open_existing(config, database)?;
            let tables = store.table_names()?;

            ui::header(&format!("Database {}", ui::highlight(&name)));
            if tables.is_empty() {
                ui::warn("No tables yet");
                return Ok(());
            }

            let mut builder = ui::TableBuilder::new();
            for table in &tables {
                let rows = row_ids(&store, table)?;
                builder.add_row(table, &rows.to_string());
            }
            println!("{}", builder.build());
        }

        Commands::Columns { database, table } => {
            let (_, store) = open_existing(config, database)?;
            let columns = store.table_columns(&table)?;
            if columns.is_empty() {
                anyhow::bail!("no table named {}", table);
            }

            ui::header(&format!("Table {}", ui::highlight(&table)));
            println!("{}", ui::columns_table(&columns));
            if let Some(sql) = store.table_sql(&table)? {
                ui::summary_row("schema:", &ui::muted(&sql));
            }
        }

        Commands::Count { database, table } => {
            let (_, store) = open_existing(config, database)?;
            let count = row_ids(&store, &table)?;
            ui::status(Icons::STATS, &table, &count.to_string());
        }

        Commands::Dump {
            database,
            table,
            predicate,
            format,
        } => {
            let (_, store) = open_existing(config, database)?;
            let query = match predicate {
                Some(predicate) => Query::new(predicate),
                None => Query::all(),
            };
            let rows = store.query(&table, None, &query)?;

            match format {
                Format::Json => {
                    let objects: Vec<serde_json::Value> = rows.iter().map(row_to_json).collect();
                    println!("{}", serde_json::to_string_pretty(&objects)?);
                }
                Format::Text => {
                    if rows.is_empty() {
                        ui::warn("No rows");
                    } else {
                        println!("{}", ui::rows_table(&rows));
                        ui::summary_row("rows:", &rows.len().to_string());
                    }
                }
            }
        }

        Commands::Drop { database, table } => {
            let (_, store) = open_existing(config, database)?;
            store.execute(&drop_table_sql(&table))?;
            ui::status(Icons::DEL, "dropped", &table);
        }
    }

    Ok(())
}

fn run_init(config_path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);
    let config = RoboConfig {
        data_dir: Some(robomodel::config::default_data_dir().display().to_string()),
        database: Some(robomodel::config::DEFAULT_DATABASE.to_string()),
        in_memory: false,
    };

    write_config(&path, &config, force)?;

    let project_root = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    ensure_gitignore(project_root, &config.data_dir())?;

    ui::success(&format!("Wrote {}", path.display()));
    ui::info("data dir", &config.data_dir().display().to_string());
    ui::info("database", config.database_name());
    Ok(())
}

/// Open a database that already exists; never creates an empty file
fn open_existing(
    config: Option<&Path>,
    database: Option<String>,
) -> anyhow::Result<(String, Rc<SqliteStore>)> {
    let context = Context::from_config_file(config)?;
    let name = database.unwrap_or_else(|| context.default_database().to_string());

    if let Location::Directory(_) = context.location() {
        let path = context
            .registry()
            .path_for(&name)
            .ok_or_else(|| anyhow::anyhow!("no path for database {}", name))?;
        if !path.exists() {
            anyhow::bail!("database {} does not exist at {}", name, path.display());
        }
        tracing::debug!(path = %path.display(), "opening database");
    }

    let store = context.database(&name)?;
    Ok((name, store))
}

fn row_ids(store: &SqliteStore, table: &str) -> anyhow::Result<usize> {
    Ok(store.query(table, Some(&[ID_COLUMN][..]), &Query::all())?.len())
}

fn row_to_json(row: &Row) -> serde_json::Value {
    let object = row
        .iter()
        .map(|(column, value)| {
            let json = match value {
                Value::Null => serde_json::Value::Null,
                Value::Integer(i) => serde_json::Value::from(*i),
                Value::Real(r) => serde_json::Number::from_f64(*r)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
                Value::Text(text) => serde_json::Value::String(text.clone()),
                Value::Blob(_) => serde_json::Value::String(display_value(value)),
            };
            (column.to_string(), json)
        })
        .collect();
    serde_json::Value::Object(object)
}
