//! json-stage: flatten JSON files and load them into a staging table
//!
//! Usage:
//!   # Flatten one file and print the table
//!   json-stage file orders_2024.json --object data --remove-empty-lists
//!
//!   # Flatten every file of a directory as JSON Lines
//!   json-stage dir ./landing --columns id,tags --format jsonl
//!
//!   # Re-run ETL 2024 and load it into Stage.Orders
//!   json-stage etl ./landing 2024 --config stage.toml --export Orders

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use json_stage::{
    flatten_directory, flatten_single, rerun_etl, FileInventory, FlattenOptions, ListExpansion,
    RowWriter, StageConfig, Table,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "json-stage")]
#[command(about = "Flatten JSON files into tables and load them into SQL Server", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// TOML file with connection and flatten settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Key of the records array when the top level is an object
    #[arg(long, global = true)]
    object: Option<String>,

    /// Comma-separated columns to keep before normalization
    #[arg(long, global = true, value_delimiter = ',')]
    columns: Option<Vec<String>>,

    /// Drop rows whose list columns hold empty arrays
    #[arg(long, global = true)]
    remove_empty_lists: bool,

    /// Separator for expanded mapping columns (default: ".")
    #[arg(long, global = true)]
    separator: Option<String>,

    /// Spread list elements over indexed columns instead of rows
    #[arg(long, global = true)]
    explode_lists_as_columns: bool,

    /// Print every row of the table
    #[arg(long, global = true)]
    max_rows: bool,

    /// Print every column of the table
    #[arg(long, global = true)]
    max_columns: bool,

    /// Output format when not exporting
    #[arg(long, global = true, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Load the result into a staging table instead of printing it
    /// (table defaults to `default_table` from the config file)
    #[arg(long, global = true, value_name = "TABLE", num_args = 0..=1)]
    export: Option<Option<String>>,

    /// ODBC connection string (overrides the config file)
    #[arg(long, global = true)]
    connection_string: Option<String>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Flatten a single file
    File { path: PathBuf },
    /// Flatten every file in a directory
    Dir { path: PathBuf },
    /// Flatten the files of a directory whose name ends with an ETL id
    Etl { path: PathBuf, etl_id: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Table,
    Jsonl,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => StageConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => StageConfig::default(),
    };
    apply_overrides(&args, &mut config.flatten);

    let (table, label) = match &args.command {
        Command::File { path } => (
            flatten_single(path, &config.flatten)?,
            path.display().to_string(),
        ),
        Command::Dir { path } => (
            flatten_directory(path, &config.flatten)?,
            path.display().to_string(),
        ),
        Command::Etl { path, etl_id } => {
            let inventory = FileInventory::scan(path)?;
            (
                rerun_etl(&inventory, etl_id, &config.flatten)?,
                format!("ETL {}", etl_id),
            )
        }
    };

    let Some(requested) = &args.export else {
        return print_table(&table, &config.flatten, args.format);
    };

    let table_name = requested
        .clone()
        .or_else(|| config.default_table.clone())
        .context("No staging table: pass --export TABLE or set default_table in --config")?;
    let connection_string = args
        .connection_string
        .clone()
        .or_else(|| config.connection_string.clone())
        .context("No connection string: pass --connection-string or set it in --config")?;

    export(&table, &table_name, &label, &connection_string, &config.schema)
}

fn apply_overrides(args: &Args, options: &mut FlattenOptions) {
    if let Some(object) = &args.object {
        options.object_key = Some(object.clone());
    }
    if let Some(columns) = &args.columns {
        options.columns = Some(columns.iter().map(|c| c.trim().to_string()).collect());
    }
    if let Some(sep) = &args.separator {
        options.separator = sep.clone();
    }
    if args.remove_empty_lists {
        options.remove_empty_lists = true;
    }
    if args.explode_lists_as_columns {
        options.list_expansion = ListExpansion::Columns;
    }
    if args.max_rows {
        options.display.show_all_rows = true;
    }
    if args.max_columns {
        options.display.show_all_columns = true;
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_table(table: &Table, options: &FlattenOptions, format: Format) -> Result<()> {
    match format {
        Format::Table => {
            println!("{}", table.display(options.display));
            Ok(())
        }
        Format::Jsonl => {
            let mut writer = RowWriter::new(std::io::stdout().lock());
            writer.write_table(table)?;
            writer.flush()
        }
    }
}

#[cfg(feature = "odbc")]
fn export(table: &Table, table_name: &str, label: &str, connection_string: &str, schema: &str) -> Result<()> {
    use json_stage::export::OdbcConnector;
    use json_stage::Exporter;

    let connector = OdbcConnector::new()?;
    let exporter = Exporter::new(connector, connection_string).with_schema(schema);
    let report = exporter.export(table, table_name, label)?;
    tracing::info!(rows = report.rows, target = %report.target, "Export finished");
    Ok(())
}

#[cfg(not(feature = "odbc"))]
fn export(_table: &Table, _table_name: &str, _label: &str, _connection_string: &str, _schema: &str) -> Result<()> {
    anyhow::bail!("json-stage was built without ODBC support; rebuild with `--features odbc`")
}
