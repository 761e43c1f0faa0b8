use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use skiff_common::config::AppConfig;
use skiff_common::schema::parse_ddl_schema;
use skiff_data_source::formats::csv::read_csv;
use skiff_data_source::formats::json::read_json;
use skiff_data_source::formats::parquet::read_parquet;
use skiff_data_source::options::{CsvReadOptions, JsonReadOptions};
use skiff_execution::dataframe::DataFrame;
use skiff_execution::session::SessionContext;

#[derive(Parser)]
#[command(version, name = "skiff")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a SQL query against files registered as views.
    Sql {
        /// A view registration of the form `name=path`; repeatable.
        #[arg(long = "table", value_name = "NAME=PATH")]
        tables: Vec<String>,
        query: String,
        /// Treat the first line of CSV files as a header.
        #[arg(long)]
        header: bool,
        /// Infer CSV column types instead of reading strings.
        #[arg(long)]
        infer_schema: bool,
    },
    /// Print rows of a data file.
    Show {
        path: PathBuf,
        /// Number of rows to print.
        #[arg(long, short = 'n')]
        limit: Option<usize>,
        #[arg(long)]
        header: bool,
        #[arg(long)]
        infer_schema: bool,
        /// An explicit DDL schema such as `"name STRING, qty INT"`.
        #[arg(long)]
        schema: Option<String>,
    },
    /// Print the schema of a data file.
    Schema {
        path: PathBuf,
        #[arg(long)]
        header: bool,
        #[arg(long)]
        infer_schema: bool,
    },
}

#[derive(Clone, Copy, Default)]
struct ReadFlags {
    header: bool,
    infer_schema: bool,
}

pub fn main(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_from(args);
    let config = AppConfig::load()?;

    match cli.command {
        Command::Sql {
            tables,
            query,
            header,
            infer_schema,
        } => {
            let ctx = SessionContext::with_config(config.clone());
            let flags = ReadFlags {
                header,
                infer_schema,
            };
            for table in &tables {
                let (name, path) = table.split_once('=').ok_or_else(|| {
                    format!("expected a `name=path` table registration, got: {table}")
                })?;
                let df = read_table(Path::new(path), &config, flags, None)?;
                ctx.register_temp_view(name, df, true)?;
            }
            let df = skiff_sql::sql(&ctx, &query)?;
            print!(
                "{}",
                df.format(config.display.default_show_rows, config.display.truncate)?
            );
        }
        Command::Show {
            path,
            limit,
            header,
            infer_schema,
            schema,
        } => {
            let flags = ReadFlags {
                header,
                infer_schema,
            };
            let df = read_table(&path, &config, flags, schema.as_deref())?;
            let limit = limit.unwrap_or(config.display.default_show_rows);
            print!("{}", df.format(limit, config.display.truncate)?);
        }
        Command::Schema {
            path,
            header,
            infer_schema,
        } => {
            let flags = ReadFlags {
                header,
                infer_schema,
            };
            let df = read_table(&path, &config, flags, None)?;
            print!("{}", df.schema_tree()?);
        }
    }
    Ok(())
}

/// Reads a file into a dataframe, picking the format by extension.
fn read_table(
    path: &Path,
    config: &AppConfig,
    flags: ReadFlags,
    ddl_schema: Option<&str>,
) -> Result<DataFrame, Box<dyn std::error::Error>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let df = match extension.as_str() {
        "csv" => {
            let mut options = CsvReadOptions::from_config(config)
                .with_header(flags.header)
                .with_infer_schema(flags.infer_schema);
            if let Some(ddl) = ddl_schema {
                options = options.with_schema(std::sync::Arc::new(parse_ddl_schema(ddl)?));
            }
            read_csv(path, &options)?
        }
        "json" => {
            let mut options = JsonReadOptions::from_config(config);
            if let Some(ddl) = ddl_schema {
                options = options.with_schema(std::sync::Arc::new(parse_ddl_schema(ddl)?));
            }
            read_json(path, &options)?
        }
        "parquet" => read_parquet(path)?,
        other => return Err(format!("unsupported file extension: {other:?}").into()),
    };
    log::info!("read {} rows from {}", df.num_rows(), path.display());
    Ok(df)
}
