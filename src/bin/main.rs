//! classmetrics CLI - compile analytics requests to SQL
//!
//! Usage:
//!   classmetrics compile <request.json|-> [--dialect <dialect>] [--format <format>]
//!   classmetrics schema
//!   classmetrics run <request.json|-> --database <file.db>
//!
//! Examples:
//!   classmetrics compile requests/sessions_by_role.json --dialect sqlite
//!   echo '{"measures": ["events.count"]}' | classmetrics compile - --format json
//!   classmetrics run requests/daily_events.json --database ./classroom.db

use clap::{Parser, Subcommand, ValueEnum};
use classmetrics::compiler::{CompiledQuery, Compiler};
use classmetrics::config::Settings;
use classmetrics::connector::{SqliteConnector, StorageConnector};
use classmetrics::schema::SchemaRegistry;
use classmetrics::sql::{Dialect, SqlDialect};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "classmetrics")]
#[command(about = "classmetrics - compile declarative analytics requests to SQL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a JSON request to SQL
    Compile {
        /// Path to the request file, or '-' for stdin
        file: PathBuf,

        /// SQL dialect to generate (defaults to the configured dialect)
        #[arg(short, long)]
        dialect: Option<DialectArg>,

        /// Output format
        #[arg(short, long, default_value = "sql")]
        format: OutputFormat,
    },

    /// Print the measure and dimension catalogue as JSON
    Schema,

    /// Compile a request for SQLite, execute it, and print the rows as JSON
    Run {
        /// Path to the request file, or '-' for stdin
        file: PathBuf,

        /// SQLite database file (defaults to [storage].database)
        #[arg(long)]
        database: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Postgres,
    Duckdb,
    Sqlite,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Duckdb => Dialect::DuckDb,
            DialectArg::Sqlite => Dialect::Sqlite,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// SQL text, with bound parameters listed as a trailing comment
    Sql,
    /// The full compiled query as JSON
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&settings);

    let registry = match SchemaRegistry::classroom() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error building schema registry: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Compile {
            file,
            dialect,
            format,
        } => cmd_compile(&settings, &registry, file, dialect, format),
        Commands::Schema => cmd_schema(&registry),
        Commands::Run { file, database } => cmd_run(&settings, &registry, file, database),
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the configured level.
fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_request(file: &PathBuf) -> io::Result<String> {
    if file.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        fs::read_to_string(file)
    }
}

fn compile(
    settings: &Settings,
    registry: &SchemaRegistry,
    file: &PathBuf,
    dialect: Dialect,
) -> Option<CompiledQuery> {
    let source = match read_request(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading request '{}': {}", file.display(), e);
            return None;
        }
    };

    let options = settings.compile_options().with_dialect(dialect);
    match Compiler::new(registry).with_options(options).compile_json(&source) {
        Ok(compiled) => Some(compiled),
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            None
        }
    }
}

fn cmd_compile(
    settings: &Settings,
    registry: &SchemaRegistry,
    file: PathBuf,
    dialect: Option<DialectArg>,
    format: OutputFormat,
) -> ExitCode {
    let dialect = dialect.map(Dialect::from).unwrap_or(settings.compiler.dialect);
    let Some(compiled) = compile(settings, registry, &file, dialect) else {
        return ExitCode::FAILURE;
    };

    match format {
        OutputFormat::Sql => {
            println!("{}", compiled.sql);
            for (i, value) in compiled.params.iter().enumerate() {
                let rendered = serde_json::to_string(value).unwrap_or_default();
                println!("-- {} = {}", dialect.placeholder(i + 1), rendered);
            }
            ExitCode::SUCCESS
        }
        OutputFormat::Json => {
            print_json(compiled_json(&compiled))
        }
    }
}

/// The compiled query with its fingerprint alongside.
fn compiled_json(compiled: &CompiledQuery) -> serde_json::Result<String> {
    let fingerprint = compiled.fingerprint()?;
    let mut value = serde_json::to_value(compiled)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("fingerprint".into(), fingerprint.into());
    }
    serde_json::to_string_pretty(&value)
}

fn cmd_schema(registry: &SchemaRegistry) -> ExitCode {
    print_json(serde_json::to_string_pretty(&registry.catalogue()))
}

fn cmd_run(
    settings: &Settings,
    registry: &SchemaRegistry,
    file: PathBuf,
    database: Option<PathBuf>,
) -> ExitCode {
    let database = match database {
        Some(path) => path,
        None => match settings.storage.database_path() {
            Ok(path) => path,
            Err(e) => {
                eprintln!("Error: {} (pass --database)", e);
                return ExitCode::FAILURE;
            }
        },
    };
    let timeout = match settings.storage.query_timeout() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let Some(compiled) = compile(settings, registry, &file, Dialect::Sqlite) else {
        return ExitCode::FAILURE;
    };

    let connector = match SqliteConnector::open(&database) {
        Ok(c) => c.with_timeout(timeout),
        Err(e) => {
            eprintln!("Error opening '{}': {}", database.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(connector.execute(&compiled)) {
        Ok(result) => print_json(serde_json::to_string_pretty(&result)),
        Err(e) => {
            eprintln!("Execution error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_json(rendered: serde_json::Result<String>) -> ExitCode {
    match rendered {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            ExitCode::FAILURE
        }
    }
}
