//! csvwindow CLI - filter CSV exports by date and clean identifiers
//!
//! # Main Commands
//!
//! ```bash
//! csvwindow process export.csv --start 2024-01-01 --end 2024-02-28
//! csvwindow serve                  # Start HTTP server (port 3000)
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! csvwindow parse export.csv       # Parsed rows as JSON
//! csvwindow columns export.csv     # Which columns would be used
//! ```

use clap::{Parser, Subcommand};
use csvwindow::api::logs::{log_info, log_success, LOG_BROADCASTER};
use csvwindow::transform::pipeline::format_delimiter;
use csvwindow::{
    locate_columns, parse_bytes_with, parse_optional_bound, process_file, Config, DateWindow,
    ProcessOptions,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "csvwindow")]
#[command(about = "Filter CSV exports by date range and strip identifier prefixes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the date window and identifier cleanup, write the result
    Process {
        /// Input CSV file
        input: PathBuf,

        /// Keep rows dated on or after this date
        #[arg(short, long)]
        start: Option<String>,

        /// Keep rows dated on or before this date
        #[arg(short, long)]
        end: Option<String>,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: <name>_<timestamp>.csv next to the input)
        #[arg(short, long, conflicts_with_all = ["out_dir", "stdout"])]
        output: Option<PathBuf>,

        /// Directory for the generated output name
        #[arg(long, conflicts_with = "stdout")]
        out_dir: Option<PathBuf>,

        /// Write the processed CSV to stdout
        #[arg(long)]
        stdout: bool,

        /// Do not print progress to stderr
        #[arg(short, long)]
        quiet: bool,
    },

    /// Parse a CSV file and output its rows as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show which identifier and date columns would be used
    Columns {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: $CSVWINDOW_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process {
            input,
            start,
            end,
            delimiter,
            output,
            out_dir,
            stdout,
            quiet,
        } => {
            LOG_BROADCASTER.set_echo(!quiet);
            cmd_process(
                &input,
                start.as_deref(),
                end.as_deref(),
                delimiter,
                Destination::from_flags(output, out_dir, stdout),
            )
        }

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::Columns { input, delimiter } => cmd_columns(&input, delimiter),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// Where `process` writes its result.
enum Destination {
    File(PathBuf),
    Dir(PathBuf),
    Stdout,
    NextToInput,
}

impl Destination {
    fn from_flags(output: Option<PathBuf>, out_dir: Option<PathBuf>, stdout: bool) -> Self {
        match (output, out_dir, stdout) {
            (Some(path), _, _) => Destination::File(path),
            (None, Some(dir), _) => Destination::Dir(dir),
            (None, None, true) => Destination::Stdout,
            (None, None, false) => Destination::NextToInput,
        }
    }
}

fn cmd_process(
    input: &Path,
    start: Option<&str>,
    end: Option<&str>,
    delimiter: Option<char>,
    destination: Destination,
) -> Result<(), Box<dyn std::error::Error>> {
    log_info(format!("📄 Processing: {}", input.display()));

    let options = ProcessOptions {
        window: DateWindow::new(parse_optional_bound(start)?, parse_optional_bound(end)?),
        delimiter,
        ..ProcessOptions::from(&Config::from_env())
    };

    let processed = process_file(input, &options)?;

    let target = match destination {
        Destination::Stdout => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            processed.write_to(&mut lock)?;
            return Ok(());
        }
        Destination::File(path) => path,
        Destination::Dir(dir) => dir.join(&processed.name),
        Destination::NextToInput => input
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&processed.name),
    };

    let mut file = fs::File::create(&target)?;
    processed.write_to(&mut file)?;
    log_success(format!(
        "Output written to: {} ({})",
        target.display(),
        processed.size_kb()
    ));

    Ok(())
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let bytes = fs::read(input)?;
    let result = parse_bytes_with(&bytes, delimiter)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(result.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    if let Some(header) = result.table.header() {
        eprintln!("   Columns: {}", header.join(", "));
    }
    eprintln!("✅ Parsed {} data rows", result.table.data_rows().len());

    let json = serde_json::to_string_pretty(&result.table)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_columns(input: &Path, delimiter: Option<char>) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = fs::read(input)?;
    let result = parse_bytes_with(&bytes, delimiter)?;
    let header = result.table.header().cloned().unwrap_or_default();

    match locate_columns(&header) {
        Some(layout) => {
            println!("Identifier column: [{}] {}", layout.id_index + 1, header[layout.id_index]);
            println!("Date column:       [{}] {}", layout.date_index + 1, header[layout.date_index]);
        }
        None => {
            println!("No 'No.' column or no date column: the file would pass through unchanged.");
            println!("Columns: {}", header.join(", "));
        }
    }

    Ok(())
}

async fn cmd_serve(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env().with_port(port);
    csvwindow::server::start_server(config).await
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", content)?;
        }
    }
    Ok(())
}
