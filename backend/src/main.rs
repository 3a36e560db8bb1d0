//! Copylist CLI - Turn Rakuten item CSV exports into copy listings
//!
//! # Main Commands
//!
//! ```bash
//! copylist convert item.csv             # Writes item_cp.csv next to the input
//! copylist convert a.csv b.csv -o out/  # Several files into one directory
//! copylist serve                        # Start HTTP server (port 3000)
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! copylist parse item.csv      # Decode a CSV and dump rows as JSON
//! copylist rules               # Print the default rule set as JSON
//! copylist operations          # Show available rule types
//! ```

use clap::{Parser, Subcommand};
use copylist::{
    convert_files, parse_file, rules_description, Config, ConvertOptions, LineEnding, RuleSet,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "copylist")]
#[command(about = "Convert Rakuten item CSV exports into copy listings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert CSV files to copy listings (Shift_JIS output)
    Convert {
        /// Input CSV files, converted in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output directory (default: next to each input)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Rule set JSON file replacing the default rules
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Suffix appended to output file names
        #[arg(short, long)]
        suffix: Option<String>,

        /// Write CRLF line endings
        #[arg(long)]
        crlf: bool,
    },

    /// Parse a CSV file and output its rows as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the default rule set as JSON
    Rules,

    /// Show available rule types
    Operations,

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: COPYLIST_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Rule set JSON file replacing the default rules
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match Config::from_env() {
        Ok(config) => match cli.command {
            Commands::Convert {
                files,
                output_dir,
                rules,
                suffix,
                crlf,
            } => {
                let config = Config {
                    rules_path: rules.or(config.rules_path),
                    output_suffix: suffix.unwrap_or(config.output_suffix),
                    line_ending: if crlf { LineEnding::Crlf } else { config.line_ending },
                    ..config
                };
                cmd_convert(&files, output_dir.as_deref(), &config)
            }

            Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

            Commands::Rules => cmd_rules(),

            Commands::Operations => cmd_operations(),

            Commands::Serve { port, rules } => {
                let config = Config {
                    port: port.unwrap_or(config.port),
                    rules_path: rules.or(config.rules_path),
                    ..config
                };
                cmd_serve(&config).await
            }
        },
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_convert(
    files: &[PathBuf],
    output_dir: Option<&Path>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = load_options(config)?;

    if let Some(dir) = output_dir {
        fs::create_dir_all(dir)?;
    }

    let results = convert_files(files, output_dir, &options);

    let mut failed = 0;
    eprintln!("\n📊 Results:");
    for (input, outcome) in &results {
        match outcome {
            Ok((written, result)) => eprintln!(
                "   ✅ {} → {} ({} rows)",
                input.display(),
                written.display(),
                result.csv_info.row_count
            ),
            Err(e) => {
                failed += 1;
                eprintln!("   ❌ {}: {}", input.display(), e);
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} file(s) failed", failed, results.len()).into());
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = parse_file(input)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Columns: {}", result.dataset.headers.join(", "));
    eprintln!("✅ Parsed {} records", result.dataset.row_count());

    let json = serde_json::to_string_pretty(&result.dataset.to_records())?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_rules() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", RuleSet::default().to_json()?);
    Ok(())
}

fn cmd_operations() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", rules_description());
    Ok(())
}

async fn cmd_serve(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let options = load_options(config)?;
    copylist::server::start_server(config.port, config.max_upload_bytes(), options).await?;
    Ok(())
}

fn load_options(config: &Config) -> Result<ConvertOptions, Box<dyn std::error::Error>> {
    if let Some(path) = &config.rules_path {
        eprintln!("📋 Rules: {}", path.display());
    }
    Ok(config.convert_options()?)
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
