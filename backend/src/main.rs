//! Sheetmill CLI - convert CSV exports into spreadsheet tables
//!
//! # Commands
//!
//! ```bash
//! sheetmill convert -c config.json        # Full conversion run
//! sheetmill check -c config.json          # Parse the config and report field problems
//! sheetmill types                         # Show available field types
//! sheetmill split JiraLogTime ";05/Jan/21 8:45 AM;uid:12;14400" Hours
//! ```
//!
//! The config path also comes from `SHEETMILL_CONFIG` (a `.env` file is read).

use clap::{Args, Parser, Subcommand};
use sheetmill::logs::{set_verbosity, DEFAULT_VERBOSITY};
use sheetmill::transform::split;
use sheetmill::{
    converters_description, run, ConversionPlan, ConvertConfig, Converter, LoadOptions, CONFIG_ENV,
    DEFAULT_CONFIG_PATH,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sheetmill", version)]
#[command(about = "Convert CSV exports into spreadsheet tables", long_about = None)]
struct Cli {
    /// Log verbosity: 0 errors only, 3 progress, 6 details, 10 debug
    #[arg(short = 'l', long = "level", global = true, default_value_t = DEFAULT_VERBOSITY)]
    level: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    /// Configuration file
    #[arg(short, long, env = CONFIG_ENV, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Warn about duplicated keys in exact-match lookup files
    #[arg(short = 'w', long)]
    warn_duplicates: bool,
}

impl ConfigArgs {
    fn options(&self) -> LoadOptions {
        LoadOptions {
            warn_duplicates: self.warn_duplicates,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert the configured input into output tables
    Convert(ConfigArgs),

    /// Parse the configuration and list every field
    Check(ConfigArgs),

    /// Show available field types
    Types,

    /// Split one repeating-group cell
    Split {
        /// Child table name selecting the parser (e.g. JiraLogTime)
        group: String,
        /// Cell content
        content: String,
        /// Child column to extract (e.g. Hours)
        field: String,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    set_verbosity(cli.level);

    let result = match cli.command {
        Commands::Convert(args) => cmd_convert(&args),
        Commands::Check(args) => cmd_check(&args),
        Commands::Types => cmd_types(),
        Commands::Split { group, content, field } => cmd_split(&group, &content, &field),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: &Path) -> Result<ConvertConfig, Box<dyn std::error::Error>> {
    eprintln!("📄 Loading config: {}", path.display());
    Ok(ConvertConfig::from_file(path)?)
}

fn cmd_convert(args: &ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;
    let summary = run(&config, &args.options())?;

    eprintln!(
        "✅ {} records read, {} saved, {} filtered out",
        summary.records_read, summary.records_saved, summary.records_filtered
    );
    if summary.records_failed > 0 {
        eprintln!("⚠️  {} records could not be written", summary.records_failed);
    }
    for table in &summary.sub_tables {
        eprintln!("   {} → {} ({} rows)", table.name, table.output, table.rows);
    }
    Ok(())
}

fn cmd_check(args: &ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;
    let plan = ConversionPlan::build(&config, &args.options());

    eprintln!("🔍 {} [{}]", config.output, config.sheet_name);
    for field in plan.fields.fields() {
        let target = match &field.converter {
            Converter::SubRecord { table } => format!(" → {}", table),
            _ => String::new(),
        };
        eprintln!(
            "   {:<20} → {:<20} {:>4}  {}{}",
            field.input_name,
            field.output_name,
            field.width,
            field.kind(),
            target
        );
        if let Some(diagnostic) = &field.diagnostic {
            eprintln!("      ❌ {}", diagnostic);
        }
    }

    for sub in &plan.sub_records {
        eprintln!("🔍 {} → {} [{}]", sub.name, sub.output, sub.sheet_name);
        for field in sub.fields.fields() {
            eprintln!("   {:<20} → {:<20} {}", field.input_name, field.output_name, field.kind());
            if let Some(diagnostic) = &field.diagnostic {
                eprintln!("      ❌ {}", diagnostic);
            }
        }
    }

    for name in plan.unknown_sub_records() {
        eprintln!("⚠️  Sub-table '{}' is not declared", name);
    }

    let degraded = plan.fields.degraded().count()
        + plan.sub_records.iter().map(|s| s.fields.degraded().count()).sum::<usize>();
    if degraded > 0 {
        return Err(format!("{} field(s) have configuration errors", degraded).into());
    }

    eprintln!("✅ Configuration is valid");
    Ok(())
}

fn cmd_types() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", converters_description());
    Ok(())
}

fn cmd_split(group: &str, content: &str, field: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", split(group, content, field)?);
    Ok(())
}
