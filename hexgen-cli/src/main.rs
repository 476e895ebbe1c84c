use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use hexgen_core::batch::{BatchStats, build_report};
use hexgen_core::fields::FILE_EXTENSION_KEY;
use hexgen_core::verify::verify_report;
use hexgen_core::{Binary, OutputFormat, Report};
use log::{LevelFilter, Record};
use std::fmt::Display;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Executable header fixture generator
#[derive(Parser)]
#[command(
    name = "hexgen",
    about = "Generate header fixtures from PE, ELF and Mach-O binaries",
    version,
    author
)]
struct Cli {
    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse every file in a directory and write a report
    Generate {
        /// Directory containing files to analyze
        #[arg(short, long, default_value = "samples")]
        input: PathBuf,

        /// Output report path
        #[arg(short, long, default_value = "tests.toml")]
        output: PathBuf,

        /// Report format
        #[arg(long, value_enum, default_value_t = ReportFormat::Toml)]
        format: ReportFormat,

        /// Print a table of the parsed files
        #[arg(long)]
        summary: bool,
    },
    /// Re-parse the files named in a report and compare
    Verify {
        /// Directory containing the files the report was built from
        #[arg(short, long, default_value = "samples")]
        input: PathBuf,

        /// Report to check
        #[arg(short, long, default_value = "tests.toml")]
        report: PathBuf,
    },
    /// Show the header fields of a single file
    Inspect {
        /// Path to binary file
        path: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Toml,
    Json,
}

impl From<ReportFormat> for OutputFormat {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Toml => OutputFormat::Toml,
            ReportFormat::Json => OutputFormat::Json,
        }
    }
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Format")]
    format: String,
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Fields")]
    fields: usize,
    #[tabled(rename = "Extension")]
    extension: String,
}

fn init_logging(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            write_log_line(buf, chrono::Local::now().format("%H:%M:%S"), record)
        })
        .init();
}

fn write_log_line<W: Write + ?Sized>(
    out: &mut W,
    time: impl Display,
    record: &Record<'_>,
) -> io::Result<()> {
    writeln!(out, "[{}] [{}] {}", time, record.level(), record.args())
}

fn print_summary(report: &Report, stats: BatchStats) {
    let rows: Vec<SummaryRow> = report
        .entries()
        .map(|(format, key, fields)| SummaryRow {
            format: format.to_string(),
            file: key.to_string(),
            fields: fields.len(),
            extension: fields.get(FILE_EXTENSION_KEY).unwrap_or("-").to_string(),
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
    println!(
        "{} parsed, {} skipped, {}",
        stats.parsed.to_string().green(),
        stats.skipped.to_string().yellow(),
        format!("{} failed", stats.failed).red()
    );
}

fn verify(input: &Path, report: &Path) -> Result<()> {
    let expected = Report::load(report)?;
    let mismatches = verify_report(&expected, input);
    if mismatches.is_empty() {
        println!(
            "{} all {} entries match",
            "OK".green().bold(),
            expected.len()
        );
        return Ok(());
    }

    for mismatch in &mismatches {
        println!("{} {}", "MISMATCH".red().bold(), mismatch);
    }
    bail!("{} mismatches against {}", mismatches.len(), report.display());
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match cli.command {
        Command::Generate {
            input,
            output,
            format,
            summary,
        } => {
            let (report, stats) = build_report(&input)?;
            report.write_to(&output, format.into())?;
            if summary {
                print_summary(&report, stats);
            }
        }

        Command::Verify { input, report } => verify(&input, &report)?,

        Command::Inspect { path } => match Binary::open(&path)? {
            Some(binary) => {
                println!("{} ({})", path.display(), binary.format.to_string().bold());
                for (key, value) in binary.fields.iter() {
                    println!("  {:<20} {}", key, value);
                }
            }
            None => println!("{}: not a PE, ELF or Mach-O file", path.display()),
        },
    }

    Ok(())
}
