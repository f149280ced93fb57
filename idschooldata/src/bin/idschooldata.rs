use std::io::BufWriter;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;

use idschooldata::Client;
use idschooldata::Config;
use idschooldata::Enrollment;
use idschooldata::Level;
use idschooldata::tidy::filter_level;

/// Idaho school enrollment data.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the range of available end years.
    Years,
    /// Fetch one school year and print it as JSON lines.
    Fetch {
        /// End year of the school year, e.g. 2024 for 2023-24.
        end_year: u16,
        /// One row per entity instead of one row per entity and grade.
        #[arg(long)]
        wide: bool,
        /// Always download, ignoring and not updating the cache.
        #[arg(long)]
        no_cache: bool,
        /// Only print rows at this level (state, district or school).
        #[arg(long)]
        level: Option<Level>,
    },
    /// Inspect or clear downloaded workbooks.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Debug, Subcommand)]
enum CacheAction {
    Status,
    Clear {
        /// Only clear this end year.
        #[arg(long)]
        year: Option<u16>,
    },
}

fn write_json_lines<T: serde::Serialize>(rows: &[T]) -> Result<(), Box<dyn std::error::Error>> {
    let mut out = BufWriter::new(std::io::stdout().lock());
    for row in rows {
        serde_json::to_writer(&mut out, row)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new(Config::from_env()?)?;
    match args.command {
        Command::Years => {
            let years = client.get_available_years();
            println!("{}-{}", years.min_year, years.max_year);
        }
        Command::Fetch {
            end_year,
            wide,
            no_cache,
            level,
        } => match client.fetch_enr(end_year, !wide, !no_cache)? {
            Enrollment::Tidy(rows) => {
                let rows = match level {
                    Some(level) => filter_level(rows, level),
                    None => rows,
                };
                write_json_lines(&rows)?;
            }
            Enrollment::Wide(mut rows) => {
                if let Some(level) = level {
                    rows.retain(|r| r.level == level);
                }
                write_json_lines(&rows)?;
            }
        },
        Command::Cache { action } => match action {
            CacheAction::Status => {
                for entry in client.cache_status()? {
                    println!(
                        "{}\t{}\t{}",
                        entry.end_year,
                        entry.size_bytes,
                        entry.path.display()
                    );
                }
            }
            CacheAction::Clear { year } => {
                let removed = client.clear_cache(year)?;
                println!("removed {removed} file(s)");
            }
        },
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
