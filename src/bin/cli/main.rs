//! CLI tool for streaming records out of bulk dumps.

mod commands;
mod consumers;
mod exit_codes;
mod output;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use bulkdump::{EntrySelector, RunConfig};

/// Stream records out of bulk patent dumps
#[derive(Parser)]
#[command(name = "bulkdump")]
#[command(author, version, about = "Stream records out of bulk patent dumps", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format for statistics and listings
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Only log errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Log more detail (repeat for debug output); RUST_LOG overrides
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Count records (alias: c)
    #[command(alias = "c")]
    Count {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Write raw records to the output
    Cat {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Report records matching a regular expression (alias: g)
    #[command(alias = "g")]
    Grep {
        /// Regular expression searched for in each record
        pattern: String,

        /// Match case-insensitively
        #[arg(short = 'i', long)]
        ignore_case: bool,

        #[command(flatten)]
        run: RunArgs,
    },

    /// List the entries of an archive or directory (alias: l)
    #[command(alias = "l")]
    List {
        /// Archive or directory to list
        input: PathBuf,

        #[command(flatten)]
        select: SelectArgs,
    },

    /// Detect the dialect of a dump (alias: d)
    #[command(alias = "d")]
    Detect {
        /// Dump file, archive or directory
        input: PathBuf,
    },
}

/// Options shared by the record processing commands.
#[derive(Args)]
pub struct RunArgs {
    /// Dump file, archive or directory to read
    input: PathBuf,

    /// Output file (default: standard output)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Records to skip before processing
    #[arg(short = 's', long, default_value = "0")]
    skip: u64,

    /// Stop after this many records (0 = no limit)
    #[arg(short = 'n', long, default_value = "0")]
    max_records: u64,

    /// Stop after this many successes (0 = no limit)
    #[arg(long, default_value = "0")]
    max_successes: u64,

    /// Stop after this many failures (0 = no limit)
    #[arg(long, default_value = "0")]
    max_failures: u64,

    /// Prefix SGML records with the entity-definition header
    #[arg(long)]
    entity_header: bool,

    /// Read the input as a flat dump without detecting its dialect
    #[arg(long)]
    flat: bool,

    /// Body element of tagged records (overrides detection)
    #[arg(long)]
    body_tag: Option<String>,

    /// Start-of-record marker line of flat records
    #[arg(long)]
    marker: Option<String>,

    #[command(flatten)]
    select: SelectArgs,
}

/// Archive entry selection.
#[derive(Args)]
pub struct SelectArgs {
    /// Only read entries directly inside this directory of the archive
    #[arg(long)]
    parent: Option<String>,

    /// Only read entries with exactly this file name
    #[arg(long)]
    name: Option<String>,

    /// Only read entries whose file name ends with this suffix
    #[arg(long)]
    suffix: Option<String>,
}

impl SelectArgs {
    /// Builds a selector, or `None` if no criterion was given.
    fn selector(&self) -> Option<EntrySelector> {
        let mut selector = EntrySelector::new();
        if let Some(parent) = &self.parent {
            selector = selector.parent_path(parent);
        }
        if let Some(name) = &self.name {
            selector = selector.name(name.as_str());
        }
        if let Some(suffix) = &self.suffix {
            selector = selector.suffix(suffix.as_str());
        }
        (!selector.is_empty()).then_some(selector)
    }
}

impl RunArgs {
    fn to_config(&self) -> RunConfig {
        let mut config = RunConfig::new(&self.input)
            .skip(self.skip)
            .max_records(self.max_records)
            .max_successes(self.max_successes)
            .max_failures(self.max_failures)
            .inject_entity_header(self.entity_header)
            .force_flat(self.flat);
        if let Some(path) = &self.output {
            config = config.output(path);
        }
        if let Some(tag) = &self.body_tag {
            config = config.body_tag(tag.as_str());
        }
        if let Some(marker) = &self.marker {
            config = config.marker(marker.as_str());
        }
        if let Some(selector) = self.select.selector() {
            config = config.selector(selector);
        }
        config
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let exit_code = match cli.command {
        Commands::Count { run } => {
            commands::run(&run.to_config(), &mut consumers::Count::default(), cli.format)
        }

        Commands::Cat { run } => {
            commands::run(&run.to_config(), &mut consumers::Cat::default(), cli.format)
        }

        Commands::Grep {
            pattern,
            ignore_case,
            run,
        } => match consumers::Grep::new(&pattern, ignore_case) {
            Ok(mut grep) => commands::run(&run.to_config(), &mut grep, cli.format),
            Err(e) => {
                eprintln!("Error: invalid pattern: {}", e);
                exit_codes::ExitCode::BadArgs
            }
        },

        Commands::List { input, select } => {
            commands::list(&input, select.selector(), cli.format)
        }

        Commands::Detect { input } => commands::detect(&input, cli.format),
    };

    std::process::exit(exit_code.code());
}
