use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use fragmap::errors::{MapError, MapResult};
use fragmap::hhsuite::ProfileBuilder;
use fragmap::query::read_one_fasta;
use fragmap::{Backend, CommandSearch, FragmentMapper, MapConfig, ProfileSource, Query, WindowPlan};
use log::{error, info};

#[derive(Parser)]
#[command(name = "fragmap")]
#[command(about = "Map a protein sequence to its best-matching structural fragments")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the fragment map of a single-sequence FASTA file
    Map {
        /// Query FASTA file (exactly one sequence; compressed input is fine)
        #[arg(short, long)]
        query: PathBuf,

        /// Precomputed HHM profile of the query
        #[arg(short, long, conflicts_with = "seq_db")]
        profile: Option<PathBuf>,

        /// hhsuite sequence database used to build the profile
        #[arg(long)]
        seq_db: Option<PathBuf>,

        /// Directory holding the hhsuite executables
        #[arg(long)]
        hhsuite_bin: Option<PathBuf>,

        /// Program that searches one window and prints its fragments as JSON
        #[arg(short, long)]
        search_cmd: PathBuf,

        /// Extra argument passed to the search program before the window arguments
        #[arg(long = "search-arg", allow_hyphen_values = true)]
        search_args: Vec<String>,

        #[command(flatten)]
        windows: WindowArgs,

        /// Number of search workers (default: all cores)
        #[arg(short, long)]
        threads: Option<usize>,

        /// JSON output path for the fragment map (stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write a per-segment CSV summary
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Print the windows searched for a sequence
    Windows {
        /// Sequence length
        #[arg(short, long, conflicts_with = "query", required_unless_present = "query")]
        length: Option<usize>,

        /// Query FASTA file to take the length from
        #[arg(short, long)]
        query: Option<PathBuf>,

        #[command(flatten)]
        windows: WindowArgs,
    },
}

#[derive(Args)]
struct WindowArgs {
    /// JSON configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Shortest window length
    #[arg(long)]
    window_min: Option<usize>,

    /// Longest window length
    #[arg(long)]
    window_max: Option<usize>,

    /// Distance between window starts
    #[arg(long)]
    window_increment: Option<usize>,

    /// Alignment backend
    #[arg(short, long)]
    backend: Option<BackendArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    /// Iterative search with hhblits
    Hhblits,
    /// Single-pass search with hhsearch
    Hhsearch,
}

impl From<BackendArg> for Backend {
    fn from(backend: BackendArg) -> Self {
        match backend {
            BackendArg::Hhblits => Backend::HHblits,
            BackendArg::Hhsearch => Backend::HHsearch,
        }
    }
}

impl WindowArgs {
    fn to_config(&self) -> MapResult<MapConfig> {
        let mut config = match &self.config {
            Some(path) => MapConfig::from_json_file(path)?,
            None => MapConfig::default(),
        };
        if let Some(min) = self.window_min {
            config.window_min = min;
        }
        if let Some(max) = self.window_max {
            config.window_max = max;
        }
        if let Some(increment) = self.window_increment {
            config.window_increment = increment;
        }
        if let Some(backend) = self.backend {
            config.backend = backend.into();
        }
        config.validate()?;
        Ok(config)
    }
}

fn output_writer(path: Option<&PathBuf>) -> MapResult<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

/// Exit status for errors in the user's input files
const EXIT_INPUT_ERROR: u8 = 2;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            if err.is_input_error() {
                ExitCode::from(EXIT_INPUT_ERROR)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> MapResult<()> {
    match cli.command {
        Commands::Map {
            query,
            profile,
            seq_db,
            hhsuite_bin,
            search_cmd,
            search_args,
            windows,
            threads,
            output,
            csv,
        } => {
            let mut config = windows.to_config()?;
            if let Some(threads) = threads {
                config.performance.num_workers = Some(threads);
                config.validate()?;
            }

            let source = match (profile, seq_db) {
                (Some(profile), _) => ProfileSource::File(profile),
                (None, Some(seq_db)) => {
                    let mut builder = ProfileBuilder::new(config.backend, seq_db);
                    if let Some(bin_dir) = hhsuite_bin {
                        builder = builder.bin_dir(bin_dir);
                    }
                    ProfileSource::Build(builder)
                }
                (None, None) => {
                    return Err(MapError::ConfigurationError {
                        field: "profile".to_string(),
                        message: "either --profile or --seq-db is required".to_string(),
                    })
                }
            };

            info!("Query: {}", query.display());
            info!(
                "Windows: {}..={} every {} with {}",
                config.window_min, config.window_max, config.window_increment, config.backend
            );

            let query = Query::load(&query, &source)?;
            let search = CommandSearch::new(search_cmd).args(search_args);
            let (map, metrics) = FragmentMapper::new(&config, &search).run_with_metrics(&query)?;
            info!(
                "{} segments, {} windows searched, {} starts without a fitting window",
                map.len(),
                metrics.windows_searched,
                metrics.starts_empty
            );

            let mut writer = output_writer(output.as_ref())?;
            map.write_json(&mut writer)?;
            writeln!(writer)?;
            writer.flush()?;

            if let Some(csv_path) = csv {
                info!("Writing segment summary to: {}", csv_path.display());
                map.write_csv(File::create(csv_path)?)?;
            }
        }
        Commands::Windows { length, query, windows } => {
            let config = windows.to_config()?;
            let seq_len = match (length, query) {
                (Some(length), _) => length,
                (None, Some(query)) => read_one_fasta(query)?.len(),
                // clap enforces one of the two
                (None, None) => 0,
            };

            let plan = WindowPlan::new(&config, seq_len);
            let mut out = BufWriter::new(io::stdout().lock());
            writeln!(out, "start\tmin_length\tmax_length")?;
            for start in plan.starts() {
                let lengths = plan.lengths(start);
                if lengths.is_empty() {
                    continue;
                }
                writeln!(out, "{}\t{}\t{}", start, lengths.start(), lengths.end())?;
            }
            out.flush()?;
        }
    }

    Ok(())
}
