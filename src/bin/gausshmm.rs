use clap::{Parser, Subcommand};
use gausshmm::{
    cli,
    em::{EmConfig, TolMode},
    init::{InitConfig, TransitionInit},
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, about, version)]
struct Opts {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit a Gaussian HMM to an observation matrix
    Fit {
        /// Number of hidden states
        #[clap(short = 'k', default_value_t = 2)]
        n_states: usize,
        /// Random seeds of initialization. One model is fitted per seed in
        /// parallel and the best log likelihood is kept.
        #[clap(short, long, default_value = "0")]
        seeds: Vec<u64>,
        /// Maximum number of EM iterations
        #[clap(short = 'n', long, default_value_t = 1000)]
        max_iter: usize,
        /// Convergence tolerance of the log likelihood
        #[clap(short, long, default_value_t = 1e-2)]
        tol: f64,
        /// Compare the tolerance with the relative change of the log likelihood
        #[clap(long)]
        relative: bool,
        /// Fail if EM does not converge within max_iter
        #[clap(long)]
        strict: bool,
        /// Covariance floor relative to the average feature variance
        #[clap(long, default_value_t = 1e-6)]
        min_covar: f64,
        /// Initial self-transition probability. Uniform transitions if not specified.
        #[clap(long)]
        sticky: Option<f64>,
        /// Input observations (TSV/CSV, one time step per line)
        input: PathBuf,
        /// Output params JSON filename
        #[clap(short, long)]
        output: PathBuf,
    },
    /// Most probable state path of observations under a fitted model
    Decode {
        /// Params JSON filename
        #[clap(short, long)]
        params: PathBuf,
        /// Input observations
        input: PathBuf,
        /// Output labels filename (stdout if not specified)
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// Sample synthetic observations from a fitted model
    Sample {
        #[clap(short, long)]
        params: PathBuf,
        /// Number of time steps
        #[clap(short = 'n', long)]
        length: usize,
        #[clap(short, long, default_value_t = 0)]
        seed: u64,
        /// Output observations filename (stdout if not specified)
        #[clap(short, long)]
        output: Option<PathBuf>,
        /// Output hidden states filename
        #[clap(long)]
        states_output: Option<PathBuf>,
    },
    /// Per-regime summary of a fitted model
    Summary {
        #[clap(short, long)]
        params: PathBuf,
        /// Input observations used for occupancy
        input: PathBuf,
        /// Print as JSON
        #[clap(long)]
        json: bool,
    },
}

fn main() {
    env_logger::init();
    let opts: Opts = Opts::parse();
    eprintln!("# started_at={}", chrono::Local::now());
    eprintln!("# n_threads={}", rayon::current_num_threads());
    eprintln!("# opts={:?}", opts);
    let result = match &opts.command {
        Commands::Fit {
            n_states,
            seeds,
            max_iter,
            tol,
            relative,
            strict,
            min_covar,
            sticky,
            input,
            output,
        } => {
            let init_config = InitConfig {
                transition: match sticky {
                    Some(p) => TransitionInit::Sticky(*p),
                    None => TransitionInit::Uniform,
                },
                min_covar: *min_covar,
                ..InitConfig::default()
            };
            let em_config = EmConfig {
                max_iter: *max_iter,
                tol: *tol,
                tol_mode: if *relative {
                    TolMode::Relative
                } else {
                    TolMode::Absolute
                },
                strict: *strict,
                min_covar: *min_covar,
            };
            cli::run_fit(input, *n_states, seeds, &init_config, &em_config, output)
        }
        Commands::Decode {
            params,
            input,
            output,
        } => cli::run_decode(params, input, output.as_deref()),
        Commands::Sample {
            params,
            length,
            seed,
            output,
            states_output,
        } => cli::run_sample(
            params,
            *length,
            *seed,
            output.as_deref(),
            states_output.as_deref(),
        ),
        Commands::Summary {
            params,
            input,
            json,
        } => cli::run_summary(params, input, *json),
    };
    eprintln!("# finished_at={}", chrono::Local::now());
    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
