//!
//! Subcommands of the `gausshmm` binary
//!
use crate::em::EmConfig;
use crate::error::{HmmError, Result};
use crate::init::InitConfig;
use crate::io::json::{load_params, save_params, write_json};
use crate::io::matrix::{read_observations, write_labels, write_observations};
use crate::model::GaussianHmm;
use log::{info, warn};
use ndarray::prelude::*;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

///
/// Fit one model per seed in parallel and keep the one with the best log
/// likelihood (earliest seed on ties). Fails with the error of the first seed
/// only if every seed failed.
///
pub fn fit_best(
    xs: ArrayView2<f64>,
    k: usize,
    seeds: &[u64],
    init_config: &InitConfig,
    em_config: &EmConfig,
) -> Result<(u64, GaussianHmm)> {
    if seeds.is_empty() {
        return Err(HmmError::invalid("at least one seed is required"));
    }
    let results: Vec<(u64, Result<GaussianHmm>)> = seeds
        .par_iter()
        .map(|&seed| (seed, GaussianHmm::fit_with(xs, k, seed, init_config, em_config)))
        .collect();

    let mut best: Option<(u64, GaussianHmm, f64)> = None;
    let mut first_error = None;
    for (seed, result) in results {
        match result {
            Ok(model) => {
                let ll = model.log_likelihood().unwrap_or(f64::NEG_INFINITY);
                info!("seed={} ll={} converged={}", seed, ll, model.converged());
                if best.as_ref().map_or(true, |(_, _, best_ll)| ll > *best_ll) {
                    best = Some((seed, model, ll));
                }
            }
            Err(e) => {
                warn!("seed={} failed: {}", seed, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    match (best, first_error) {
        (Some((seed, model, _)), _) => Ok((seed, model)),
        (None, Some(e)) => Err(e),
        (None, None) => Err(HmmError::invalid("no model was fitted")),
    }
}

/// writer to the file, or stdout if `None`
fn open_output(output: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(std::io::stdout())),
    })
}

///
/// `# key=value` lines describing a fit: the configurations (as JSON), the
/// chosen seed and the training outcome.
///
pub fn fit_header(
    seed: u64,
    model: &GaussianHmm,
    init_config: &InitConfig,
    em_config: &EmConfig,
) -> Result<Vec<String>> {
    Ok(vec![
        format!("# init_config={}", serde_json::to_string(init_config)?),
        format!("# em_config={}", serde_json::to_string(em_config)?),
        format!("# best_seed={}", seed),
        format!("# log_likelihood={:?}", model.log_likelihood()),
        format!("# n_iterations={}", model.iterations()),
        format!("# converged={}", model.converged()),
    ])
}

///
/// `fit`: observations file -> params JSON
///
pub fn run_fit(
    input: &Path,
    k: usize,
    seeds: &[u64],
    init_config: &InitConfig,
    em_config: &EmConfig,
    output: &Path,
) -> Result<()> {
    let obs = read_observations(input)?;
    info!("n_observations={} dim={}", obs.data.nrows(), obs.data.ncols());
    let (seed, model) = fit_best(obs.data.view(), k, seeds, init_config, em_config)?;
    for line in fit_header(seed, &model, init_config, em_config)? {
        println!("{}", line);
    }
    print!("{}", model.params());
    save_params(output, model.params())
}

///
/// `decode`: params JSON + observations -> one label per line
///
pub fn run_decode(params: &Path, input: &Path, output: Option<&Path>) -> Result<()> {
    let model = GaussianHmm::from_params(load_params(params)?);
    let obs = read_observations(input)?;
    let labels = model.decode(obs.data.view())?;
    let mut writer = open_output(output)?;
    write_labels(&mut writer, &labels)?;
    writer.flush()?;
    Ok(())
}

///
/// `sample`: params JSON -> synthetic observations (and optionally the states)
///
pub fn run_sample(
    params: &Path,
    n: usize,
    seed: u64,
    output: Option<&Path>,
    states_output: Option<&Path>,
) -> Result<()> {
    let model = GaussianHmm::from_params(load_params(params)?);
    let history = model.sample(n, seed);
    let mut writer = open_output(output)?;
    write_observations(&mut writer, history.observations.view())?;
    writer.flush()?;
    if let Some(path) = states_output {
        let mut writer = open_output(Some(path))?;
        write_labels(&mut writer, &history.states)?;
        writer.flush()?;
    }
    Ok(())
}

///
/// `summary`: per-regime statistics of a fitted model on observations
///
pub fn run_summary(params: &Path, input: &Path, json: bool) -> Result<()> {
    let model = GaussianHmm::from_params(load_params(params)?);
    let obs = read_observations(input)?;
    let summary = model.summary(obs.data.view())?;
    println!("# log_likelihood={}", model.score(obs.data.view())?);
    if json {
        let stdout = std::io::stdout();
        write_json(stdout.lock(), &summary)?;
        println!();
    } else {
        for s in summary.iter() {
            println!("{}", s);
        }
    }
    Ok(())
}
