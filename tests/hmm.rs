//!
//! test of fit/decode on synthetic regimes
//!
#[macro_use]
extern crate approx;

use gausshmm::em::{baum_welch, EmConfig, LL_DECREASE_TOLERANCE};
use gausshmm::hmm::mocks::{mock_two_state_params, permuted_accuracy, two_regime_blocks};
use gausshmm::init::{initialize, InitConfig, TransitionInit};
use gausshmm::io::json::{load_params, save_params};
use gausshmm::{decode, fit, GaussianHmm, HmmError};
use ndarray::prelude::*;
use rand::prelude::*;
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256PlusPlus;
use test_case::test_case;

#[test_case(0 ; "seed 0")]
#[test_case(1 ; "seed 1")]
#[test_case(42 ; "seed 42")]
fn two_regimes_are_recovered(seed: u64) {
    let (xs, truth) = two_regime_blocks(500, 50, seed);
    let (params, ll) = fit(xs.view(), 2, seed, 1000, 1e-2).unwrap();
    println!("{}", params);
    assert!(ll.is_finite());

    // invariants of the fitted parameters
    assert_abs_diff_eq!(params.init().sum(), 1.0, epsilon = 1e-9);
    for row in params.trans().outer_iter() {
        assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
    }

    let labels = decode(&params, xs.view()).unwrap();
    assert_eq!(labels.len(), 500);
    assert!(labels.iter().all(|&s| s < 2));
    let acc = permuted_accuracy(&labels, &truth, 2);
    println!("accuracy={}", acc);
    assert!(acc >= 0.95);
}

#[test]
fn posteriors_sum_to_one_during_training() {
    let (xs, _) = two_regime_blocks(300, 25, 8);
    let mut params = initialize(xs.view(), 2, 8, &InitConfig::default()).unwrap();
    let config = EmConfig {
        max_iter: 1,
        tol: 0.0,
        ..EmConfig::default()
    };
    for _ in 0..10 {
        let o = params.run(xs.view()).unwrap();
        for row in o.gamma.outer_iter() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
        }
        for slice in o.xi.outer_iter() {
            assert_abs_diff_eq!(slice.sum(), 1.0, epsilon = 1e-9);
        }
        params = baum_welch(xs.view(), &params, &config).unwrap().params;
    }
}

#[test]
fn log_likelihood_trace_is_monotone_with_sticky_init() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
    let xs = Array2::from_shape_fn((400, 3), |(t, _)| {
        let shift = if (t / 80) % 2 == 0 { 0.0 } else { 0.5 };
        shift + 0.3 * rng.sample::<f64, _>(StandardNormal)
    });
    let init_config = InitConfig {
        transition: TransitionInit::Sticky(0.9),
        ..InitConfig::default()
    };
    let em_config = EmConfig {
        tol: 1e-6,
        ..EmConfig::default()
    };
    let model = GaussianHmm::fit_with(xs.view(), 2, 3, &init_config, &em_config).unwrap();
    let history = model.history();
    for w in history.windows(2) {
        assert!(w[1] >= w[0] - LL_DECREASE_TOLERANCE, "{:?}", history);
    }
}

#[test]
fn fit_is_reproducible() {
    let (xs, _) = two_regime_blocks(200, 40, 5);
    let a = GaussianHmm::fit(xs.view(), 3, 9, 100, 1e-3).unwrap();
    let b = GaussianHmm::fit(xs.view(), 3, 9, 100, 1e-3).unwrap();
    assert_eq!(a.params(), b.params());
    assert_eq!(a.history(), b.history());
}

#[test]
fn identical_observations_do_not_crash() {
    let xs = Array2::from_elem((100, 3), 1.5);
    let model = GaussianHmm::fit(xs.view(), 2, 0, 100, 1e-2).unwrap();
    assert!(model.log_likelihood().unwrap().is_finite());
    let labels = model.decode(xs.view()).unwrap();
    assert_eq!(labels.len(), 100);
}

#[test]
fn decode_rejects_other_dimension() {
    let (xs, _) = two_regime_blocks(100, 20, 0);
    let (params, _) = fit(xs.view(), 2, 0, 50, 1e-2).unwrap();
    let other = Array2::zeros((10, 2));
    assert!(matches!(
        decode(&params, other.view()),
        Err(HmmError::InvalidInput(_))
    ));
}

#[test]
fn saved_model_decodes_the_same() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let model = GaussianHmm::from_params(mock_two_state_params());
    let h = model.sample(300, 7);
    save_params(&path, model.params()).unwrap();
    let loaded = GaussianHmm::from_params(load_params(&path).unwrap());
    assert_eq!(
        model.decode(h.observations.view()).unwrap(),
        loaded.decode(h.observations.view()).unwrap()
    );
    assert_abs_diff_eq!(
        model.score(h.observations.view()).unwrap(),
        loaded.score(h.observations.view()).unwrap(),
        epsilon = 1e-9
    );
}
