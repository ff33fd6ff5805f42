//! Vector addition across every backend.
//!
//! Sweep bounds come from `KERNELBENCH_ADD_START`, `KERNELBENCH_ADD_END` and
//! `KERNELBENCH_ADD_MULTIPLIER` (default 2^4 to 2^28, ×16).
//!
//! Every configuration is set up before criterion applies its name filter,
//! so a filtered run still allocates and stages each size (about 6 GiB of
//! f64 operands at 2^28). Lower `KERNELBENCH_ADD_END` to keep filtered runs
//! cheap.

use std::process::ExitCode;

use criterion::Criterion;
use kernelbench_backends::SweepConfig;
use kernelbench_harness::{addition_suite, init_tracing, FailureLog, ADDITION_SWEEP_ENV};
use tracing::error;

fn main() -> ExitCode {
    init_tracing();

    let sweep = match SweepConfig::from_env(ADDITION_SWEEP_ENV, SweepConfig::ADDITION) {
        Ok(sweep) => sweep,
        Err(err) => {
            error!(error = %err, "invalid addition sweep");
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut criterion = Criterion::default().configure_from_args();
    let mut failures = FailureLog::new();

    addition_suite::<f32>(&mut criterion, &sweep, &mut failures);
    addition_suite::<i32>(&mut criterion, &sweep, &mut failures);

    #[cfg(feature = "cuda")]
    kernelbench_harness::cuda_addition_suite::<f32>(&mut criterion, &sweep, &mut failures);

    criterion.final_summary();
    failures.finish()
}
