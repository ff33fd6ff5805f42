//! Registration of backends with criterion

use criterion::{BenchmarkId, Criterion};
use kernelbench_backends::{BenchError, SweepConfig};
use tracing::{debug, error, info_span};

use crate::failures::FailureLog;
use crate::session::{Benchmark, Session};

/// Register `bench` in `group_name` for every size of `sweep`.
///
/// Each size gets a fresh session. Setup and one unmeasured probe run happen
/// before the benchmark is handed to criterion, so a configuration that
/// cannot run is recorded in `failures` and skipped rather than registered.
/// An error raised during measurement is recorded once the size finishes.
pub fn register<B: Benchmark>(
    c: &mut Criterion,
    group_name: &str,
    bench: &B,
    sweep: &SweepConfig,
    failures: &mut FailureLog,
) {
    let label = bench.label();
    let mut group = c.benchmark_group(group_name);

    for size in bench.sizes(sweep) {
        let _span = info_span!("configuration", group = group_name, label = %label, size).entered();

        let mut session = match prepare_and_probe(bench, size) {
            Ok(session) => session,
            Err(err) => {
                error!(error = %err, "configuration failed during setup");
                failures.record(group_name, &label, size, err);
                continue;
            }
        };

        let mut deferred: Option<BenchError> = None;
        group.throughput(bench.throughput(size));
        group.bench_with_input(BenchmarkId::new(label.as_str(), size), &size, |bencher, _| {
            bencher.iter(|| {
                if let Err(err) = session.run() {
                    deferred.get_or_insert(err);
                }
            })
        });

        drop(session);
        debug!("configuration torn down");

        if let Some(err) = deferred {
            error!(error = %err, "configuration failed during measurement");
            failures.record(group_name, &label, size, err);
        }
    }

    group.finish();
}

fn prepare_and_probe<B: Benchmark>(bench: &B, size: usize) -> kernelbench_backends::Result<B::Session> {
    let mut session = bench.prepare(size)?;
    session.run()?;
    debug!("configuration ready");
    Ok(session)
}
