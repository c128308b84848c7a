// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Parallel and serial execution of one hop's work units.
//!
//! Workers dynamically claim units via an atomic counter (work-stealing) and
//! each worker owns its output buffer, so nothing is shared mutably. Joining
//! the thread scope is the hop barrier: no caller sees any output until every
//! unit has finished.
//!
//! # Collective Failure
//!
//! A hop either succeeds for every unit or fails as a whole. When units fail,
//! the error of the lowest-indexed failing unit is returned and all outputs
//! are discarded. Units above a known failure are skipped; units below it
//! always run, so the reported error does not depend on the worker count.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::SampleError;
use crate::router::WorkUnit;

/// Output of one work unit, tagged with the unit's canonical index.
pub type UnitOutput<T> = (usize, T);

/// Serial baseline with the same contract as [`execute_parallel`].
///
/// # Errors
///
/// The first error returned by `job`, in unit order.
pub fn execute_serial<T, F>(units: &[WorkUnit], job: F) -> Result<Vec<UnitOutput<T>>, SampleError>
where
    F: Fn(&WorkUnit) -> Result<T, SampleError>,
{
    units
        .iter()
        .enumerate()
        .map(|(idx, unit)| job(unit).map(|out| (idx, out)))
        .collect()
}

/// Runs `job` over `units` on `workers` scoped threads.
///
/// Outputs are returned sorted by unit index. With `workers <= 1` or a single
/// unit this falls back to [`execute_serial`].
///
/// # Errors
///
/// The error of the lowest-indexed failing unit.
///
/// # Panics
///
/// Resumes the panic of any worker thread that panicked.
pub fn execute_parallel<T, F>(
    units: &[WorkUnit],
    workers: usize,
    job: F,
) -> Result<Vec<UnitOutput<T>>, SampleError>
where
    T: Send,
    F: Fn(&WorkUnit) -> Result<T, SampleError> + Sync,
{
    if workers <= 1 || units.len() <= 1 {
        return execute_serial(units, job);
    }
    let workers = workers.min(units.len());

    let next_unit = AtomicUsize::new(0);
    let first_failure = AtomicUsize::new(usize::MAX);

    let per_worker: Vec<WorkerOutput<T>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let job = &job;
                let next_unit = &next_unit;
                let first_failure = &first_failure;

                s.spawn(move || {
                    let mut out = WorkerOutput::default();

                    loop {
                        let idx = next_unit.fetch_add(1, Ordering::Relaxed);
                        if idx >= units.len() {
                            break;
                        }
                        if idx > first_failure.load(Ordering::Acquire) {
                            break;
                        }

                        match job(&units[idx]) {
                            Ok(value) => out.done.push((idx, value)),
                            Err(err) => {
                                first_failure.fetch_min(idx, Ordering::AcqRel);
                                out.failed.push((idx, err));
                                break;
                            }
                        }
                    }

                    out
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(out) => out,
                Err(e) => std::panic::resume_unwind(e),
            })
            .collect()
    });

    let mut done = Vec::with_capacity(units.len());
    let mut failure: Option<(usize, SampleError)> = None;
    for out in per_worker {
        done.extend(out.done);
        for (idx, err) in out.failed {
            if failure.as_ref().is_none_or(|(best, _)| idx < *best) {
                failure = Some((idx, err));
            }
        }
    }
    if let Some((_, err)) = failure {
        return Err(err);
    }
    done.sort_unstable_by_key(|(idx, _)| *idx);
    Ok(done)
}

struct WorkerOutput<T> {
    done: Vec<UnitOutput<T>>,
    failed: Vec<(usize, SampleError)>,
}

impl<T> Default for WorkerOutput<T> {
    fn default() -> Self {
        Self {
            done: Vec::new(),
            failed: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn units(n: usize) -> Vec<WorkUnit> {
        (0..n)
            .map(|i| WorkUnit {
                shard: i % 3,
                ordinals: vec![i],
            })
            .collect()
    }

    fn square(unit: &WorkUnit) -> Result<usize, SampleError> {
        Ok(unit.ordinals[0] * unit.ordinals[0])
    }

    #[test]
    fn parallel_matches_serial() {
        let work = units(97);
        let serial = execute_serial(&work, square).unwrap();
        for workers in [1, 2, 4, 8, 32] {
            let parallel = execute_parallel(&work, workers, square).unwrap();
            assert_eq!(parallel, serial, "workers = {workers}");
        }
    }

    #[test]
    fn empty_work_is_empty_output() {
        let out = execute_parallel(&[], 4, square).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn lowest_failing_unit_wins_for_any_worker_count() {
        let work = units(64);
        let job = |unit: &WorkUnit| -> Result<usize, SampleError> {
            let i = unit.ordinals[0];
            if i == 40 || i == 17 || i == 63 {
                Err(SampleError::OutOfRange {
                    vertex: i as i128,
                    hop: Some(0),
                    shard: Some(unit.shard),
                })
            } else {
                Ok(i)
            }
        };
        for workers in [1, 2, 3, 8, 16] {
            let err = execute_parallel(&work, workers, job).unwrap_err();
            assert!(
                matches!(err, SampleError::OutOfRange { vertex: 17, .. }),
                "workers = {workers}: {err:?}"
            );
        }
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn worker_panics_are_resumed() {
        let work = units(8);
        let _ = execute_parallel(&work, 4, |unit: &WorkUnit| -> Result<usize, SampleError> {
            assert!(unit.ordinals[0] != 5, "boom");
            Ok(0)
        });
    }
}
