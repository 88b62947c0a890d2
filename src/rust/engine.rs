//! Concurrent window search and aggregation.
//!
//! A dispatcher thread feeds window starts into a bounded job queue. A fixed
//! pool of workers pulls starts, searches every window length that fits at
//! that start, and reports the best candidate on a bounded report queue. The
//! calling thread aggregates reports into a [`FragmentMap`].
//!
//! All threads are scoped: nothing started here outlives the call. The first
//! failed start raises the stop signal, which workers check at every start
//! and before every window search, so a failure costs at most one in-flight
//! search per worker.

use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{bounded, Receiver, Sender};
use log::{debug, info, warn};

use crate::config::MapConfig;
use crate::errors::{MapError, MapResult};
use crate::fragmap::FragmentMap;
use crate::hhsuite::ProfileBuilder;
use crate::metrics::{MetricsCollector, SearchMetrics};
use crate::query::{ProfileSource, Query};
use crate::search::{ByScore, FragmentSearch, Fragments, MatchComparator};
use crate::types::Window;

/// Which windows are searched for a sequence of a given length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    seq_len: usize,
    window_min: usize,
    window_max: usize,
    window_increment: usize,
}

impl WindowPlan {
    pub fn new(config: &MapConfig, seq_len: usize) -> Self {
        Self {
            seq_len,
            window_min: config.window_min,
            window_max: config.window_max,
            window_increment: config.window_increment.max(1),
        }
    }

    /// Window starts: multiples of the increment up to `seq_len - window_min`
    pub fn starts(&self) -> impl Iterator<Item = usize> {
        let step = self.window_increment;
        self.seq_len
            .checked_sub(self.window_min)
            .into_iter()
            .flat_map(move |last| (0..=last).step_by(step))
    }

    pub fn num_starts(&self) -> usize {
        self.seq_len.checked_sub(self.window_min).map_or(0, |last| last / self.window_increment + 1)
    }

    /// Window lengths that fit at `start`; empty when none does
    pub fn lengths(&self, start: usize) -> RangeInclusive<usize> {
        let longest = self.window_max.min(self.seq_len.saturating_sub(start));
        self.window_min..=longest
    }

    /// Windows tried at `start`, shortest first
    pub fn windows(&self, start: usize) -> impl Iterator<Item = Window> {
        let seq_len = self.seq_len;
        self.lengths(start)
            .map(move |length| Window::new(start, length))
            .take_while(move |window| window.fits(seq_len))
    }
}

/// Cancels a running computation from outside.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Caller cancellation plus the aggregator's own abort flag
struct StopSignal<'a> {
    external: &'a CancelToken,
    aborted: AtomicBool,
}

impl<'a> StopSignal<'a> {
    fn new(external: &'a CancelToken) -> Self {
        Self { external, aborted: AtomicBool::new(false) }
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.aborted.load(Ordering::SeqCst) || self.external.is_cancelled()
    }
}

/// Outcome of one window start
enum Report {
    Segment(Fragments),
    Empty(usize),
    Failed(MapError),
}

/// Computes fragment maps with a worker pool
pub struct FragmentMapper<'a, S, C = ByScore> {
    config: &'a MapConfig,
    search: &'a S,
    comparator: C,
    cancel: CancelToken,
}

impl<'a, S: FragmentSearch> FragmentMapper<'a, S> {
    pub fn new(config: &'a MapConfig, search: &'a S) -> Self {
        Self { config, search, comparator: ByScore, cancel: CancelToken::new() }
    }
}

impl<'a, S: FragmentSearch, C: MatchComparator> FragmentMapper<'a, S, C> {
    /// Use a different rule for picking the best window length
    pub fn with_comparator<D: MatchComparator>(self, comparator: D) -> FragmentMapper<'a, S, D> {
        FragmentMapper { config: self.config, search: self.search, comparator, cancel: self.cancel }
    }

    /// Let the caller stop the computation through `token`
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Compute the fragment map of `query`
    pub fn run(&self, query: &Query) -> MapResult<FragmentMap> {
        self.run_with_metrics(query).map(|(map, _)| map)
    }

    /// Compute the fragment map of `query` along with search counters
    pub fn run_with_metrics(&self, query: &Query) -> MapResult<(FragmentMap, SearchMetrics)> {
        self.config.validate()?;
        let plan = WindowPlan::new(self.config, query.sequence.len());
        let workers = self.config.effective_worker_count();
        let capacity = self.config.performance.queue_capacity;
        let metrics = MetricsCollector::new();
        let stop = StopSignal::new(&self.cancel);

        info!(
            "Mapping '{}' ({} residues): {} window starts, {} workers",
            query.name(),
            query.sequence.len(),
            plan.num_starts(),
            workers
        );

        let segments = thread::scope(|scope| -> MapResult<Vec<Fragments>> {
            let (job_tx, job_rx) = bounded::<usize>(capacity);
            let (report_tx, report_rx) = bounded::<Report>(capacity);
            let (plan, stop, metrics) = (&plan, &stop, &metrics);

            // Every worker holds a report sender before any job exists, so the
            // report queue closes exactly when the last worker exits.
            for id in 0..workers {
                let jobs = job_rx.clone();
                let reports = report_tx.clone();
                thread::Builder::new().name(format!("fragmap-worker-{id}")).spawn_scoped(
                    scope,
                    move || self.run_worker(plan, query, stop, metrics, jobs, reports),
                )?;
            }
            drop(job_rx);
            drop(report_tx);

            thread::Builder::new()
                .name("fragmap-dispatcher".to_string())
                .spawn_scoped(scope, move || dispatch(plan, stop, metrics, job_tx))?;

            collect(report_rx, stop)
        })?;

        let map = FragmentMap::from_segments(query.name(), segments)?;
        let metrics = metrics.get_metrics();
        if self.config.performance.enable_metrics {
            info!(
                "Mapped '{}': {} segments from {} windows in {:?} ({:.1} windows/s)",
                map.name,
                map.len(),
                metrics.windows_searched,
                metrics.elapsed,
                metrics.windows_per_second()
            );
        }
        Ok((map, metrics))
    }

    fn run_worker(
        &self,
        plan: &WindowPlan,
        query: &Query,
        stop: &StopSignal<'_>,
        metrics: &MetricsCollector,
        jobs: Receiver<usize>,
        reports: Sender<Report>,
    ) {
        for start in jobs {
            if stop.is_stopped() {
                metrics.record_cancelled();
                break;
            }
            let report = match self.best_at(plan, query, stop, metrics, start) {
                Ok(Some(best)) => {
                    metrics.record_completed();
                    Report::Segment(best)
                }
                Ok(None) => {
                    metrics.record_empty();
                    Report::Empty(start)
                }
                Err(MapError::Cancelled) => {
                    metrics.record_cancelled();
                    break;
                }
                Err(err) => Report::Failed(err),
            };
            if reports.send(report).is_err() {
                // aggregator has already returned
                break;
            }
        }
    }

    /// Search every window at `start` and keep the best one.
    ///
    /// The first failing length aborts the start; no partial best is kept.
    fn best_at(
        &self,
        plan: &WindowPlan,
        query: &Query,
        stop: &StopSignal<'_>,
        metrics: &MetricsCollector,
        start: usize,
    ) -> MapResult<Option<Fragments>> {
        let mut best: Option<Fragments> = None;
        for window in plan.windows(start) {
            if stop.is_stopped() {
                return Err(MapError::Cancelled);
            }
            metrics.record_window();

            let frags = self
                .search
                .find_fragments(self.config.backend, &query.profile, &query.sequence, window)
                .and_then(|frags| {
                    if frags.window() == window {
                        Ok(frags)
                    } else {
                        Err(anyhow::anyhow!("search returned fragments for window {}", frags.window()))
                    }
                })
                .map_err(|source| {
                    metrics.record_failure();
                    MapError::Search { start: window.start, end: window.end, source }
                })?;
            debug!("Window {} scored {:.3} with {} fragments", window, frags.score, frags.frags.len());

            best = match best {
                Some(current) if !self.comparator.better(&frags, &current) => Some(current),
                _ => Some(frags),
            };
        }
        Ok(best)
    }
}

fn dispatch(
    plan: &WindowPlan,
    stop: &StopSignal<'_>,
    metrics: &MetricsCollector,
    jobs: Sender<usize>,
) {
    for start in plan.starts() {
        if stop.is_stopped() || jobs.send(start).is_err() {
            break;
        }
        metrics.record_dispatch();
    }
}

/// Gather reports in arrival order; the first failure wins.
fn collect(reports: Receiver<Report>, stop: &StopSignal<'_>) -> MapResult<Vec<Fragments>> {
    let mut segments = Vec::new();
    for report in reports {
        match report {
            Report::Segment(frags) => segments.push(frags),
            Report::Empty(start) => debug!("No window fits at start {}", start),
            Report::Failed(err) => {
                warn!("Aborting fragment map: {}", err);
                stop.abort();
                return Err(err);
            }
        }
    }
    if stop.is_stopped() {
        return Err(MapError::Cancelled);
    }
    Ok(segments)
}

impl MapConfig {
    /// Compute the fragment map of `query` with the default comparator
    pub fn compute_map<S: FragmentSearch>(&self, search: &S, query: &Query) -> MapResult<FragmentMap> {
        FragmentMapper::new(self, search).run(query)
    }

    /// Load the query from `fasta`, building its profile against `seq_db`
    pub fn map_from_fasta<S: FragmentSearch>(
        &self,
        search: &S,
        seq_db: &Path,
        fasta: &Path,
    ) -> MapResult<FragmentMap> {
        let source = ProfileSource::Build(ProfileBuilder::new(self.backend, seq_db));
        let query = Query::load(fasta, &source)?;
        self.compute_map(search, &query)
    }

    /// Load the query from `fasta` with the precomputed profile `hhm`
    pub fn map_from_hhm<S: FragmentSearch>(
        &self,
        search: &S,
        fasta: &Path,
        hhm: &Path,
    ) -> MapResult<FragmentMap> {
        let query = Query::from_files(fasta, hhm)?;
        self.compute_map(search, &query)
    }
}
