//! Run driver.
//!
//! A [`RunSession`] owns everything with run lifetime: the orchestrator, the
//! fault aggregator and the event log. It is created at run start, executes
//! any number of registries, and is consumed by [`RunSession::finish`].

use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use serde::Serialize;
use tracing::{info, info_span};

use crate::config::HarnessConfig;
use crate::error::Result;
use crate::explorer::Explorer;
use crate::jsonl::EventLog;
use crate::orchestrator::{MethodState, Orchestrator, TestReport};
use crate::registry::{RegisteredMethod, TestRegistry};
use crate::statistics::{SharedAggregator, StatisticsReport};

#[derive(Debug)]
pub struct RunSession {
    config: HarnessConfig,
    orchestrator: Orchestrator,
    aggregator: SharedAggregator,
    events: EventLog,
    reports: Vec<TestReport>,
    started: Instant,
}

impl RunSession {
    pub fn new(config: HarnessConfig) -> Result<Self> {
        let events = EventLog::from_config(&config)?;
        Ok(Self::with_event_log(config, events))
    }

    pub fn with_event_log(config: HarnessConfig, events: EventLog) -> Self {
        Self {
            orchestrator: Orchestrator::from_config(&config),
            config,
            aggregator: SharedAggregator::new(),
            events,
            reports: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn aggregator(&self) -> &SharedAggregator {
        &self.aggregator
    }

    /// Execute every registered method; reports keep registration order
    /// regardless of `jobs`.
    pub fn run(&mut self, registry: &TestRegistry, explorer: &dyn Explorer) -> &[TestReport] {
        let _span = info_span!(
            "svmgold.run",
            mode = %self.config.mode,
            methods = registry.len(),
            jobs = self.config.jobs.get()
        )
        .entered();
        self.events.run_start(&self.config, registry.len());

        let methods: Vec<&RegisteredMethod> = registry.iter().map(|(_, m)| m).collect();
        let first = self.reports.len();
        let jobs = self.config.jobs.get().min(methods.len()).max(1);
        if jobs == 1 {
            for method in methods {
                let report = self.execute_one(method, explorer);
                self.reports.push(report);
            }
        } else {
            let next = AtomicUsize::new(0);
            let done: Mutex<Vec<(usize, TestReport)>> = Mutex::new(Vec::with_capacity(methods.len()));
            let this = &*self;
            let parent = tracing::Span::current();
            std::thread::scope(|scope| {
                for _ in 0..jobs {
                    scope.spawn(|| {
                        let _entered = parent.enter();
                        loop {
                            let index = next.fetch_add(1, Ordering::Relaxed);
                            let Some(method) = methods.get(index) else {
                                break;
                            };
                            let report = this.execute_one(method, explorer);
                            done.lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .push((index, report));
                        }
                    });
                }
            });
            let mut done = done.into_inner().unwrap_or_else(PoisonError::into_inner);
            done.sort_by_key(|(index, _)| *index);
            self.reports.extend(done.into_iter().map(|(_, report)| report));
        }
        &self.reports[first..]
    }

    fn execute_one(&self, method: &RegisteredMethod, explorer: &dyn Explorer) -> TestReport {
        let report = self.orchestrator.execute(method, explorer);
        self.aggregator.with(|agg| {
            if report.state() != MethodState::Skipped {
                agg.note_method_started();
            }
            if report.state() == MethodState::Succeeded {
                agg.note_method_succeeded();
            }
            if let Some(fault) = &report.fault {
                agg.record(fault, &report.method.qualified_name());
            }
        });
        self.events.method(&report);
        report
    }

    /// Close the run.
    pub fn finish(self) -> RunSummary {
        let summary = RunSummary::new(self.reports, self.aggregator.report(), self.started);
        self.events
            .run_complete(summary.succeeded, summary.failed, summary.skipped);
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "run complete"
        );
        summary
    }
}

/// Final tallies plus every report.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub reports: Vec<TestReport>,
    pub statistics: StatisticsReport,
}

impl RunSummary {
    fn new(reports: Vec<TestReport>, statistics: StatisticsReport, started: Instant) -> Self {
        let count = |state: MethodState| reports.iter().filter(|r| r.state() == state).count();
        Self {
            total: reports.len(),
            succeeded: count(MethodState::Succeeded),
            failed: count(MethodState::Failed),
            skipped: count(MethodState::Skipped),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            reports,
            statistics,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestReport> {
        self.reports
            .iter()
            .filter(|r| r.state() == MethodState::Failed)
    }

    /// One line, e.g. `12 methods: 10 succeeded, 1 failed, 1 skipped`.
    #[must_use]
    pub fn headline(&self) -> String {
        format!(
            "{} methods: {} succeeded, {} failed, {} skipped",
            self.total, self.succeeded, self.failed, self.skipped
        )
    }
}
