//! Per-request deadline and stage scheduling.
//!
//! One [`Deadline`] starts when a request arrives. Every external call gets
//! `min(stage cap, remaining)` clamped to the configured floor and ceiling.
//! Optional stages are skipped outright once the remaining budget drops
//! below their minimum useful time; the embedding stage never is.

use curator_core::config::PerfConfig;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of monotonic time.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.base + *offset
    }
}

/// Fixed budget measured from a start instant.
#[derive(Debug, Clone)]
pub struct Deadline {
    clock: Arc<dyn Clock>,
    start: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn start(clock: Arc<dyn Clock>, budget: Duration) -> Self {
        let start = clock.now();
        Self {
            clock,
            start,
            budget,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.start)
    }

    /// Zero once the budget is spent.
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.elapsed())
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// `min(cap, remaining)`, unclamped.
    pub fn allocate(&self, cap: Duration) -> Duration {
        cap.min(self.remaining())
    }
}

/// Floor and ceiling applied to every per-call timeout.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutBounds {
    pub min: Duration,
    pub max: Duration,
}

impl TimeoutBounds {
    pub fn from_perf(perf: &PerfConfig) -> Self {
        Self {
            min: Duration::from_millis(perf.min_timeout_ms),
            max: Duration::from_millis(perf.max_timeout_ms.max(perf.min_timeout_ms)),
        }
    }

    pub fn clamp(&self, value: Duration) -> Duration {
        value.clamp(self.min, self.max)
    }
}

/// External calls a request may make, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Embed,
    QueryRewrite,
    RetryEmbed,
    Rerank,
    AnswerRewrite,
    Summary,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Embed => "embed",
            Stage::QueryRewrite => "query_rewrite",
            Stage::RetryEmbed => "retry_embed",
            Stage::Rerank => "rerank",
            Stage::AnswerRewrite => "answer_rewrite",
            Stage::Summary => "summary",
        }
    }

    pub fn is_mandatory(&self) -> bool {
        matches!(self, Stage::Embed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageDecision {
    Attempt { timeout: Duration },
    Skip { remaining: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// The call succeeded and its result was adopted
    Used,
    /// The call succeeded but its result was discarded
    NotUsed,
    Failed,
    Skipped,
}

/// One ledger line.
#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    /// `attempted` or `skipped`
    pub decision: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<u64>,
    pub outcome: StageOutcome,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Budget summary reported with every response.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BudgetReport {
    pub budget_ms: u64,
    pub spent_ms: u64,
    pub left_ms: u64,
}

#[derive(Debug, Clone, Copy)]
struct StageCaps {
    embed: Duration,
    llm_step: Duration,
    summary: Duration,
    min_useful: Duration,
}

/// Decides attempt vs. skip per stage and keeps the ledger.
#[derive(Debug)]
pub struct BudgetScheduler {
    deadline: Deadline,
    bounds: TimeoutBounds,
    caps: StageCaps,
    ledger: Vec<StageRecord>,
    in_flight: Option<(Stage, Instant, Duration)>,
}

impl BudgetScheduler {
    pub fn new(deadline: Deadline, perf: &PerfConfig) -> Self {
        Self {
            deadline,
            bounds: TimeoutBounds::from_perf(perf),
            caps: StageCaps {
                embed: Duration::from_millis(perf.embed_timeout_ms),
                llm_step: Duration::from_millis(perf.llm_step_max_ms),
                summary: Duration::from_millis(perf.summary_step_max_ms),
                min_useful: Duration::from_millis(perf.effective_min_useful_ms()),
            },
            ledger: Vec::new(),
            in_flight: None,
        }
    }

    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    fn cap(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Embed | Stage::RetryEmbed => self.caps.embed,
            Stage::QueryRewrite | Stage::Rerank | Stage::AnswerRewrite => self.caps.llm_step,
            Stage::Summary => self.caps.summary,
        }
    }

    fn min_useful(&self, stage: Stage) -> Duration {
        if stage.is_mandatory() {
            Duration::ZERO
        } else {
            self.caps.min_useful.max(self.bounds.min)
        }
    }

    /// Decide whether `stage` runs. A skip is recorded immediately.
    pub fn plan(&mut self, stage: Stage) -> StageDecision {
        let remaining = self.deadline.remaining();

        if remaining < self.min_useful(stage) {
            tracing::debug!("Skipping {}: {}ms left", stage, remaining.as_millis());
            self.ledger.push(StageRecord {
                stage,
                decision: "skipped",
                timeout_ms: None,
                remaining_ms: Some(remaining.as_millis() as u64),
                outcome: StageOutcome::Skipped,
                elapsed_ms: 0,
                detail: None,
            });
            return StageDecision::Skip { remaining };
        }

        let timeout = self.bounds.clamp(self.deadline.allocate(self.cap(stage)));
        self.in_flight = Some((stage, self.deadline.clock.now(), timeout));
        StageDecision::Attempt { timeout }
    }

    /// Close the stage opened by the last [`plan`](Self::plan) call.
    pub fn complete(&mut self, stage: Stage, outcome: StageOutcome, detail: Option<String>) {
        let (timeout, elapsed) = match self.in_flight.take() {
            Some((planned, started, timeout)) if planned == stage => {
                let elapsed = self.deadline.clock.now().saturating_duration_since(started);
                (Some(timeout), elapsed)
            }
            other => {
                tracing::warn!("Stage {} completed without a matching plan", stage);
                self.in_flight = other;
                (None, Duration::ZERO)
            }
        };

        tracing::debug!(
            "Stage {} finished: {:?} in {}ms",
            stage,
            outcome,
            elapsed.as_millis()
        );
        self.ledger.push(StageRecord {
            stage,
            decision: "attempted",
            timeout_ms: timeout.map(|t| t.as_millis() as u64),
            remaining_ms: None,
            outcome,
            elapsed_ms: elapsed.as_millis() as u64,
            detail,
        });
    }

    /// Amend the latest record of `stage` once a later step decides its fate.
    pub fn revise(&mut self, stage: Stage, outcome: StageOutcome, detail: Option<String>) {
        if let Some(record) = self.ledger.iter_mut().rev().find(|r| r.stage == stage) {
            record.outcome = outcome;
            if detail.is_some() {
                record.detail = detail;
            }
        }
    }

    pub fn ledger(&self) -> &[StageRecord] {
        &self.ledger
    }

    pub fn into_ledger(self) -> Vec<StageRecord> {
        self.ledger
    }

    /// Names of optional stages whose result was adopted.
    pub fn fired(&self) -> Vec<&'static str> {
        self.ledger
            .iter()
            .filter(|r| !r.stage.is_mandatory() && r.outcome == StageOutcome::Used)
            .map(|r| r.stage.name())
            .collect()
    }

    pub fn report(&self) -> BudgetReport {
        let budget = self.deadline.budget();
        BudgetReport {
            budget_ms: budget.as_millis() as u64,
            spent_ms: self.deadline.elapsed().as_millis() as u64,
            left_ms: self.deadline.remaining().as_millis() as u64,
        }
    }
}
