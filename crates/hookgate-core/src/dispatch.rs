//! Pre- and post-action dispatch.
//!
//! A dispatch walks an explicit state machine:
//!
//! ```text
//! Received -> Filtering -> Evaluating -> Aggregated -> Emitted
//!     \____________________________________________/^
//!        malformed input or recursion guard: Allow, no checks
//! ```
//!
//! Checks run concurrently on their own threads. Each result is slotted back
//! by registration index, so aggregation order never depends on scheduling.
//! A check that errors, panics or misses the deadline counts as `Pass`.

use crate::check::{Check, CheckResult, Stage};
use crate::checks;
use crate::config::HookConfig;
use crate::decision::{Decision, HookResponse};
use crate::error::{HookError, Result};
use crate::event::Event;
use crate::runner::ToolRunner;
use std::panic::AssertUnwindSafe;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why no check ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    Malformed(String),
    RecursionGuard,
}

/// Everything one dispatch produced.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub stage: Stage,
    pub event: Option<Event>,
    /// In registration order; only checks that were selected.
    pub results: Vec<CheckResult>,
    pub decision: Decision,
    pub response: HookResponse,
    pub skipped: Option<Skip>,
}

impl Dispatch {
    pub fn checks_run(&self) -> usize {
        self.results.len()
    }
}

enum State {
    Received(Result<Event>),
    Filtering(Event),
    Evaluating(Event, Vec<Arc<dyn Check>>),
    Aggregated {
        event: Option<Event>,
        results: Vec<CheckResult>,
        decision: Decision,
        skipped: Option<Skip>,
    },
    Emitted(Dispatch),
}

pub struct Dispatcher {
    stage: Stage,
    checks: Vec<Arc<dyn Check>>,
    config: HookConfig,
}

impl Dispatcher {
    pub fn new(stage: Stage, checks: Vec<Arc<dyn Check>>, config: HookConfig) -> Self {
        Self {
            stage,
            checks,
            config,
        }
    }

    pub fn pre_action(config: HookConfig) -> Self {
        let checks = checks::pre_action_checks(&config);
        Self::new(Stage::PreAction, checks, config)
    }

    pub fn post_action(config: HookConfig, runner: Arc<dyn ToolRunner>) -> Self {
        let checks = checks::post_action_checks(&config, runner);
        Self::new(Stage::PostAction, checks, config)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn checks(&self) -> &[Arc<dyn Check>] {
        &self.checks
    }

    pub fn config(&self) -> &HookConfig {
        &self.config
    }

    /// Dispatch the raw stdin document.
    pub fn dispatch_raw(&self, input: &str) -> Dispatch {
        self.run(State::Received(Event::from_json(input)))
    }

    pub fn dispatch(&self, event: Event) -> Dispatch {
        self.run(State::Received(Ok(event)))
    }

    fn run(&self, mut state: State) -> Dispatch {
        loop {
            state = match state {
                State::Emitted(dispatch) => return dispatch,
                other => self.step(other),
            };
        }
    }

    fn step(&self, state: State) -> State {
        match state {
            State::Received(Err(e)) => {
                tracing::debug!(stage = %self.stage, error = %e, "unparseable event; allowing");
                State::Aggregated {
                    event: None,
                    results: Vec::new(),
                    decision: Decision::allow(),
                    skipped: Some(Skip::Malformed(e.to_string())),
                }
            }
            State::Received(Ok(event)) if event.recursion_guard => State::Aggregated {
                event: Some(event),
                results: Vec::new(),
                decision: Decision::allow(),
                skipped: Some(Skip::RecursionGuard),
            },
            State::Received(Ok(event)) => State::Filtering(event),

            State::Filtering(event) => {
                let selected = self
                    .checks
                    .iter()
                    .filter(|c| c.applies_to(event.action_kind) && self.config.is_enabled(c.name()))
                    .cloned()
                    .collect();
                State::Evaluating(event, selected)
            }

            State::Evaluating(event, selected) => {
                let event = Arc::new(event);
                let results = evaluate_all(&event, &selected, self.config.check_timeout());
                let decision = Decision::aggregate(self.stage, &results);
                State::Aggregated {
                    event: Some(Arc::unwrap_or_clone(event)),
                    results,
                    decision,
                    skipped: None,
                }
            }

            State::Aggregated {
                event,
                results,
                decision,
                skipped,
            } => {
                let response = HookResponse::render(self.stage, &decision);
                State::Emitted(Dispatch {
                    stage: self.stage,
                    event,
                    results,
                    decision,
                    response,
                    skipped,
                })
            }

            emitted @ State::Emitted(_) => emitted,
        }
    }
}

/// Run `checks` concurrently and return their results in the order given.
fn evaluate_all(
    event: &Arc<Event>,
    checks: &[Arc<dyn Check>],
    timeout: Option<Duration>,
) -> Vec<CheckResult> {
    if checks.is_empty() {
        return Vec::new();
    }

    let (tx, rx) = mpsc::channel::<(usize, std::thread::Result<Result<CheckResult>>)>();
    for (idx, check) in checks.iter().enumerate() {
        let worker_tx = tx.clone();
        let check = Arc::clone(check);
        let event = Arc::clone(event);
        let spawned = std::thread::Builder::new()
            .name(format!("check-{}", check.name()))
            .spawn(move || {
                let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| check.evaluate(&event)));
                let _ = worker_tx.send((idx, outcome));
            });
        if let Err(e) = spawned {
            let _ = tx.send((idx, Ok(Err(HookError::Io(e)))));
        }
    }
    drop(tx);

    let started = Instant::now();
    let deadlines: Vec<Option<Instant>> = checks
        .iter()
        .map(|c| check_budget(c.as_ref(), timeout).map(|b| started + b))
        .collect();
    let mut done = vec![false; checks.len()];
    let mut slots: Vec<Option<CheckResult>> = vec![None; checks.len()];
    let mut pending = checks.len();

    while pending > 0 {
        let received = match wait_until(&done, &deadlines) {
            None => rx.recv().map_err(|_| ()),
            Some(d) => rx
                .recv_timeout(d.saturating_duration_since(Instant::now()))
                .map_err(|_| ()),
        };
        let Ok((idx, outcome)) = received else {
            break;
        };
        done[idx] = true;
        pending -= 1;
        if deadlines[idx].is_some_and(|d| Instant::now() > d) {
            // Finished, but past its own budget: counts as a timeout.
            continue;
        }
        let name = checks[idx].name();
        slots[idx] = Some(match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::warn!(check = name, error = %e, "check failed; treating as pass");
                CheckResult::pass(name)
            }
            Err(_) => {
                tracing::warn!(check = name, "check panicked; treating as pass");
                CheckResult::pass(name)
            }
        });
    }

    slots
        .into_iter()
        .zip(checks)
        .map(|(slot, check)| {
            slot.unwrap_or_else(|| {
                tracing::warn!(check = check.name(), "check timed out; treating as pass");
                check.cancel();
                CheckResult::pass(check.name())
            })
        })
        .collect()
}

/// Per-check wait: the configured timeout, stretched to cover a check's own
/// declared budget. `None` means wait indefinitely.
fn check_budget(check: &dyn Check, timeout: Option<Duration>) -> Option<Duration> {
    let timeout = timeout?;
    Some(check.time_budget().map_or(timeout, |b| b.max(timeout)))
}

/// Latest deadline among checks still running; `None` if any is unbounded.
fn wait_until(done: &[bool], deadlines: &[Option<Instant>]) -> Option<Instant> {
    let mut latest: Option<Instant> = None;
    for (finished, deadline) in done.iter().zip(deadlines) {
        if *finished {
            continue;
        }
        let d = (*deadline)?;
        latest = Some(latest.map_or(d, |l| l.max(d)));
    }
    latest
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
