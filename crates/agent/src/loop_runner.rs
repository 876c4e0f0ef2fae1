//! The control loop: decide, dispatch, reduce, then route.
//!
//! ```text
//! Deciding ──► Dispatching ──► Reducing ──► Terminal
//!    ▲  │            │             │
//!    │  └─► Waiting ◄┘(skips)      ├─► Waiting (search found nothing new)
//!    │        │                    │
//!    └────────┴────────────────────┘
//! ```
//!
//! One session runs strictly sequentially: a fetch is fully reduced before
//! the next action is chosen. The session state is owned by the caller and
//! borrowed mutably for the duration of [`ControlLoop::run`].

use chrono::Utc;
use dealwatch_core::action::{ActionKind, ActionProposal};
use dealwatch_core::capability::Capabilities;
use dealwatch_core::error::Error;
use dealwatch_core::event::{DomainEvent, EventBus};
use dealwatch_core::listing::Listing;
use dealwatch_core::policy::Policy;
use dealwatch_core::state::SessionState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatcher::{Dispatch, Dispatcher};
use crate::reducer::Reducer;
use crate::scheduler::{PollScheduler, WaitResult};
use crate::termination::{self, Termination};

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// A deal was selected and an inquiry drafted.
    DealReady,
    /// The poll budget ran out without a deal.
    BudgetExhausted,
    /// Stopped by cancellation (operator interrupt or timeout).
    Interrupted,
    /// The decision-round guard was hit.
    StepLimit,
}

impl From<Termination> for SessionOutcome {
    fn from(t: Termination) -> Self {
        match t {
            Termination::Success => SessionOutcome::DealReady,
            Termination::Exhausted => SessionOutcome::BudgetExhausted,
        }
    }
}

impl std::fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionOutcome::DealReady => "deal_ready",
            SessionOutcome::BudgetExhausted => "budget_exhausted",
            SessionOutcome::Interrupted => "interrupted",
            SessionOutcome::StepLimit => "step_limit",
        };
        f.write_str(s)
    }
}

/// Final summary of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub reference_price: Option<f64>,
    pub deal: Option<Listing>,
    pub inquiry: Option<String>,
    pub polls_completed: u32,
    /// Decision rounds taken.
    pub steps: u32,
}

impl SessionReport {
    fn from_state(outcome: SessionOutcome, state: &SessionState, steps: u32) -> Self {
        Self {
            outcome,
            reference_price: state.reference_price(),
            deal: state.deal().cloned(),
            inquiry: state.inquiry().map(str::to_string),
            polls_completed: state.polls_completed(),
            steps,
        }
    }
}

/// Where the loop is.
#[derive(Debug)]
enum Phase {
    Deciding,
    Dispatching(ActionProposal),
    Reducing { action: ActionKind, raw: Value },
    Waiting,
    Terminal(SessionOutcome),
}

/// Drives one monitoring session to a terminal state.
pub struct ControlLoop {
    policy: Arc<dyn Policy>,
    dispatcher: Dispatcher,
    reducer: Reducer,
    event_bus: Arc<EventBus>,
    cancel: CancellationToken,
    max_steps: u32,
    max_consecutive_skips: u32,
}

impl ControlLoop {
    pub fn new(policy: Arc<dyn Policy>, capabilities: Capabilities, event_bus: Arc<EventBus>) -> Self {
        Self {
            policy,
            dispatcher: Dispatcher::new(capabilities),
            reducer: Reducer::default(),
            event_bus,
            cancel: CancellationToken::new(),
            max_steps: 1000,
            max_consecutive_skips: 3,
        }
    }

    /// Bound the number of decision rounds.
    pub fn with_max_steps(mut self, max: u32) -> Self {
        self.max_steps = max;
        self
    }

    /// Wait instead of re-deciding after this many skips in a row.
    pub fn with_max_consecutive_skips(mut self, max: u32) -> Self {
        self.max_consecutive_skips = max;
        self
    }

    /// Accept or reject selected listings above the reference price.
    pub fn with_price_ceiling(mut self, enforce: bool) -> Self {
        self.reducer = Reducer::new(enforce);
        self
    }

    /// Stop the session when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run until a terminal state.
    ///
    /// Only contract violations (an unknown action name, malformed arguments)
    /// return `Err`. Every external failure is absorbed into the state.
    pub async fn run(&self, state: &mut SessionState) -> Result<SessionReport, Error> {
        let session_id = state.id().to_string();
        let scheduler = PollScheduler::new(self.cancel.clone());
        let mut phase = Phase::Deciding;
        let mut steps: u32 = 0;
        let mut skips: u32 = 0;

        info!(
            session = %session_id,
            policy = self.policy.name(),
            item = state.item_name(),
            max_polls = state.max_polls(),
            "Session started"
        );

        loop {
            phase = match phase {
                Phase::Deciding => {
                    if self.cancel.is_cancelled() {
                        Phase::Terminal(SessionOutcome::Interrupted)
                    } else if steps >= self.max_steps {
                        warn!(steps, "Step limit reached");
                        Phase::Terminal(SessionOutcome::StepLimit)
                    } else {
                        steps += 1;
                        match self.policy.decide(state, state.history()).await {
                            Ok(Some(proposal)) => {
                                debug!(step = steps, action = %proposal.name, "Policy proposed");
                                Phase::Dispatching(proposal)
                            }
                            Ok(None) => {
                                debug!(step = steps, "Policy proposed nothing");
                                Phase::Waiting
                            }
                            Err(e) => {
                                warn!(error = %e, "Policy failed; waiting");
                                Phase::Waiting
                            }
                        }
                    }
                }

                Phase::Dispatching(proposal) => match self.dispatcher.dispatch(&proposal, state).await? {
                    Dispatch::Completed {
                        action,
                        raw,
                        duration_ms,
                    } => {
                        skips = 0;
                        self.event_bus.publish(DomainEvent::ActionDispatched {
                            session_id: session_id.clone(),
                            action: action.name().into(),
                            duration_ms,
                            timestamp: Utc::now(),
                        });
                        Phase::Reducing { action, raw }
                    }
                    Dispatch::Skipped { action, missing } => {
                        skips += 1;
                        self.event_bus.publish(DomainEvent::ActionSkipped {
                            session_id: session_id.clone(),
                            action: action.name().into(),
                            missing,
                            timestamp: Utc::now(),
                        });
                        if skips >= self.max_consecutive_skips {
                            skips = 0;
                            Phase::Waiting
                        } else {
                            Phase::Deciding
                        }
                    }
                },

                Phase::Reducing { action, raw } => {
                    let outcome = self.reducer.reduce(action, &raw, state);
                    self.event_bus.publish(DomainEvent::ObservationReduced {
                        session_id: session_id.clone(),
                        action: action.name().into(),
                        applied: outcome.is_applied(),
                        polls_completed: state.polls_completed(),
                        timestamp: Utc::now(),
                    });
                    route(action, state)
                }

                Phase::Waiting => {
                    let interval = state.poll_interval();
                    self.event_bus.publish(DomainEvent::PollWaiting {
                        session_id: session_id.clone(),
                        seconds: interval.as_secs(),
                        timestamp: Utc::now(),
                    });
                    match scheduler.wait(interval).await {
                        WaitResult::Elapsed => Phase::Deciding,
                        WaitResult::Cancelled => Phase::Terminal(SessionOutcome::Interrupted),
                    }
                }

                Phase::Terminal(outcome) => {
                    info!(
                        session = %session_id,
                        %outcome,
                        polls = state.polls_completed(),
                        steps,
                        "Session finished"
                    );
                    self.event_bus.publish(DomainEvent::SessionFinished {
                        session_id,
                        outcome: outcome.to_string(),
                        polls_completed: state.polls_completed(),
                        timestamp: Utc::now(),
                    });
                    return Ok(SessionReport::from_state(outcome, state, steps));
                }
            };
        }
    }
}

/// Where to go after a reduction.
fn route(action: ActionKind, state: &SessionState) -> Phase {
    if let Some(termination) = termination::evaluate(state) {
        return Phase::Terminal(termination.into());
    }
    if action == ActionKind::SearchCurrent && state.current_poll().is_empty() && !state.deal_found() {
        return Phase::Waiting;
    }
    Phase::Deciding
}
