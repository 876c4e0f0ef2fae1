//! Shared test helpers: a scripted marketplace and a scripted policy.

use async_trait::async_trait;
use dealwatch_core::action::ActionProposal;
use dealwatch_core::capability::{
    Capabilities, DealSelector, ListingSource, MessageComposer, PriceEstimator, RawRecords,
};
use dealwatch_core::error::{CapabilityError, PolicyError};
use dealwatch_core::listing::Listing;
use dealwatch_core::policy::Policy;
use dealwatch_core::state::{HistoryEntry, SessionState};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub fn listing(name: &str, price: f64) -> Listing {
    Listing::new(name, "", price, "")
}

#[derive(Default)]
struct Script {
    historical: VecDeque<RawRecords>,
    current: VecDeque<RawRecords>,
    prices: VecDeque<f64>,
    picks: VecDeque<Option<Value>>,
    messages: VecDeque<String>,
    fail_search: bool,
    calls: Vec<String>,
}

/// Every capability backed by queues of scripted replies.
///
/// An empty queue answers with the empty result for that capability.
#[derive(Default, Clone)]
pub struct MockCapabilities {
    script: Arc<Mutex<Script>>,
}

impl MockCapabilities {
    pub fn capabilities(&self) -> Capabilities {
        let market = Arc::new(self.clone());
        Capabilities::new(market.clone(), market.clone(), market.clone(), market)
    }

    pub fn push_historical(&self, records: RawRecords) {
        self.script.lock().unwrap().historical.push_back(records);
    }

    pub fn push_current(&self, records: RawRecords) {
        self.script.lock().unwrap().current.push_back(records);
    }

    pub fn push_price(&self, price: f64) {
        self.script.lock().unwrap().prices.push_back(price);
    }

    pub fn push_pick(&self, pick: Option<Value>) {
        self.script.lock().unwrap().picks.push_back(pick);
    }

    pub fn push_message(&self, text: &str) {
        self.script.lock().unwrap().messages.push_back(text.to_string());
    }

    pub fn fail_next_search(&self) {
        self.script.lock().unwrap().fail_search = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }

    fn search_failure(script: &mut Script) -> Option<CapabilityError> {
        std::mem::take(&mut script.fail_search).then(|| CapabilityError::ExecutionFailed {
            capability: "search-list".into(),
            reason: "scripted failure".into(),
        })
    }
}

#[async_trait]
impl ListingSource for MockCapabilities {
    async fn search_historical(&self, item_name: &str) -> Result<RawRecords, CapabilityError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(format!("search_historical:{item_name}"));
        if let Some(err) = Self::search_failure(&mut script) {
            return Err(err);
        }
        Ok(script.historical.pop_front().unwrap_or_default())
    }

    async fn search_current(
        &self,
        item_name: &str,
        region: Option<&str>,
    ) -> Result<RawRecords, CapabilityError> {
        let mut script = self.script.lock().unwrap();
        script
            .calls
            .push(format!("search_current:{item_name}:{}", region.unwrap_or("-")));
        if let Some(err) = Self::search_failure(&mut script) {
            return Err(err);
        }
        Ok(script.current.pop_front().unwrap_or_default())
    }
}

#[async_trait]
impl PriceEstimator for MockCapabilities {
    async fn infer_price(&self, item_name: &str, historical: &[Listing]) -> Result<f64, CapabilityError> {
        let mut script = self.script.lock().unwrap();
        script
            .calls
            .push(format!("infer_price:{item_name}:{}", historical.len()));
        Ok(script.prices.pop_front().unwrap_or_default())
    }
}

#[async_trait]
impl DealSelector for MockCapabilities {
    async fn select_deal(
        &self,
        item_name: &str,
        candidates: &[Listing],
        reference_price: f64,
    ) -> Result<Option<Value>, CapabilityError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(format!(
            "select_deal:{item_name}:{}:{reference_price}",
            candidates.len()
        ));
        Ok(script.picks.pop_front().flatten())
    }
}

#[async_trait]
impl MessageComposer for MockCapabilities {
    async fn compose_message(&self, name: &str, description: &str, price: f64) -> Result<String, CapabilityError> {
        let mut script = self.script.lock().unwrap();
        script
            .calls
            .push(format!("compose_message:{name}:{description}:{price}"));
        Ok(script.messages.pop_front().unwrap_or_default())
    }
}

/// A policy that replays a fixed sequence of proposals, then proposes nothing.
pub struct ScriptedPolicy {
    proposals: Mutex<VecDeque<Option<ActionProposal>>>,
}

impl ScriptedPolicy {
    pub fn new(proposals: Vec<Option<ActionProposal>>) -> Self {
        Self {
            proposals: Mutex::new(proposals.into()),
        }
    }
}

#[async_trait]
impl Policy for ScriptedPolicy {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn decide(
        &self,
        _state: &SessionState,
        _history: &[HistoryEntry],
    ) -> Result<Option<ActionProposal>, PolicyError> {
        Ok(self.proposals.lock().unwrap().pop_front().flatten())
    }
}
