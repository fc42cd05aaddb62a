use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::BidId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Engine,
    Backtest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
}

/// Identifies the caller and the run a set of audit events belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    pub bid_id: Option<BidId>,
    /// Groups the events of one backtest or batch run.
    pub run_id: Option<String>,
    pub correlation_id: String,
    pub actor: String,
}

impl AuditContext {
    pub fn new(
        bid_id: Option<BidId>,
        run_id: Option<String>,
        correlation_id: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self { bid_id, run_id, correlation_id: correlation_id.into(), actor: actor.into() }
    }

    /// Context with a fresh correlation id, for callers that have none of their own.
    pub fn generated(bid_id: Option<BidId>, actor: impl Into<String>) -> Self {
        Self::new(bid_id, None, Uuid::new_v4().to_string(), actor)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub bid_id: Option<BidId>,
    pub run_id: Option<String>,
    pub correlation_id: String,
    pub event_type: String,
    pub category: AuditCategory,
    pub actor: String,
    pub outcome: AuditOutcome,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        context: &AuditContext,
        event_type: impl Into<String>,
        category: AuditCategory,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            bid_id: context.bid_id.clone(),
            run_id: context.run_id.clone(),
            correlation_id: context.correlation_id.clone(),
            event_type: event_type.into(),
            category,
            actor: context.actor.clone(),
            outcome,
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Sink for callers that do not keep an audit trail.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: AuditEvent) {}
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events().into_iter().map(|event| event.event_type).collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::audit::{
        AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
    };
    use crate::domain::BidId;

    #[test]
    fn in_memory_sink_records_events_with_correlation_fields() {
        let context = AuditContext::new(
            Some(BidId("20260115-001".to_owned())),
            Some("backtest-2026q1".to_owned()),
            "req-123",
            "bidding-engine",
        );
        let sink = InMemoryAuditSink::default();
        sink.emit(
            AuditEvent::new(
                &context,
                "engine.transition_applied",
                AuditCategory::Engine,
                AuditOutcome::Success,
            )
            .with_metadata("from", "Pending")
            .with_metadata("to", "InputValidated"),
        );

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].correlation_id, "req-123");
        assert_eq!(events[0].run_id.as_deref(), Some("backtest-2026q1"));
        assert_eq!(events[0].bid_id.as_ref().map(|id| id.0.as_str()), Some("20260115-001"));
        assert!(events[0].metadata.contains_key("from"));
        assert_eq!(sink.event_types(), vec!["engine.transition_applied".to_owned()]);
    }

    #[test]
    fn generated_context_gets_a_unique_correlation_id() {
        let first = AuditContext::generated(None, "cli");
        let second = AuditContext::generated(None, "cli");
        assert_ne!(first.correlation_id, second.correlation_id);
        assert_eq!(first.actor, "cli");
    }
}
