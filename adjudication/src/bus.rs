//! Process-local message bus.
//!
//! A single append-only log defines the total message order; delivery to
//! subscriber callbacks is synchronous and best-effort. Subscriber errors
//! are logged and never reach the publisher. Heavy work does not belong in
//! a callback — runners do that.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::finding::AgentRole;
use crate::message::{AgentMessage, MessageType, Recipient};

/// Subscriber callback. Must be non-blocking.
pub type Subscriber = Arc<dyn Fn(&AgentMessage) -> anyhow::Result<()> + Send + Sync>;

/// Shared reference to the bus.
pub type SharedMessageBus = Arc<MessageBus>;

#[derive(Default)]
struct BusState {
    log: Vec<AgentMessage>,
    subscribers: HashMap<AgentRole, Vec<Subscriber>>,
}

/// Multi-producer, multi-consumer bus with a totally ordered log.
#[derive(Default)]
pub struct MessageBus {
    state: Mutex<BusState>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedMessageBus {
        Arc::new(self)
    }

    /// Append to the log, then deliver. Broadcast messages reach every
    /// subscriber; addressed messages only the target role's subscribers.
    /// Callbacks run to completion before `publish` returns.
    pub fn publish(&self, msg: AgentMessage) {
        let targets: Vec<Subscriber> = {
            let mut state = self.state.lock().expect("bus lock poisoned");
            let targets = match msg.to {
                Recipient::Broadcast => state
                    .subscribers
                    .values()
                    .flatten()
                    .cloned()
                    .collect(),
                Recipient::Role(role) => state
                    .subscribers
                    .get(&role)
                    .map(|subs| subs.to_vec())
                    .unwrap_or_default(),
            };
            state.log.push(msg.clone());
            targets
        };

        debug!(
            from = %msg.from,
            to = %msg.to,
            msg_type = %msg.msg_type,
            subscribers = targets.len(),
            "message published"
        );

        for subscriber in targets {
            if let Err(e) = subscriber(&msg) {
                warn!(msg_id = %msg.id, error = %e, "subscriber callback failed");
            }
        }
    }

    /// Register a callback for messages addressed to `role` (and broadcasts).
    pub fn subscribe<F>(&self, role: AgentRole, callback: F)
    where
        F: Fn(&AgentMessage) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut state = self.state.lock().expect("bus lock poisoned");
        state
            .subscribers
            .entry(role)
            .or_default()
            .push(Arc::new(callback));
    }

    /// Snapshot of the log filtered by `filter`, in publish order.
    pub fn get_messages(&self, filter: &MessageFilter) -> Vec<AgentMessage> {
        let thread_ids = filter
            .related_to_finding
            .as_deref()
            .map(|finding_id| self.thread_ids(finding_id));
        let state = self.state.lock().expect("bus lock poisoned");
        state
            .log
            .iter()
            .filter(|msg| filter.matches(msg, thread_ids.as_ref()))
            .cloned()
            .collect()
    }

    /// Every message in the thread of `finding_id`: direct references plus
    /// transitive replies, in publish order. Single pass over the log.
    pub fn get_thread(&self, finding_id: &str) -> Vec<AgentMessage> {
        let ids = self.thread_ids(finding_id);
        let state = self.state.lock().expect("bus lock poisoned");
        state
            .log
            .iter()
            .filter(|msg| ids.contains(&msg.id))
            .cloned()
            .collect()
    }

    /// Total number of messages published so far.
    pub fn len(&self) -> usize {
        self.state.lock().expect("bus lock poisoned").log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn thread_ids(&self, finding_id: &str) -> std::collections::HashSet<String> {
        let state = self.state.lock().expect("bus lock poisoned");
        let mut ids = std::collections::HashSet::new();
        // Replies always land after their parent, so one forward pass
        // closes the transitive set.
        for msg in &state.log {
            let in_thread = msg.references_finding(finding_id)
                || msg
                    .in_reply_to
                    .as_deref()
                    .is_some_and(|parent| ids.contains(parent));
            if in_thread {
                ids.insert(msg.id.clone());
            }
        }
        ids
    }
}

/// Filter over the message log. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub from: Option<AgentRole>,
    pub to: Option<Recipient>,
    pub msg_type: Option<MessageType>,
    pub after: Option<DateTime<Utc>>,
    pub related_to_finding: Option<String>,
}

impl MessageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, role: AgentRole) -> Self {
        self.from = Some(role);
        self
    }

    pub fn to(mut self, recipient: Recipient) -> Self {
        self.to = Some(recipient);
        self
    }

    pub fn msg_type(mut self, msg_type: MessageType) -> Self {
        self.msg_type = Some(msg_type);
        self
    }

    pub fn after(mut self, timestamp: DateTime<Utc>) -> Self {
        self.after = Some(timestamp);
        self
    }

    pub fn related_to_finding(mut self, finding_id: impl Into<String>) -> Self {
        self.related_to_finding = Some(finding_id.into());
        self
    }

    fn matches(
        &self,
        msg: &AgentMessage,
        thread_ids: Option<&std::collections::HashSet<String>>,
    ) -> bool {
        if let Some(from) = self.from {
            if msg.from != from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if msg.to != to {
                return false;
            }
        }
        if let Some(msg_type) = self.msg_type {
            if msg.msg_type != msg_type {
                return false;
            }
        }
        if let Some(after) = self.after {
            if msg.timestamp <= after {
                return false;
            }
        }
        if let Some(ids) = thread_ids {
            if !ids.contains(&msg.id) {
                return false;
            }
        }
        true
    }
}
