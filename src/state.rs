// Application State Controller
//
// Sole owner of the two collections for the session. Views read through
// the accessors and mutate only through the operations below; each one
// rewrites the affected collection to the store, appends an audit event
// and notifies subscribers.

use crate::models::{BudgetEntry, Investment};
use crate::seed::{default_budgets, default_investments};
use crate::store::{self, Event, KeyValueStore, BUDGETS_KEY, INVESTMENTS_KEY};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

const ACTOR: &str = "planner";

// ============================================================================
// CHANGE NOTIFICATIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Budgets,
    Investments,
}

impl Collection {
    fn entity_type(&self) -> &'static str {
        match self {
            Collection::Budgets => "budget",
            Collection::Investments => "investment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Updated,
    Removed,
    Reset,
}

impl ChangeKind {
    fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Updated => "updated",
            ChangeKind::Removed => "removed",
            ChangeKind::Reset => "reset",
        }
    }
}

/// Delivered to every subscriber after a committed operation
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub collection: Collection,
    pub kind: ChangeKind,
    /// Target record; `None` for resets
    pub entity_id: Option<String>,
    /// False when update/remove matched nothing
    pub applied: bool,
    /// False when the store rejected the write (in-memory state still changed)
    pub persisted: bool,
}

pub trait StateObserver: Send + Sync {
    fn on_change(&self, change: &StateChange);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Owned copy of both collections, handed to the risk client
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub budgets: Vec<BudgetEntry>,
    pub investments: Vec<Investment>,
}

// ============================================================================
// RECORD HELPERS
// ============================================================================

trait Record: Clone + Serialize {
    fn id(&self) -> &str;

    /// JSON has no NaN/inf; a non-finite field would make the stored
    /// collection undecodable on the next load.
    fn is_storable(&self) -> bool;
}

impl Record for BudgetEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_storable(&self) -> bool {
        self.amount.is_finite()
    }
}

impl Record for Investment {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_storable(&self) -> bool {
        [self.amount, self.current_value, self.performance]
            .iter()
            .all(|v| v.is_finite())
    }
}

fn prepend<T: Record>(items: &mut Vec<T>, entry: T) {
    items.insert(0, entry);
}

fn replace_by_id<T: Record>(items: &mut [T], entry: T) -> bool {
    match items.iter_mut().find(|item| item.id() == entry.id()) {
        Some(slot) => {
            *slot = entry;
            true
        }
        None => false,
    }
}

fn remove_by_id<T: Record>(items: &mut Vec<T>, id: &str) -> bool {
    let before = items.len();
    items.retain(|item| item.id() != id);
    items.len() != before
}

// ============================================================================
// CONTROLLER
// ============================================================================

pub struct AppState {
    budgets: Vec<BudgetEntry>,
    investments: Vec<Investment>,
    store: Box<dyn KeyValueStore>,
    observers: Vec<(SubscriptionId, Arc<dyn StateObserver>)>,
    next_subscription: u64,
}

impl AppState {
    /// Load both collections from `store`, seeding any that are absent
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let budgets = store::load(store.as_ref(), BUDGETS_KEY, default_budgets());
        let investments = store::load(store.as_ref(), INVESTMENTS_KEY, default_investments());

        info!(
            budgets = budgets.len(),
            investments = investments.len(),
            "planning state loaded"
        );

        Self {
            budgets,
            investments,
            store,
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn budgets(&self) -> &[BudgetEntry] {
        &self.budgets
    }

    pub fn investments(&self) -> &[Investment] {
        &self.investments
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            budgets: self.budgets.clone(),
            investments: self.investments.clone(),
        }
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    // ------------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------------

    pub fn subscribe(&mut self, observer: Arc<dyn StateObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, observer));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    // ------------------------------------------------------------------------
    // Budgets
    // ------------------------------------------------------------------------

    /// Prepend a new entry. The caller supplies the id (see `models::new_id`).
    pub fn add_budget(&mut self, entry: BudgetEntry) {
        let id = entry.id.clone();
        if !entry.is_storable() {
            return self.reject(Collection::Budgets, ChangeKind::Added, id);
        }
        let payload = serde_json::to_value(&entry).unwrap_or_default();
        prepend(&mut self.budgets, entry);
        self.commit(Collection::Budgets, ChangeKind::Added, Some(id), true, payload);
    }

    pub fn update_budget(&mut self, entry: BudgetEntry) {
        let id = entry.id.clone();
        if !entry.is_storable() {
            return self.reject(Collection::Budgets, ChangeKind::Updated, id);
        }
        let payload = serde_json::to_value(&entry).unwrap_or_default();
        let applied = replace_by_id(&mut self.budgets, entry);
        self.commit(Collection::Budgets, ChangeKind::Updated, Some(id), applied, payload);
    }

    pub fn remove_budget(&mut self, id: &str) {
        let applied = remove_by_id(&mut self.budgets, id);
        self.commit(
            Collection::Budgets,
            ChangeKind::Removed,
            Some(id.to_string()),
            applied,
            serde_json::Value::Null,
        );
    }

    pub fn reset_budgets(&mut self) {
        self.budgets = default_budgets();
        self.commit(Collection::Budgets, ChangeKind::Reset, None, true, serde_json::Value::Null);
    }

    // ------------------------------------------------------------------------
    // Investments
    // ------------------------------------------------------------------------

    pub fn add_investment(&mut self, entry: Investment) {
        let id = entry.id.clone();
        if !entry.is_storable() {
            return self.reject(Collection::Investments, ChangeKind::Added, id);
        }
        let payload = serde_json::to_value(&entry).unwrap_or_default();
        prepend(&mut self.investments, entry);
        self.commit(Collection::Investments, ChangeKind::Added, Some(id), true, payload);
    }

    pub fn update_investment(&mut self, entry: Investment) {
        let id = entry.id.clone();
        if !entry.is_storable() {
            return self.reject(Collection::Investments, ChangeKind::Updated, id);
        }
        let payload = serde_json::to_value(&entry).unwrap_or_default();
        let applied = replace_by_id(&mut self.investments, entry);
        self.commit(Collection::Investments, ChangeKind::Updated, Some(id), applied, payload);
    }

    pub fn remove_investment(&mut self, id: &str) {
        let applied = remove_by_id(&mut self.investments, id);
        self.commit(
            Collection::Investments,
            ChangeKind::Removed,
            Some(id.to_string()),
            applied,
            serde_json::Value::Null,
        );
    }

    pub fn reset_investments(&mut self) {
        self.investments = default_investments();
        self.commit(
            Collection::Investments,
            ChangeKind::Reset,
            None,
            true,
            serde_json::Value::Null,
        );
    }

    /// Destructive "reset all data". Callers gate this behind a confirmation.
    pub fn reset_all(&mut self) {
        self.reset_budgets();
        self.reset_investments();
    }

    // ------------------------------------------------------------------------
    // Side effects
    // ------------------------------------------------------------------------

    /// Refuse a record that cannot round-trip through the store. Observers
    /// still hear about it, as a change that did not apply.
    fn reject(&mut self, collection: Collection, kind: ChangeKind, id: String) {
        warn!(?collection, id = %id, "refusing record with non-finite numbers");
        self.commit(collection, kind, Some(id), false, serde_json::Value::Null);
    }

    fn persist(&self, collection: Collection) -> bool {
        let result = match collection {
            Collection::Budgets => store::save(self.store.as_ref(), BUDGETS_KEY, &self.budgets),
            Collection::Investments => {
                store::save(self.store.as_ref(), INVESTMENTS_KEY, &self.investments)
            }
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    ?collection,
                    error = %e,
                    "failed to persist collection, keeping in-memory state"
                );
                false
            }
        }
    }

    fn commit(
        &mut self,
        collection: Collection,
        kind: ChangeKind,
        entity_id: Option<String>,
        applied: bool,
        data: serde_json::Value,
    ) {
        let persisted = self.persist(collection);

        if applied {
            let event = Event::new(
                &format!("{}_{}", collection.entity_type(), kind.as_str()),
                collection.entity_type(),
                entity_id.as_deref().unwrap_or("*"),
                data,
                ACTOR,
            );
            if let Err(e) = self.store.insert_event(&event) {
                warn!(event_type = %event.event_type, error = %e, "failed to record audit event");
            }
            info!(?collection, kind = kind.as_str(), id = ?entity_id, "state change committed");
        }

        let change = StateChange {
            collection,
            kind,
            entity_id,
            applied,
            persisted,
        };

        for (_, observer) in &self.observers {
            observer.on_change(&change);
        }
    }
}
