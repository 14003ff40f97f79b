//! Session-gated remote list controller.
//!
//! One `ListController` backs one rendered list. It fetches the list whenever
//! a session appears, dispatches user actions as server-confirmed writes and
//! reconciles the local list only after the backend says yes.
//!
//! Ordering rules:
//! - fetches are tagged with a sequence number; only the latest issued fetch
//!   may replace the list, whatever order responses arrive in;
//! - one mutation per item id may be in flight at a time;
//! - once the view is torn down, late responses are dropped on the floor.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::api_client::TaskApi;
use crate::errors::ClientError;
use crate::models::{ListItem, ListKind};
use crate::notify::{Notification, Notifier};
use crate::planner::reconcile::{self, Action};
use crate::session::{Session, SessionContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Mounted,
    TornDown,
}

struct ListState {
    items: Vec<ListItem>,
    latest_fetch: u64,
    in_flight: HashSet<String>,
    phase: Phase,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Nobody is signed in; nothing was requested.
    NoSession,
    /// The list was replaced with `count` items.
    Replaced { count: usize },
    /// A newer fetch was issued or the view was torn down; response ignored.
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Nobody is signed in; nothing was requested.
    NoSession,
    /// A mutation for this item is already in flight; nothing was requested.
    InFlight,
    /// The backend confirmed the action and the list was reconciled. `item`
    /// is the affected item (as it was for removals, as it is now for
    /// updates), or `None` if it was no longer in the list.
    Applied { item: Option<ListItem> },
    /// The view was torn down before the response arrived.
    Discarded,
}

pub struct ListController {
    kind: ListKind,
    api: Arc<dyn TaskApi>,
    session: SessionContext,
    notifier: Arc<dyn Notifier>,
    state: Mutex<ListState>,
    /// Bumped every time `items` changes.
    revision: watch::Sender<u64>,
}

impl ListController {
    pub fn new(
        kind: ListKind,
        api: Arc<dyn TaskApi>,
        session: SessionContext,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            api,
            session,
            notifier,
            state: Mutex::new(ListState {
                items: Vec::new(),
                latest_fetch: 0,
                in_flight: HashSet::new(),
                phase: Phase::Idle,
            }),
            revision: watch::channel(0).0,
        })
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    /// Snapshot of the current list.
    pub fn items(&self) -> Vec<ListItem> {
        self.state.lock().items.clone()
    }

    /// Whether a mutation for `item_id` is awaiting the backend. Front ends
    /// disable the item's controls while this is true.
    pub fn is_in_flight(&self, item_id: &str) -> bool {
        self.state.lock().in_flight.contains(item_id)
    }

    pub fn is_live(&self) -> bool {
        self.state.lock().phase != Phase::TornDown
    }

    /// Receiver that wakes whenever the list is replaced or reconciled.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Subscribes this view to session changes. The current session (if any)
    /// and every later sign-in triggers one fetch; sign-out does nothing.
    ///
    /// Must be called from within a tokio runtime. A controller can be
    /// mounted once; the returned handle tears it down when dropped.
    pub fn mount(self: &Arc<Self>) -> Result<ViewHandle, ClientError> {
        {
            let mut state = self.state.lock();
            if state.phase != Phase::Idle {
                return Err(ClientError::AlreadyMounted);
            }
            state.phase = Phase::Mounted;
        }

        let mut subscription = self.session.subscribe();
        let weak: Weak<Self> = Arc::downgrade(self);
        let kind = self.kind;

        let task = tokio::spawn(async move {
            loop {
                if subscription.current().is_some() {
                    let Some(controller) = weak.upgrade() else {
                        break;
                    };
                    tokio::spawn(async move {
                        if let Err(e) = controller.refresh().await {
                            debug!("Background fetch of {} failed: {e}", kind.label());
                        }
                    });
                }
                if !subscription.changed().await {
                    break;
                }
            }
            debug!("Session subscription for {} released", kind.label());
        });

        info!("Mounted {} view", self.kind.label());
        Ok(ViewHandle {
            controller: Arc::clone(self),
            subscription: task,
        })
    }

    /// Performs one authenticated read and replaces the list wholesale.
    ///
    /// On failure the list is left untouched, one failure notification is
    /// emitted and the error is returned.
    pub async fn refresh(&self) -> Result<FetchOutcome, ClientError> {
        let Some(session) = self.session.current() else {
            debug!("No session; skipping fetch of {}", self.kind.label());
            return Ok(FetchOutcome::NoSession);
        };

        let seq = {
            let mut state = self.state.lock();
            if state.phase == Phase::TornDown {
                return Ok(FetchOutcome::Discarded);
            }
            state.latest_fetch += 1;
            state.latest_fetch
        };

        let result = self.fetch(&session).await;

        let mut state = self.state.lock();
        if state.phase == Phase::TornDown || seq != state.latest_fetch {
            debug!(
                seq,
                latest = state.latest_fetch,
                "Discarding stale {} response",
                self.kind.label()
            );
            return Ok(FetchOutcome::Discarded);
        }

        match result {
            Ok(items) => {
                let count = items.len();
                state.items = items;
                drop(state);
                self.bump_revision();
                info!("Loaded {count} {}", self.kind.label());
                Ok(FetchOutcome::Replaced { count })
            }
            Err(e) => {
                drop(state);
                error!("Error fetching {}: {e}", self.kind.label());
                self.notifier.notify(Notification::load_failed());
                Err(e)
            }
        }
    }

    /// Performs one authenticated write for `action` on `item_id` and, once
    /// the backend confirms, reconciles the local list.
    pub async fn dispatch(
        &self,
        item_id: &str,
        action: Action,
    ) -> Result<DispatchOutcome, ClientError> {
        let Some(session) = self.session.current() else {
            debug!("No session; skipping {} of {item_id}", action.label());
            return Ok(DispatchOutcome::NoSession);
        };

        {
            let mut state = self.state.lock();
            if state.phase == Phase::TornDown {
                return Ok(DispatchOutcome::Discarded);
            }
            if !state.in_flight.insert(item_id.to_string()) {
                debug!("{} of {item_id} ignored; already in flight", action.label());
                return Ok(DispatchOutcome::InFlight);
            }
        }

        let guard = InFlightGuard {
            state: &self.state,
            item_id,
        };
        let result = self.send(&session, action, item_id).await;
        drop(guard);

        let mut state = self.state.lock();
        if state.phase == Phase::TornDown {
            return Ok(DispatchOutcome::Discarded);
        }

        match result {
            Ok(()) => {
                let next = reconcile::next(&state.items, action, item_id);
                let affected = if action.removes_item() {
                    state.items.iter().find(|i| i.id == item_id).cloned()
                } else {
                    next.iter().find(|i| i.id == item_id).cloned()
                };
                state.items = next;
                drop(state);
                self.bump_revision();

                let title = affected
                    .as_ref()
                    .map(|i| i.title.as_str())
                    .unwrap_or(item_id);
                info!("{} of '{title}' confirmed", action.label());
                self.notifier
                    .notify(Notification::action_succeeded(action, title));
                Ok(DispatchOutcome::Applied { item: affected })
            }
            Err(e) => {
                drop(state);
                error!("Error during {} of {item_id}: {e}", action.label());
                self.notifier.notify(Notification::update_failed());
                Err(e)
            }
        }
    }

    /// Inserts `item` at the head of the list as an accepted task. Returns
    /// `false` if the view is already torn down.
    pub fn adopt(&self, item: ListItem) -> bool {
        let mut state = self.state.lock();
        if state.phase == Phase::TornDown {
            return false;
        }
        state.items = reconcile::adopt(&state.items, item);
        drop(state);
        self.bump_revision();
        true
    }

    async fn fetch(&self, session: &Session) -> Result<Vec<ListItem>, ClientError> {
        let token = session.id_token().await?;
        self.api.list(self.kind, &token).await
    }

    async fn send(&self, session: &Session, action: Action, item_id: &str) -> Result<(), ClientError> {
        let token = session.id_token().await?;
        self.api.mutate(action, item_id, &token).await
    }

    fn tear_down(&self) {
        let mut state = self.state.lock();
        state.phase = Phase::TornDown;
        state.in_flight.clear();
    }
}

/// Clears an item's in-flight mark even if the dispatch future is dropped.
struct InFlightGuard<'a> {
    state: &'a Mutex<ListState>,
    item_id: &'a str,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().in_flight.remove(self.item_id);
    }
}

/// A mounted view. Dropping it releases the session subscription and tears
/// the controller down.
pub struct ViewHandle {
    controller: Arc<ListController>,
    subscription: JoinHandle<()>,
}

impl ViewHandle {
    pub fn unmount(self) {}
}

impl Drop for ViewHandle {
    fn drop(&mut self) {
        self.subscription.abort();
        self.controller.tear_down();
        info!("Unmounted {} view", self.controller.kind.label());
    }
}
