//! Change notifications for the host UI.
//!
//! The session publishes a snapshot of its observable fields after every operation; the
//! [`Notifier`] compares it with what was last announced and only reports real changes.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::Serialize;

use crate::axis::AxisSelector;
use crate::doc::OptionDocument;
use crate::gateway::RequestId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum Change {
    Visible(bool),
    Name(String),
    Title(String),
    Width(i64),
    Height(i64),
    Ppi(f64),
    CurrentAxis(AxisSelector),
    #[serde(rename_all = "camelCase")]
    UndoRedoEnabled { undo: bool, redo: bool },
    Loading(bool),
    Image { url: Option<String> },
    #[serde(rename_all = "camelCase")]
    RenderFailed { request: RequestId, message: String },
    #[serde(rename_all = "camelCase")]
    Saved { context_id: i64, options: OptionDocument },
}

pub trait Observer {
    fn on_change(&mut self, change: &Change);
}

impl<F> Observer for F
where
    F: FnMut(&Change),
{
    fn on_change(&mut self, change: &Change) {
        self(change)
    }
}

/// Observer that buffers changes for hosts that poll instead of taking callbacks.
#[derive(Debug, Default, Clone)]
pub struct ChangeQueue {
    inner: Rc<RefCell<VecDeque<Change>>>,
}

impl ChangeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Change> {
        self.inner.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

impl Observer for ChangeQueue {
    fn on_change(&mut self, change: &Change) {
        self.inner.borrow_mut().push_back(change.clone());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Observable fields as last announced to subscribers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Observed {
    pub visible: bool,
    pub name: String,
    pub title: String,
    pub width: i64,
    pub height: i64,
    pub ppi: f64,
    pub current_axis: AxisSelector,
    pub undo_enabled: bool,
    pub redo_enabled: bool,
    pub loading: bool,
    pub image_url: Option<String>,
}

impl Observed {
    fn diff(&self, next: &Observed) -> Vec<Change> {
        let mut changes = Vec::new();
        if self.visible != next.visible {
            changes.push(Change::Visible(next.visible));
        }
        if self.name != next.name {
            changes.push(Change::Name(next.name.clone()));
        }
        if self.title != next.title {
            changes.push(Change::Title(next.title.clone()));
        }
        if self.width != next.width {
            changes.push(Change::Width(next.width));
        }
        if self.height != next.height {
            changes.push(Change::Height(next.height));
        }
        if self.ppi != next.ppi {
            changes.push(Change::Ppi(next.ppi));
        }
        if self.current_axis != next.current_axis {
            changes.push(Change::CurrentAxis(next.current_axis));
        }
        if self.undo_enabled != next.undo_enabled || self.redo_enabled != next.redo_enabled {
            changes.push(Change::UndoRedoEnabled {
                undo: next.undo_enabled,
                redo: next.redo_enabled,
            });
        }
        if self.loading != next.loading {
            changes.push(Change::Loading(next.loading));
        }
        if self.image_url != next.image_url {
            changes.push(Change::Image {
                url: next.image_url.clone(),
            });
        }
        changes
    }
}

#[derive(Default)]
pub struct Notifier {
    subscribers: Vec<(SubscriptionId, Box<dyn Observer>)>,
    last: Observed,
    next_id: u64,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscribers.len())
            .field("last", &self.last)
            .finish()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl Observer + 'static) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Announces every field of `next` that differs from the previous announcement.
    pub fn publish(&mut self, next: Observed) {
        let changes = self.last.diff(&next);
        self.last = next;
        for change in &changes {
            self.emit(change);
        }
    }

    /// Announces a one-off event that is not tied to a field value.
    pub fn emit(&mut self, change: &Change) {
        for (_, observer) in &mut self.subscribers {
            observer.on_change(change);
        }
    }
}
