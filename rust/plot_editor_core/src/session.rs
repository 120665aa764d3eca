//! Editing session: owns the option documents, the history and the render round-trips.
//!
//! Every forward edit snapshots `(current axis, working)` onto the undo stack before it is
//! applied, then the working document is sent to the render engine. Only the response to the
//! most recent request is applied; anything older is dropped. A successful response is laid
//! over the copy that was submitted (see [`OptionDocument::overlay`]) and becomes the new
//! baseline; edits made after the submit are then replayed on top of it.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::axis::{AxisModel, AxisSelector, EDIT_OPTIONS_KEY};
use crate::config::{check_ppi, SessionConfig};
use crate::doc::{OptionDocument, Path};
use crate::error::{EditorError, Result};
use crate::gateway::{ImageHandle, RenderGateway, RenderOutcome, RenderRequest, RenderResponse, RequestId};
use crate::history::{History, HistorySnapshot};
use crate::observer::{Change, Notifier, Observed, Observer, SubscriptionId};

const NAME: &str = "name";
const TITLE: &str = "title";
const DATA: &str = "data";
const WIDTH: &str = "width";
const HEIGHT: &str = "height";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing pending; the working document matches what was last rendered or submitted.
    Idle,
    /// Local edits that have not been submitted yet.
    Editing,
    /// Waiting for the render engine.
    Submitted,
    /// Applying an engine response.
    Reconciling,
    /// No plot open.
    Closed,
}

/// What happened to a render response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    Applied,
    /// Superseded by a newer request; ignored.
    Stale,
}

/// The finished options handed back to the plot's owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPlot {
    pub context_id: i64,
    pub options: OptionDocument,
}

#[derive(Debug)]
pub struct EditSession<G> {
    gateway: G,
    config: SessionConfig,
    notifier: Notifier,
    history: History,
    /// Last document confirmed by the render engine.
    original: OptionDocument,
    /// Document as handed to `open`.
    opened: OptionDocument,
    working: OptionDocument,
    pending: BTreeMap<RequestId, OptionDocument>,
    latest: Option<RequestId>,
    block_changes: bool,
    state: SessionState,
    axis: AxisSelector,
    visible: bool,
    loading: bool,
    ppi: f64,
    image: Option<ImageHandle>,
    context_id: i64,
}

impl<G: RenderGateway> EditSession<G> {
    pub fn new(gateway: G, config: SessionConfig) -> Self {
        let ppi = config.default_ppi;
        Self {
            gateway,
            config,
            notifier: Notifier::new(),
            history: History::new(),
            original: OptionDocument::new(),
            opened: OptionDocument::new(),
            working: OptionDocument::new(),
            pending: BTreeMap::new(),
            latest: None,
            block_changes: false,
            state: SessionState::Closed,
            axis: AxisSelector::default(),
            visible: false,
            loading: false,
            ppi,
            image: None,
            context_id: 0,
        }
    }

    pub fn subscribe(&mut self, observer: impl Observer + 'static) -> SubscriptionId {
        self.notifier.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    // Lifecycle

    /// Starts editing a plot. Any previous target is forgotten.
    pub fn open(&mut self, options: OptionDocument, context_id: i64) {
        self.reset_state();
        tracing::info!(context_id, "opening plot editor");
        self.context_id = context_id;
        self.opened = options.clone();
        self.original = options.clone();
        self.working = options;
        self.visible = true;
        self.state = SessionState::Idle;
        self.sync();
    }

    pub fn open_json(&mut self, options: &str, context_id: i64) -> Result<()> {
        let options = OptionDocument::from_json(options)?;
        self.open(options, context_id);
        Ok(())
    }

    /// Throws away local edits and history and returns to the last rendered document.
    pub fn cancel(&mut self) {
        self.cancel_state();
        self.sync();
    }

    /// Like [`cancel`](Self::cancel), and also forgets the baseline documents.
    pub fn reset(&mut self) {
        self.reset_state();
        self.sync();
    }

    /// Returns the working document as the finished result. History is left alone.
    pub fn save(&mut self) -> Result<SavedPlot> {
        self.ensure_open()?;
        let saved = SavedPlot {
            context_id: self.context_id,
            options: self.working.clone(),
        };
        tracing::info!(context_id = self.context_id, "saving edited plot");
        self.notifier.emit(&Change::Saved {
            context_id: saved.context_id,
            options: saved.options.clone(),
        });
        Ok(saved)
    }

    pub fn close(&mut self) {
        self.close_state();
        self.sync();
    }

    pub fn request_save(&mut self) -> Result<SavedPlot> {
        let saved = self.save()?;
        self.close();
        Ok(saved)
    }

    pub fn request_cancel(&mut self) {
        self.cancel_state();
        self.close_state();
        self.sync();
    }

    // The `*_state` helpers mutate without notifying so that composite operations announce
    // their end state once.

    fn cancel_state(&mut self) {
        tracing::info!(context_id = self.context_id, "cancelling plot edits");
        self.working = self.original.clone();
        self.history.clear();
        self.abandon_requests();
        self.block_changes = false;
        if self.state != SessionState::Closed {
            self.state = SessionState::Idle;
        }
    }

    fn reset_state(&mut self) {
        self.cancel_state();
        self.original = OptionDocument::new();
        self.opened = OptionDocument::new();
        self.working = OptionDocument::new();
        self.image = None;
        self.context_id = 0;
        self.axis = AxisSelector::default();
    }

    fn close_state(&mut self) {
        self.visible = false;
        self.history.clear();
        self.abandon_requests();
        self.block_changes = false;
        self.state = SessionState::Closed;
    }

    /// Host-facing undo; an empty stack just reports `false`.
    pub fn request_undo(&mut self) -> Result<bool> {
        swallow_history_empty(self.undo())
    }

    pub fn request_redo(&mut self) -> Result<bool> {
        swallow_history_empty(self.redo())
    }

    // Editing

    /// Applies one discrete user edit to the working document.
    ///
    /// All mutations made inside `apply` form a single undo step. An edit that leaves the
    /// document unchanged records nothing. While changes are blocked the edit is applied
    /// without touching history or the render engine. Returns whether a step was recorded.
    pub fn edit<F>(&mut self, apply: F) -> Result<bool>
    where
        F: FnOnce(&mut OptionDocument) -> Result<()>,
    {
        self.ensure_open()?;
        let before = self.working.clone();
        if let Err(err) = apply(&mut self.working) {
            self.working = before;
            return Err(err);
        }
        if self.block_changes || self.working == before {
            self.sync();
            return Ok(false);
        }
        self.history.record(HistorySnapshot::new(self.axis, before));
        self.state = SessionState::Editing;
        if self.config.auto_submit {
            self.submit()?;
        } else {
            self.sync();
        }
        Ok(true)
    }

    pub fn set_option(&mut self, path: &Path, value: Value) -> Result<bool> {
        self.edit(|doc| doc.set(path, value))
    }

    pub fn set_option_json(&mut self, path: &str, value: &str) -> Result<bool> {
        let path = Path::parse(path)?;
        let value: Value = serde_json::from_str(value)?;
        self.set_option(&path, value)
    }

    /// Sets an option relative to the current axis subtree.
    pub fn set_axis_option(&mut self, path: &Path, value: Value) -> Result<bool> {
        let full = self.axis.path().join(path);
        self.edit(|doc| doc.set(&full, value))
    }

    pub fn set_name(&mut self, name: &str) -> Result<bool> {
        self.set_option(&Path::root().key(NAME), json!(name))
    }

    pub fn set_title(&mut self, title: &str) -> Result<bool> {
        self.set_option(&Path::root().key(TITLE), json!(title))
    }

    pub fn set_data(&mut self, data: &str) -> Result<bool> {
        self.set_option(&Path::root().key(DATA), json!(data))
    }

    pub fn set_width(&mut self, width: i64) -> Result<bool> {
        self.set_option(&Path::root().key(WIDTH), json!(width))
    }

    pub fn set_height(&mut self, height: i64) -> Result<bool> {
        self.set_option(&Path::root().key(HEIGHT), json!(height))
    }

    /// Undoable edit back to the options the editor was opened with.
    pub fn reset_defaults(&mut self) -> Result<bool> {
        let defaults = self.opened.clone();
        self.edit(|doc| {
            *doc = defaults;
            Ok(())
        })
    }

    pub fn set_current_axis(&mut self, axis: AxisSelector) {
        self.axis = axis;
        self.sync();
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.sync();
    }

    /// Changes the render resolution; the open plot is re-rendered.
    pub fn set_ppi(&mut self, ppi: f64) -> Result<()> {
        check_ppi(ppi)?;
        if self.ppi == ppi {
            return Ok(());
        }
        self.ppi = ppi;
        if self.state == SessionState::Closed || self.block_changes {
            self.sync();
            return Ok(());
        }
        self.refresh().map(|_| ())
    }

    pub fn set_block_changes(&mut self, block: bool) {
        self.block_changes = block;
    }

    // History

    pub fn undo(&mut self) -> Result<()> {
        self.ensure_open()?;
        let current = HistorySnapshot::new(self.axis, self.working.clone());
        let snapshot = self.history.undo(current)?;
        tracing::debug!(remaining = self.history.undo_depth(), "undo");
        self.replay(snapshot)
    }

    pub fn redo(&mut self) -> Result<()> {
        self.ensure_open()?;
        let current = HistorySnapshot::new(self.axis, self.working.clone());
        let snapshot = self.history.redo(current)?;
        tracing::debug!(remaining = self.history.redo_depth(), "redo");
        self.replay(snapshot)
    }

    fn replay(&mut self, snapshot: HistorySnapshot) -> Result<()> {
        self.block_changes = true;
        let (axis, options) = snapshot.into_parts();
        self.axis = axis;
        self.working = options;
        self.block_changes = false;
        self.submit().map(|_| ())
    }

    // Rendering

    /// Sends the working document to the render engine. Earlier requests are superseded.
    pub fn submit(&mut self) -> Result<RequestId> {
        self.ensure_open()?;
        let id = RequestId::next();
        if let Some(previous) = self.latest {
            tracing::debug!(%previous, superseded_by = %id, "superseding render request");
        }
        self.pending.clear();
        self.pending.insert(id, self.working.clone());
        self.latest = Some(id);
        self.loading = true;
        self.state = SessionState::Submitted;
        tracing::debug!(request = %id, context_id = self.context_id, "submitting options for rendering");
        self.gateway.submit(RenderRequest {
            id,
            context_id: self.context_id,
            ppi: self.ppi,
            options: self.working.clone(),
        });
        self.sync();
        Ok(id)
    }

    /// Re-renders the working document without recording a history step.
    pub fn refresh(&mut self) -> Result<RequestId> {
        self.submit()
    }

    /// Handles a render engine response.
    ///
    /// Responses to anything but the latest request are ignored. On success the response is
    /// laid over the submitted document and becomes the new baseline; edits made since the
    /// submit are replayed onto it and leave the session in `Editing`. On failure the working
    /// document rolls back to the last rendered one, undo steps that would now restore that
    /// same document are dropped, and the failure is returned.
    pub fn on_result(&mut self, response: RenderResponse) -> Result<ResponseOutcome> {
        let RenderResponse { request, outcome } = response;
        if self.latest != Some(request) {
            self.pending.remove(&request);
            tracing::debug!(%request, latest = ?self.latest, "discarding stale render response");
            return Ok(ResponseOutcome::Stale);
        }
        self.latest = None;
        let submitted = self.pending.remove(&request);
        self.state = SessionState::Reconciling;
        self.block_changes = true;

        let mut resume = SessionState::Idle;
        let result = match outcome {
            RenderOutcome::Success { options, image } => {
                // Edits made after the request went out are still waiting for a submit.
                let local_edits = submitted
                    .as_ref()
                    .map(|sent| self.working.edits_since(sent))
                    .unwrap_or_default();
                tracing::debug!(
                    %request,
                    image = image.as_str(),
                    engine_defaults = submitted.as_ref().is_some_and(|sent| *sent != options),
                    local_edits = local_edits.len(),
                    "applying render response"
                );
                let mut merged = submitted.unwrap_or_else(|| self.working.clone());
                merged.overlay(&options);
                self.original = merged.clone();
                if !local_edits.is_empty() {
                    merged.apply_edits(&local_edits);
                    resume = SessionState::Editing;
                }
                self.working = merged;
                self.image = Some(image);
                Ok(ResponseOutcome::Applied)
            }
            RenderOutcome::Failure { error } => {
                let message = error.unwrap_or_else(|| "render engine reported a failure".to_string());
                tracing::warn!(%request, %message, "render failed, rolling back edits");
                self.working = self.original.clone();
                let dropped = self.history.drop_steps_matching(&self.working);
                if dropped > 0 {
                    tracing::debug!(%request, dropped, "dropped undo steps of the failed edit");
                }
                self.notifier.emit(&Change::RenderFailed {
                    request,
                    message: message.clone(),
                });
                Err(EditorError::RenderFailure { request, message })
            }
        };

        self.loading = false;
        self.sync();
        self.block_changes = false;
        self.state = resume;
        result
    }

    fn abandon_requests(&mut self) {
        if let Some(request) = self.latest.take() {
            tracing::debug!(%request, "abandoning in-flight render request");
        }
        self.pending.clear();
        self.loading = false;
    }

    // Accessors

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn working(&self) -> &OptionDocument {
        &self.working
    }

    pub fn original(&self) -> &OptionDocument {
        &self.original
    }

    pub fn context_id(&self) -> i64 {
        self.context_id
    }

    pub fn name(&self) -> &str {
        self.working.get_str(&Path::root().key(NAME)).unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.working.get_str(&Path::root().key(TITLE)).unwrap_or_default()
    }

    pub fn data(&self) -> Option<&str> {
        self.working.get_str(&Path::root().key(DATA))
    }

    pub fn width(&self) -> i64 {
        self.working.get_i64(&Path::root().key(WIDTH)).unwrap_or_default()
    }

    pub fn height(&self) -> i64 {
        self.working.get_i64(&Path::root().key(HEIGHT)).unwrap_or_default()
    }

    pub fn ppi(&self) -> f64 {
        self.ppi
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn block_changes(&self) -> bool {
        self.block_changes
    }

    pub fn current_axis(&self) -> AxisSelector {
        self.axis
    }

    pub fn axis(&self, selector: AxisSelector) -> AxisModel<'_> {
        AxisModel::new(selector, &self.working)
    }

    pub fn current_axis_model(&self) -> AxisModel<'_> {
        self.axis(self.axis)
    }

    pub fn undo_enabled(&self) -> bool {
        self.history.can_undo()
    }

    pub fn redo_enabled(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    pub fn latest_request(&self) -> Option<RequestId> {
        self.latest
    }

    /// Whether the working document differs from the one the editor was opened with.
    pub fn has_unsaved_changes(&self) -> bool {
        self.working != self.opened
    }

    /// Whether the engine supplied editable options for this plot at all.
    pub fn valid_options(&self) -> bool {
        matches!(
            self.working.get(&Path::root().key(EDIT_OPTIONS_KEY)),
            Some(Value::Object(_))
        )
    }

    /// Preview URL: the last rendered image, else the `data` file named by the options.
    pub fn image_url(&self) -> Option<String> {
        self.image
            .as_ref()
            .map(ImageHandle::as_str)
            .or_else(|| self.data())
            .map(|file| self.config.image_url(file))
    }

    // Notification

    fn observed(&self) -> Observed {
        Observed {
            visible: self.visible,
            name: self.name().to_string(),
            title: self.title().to_string(),
            width: self.width(),
            height: self.height(),
            ppi: self.ppi,
            current_axis: self.axis,
            undo_enabled: self.undo_enabled(),
            redo_enabled: self.redo_enabled(),
            loading: self.loading,
            image_url: self.image_url(),
        }
    }

    fn sync(&mut self) {
        let next = self.observed();
        self.notifier.publish(next);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Err(EditorError::Closed);
        }
        Ok(())
    }
}

fn swallow_history_empty(result: Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(err) if err.is_history_empty() => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Outbox;
    use crate::observer::ChangeQueue;

    fn opened(options: Value) -> EditSession<Outbox> {
        let mut session = EditSession::new(Outbox::new(), SessionConfig::default());
        session.open(OptionDocument::from_value(options), 11);
        session
    }

    fn last_request(session: &EditSession<Outbox>) -> RequestId {
        session.gateway().last().map(|r| r.id).unwrap()
    }

    #[test]
    fn new_session_is_closed() {
        let mut session = EditSession::new(Outbox::new(), SessionConfig::default());
        assert_eq!(session.state(), SessionState::Closed);
        assert!(matches!(session.set_width(10), Err(EditorError::Closed)));
        assert!(matches!(session.submit(), Err(EditorError::Closed)));
        assert!(session.gateway().is_empty());
    }

    #[test]
    fn edit_records_history_and_submits() {
        let mut session = opened(json!({"width": 400, "height": 300}));
        assert!(session.set_width(500).unwrap());
        assert_eq!(session.undo_depth(), 1);
        assert_eq!(session.state(), SessionState::Submitted);
        assert!(session.loading());

        let request = session.gateway().last().unwrap();
        assert_eq!(request.context_id, 11);
        assert_eq!(request.ppi, 96.0);
        assert_eq!(request.options.get_i64(&Path::root().key("width")), Some(500));
    }

    #[test]
    fn no_op_edits_record_nothing() {
        let mut session = opened(json!({"width": 400}));
        assert!(!session.set_width(400).unwrap());
        assert_eq!(session.undo_depth(), 0);
        assert!(session.gateway().is_empty());
    }

    #[test]
    fn failed_edit_leaves_document_untouched() {
        let mut session = opened(json!({"width": 400, "breaks": [1]}));
        let err = session
            .edit(|doc| {
                doc.set(&Path::root().key("height"), json!(1))?;
                doc.set(&Path::parse("breaks[3]")?, json!(2))
            })
            .unwrap_err();
        assert!(matches!(err, EditorError::InvalidPath { .. }));
        assert_eq!(session.working().as_value(), &json!({"width": 400, "breaks": [1]}));
        assert_eq!(session.undo_depth(), 0);
    }

    #[test]
    fn batched_mutations_are_one_step() {
        let mut session = opened(json!({"width": 400, "height": 300}));
        session
            .edit(|doc| {
                doc.set(&Path::root().key("width"), json!(640))?;
                doc.set(&Path::root().key("height"), json!(480))
            })
            .unwrap();
        assert_eq!(session.undo_depth(), 1);
        session.undo().unwrap();
        assert_eq!((session.width(), session.height()), (400, 300));
    }

    #[test]
    fn blocked_changes_skip_history_and_rendering() {
        let mut session = opened(json!({"width": 400}));
        session.set_block_changes(true);
        assert!(!session.set_width(500).unwrap());
        session.set_block_changes(false);
        assert_eq!(session.width(), 500);
        assert_eq!(session.undo_depth(), 0);
        assert!(session.gateway().is_empty());
    }

    #[test]
    fn axis_options_follow_the_current_axis() {
        let mut session = opened(json!({"editOptions": {"xAxis": {"title": "x"}, "yAxis": {"title": "y"}}}));
        assert!(session.valid_options());
        session.set_current_axis(AxisSelector::Y);
        session.set_axis_option(&Path::root().key("title"), json!("Count")).unwrap();
        assert_eq!(session.axis(AxisSelector::Y).title(), Some("Count"));
        assert_eq!(session.axis(AxisSelector::X).title(), Some("x"));

        session.set_current_axis(AxisSelector::X);
        session.undo().unwrap();
        assert_eq!(session.current_axis(), AxisSelector::Y);
        assert_eq!(session.current_axis_model().title(), Some("y"));
    }

    #[test]
    fn render_failure_rolls_back_to_last_rendered_document() {
        let mut session = opened(json!({"width": 400}));
        session.set_width(500).unwrap();
        let request = last_request(&session);

        let err = session
            .on_result(RenderResponse::failure(request, "engine timed out"))
            .unwrap_err();
        assert!(matches!(err, EditorError::RenderFailure { .. }));
        assert_eq!(session.width(), 400);
        assert!(!session.loading());
        assert_eq!(session.state(), SessionState::Idle);
        // The step for the failed edit would only restore the document already shown.
        assert_eq!(session.undo_depth(), 0);
        assert!(!session.undo_enabled());

        session.set_width(600).unwrap();
        assert_eq!(session.width(), 600);
        assert_eq!(session.undo_depth(), 1);
    }

    #[test]
    fn render_failure_keeps_steps_that_still_change_the_document() {
        let mut session = EditSession::new(
            Outbox::new(),
            SessionConfig::default().with_auto_submit(false),
        );
        session.open(OptionDocument::from_value(json!({"width": 400})), 1);
        session.set_width(450).unwrap();
        session.set_width(500).unwrap();
        let request = session.submit().unwrap();

        session
            .on_result(RenderResponse::failure(request, "bad width"))
            .unwrap_err();
        assert_eq!(session.width(), 400);
        assert_eq!(session.undo_depth(), 2);
        session.undo().unwrap();
        assert_eq!(session.width(), 450);
    }

    #[test]
    fn success_updates_baseline_and_image() {
        let mut session = opened(json!({"width": 400, "data": "plot_1.png"}));
        assert_eq!(session.image_url().as_deref(), Some("plot_1.png"));
        session.set_width(500).unwrap();
        let request = last_request(&session);
        let outcome = session
            .on_result(RenderResponse::success(
                request,
                OptionDocument::from_value(json!({"width": 500, "ppi": 96})),
                "plot_2.png",
            ))
            .unwrap();
        assert_eq!(outcome, ResponseOutcome::Applied);
        assert_eq!(session.original(), session.working());
        assert_eq!(session.image_url().as_deref(), Some("plot_2.png"));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.has_unsaved_changes());
    }

    #[test]
    fn manual_submit_mode_tracks_unsubmitted_edits() {
        let mut session = EditSession::new(
            Outbox::new(),
            SessionConfig::default().with_auto_submit(false),
        );
        session.open(OptionDocument::from_value(json!({"width": 400})), 1);
        session.set_width(450).unwrap();
        session.set_width(500).unwrap();
        assert_eq!(session.state(), SessionState::Editing);
        assert!(session.gateway().is_empty());
        assert_eq!(session.undo_depth(), 2);

        let request = session.submit().unwrap();
        session.set_height(300).unwrap();
        session
            .on_result(RenderResponse::success(
                request,
                OptionDocument::from_value(json!({"width": 500})),
                "p.png",
            ))
            .unwrap();
        assert_eq!(session.height(), 300);
        assert_eq!(session.state(), SessionState::Editing);
        assert_eq!(session.original().as_value(), &json!({"width": 500}));
    }

    #[test]
    fn response_does_not_overwrite_edits_made_after_submit() {
        let mut session = EditSession::new(
            Outbox::new(),
            SessionConfig::default().with_auto_submit(false),
        );
        session.open(OptionDocument::from_value(json!({"width": 400, "title": "A"})), 1);
        session.set_width(500).unwrap();
        let request = session.submit().unwrap();
        session.set_width(600).unwrap();
        session.set_title("B").unwrap();

        session
            .on_result(RenderResponse::success(
                request,
                OptionDocument::from_value(json!({"width": 500, "title": "A", "ppi": 96})),
                "p.png",
            ))
            .unwrap();
        assert_eq!(session.width(), 600);
        assert_eq!(session.title(), "B");
        assert_eq!(session.working().get_i64(&Path::root().key("ppi")), Some(96));
        assert_eq!(
            session.original().as_value(),
            &json!({"width": 500, "title": "A", "ppi": 96})
        );
        assert_eq!(session.state(), SessionState::Editing);

        let request = session.submit().unwrap();
        session
            .on_result(RenderResponse::success(
                request,
                OptionDocument::from_value(json!({"width": 600})),
                "q.png",
            ))
            .unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.original(), session.working());
    }

    #[test]
    fn save_hands_back_working_document() {
        let mut session = opened(json!({"width": 400}));
        let queue = ChangeQueue::new();
        session.subscribe(queue.clone());
        session.set_width(500).unwrap();
        queue.take();

        let saved = session.request_save().unwrap();
        assert_eq!(saved.context_id, 11);
        assert_eq!(saved.options.get_i64(&Path::root().key("width")), Some(500));
        let changes = queue.take();
        assert!(matches!(changes[0], Change::Saved { context_id: 11, .. }));
        assert!(changes.contains(&Change::Visible(false)));
        assert_eq!(session.state(), SessionState::Closed);
        assert!(matches!(session.save(), Err(EditorError::Closed)));
    }

    #[test]
    fn request_undo_reports_empty_history_as_false() {
        let mut session = opened(json!({"width": 400}));
        assert!(!session.request_undo().unwrap());
        assert!(!session.request_redo().unwrap());
        session.set_width(401).unwrap();
        assert!(session.request_undo().unwrap());
        assert!(session.request_redo().unwrap());
    }

    #[test]
    fn reset_defaults_is_undoable() {
        let mut session = opened(json!({"width": 400}));
        session.set_width(500).unwrap();
        session.set_title("Edited").unwrap();
        assert!(session.reset_defaults().unwrap());
        assert_eq!(session.working().as_value(), &json!({"width": 400}));
        assert!(!session.has_unsaved_changes());
        session.undo().unwrap();
        assert_eq!(session.title(), "Edited");
    }

    #[test]
    fn ppi_change_rerenders_without_history() {
        let mut session = opened(json!({"width": 400}));
        session.set_ppi(300.0).unwrap();
        assert_eq!(session.gateway().last().map(|r| r.ppi), Some(300.0));
        assert_eq!(session.undo_depth(), 0);
        session.set_ppi(300.0).unwrap();
        assert_eq!(session.gateway().len(), 1);
    }

    #[test]
    fn unusable_ppi_is_rejected_without_side_effects() {
        let mut session = opened(json!({"width": 400}));
        let queue = ChangeQueue::new();
        session.subscribe(queue.clone());

        for ppi in [f64::NAN, f64::INFINITY, 0.0, -72.0] {
            assert!(matches!(session.set_ppi(ppi), Err(EditorError::InvalidPpi(_))));
        }
        assert_eq!(session.ppi(), 96.0);
        assert!(session.gateway().is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn reopening_with_the_same_fields_announces_nothing() {
        let mut session = opened(json!({"width": 400, "title": "A"}));
        let queue = ChangeQueue::new();
        session.subscribe(queue.clone());

        session.open(OptionDocument::from_value(json!({"width": 400, "title": "A"})), 11);
        assert_eq!(queue.take(), vec![]);

        session.set_width(500).unwrap();
        queue.take();
        session.request_cancel();
        assert_eq!(
            queue.take(),
            vec![
                Change::Visible(false),
                Change::Width(400),
                Change::UndoRedoEnabled { undo: false, redo: false },
                Change::Loading(false)
            ]
        );
    }

    #[test]
    fn reset_forgets_the_target() {
        let mut session = opened(json!({"width": 400}));
        session.set_width(500).unwrap();
        session.reset();
        assert!(session.working().is_empty());
        assert!(session.original().is_empty());
        assert_eq!(session.context_id(), 0);
        assert_eq!((session.undo_depth(), session.redo_depth()), (0, 0));
        assert_eq!(session.latest_request(), None);
    }
}
