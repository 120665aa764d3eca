pub mod axis;
pub mod config;
pub mod doc;
pub mod error;
pub mod gateway;
pub mod history;
pub mod observer;
pub mod session;

use serde_json::Value;
use axis::AxisSelector;
use config::SessionConfig;
use doc::Path;
use gateway::{Outbox, RenderResponse};
use observer::ChangeQueue;
use session::{EditSession, ResponseOutcome};

pub use error::{EditorError, HistoryKind, Result};

/// String-in, string-out editor used by the wasm and ffi bindings.
///
/// Render requests are queued for the host to pick up with [`take_requests_json`] and engine
/// results are fed back through [`apply_result_json`]. UI changes are buffered likewise.
///
/// [`take_requests_json`]: PlotEditorCore::take_requests_json
/// [`apply_result_json`]: PlotEditorCore::apply_result_json
#[derive(Debug)]
pub struct PlotEditorCore {
    pub session: EditSession<Outbox>,
    changes: ChangeQueue,
}

impl Default for PlotEditorCore {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl PlotEditorCore {
    pub fn new(config: SessionConfig) -> Self {
        let changes = ChangeQueue::new();
        let mut session = EditSession::new(Outbox::new(), config);
        session.subscribe(changes.clone());
        Self { session, changes }
    }

    pub fn from_config_json(json: &str) -> Result<Self> {
        Ok(Self::new(SessionConfig::from_json(json)?))
    }

    pub fn open_json(&mut self, context_id: i64, options_json: &str) -> Result<()> {
        self.session.open_json(options_json, context_id)
    }

    pub fn to_json(&self) -> String {
        self.session.working().to_json()
    }

    pub fn set_name(&mut self, name: &str) -> Result<bool> { self.session.set_name(name) }
    pub fn set_title(&mut self, title: &str) -> Result<bool> { self.session.set_title(title) }
    pub fn set_data(&mut self, data: &str) -> Result<bool> { self.session.set_data(data) }
    pub fn set_width(&mut self, width: i64) -> Result<bool> { self.session.set_width(width) }
    pub fn set_height(&mut self, height: i64) -> Result<bool> { self.session.set_height(height) }
    pub fn set_ppi(&mut self, ppi: f64) -> Result<()> { self.session.set_ppi(ppi) }
    pub fn set_visible(&mut self, visible: bool) { self.session.set_visible(visible) }

    pub fn set_option_json(&mut self, path: &str, value_json: &str) -> Result<bool> {
        self.session.set_option_json(path, value_json)
    }

    pub fn set_axis_option_json(&mut self, path: &str, value_json: &str) -> Result<bool> {
        let path = Path::parse(path)?;
        let value: Value = serde_json::from_str(value_json)?;
        self.session.set_axis_option(&path, value)
    }

    /// Reads any option as JSON; absent options read as `null`.
    pub fn get_option_json(&self, path: &str) -> Result<String> {
        let path = Path::parse(path)?;
        let value = self.session.working().get(&path).cloned().unwrap_or(Value::Null);
        Ok(value.to_string())
    }

    /// Selects the axis by its option key (`xAxis`, `yAxis`). Unknown keys are ignored.
    pub fn set_current_axis(&mut self, key: &str) -> bool {
        match AxisSelector::from_key(key) {
            Some(axis) => {
                self.session.set_current_axis(axis);
                true
            }
            None => false,
        }
    }

    pub fn current_axis(&self) -> &'static str {
        self.session.current_axis().key()
    }

    // History
    pub fn undo(&mut self) -> Result<bool> { self.session.request_undo() }
    pub fn redo(&mut self) -> Result<bool> { self.session.request_redo() }
    pub fn undo_enabled(&self) -> bool { self.session.undo_enabled() }
    pub fn redo_enabled(&self) -> bool { self.session.redo_enabled() }
    pub fn reset_defaults(&mut self) -> Result<bool> { self.session.reset_defaults() }

    // Render round-trip
    pub fn refresh(&mut self) -> Result<u64> {
        self.session.refresh().map(|id| id.get())
    }

    pub fn take_requests_json(&mut self) -> String {
        let requests = self.session.gateway_mut().drain();
        serde_json::to_string(&requests).unwrap_or_else(|_| "[]".to_string())
    }

    /// Feeds an engine result back. Returns `true` when it was applied, `false` when stale.
    pub fn apply_result_json(&mut self, result_json: &str) -> Result<bool> {
        let response: RenderResponse = serde_json::from_str(result_json)?;
        Ok(self.session.on_result(response)? == ResponseOutcome::Applied)
    }

    pub fn take_changes_json(&mut self) -> String {
        serde_json::to_string(&self.changes.take()).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn image_url(&self) -> Option<String> {
        self.session.image_url()
    }

    // Closing
    pub fn save_json(&mut self) -> Result<String> {
        let saved = self.session.request_save()?;
        Ok(serde_json::to_string(&saved)?)
    }

    pub fn cancel(&mut self) { self.session.request_cancel() }

    pub fn original_json(&self) -> String {
        self.session.original().to_json()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.session.has_unsaved_changes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip_through_the_facade() {
        let mut core = PlotEditorCore::default();
        core.open_json(4, r#"{"width":400,"height":300,"editOptions":{"xAxis":{"title":"x"}}}"#)
            .unwrap();
        assert!(core.set_width(500).unwrap());
        assert!(core.set_current_axis("xAxis"));
        assert!(!core.set_current_axis("zAxis"));
        assert!(core.set_axis_option_json("title", "\"Time\"").unwrap());
        assert_eq!(core.get_option_json("editOptions.xAxis.title").unwrap(), "\"Time\"");
        assert_eq!(core.get_option_json("missing").unwrap(), "null");

        let requests: Vec<Value> = serde_json::from_str(&core.take_requests_json()).unwrap();
        assert_eq!(requests.len(), 2);
        let latest = requests[1]["id"].as_u64().unwrap();
        let stale = requests[0]["id"].as_u64().unwrap();

        let stale_result = format!(r#"{{"request":{stale},"status":"success","options":{{"width":1}},"image":"a.png"}}"#);
        assert!(!core.apply_result_json(&stale_result).unwrap());

        let result = format!(r#"{{"request":{latest},"status":"success","options":{{"height":320}},"image":"b.png"}}"#);
        assert!(core.apply_result_json(&result).unwrap());
        assert_eq!(
            core.to_json(),
            r#"{"width":500,"height":320,"editOptions":{"xAxis":{"title":"Time"}}}"#
        );

        let changes: Vec<Value> = serde_json::from_str(&core.take_changes_json()).unwrap();
        assert!(changes.iter().any(|c| c["field"] == "image" && c["value"]["url"] == "b.png"));

        let saved: Value = serde_json::from_str(&core.save_json().unwrap()).unwrap();
        assert_eq!(saved["contextId"], 4);
        assert_eq!(saved["options"]["height"], 320);
    }

    #[test]
    fn malformed_host_input_is_an_error() {
        let mut core = PlotEditorCore::default();
        assert!(matches!(core.open_json(1, "{"), Err(EditorError::Json(_))));
        core.open_json(1, "{}").unwrap();
        assert!(core.apply_result_json("[]").is_err());
        assert!(core.set_option_json("a[", "1").is_err());
    }
}
