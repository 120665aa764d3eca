use wasm_bindgen::prelude::*;
use plot_editor_core::{EditorError, PlotEditorCore};

fn js_error(err: EditorError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct PlotEditor {
    core: PlotEditorCore,
}

#[wasm_bindgen]
impl PlotEditor {
    #[wasm_bindgen(constructor)]
    pub fn new() -> PlotEditor {
        PlotEditor { core: PlotEditorCore::default() }
    }

    pub fn with_config(config_json: String) -> Result<PlotEditor, JsValue> {
        let core = PlotEditorCore::from_config_json(&config_json).map_err(js_error)?;
        Ok(PlotEditor { core })
    }

    // Lifecycle
    pub fn open(&mut self, context_id: i64, options_json: String) -> Result<(), JsValue> {
        self.core.open_json(context_id, &options_json).map_err(js_error)
    }
    pub fn save(&mut self) -> Result<String, JsValue> { self.core.save_json().map_err(js_error) }
    pub fn cancel(&mut self) { self.core.cancel() }
    pub fn to_json(&self) -> String { self.core.to_json() }
    pub fn original_json(&self) -> String { self.core.original_json() }
    pub fn has_unsaved_changes(&self) -> bool { self.core.has_unsaved_changes() }

    // Fields
    pub fn set_name(&mut self, name: String) -> Result<bool, JsValue> { self.core.set_name(&name).map_err(js_error) }
    pub fn set_title(&mut self, title: String) -> Result<bool, JsValue> { self.core.set_title(&title).map_err(js_error) }
    pub fn set_data(&mut self, data: String) -> Result<bool, JsValue> { self.core.set_data(&data).map_err(js_error) }
    pub fn set_width(&mut self, width: i32) -> Result<bool, JsValue> { self.core.set_width(width.into()).map_err(js_error) }
    pub fn set_height(&mut self, height: i32) -> Result<bool, JsValue> { self.core.set_height(height.into()).map_err(js_error) }
    pub fn set_ppi(&mut self, ppi: f64) -> Result<(), JsValue> { self.core.set_ppi(ppi).map_err(js_error) }
    pub fn set_visible(&mut self, visible: bool) { self.core.set_visible(visible) }
    pub fn set_option(&mut self, path: String, value_json: String) -> Result<bool, JsValue> {
        self.core.set_option_json(&path, &value_json).map_err(js_error)
    }
    pub fn get_option(&self, path: String) -> Result<String, JsValue> {
        self.core.get_option_json(&path).map_err(js_error)
    }

    // Axes
    pub fn set_current_axis(&mut self, key: String) -> bool { self.core.set_current_axis(&key) }
    pub fn current_axis(&self) -> String { self.core.current_axis().to_string() }
    pub fn set_axis_option(&mut self, path: String, value_json: String) -> Result<bool, JsValue> {
        self.core.set_axis_option_json(&path, &value_json).map_err(js_error)
    }

    // History
    pub fn undo(&mut self) -> Result<bool, JsValue> { self.core.undo().map_err(js_error) }
    pub fn redo(&mut self) -> Result<bool, JsValue> { self.core.redo().map_err(js_error) }
    pub fn undo_enabled(&self) -> bool { self.core.undo_enabled() }
    pub fn redo_enabled(&self) -> bool { self.core.redo_enabled() }
    pub fn reset_defaults(&mut self) -> Result<bool, JsValue> { self.core.reset_defaults().map_err(js_error) }

    // Render round-trip
    pub fn refresh(&mut self) -> Result<f64, JsValue> {
        self.core.refresh().map(|id| id as f64).map_err(js_error)
    }
    pub fn take_requests(&mut self) -> String { self.core.take_requests_json() }
    pub fn apply_result(&mut self, result_json: String) -> Result<bool, JsValue> {
        self.core.apply_result_json(&result_json).map_err(js_error)
    }
    pub fn take_changes(&mut self) -> String { self.core.take_changes_json() }
    pub fn image_url(&self) -> Option<String> { self.core.image_url() }
}

impl Default for PlotEditor {
    fn default() -> Self {
        Self::new()
    }
}
