//! Handle-based API for native hosts. Editors live on the calling thread.

use std::cell::RefCell;
use std::collections::HashMap;

use plot_editor_core::{EditorError, PlotEditorCore};
use serde::Serialize;

thread_local! {
    static EDITORS: RefCell<HashMap<u32, PlotEditorCore>> = RefCell::new(HashMap::new());
    static NEXT_HANDLE: RefCell<u32> = const { RefCell::new(1) };
}

/// Snapshot of the flags a native toolbar binds to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorStatus {
    pub visible: bool,
    pub loading: bool,
    pub undo_enabled: bool,
    pub redo_enabled: bool,
    pub current_axis: String,
    pub image_url: Option<String>,
}

fn with_editor<T>(handle: u32, f: impl FnOnce(&mut PlotEditorCore) -> Result<T, EditorError>) -> Result<T, String> {
    EDITORS.with(|editors| {
        let mut editors = editors.borrow_mut();
        let editor = editors
            .get_mut(&handle)
            .ok_or_else(|| format!("unknown plot editor handle {handle}"))?;
        f(editor).map_err(|err| err.to_string())
    })
}

pub fn create_editor(config_json: Option<String>) -> Result<u32, String> {
    let core = match config_json {
        Some(json) => PlotEditorCore::from_config_json(&json).map_err(|err| err.to_string())?,
        None => PlotEditorCore::default(),
    };
    let handle = NEXT_HANDLE.with(|next| {
        let mut next = next.borrow_mut();
        let handle = *next;
        *next += 1;
        handle
    });
    EDITORS.with(|editors| editors.borrow_mut().insert(handle, core));
    Ok(handle)
}

pub fn destroy_editor(handle: u32) -> bool {
    EDITORS.with(|editors| editors.borrow_mut().remove(&handle).is_some())
}

pub fn open(handle: u32, context_id: i64, options_json: String) -> Result<(), String> {
    with_editor(handle, |e| e.open_json(context_id, &options_json))
}

pub fn set_option(handle: u32, path: String, value_json: String) -> Result<bool, String> {
    with_editor(handle, |e| e.set_option_json(&path, &value_json))
}

pub fn set_axis_option(handle: u32, path: String, value_json: String) -> Result<bool, String> {
    with_editor(handle, |e| e.set_axis_option_json(&path, &value_json))
}

pub fn set_current_axis(handle: u32, key: String) -> Result<bool, String> {
    with_editor(handle, |e| Ok(e.set_current_axis(&key)))
}

pub fn set_size(handle: u32, width: i64, height: i64) -> Result<(), String> {
    with_editor(handle, |e| {
        e.set_width(width)?;
        e.set_height(height)?;
        Ok(())
    })
}

pub fn undo(handle: u32) -> Result<bool, String> {
    with_editor(handle, |e| e.undo())
}

pub fn redo(handle: u32) -> Result<bool, String> {
    with_editor(handle, |e| e.redo())
}

pub fn take_requests(handle: u32) -> Result<String, String> {
    with_editor(handle, |e| Ok(e.take_requests_json()))
}

pub fn apply_result(handle: u32, result_json: String) -> Result<bool, String> {
    with_editor(handle, |e| e.apply_result_json(&result_json))
}

pub fn take_changes(handle: u32) -> Result<String, String> {
    with_editor(handle, |e| Ok(e.take_changes_json()))
}

pub fn status(handle: u32) -> Result<EditorStatus, String> {
    with_editor(handle, |e| {
        Ok(EditorStatus {
            visible: e.session.visible(),
            loading: e.session.loading(),
            undo_enabled: e.undo_enabled(),
            redo_enabled: e.redo_enabled(),
            current_axis: e.current_axis().to_string(),
            image_url: e.image_url(),
        })
    })
}

pub fn save(handle: u32) -> Result<String, String> {
    with_editor(handle, |e| e.save_json())
}

pub fn cancel(handle: u32) -> Result<(), String> {
    with_editor(handle, |e| {
        e.cancel();
        Ok(())
    })
}

pub fn to_json(handle: u32) -> Result<String, String> {
    with_editor(handle, |e| Ok(e.to_json()))
}
