//! Axis selection and read-only views over axis option subtrees.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::doc::{OptionDocument, Path};

/// Key under which the engine keeps the editable part of the options.
pub const EDIT_OPTIONS_KEY: &str = "editOptions";

/// Which axis edits are aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AxisSelector {
    #[default]
    #[serde(rename = "xAxis")]
    X,
    #[serde(rename = "yAxis")]
    Y,
}

impl AxisSelector {
    pub const ALL: [AxisSelector; 2] = [AxisSelector::X, AxisSelector::Y];

    pub fn key(self) -> &'static str {
        match self {
            AxisSelector::X => "xAxis",
            AxisSelector::Y => "yAxis",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|axis| axis.key() == key)
    }

    /// Location of this axis inside an option document.
    pub fn path(self) -> Path {
        Path::root().key(EDIT_OPTIONS_KEY).key(self.key())
    }
}

/// Borrowed view of one axis' options in a document.
#[derive(Debug, Clone, Copy)]
pub struct AxisModel<'a> {
    selector: AxisSelector,
    doc: &'a OptionDocument,
}

impl<'a> AxisModel<'a> {
    pub fn new(selector: AxisSelector, doc: &'a OptionDocument) -> Self {
        Self { selector, doc }
    }

    pub fn selector(&self) -> AxisSelector {
        self.selector
    }

    /// Whole axis subtree, if the engine supplied one.
    pub fn data(&self) -> Option<&'a Value> {
        self.doc.get(&self.selector.path())
    }

    /// Reads a node relative to the axis subtree.
    pub fn get(&self, path: &Path) -> Option<&'a Value> {
        self.doc.get(&self.selector.path().join(path))
    }

    pub fn title(&self) -> Option<&'a str> {
        self.get(&Path::root().key("title")).and_then(Value::as_str)
    }

    pub fn axis_type(&self) -> Option<&'a str> {
        self.get(&Path::root().key("type")).and_then(Value::as_str)
    }
}
