//! Requests to and responses from the external render engine.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::doc::OptionDocument;

static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

/// Identifier of one render request. Ids increase monotonically across the whole process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    pub fn next() -> Self {
        Self(NEXT_REQUEST.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Engine-side reference to a rendered image, usually a file name relative to the image root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageHandle(pub String);

impl ImageHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One complete document submitted for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub id: RequestId,
    /// Host-side identifier of the plot being edited (the owning analysis).
    pub context_id: i64,
    pub ppi: f64,
    pub options: OptionDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RenderOutcome {
    Success {
        options: OptionDocument,
        image: ImageHandle,
    },
    Failure {
        #[serde(default)]
        error: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderResponse {
    pub request: RequestId,
    #[serde(flatten)]
    pub outcome: RenderOutcome,
}

impl RenderResponse {
    pub fn success(request: RequestId, options: OptionDocument, image: impl Into<String>) -> Self {
        Self {
            request,
            outcome: RenderOutcome::Success {
                options,
                image: ImageHandle(image.into()),
            },
        }
    }

    pub fn failure(request: RequestId, error: impl Into<String>) -> Self {
        Self {
            request,
            outcome: RenderOutcome::Failure {
                error: Some(error.into()),
            },
        }
    }
}

/// Fire-and-forget submission to the render engine. Results come back through
/// [`EditSession::on_result`](crate::session::EditSession::on_result).
pub trait RenderGateway {
    fn submit(&mut self, request: RenderRequest);
}

/// Gateway that queues requests until the host drains them.
#[derive(Debug, Default)]
pub struct Outbox {
    queue: VecDeque<RenderRequest>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> Vec<RenderRequest> {
        self.queue.drain(..).collect()
    }

    pub fn last(&self) -> Option<&RenderRequest> {
        self.queue.back()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl RenderGateway for Outbox {
    fn submit(&mut self, request: RenderRequest) {
        self.queue.push_back(request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_ids_increase() {
        let a = RequestId::next();
        let b = RequestId::next();
        assert!(b > a);
    }

    #[test]
    fn responses_parse_from_engine_json() {
        let ok: RenderResponse = serde_json::from_value(json!({
            "request": 7,
            "status": "success",
            "options": {"width": 500},
            "image": "plot_7.png"
        }))
        .unwrap();
        assert_eq!(
            ok,
            RenderResponse::success(
                RequestId::from_raw(7),
                OptionDocument::from_value(json!({"width": 500})),
                "plot_7.png"
            )
        );

        let failed: RenderResponse =
            serde_json::from_value(json!({"request": 8, "status": "failure"})).unwrap();
        assert_eq!(failed.outcome, RenderOutcome::Failure { error: None });
    }

    #[test]
    fn outbox_queues_in_order() {
        let mut outbox = Outbox::new();
        for width in [1, 2] {
            outbox.submit(RenderRequest {
                id: RequestId::from_raw(width),
                context_id: 3,
                ppi: 96.0,
                options: OptionDocument::from_value(json!({ "width": width })),
            });
        }
        assert_eq!(outbox.last().map(|r| r.id), Some(RequestId::from_raw(2)));
        let drained = outbox.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].id, RequestId::from_raw(1));
        assert!(outbox.is_empty());
    }
}
