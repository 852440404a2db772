use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Writes one out-of-band line (a progress notification) ahead of the response.
pub type Notify = Box<dyn FnMut(serde_json::Value)>;

pub struct AppState {
    /// Template written by the last `template.create`, used when a conversion
    /// names none.
    pub template: Option<PathBuf>,
    pub notify: Notify,
}

impl AppState {
    pub fn new(notify: Notify) -> Self {
        Self {
            template: None,
            notify,
        }
    }
}
