pub mod collection;
pub mod core;

use crate::ipc::error::err;
use serde_json::json;
use std::path::PathBuf;

pub(crate) struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub(crate) fn get_required_path(
    params: &serde_json::Value,
    key: &str,
) -> Result<PathBuf, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: format!("missing params.{key}"),
            details: Some(json!({ "param": key })),
        })
}
