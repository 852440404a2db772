//! Reply and notification envelopes written to stdout, one JSON object per line.

use dvdprofilerd::error::ConvertError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({ "id": id, "ok": true, "result": result })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({ "code": code, "message": message.into() });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({ "id": id, "ok": false, "error": error })
}

/// Failure reply carrying the error's stable code and its details, if any.
pub fn convert_err(id: &str, e: &ConvertError) -> serde_json::Value {
    err(id, e.code(), e.to_string(), e.details())
}

/// Notification for an in-flight request. It has no `ok` key, which is how
/// clients tell it apart from the final reply.
pub fn event(id: &str, name: &str, fields: serde_json::Value) -> serde_json::Value {
    let mut value = json!({ "id": id, "event": name });
    if let (Some(out), serde_json::Value::Object(fields)) = (value.as_object_mut(), fields) {
        out.extend(fields);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_lines_have_no_ok_key() {
        let line = event("7", "progress.range", json!({ "max": 3 }));
        assert_eq!(line, json!({ "id": "7", "event": "progress.range", "max": 3 }));
        assert!(line.get("ok").is_none());
    }

    #[test]
    fn convert_errors_keep_code_and_details() {
        let e = ConvertError::SchemaVersion {
            expected: "4.0.0.0".into(),
            found: "3.0.0.0".into(),
        };
        let reply = convert_err("1", &e);
        assert_eq!(reply["ok"], json!(false));
        assert_eq!(reply["error"]["code"], json!("schema_version_mismatch"));
        assert_eq!(reply["error"]["details"]["found"], json!("3.0.0.0"));
    }

    #[test]
    fn errors_without_details_omit_the_key() {
        let reply = err("2", "bad_params", "missing sourcePath", None);
        assert!(reply["error"].get("details").is_none());
        assert_eq!(ok("2", json!(null))["ok"], json!(true));
    }
}
