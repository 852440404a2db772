use super::get_required_path;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use dvdprofilerd::db;
use dvdprofilerd::error::SCHEMA_VERSION;
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "schemaVersion": SCHEMA_VERSION,
            "templatePath": state.template.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_template_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match get_required_path(&req.params, "path") {
        Ok(p) => p,
        Err(e) => return e.response(&req.id),
    };

    match db::create_template(&path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "template created");
            state.template = Some(path.clone());
            ok(
                &req.id,
                json!({
                    "templatePath": path.to_string_lossy(),
                    "schemaVersion": SCHEMA_VERSION,
                }),
            )
        }
        Err(e) => err(&req.id, "template_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "template.create" => Some(handle_template_create(state, req)),
        _ => None,
    }
}
