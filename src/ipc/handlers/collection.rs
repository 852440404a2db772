use super::{get_required_path, HandlerErr};
use crate::ipc::error::{convert_err, event, ok};
use crate::ipc::types::{AppState, Notify, Request};
use dvdprofilerd::config::ConvertOptions;
use dvdprofilerd::convert;
use dvdprofilerd::progress::Progress;
use dvdprofilerd::sql::Dialect;
use serde_json::json;

fn parse_options(req: &Request) -> Result<ConvertOptions, HandlerErr> {
    if req.params.is_null() {
        return Ok(ConvertOptions::default());
    }
    // Paths and flags that are not options are ignored by serde.
    serde_json::from_value::<ConvertOptions>(req.params.clone()).map_err(|e| HandlerErr {
        code: "bad_params",
        message: format!("invalid options: {e}"),
        details: None,
    })
}

/// Streams progress as notification lines tagged with the request id.
struct StreamProgress<'a> {
    id: &'a str,
    every: usize,
    notify: &'a mut Notify,
}

impl Progress for StreamProgress<'_> {
    fn range(&mut self, max: usize) {
        (self.notify)(event(self.id, "progress.range", json!({ "max": max })));
    }

    fn advance(&mut self, index: usize) {
        if self.every > 0 && index % self.every == 0 {
            (self.notify)(event(self.id, "progress.advance", json!({ "index": index })));
        }
    }

    fn message(&mut self, text: &str) {
        (self.notify)(event(self.id, "progress.message", json!({ "text": text })));
    }
}

fn handle_inspect(req: &Request) -> serde_json::Value {
    let source = match get_required_path(&req.params, "sourcePath") {
        Ok(p) => p,
        Err(e) => return e.response(&req.id),
    };
    let options = match parse_options(req) {
        Ok(o) => o,
        Err(e) => return e.response(&req.id),
    };
    match convert::inspect(&source, &options) {
        Ok(summary) => ok(&req.id, json!(summary)),
        Err(e) => convert_err(&req.id, &e),
    }
}

fn handle_export_sql(req: &Request) -> serde_json::Value {
    let source = match get_required_path(&req.params, "sourcePath") {
        Ok(p) => p,
        Err(e) => return e.response(&req.id),
    };
    let out = match get_required_path(&req.params, "outPath") {
        Ok(p) => p,
        Err(e) => return e.response(&req.id),
    };
    let options = match parse_options(req) {
        Ok(o) => o,
        Err(e) => return e.response(&req.id),
    };
    match convert::export_sql(&source, &out, options.dialect, &options) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "outPath": out.to_string_lossy(),
                "statements": summary.statements,
                "highWaterId": summary.high_water_id,
                "digest": summary.digest,
            }),
        ),
        Err(e) => convert_err(&req.id, &e),
    }
}

fn handle_convert(state: &mut AppState, req: &Request) -> serde_json::Value {
    let source = match get_required_path(&req.params, "sourcePath") {
        Ok(p) => p,
        Err(e) => return e.response(&req.id),
    };
    let target = match get_required_path(&req.params, "targetPath") {
        Ok(p) => p,
        Err(e) => return e.response(&req.id),
    };
    let mut options = match parse_options(req) {
        Ok(o) => o,
        Err(e) => return e.response(&req.id),
    };
    if options.dialect != Dialect::Sqlite {
        return HandlerErr {
            code: "bad_params",
            message: "only the sqlite dialect can be executed".to_string(),
            details: Some(json!({ "dialect": options.dialect })),
        }
        .response(&req.id);
    }
    if options.template_path.is_none() {
        options.template_path = state.template.clone();
    }

    let stream = req
        .params
        .get("progress")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let result = if stream {
        let mut progress = StreamProgress {
            id: &req.id,
            every: options.progress_every,
            notify: &mut state.notify,
        };
        convert::convert(&source, &target, &options, &mut progress)
    } else {
        convert::convert(
            &source,
            &target,
            &options,
            &mut dvdprofilerd::progress::Silent,
        )
    };

    match result {
        Ok(summary) => ok(&req.id, json!(summary)),
        Err(e) => convert_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "collection.inspect" => Some(handle_inspect(req)),
        "collection.exportSql" => Some(handle_export_sql(req)),
        "collection.convert" => Some(handle_convert(state, req)),
        _ => None,
    }
}
