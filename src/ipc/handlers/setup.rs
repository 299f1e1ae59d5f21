use super::db_conn;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::report::settings::ReportSettings;
use serde_json::json;

#[derive(Clone, Copy)]
enum SetupSection {
    Report,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "report" => Some(Self::Report),
            _ => None,
        }
    }
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let report = match ReportSettings::load(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    ok(&req.id, json!({ "report": report.to_value() }))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    match section {
        SetupSection::Report => {
            let mut current = match ReportSettings::load(conn) {
                Ok(v) => v,
                Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
            };
            if let Err(msg) = current.merge_patch(patch_obj) {
                return err(&req.id, "bad_params", msg, None);
            }
            if let Err(e) = current.save(conn) {
                return err(&req.id, "db_update_failed", e.to_string(), None);
            }
            ok(&req.id, json!({ "report": current.to_value() }))
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
