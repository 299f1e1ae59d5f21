use super::{db_conn, required_group};
use crate::catalog::RespondentGroup;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;

fn handle_responses_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let group = match required_group(req) {
        Ok(g) => g,
        Err(e) => return e,
    };
    let Some(records) = req.params.get("records").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "records must be an array", None);
    };
    let Some(conn) = state.db.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    match store::insert_records(conn, group, records) {
        Ok(summary) => {
            tracing::info!(
                group = group.key(),
                inserted = summary.inserted,
                rejected = summary.rejected,
                "responses imported"
            );
            ok(&req.id, json!(summary))
        }
        Err(e) => err(
            &req.id,
            "db_update_failed",
            format!("{e:#}"),
            Some(json!({ "table": "responses" })),
        ),
    }
}

fn handle_responses_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let group = match req.params.get("group") {
        None | Some(serde_json::Value::Null) => None,
        Some(_) => match required_group(req) {
            Ok(g) => Some(g),
            Err(e) => return e,
        },
    };
    match store::delete_records(conn, group) {
        Ok(deleted) => ok(&req.id, json!({ "deleted": deleted })),
        Err(e) => err(&req.id, "db_update_failed", format!("{e:#}"), None),
    }
}

fn handle_responses_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let by_institution = match store::counts_by_institution(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", format!("{e:#}"), None),
    };

    let mut totals = serde_json::Map::new();
    for g in RespondentGroup::ALL {
        let n: i64 = by_institution
            .values()
            .filter_map(|groups| groups.get(g.key()))
            .sum();
        totals.insert(g.key().to_string(), json!(n));
    }
    let institutions: Vec<serde_json::Value> = by_institution
        .iter()
        .map(|(name, groups)| {
            let mut counts = serde_json::Map::new();
            for g in RespondentGroup::ALL {
                counts.insert(
                    g.key().to_string(),
                    json!(groups.get(g.key()).copied().unwrap_or(0)),
                );
            }
            json!({ "institution": name, "counts": counts })
        })
        .collect();

    ok(
        &req.id,
        json!({ "totals": totals, "institutions": institutions }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "responses.import" => Some(handle_responses_import(state, req)),
        "responses.clear" => Some(handle_responses_clear(state, req)),
        "responses.summary" => Some(handle_responses_summary(state, req)),
        _ => None,
    }
}
