pub mod core;
pub mod reports;
pub mod responses;
pub mod setup;

use crate::catalog::RespondentGroup;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;

pub(crate) fn db_conn<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub(crate) fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// `params.school`; absent, null or blank means every institution.
pub(crate) fn optional_school(req: &Request) -> Result<Option<String>, serde_json::Value> {
    match req.params.get("school") {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => match v.as_str() {
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => Ok(Some(s.trim().to_string())),
            None => Err(err(&req.id, "bad_params", "school must be a string", None)),
        },
    }
}

pub(crate) fn required_group(req: &Request) -> Result<RespondentGroup, serde_json::Value> {
    let raw = required_str(req, "group")?;
    RespondentGroup::parse(&raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            "group must be one of: docentes, estudiantes, acudientes",
            Some(serde_json::json!({ "group": raw })),
        )
    })
}
