use super::{db_conn, optional_school, required_group, required_str};
use crate::calc;
use crate::catalog::{self, RespondentGroup};
use crate::db;
use crate::ipc::error::{calc_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::report::{self, settings::ReportSettings};
use crate::store::{self, SqliteSource};
use serde_json::json;
use std::path::PathBuf;

fn load_settings(state: &AppState, req: &Request) -> Result<ReportSettings, serde_json::Value> {
    let conn = db_conn(state, req)?;
    ReportSettings::load(conn)
        .map_err(|e| err(&req.id, "db_query_failed", format!("{e:#}"), None))
}

fn builtin_catalog(req: &Request) -> Result<&'static catalog::Catalog, serde_json::Value> {
    catalog::builtin().map_err(|e| err(&req.id, "catalog_invalid", e.to_string(), None))
}

fn handle_calc_statement_frequencies(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let catalog = match builtin_catalog(req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let statement_id = match required_str(req, "statementId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let group = match required_group(req) {
        Ok(g) => g,
        Err(e) => return e,
    };
    let school = match optional_school(req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let statement = match calc::statement_by_id(catalog, &statement_id) {
        Ok(s) => s,
        Err(e) => return calc_err(&req.id, e),
    };

    let agg = calc::aggregate_detailed(conn, statement, group, school.as_deref());
    ok(
        &req.id,
        json!({
            "statementId": statement.id,
            "group": group,
            "school": school,
            "result": agg.result,
            "noDataReason": agg.no_data_reason,
            "counts": agg.counts,
        }),
    )
}

fn handle_reports_grid_model(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let catalog = match builtin_catalog(req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let school = match optional_school(req) {
        Ok(s) => s,
        Err(e) => return e,
    };

    let grid = calc::build_grid(conn, catalog, school.as_deref());
    let averages = calc::category_averages(catalog, &grid);
    let rows: Vec<serde_json::Value> = grid
        .iter()
        .map(|item| {
            let applicable: serde_json::Map<String, serde_json::Value> = RespondentGroup::ALL
                .iter()
                .map(|g| (g.key().to_string(), json!(item.applies_to(*g))))
                .collect();
            let mut v = json!(item);
            v["applicable"] = json!(applicable);
            v
        })
        .collect();
    ok(
        &req.id,
        json!({
            "school": school,
            "groups": RespondentGroup::ALL,
            "items": rows,
            "categoryAverages": averages,
        }),
    )
}

fn handle_report_generate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let settings = match load_settings(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let out_path = match required_str(req, "outPath") {
        Ok(p) => PathBuf::from(p),
        Err(e) => return e,
    };
    let school = match optional_school(req) {
        Ok(s) => s,
        Err(e) => return e,
    };

    if let Some(name) = school.as_deref() {
        let in_catalog = catalog::builtin()
            .map(|c| c.institutions.iter().any(|i| i == name))
            .unwrap_or(false);
        if !in_catalog && !store::has_institution(conn, name).unwrap_or(false) {
            tracing::warn!(school = name, "school has no responses and is not in the catalog");
        }
    }

    let generated = report::generate_report(conn, school.as_deref(), &settings);
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            return err(&req.id, "io_failed", e.to_string(), None);
        }
    }
    if let Err(e) = std::fs::write(&out_path, &generated.bytes) {
        return err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "outPath": out_path.to_string_lossy() })),
        );
    }
    ok(
        &req.id,
        json!({
            "outPath": out_path.to_string_lossy(),
            "pageCount": generated.page_count,
            "byteLength": generated.bytes.len(),
        }),
    )
}

fn handle_report_generate_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let settings = match load_settings(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let Some(workspace) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let catalog = match builtin_catalog(req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let out_dir = match required_str(req, "outDir") {
        Ok(p) => PathBuf::from(p),
        Err(e) => return e,
    };
    if let Err(e) = std::fs::create_dir_all(&out_dir) {
        return err(&req.id, "io_failed", e.to_string(), None);
    }

    let source = SqliteSource {
        db_path: db::db_path(workspace),
    };
    let reports = match report::generate_all_reports(catalog, &source, &settings) {
        Ok(r) => r,
        Err(e) => return err(&req.id, "io_failed", format!("{e:#}"), None),
    };

    let mut files = Vec::new();
    for (school, r) in &reports {
        let path = out_dir.join(format!("{}.pdf", catalog::slug(school)));
        let mut entry = json!({
            "school": school,
            "outPath": path.to_string_lossy(),
            "pageCount": r.page_count,
        });
        if let Err(e) = std::fs::write(&path, &r.bytes) {
            tracing::warn!(school = %school, error = %e, "could not write report file");
            entry["error"] = json!({ "code": "io_failed", "message": e.to_string() });
        }
        files.push(entry);
    }
    ok(&req.id, json!({ "files": files }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "calc.statementFrequencies" => Some(handle_calc_statement_frequencies(state, req)),
        "reports.gridModel" => Some(handle_reports_grid_model(state, req)),
        "report.generate" => Some(handle_report_generate(state, req)),
        "report.generateAll" => Some(handle_report_generate_all(state, req)),
        _ => None,
    }
}
