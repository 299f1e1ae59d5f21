mod test_support;

use serde_json::json;
use test_support::{error_code, request, spawn_sidecar, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("surveyd-router-smoke");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["ok"], json!(true));
    assert!(health["result"]["workspacePath"].is_null());

    // Workspace-bound methods refuse to run before a workspace is selected.
    let early = request(&mut stdin, &mut reader, "2", "responses.summary", json!({}));
    assert_eq!(error_code(&early), Some("no_workspace"));

    let selected = request(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected["ok"], json!(true));
    assert!(workspace.join("survey.sqlite3").is_file());

    let calls = [
        ("catalog.get", json!({})),
        ("responses.summary", json!({})),
        (
            "responses.import",
            json!({ "group": "docentes", "records": [] }),
        ),
        (
            "calc.statementFrequencies",
            json!({ "statementId": "com-1", "group": "docentes" }),
        ),
        ("reports.gridModel", json!({})),
        ("setup.get", json!({})),
        ("responses.clear", json!({})),
    ];
    for (i, (method, params)) in calls.iter().enumerate() {
        let id = format!("c{}", i);
        let resp = request(&mut stdin, &mut reader, &id, method, params.clone());
        assert_eq!(resp["ok"], json!(true), "{} failed: {}", method, resp);
    }

    let unknown = request(&mut stdin, &mut reader, "9", "classes.list", json!({}));
    assert_eq!(error_code(&unknown), Some("not_implemented"));
}

#[test]
fn malformed_params_are_bad_params() {
    let workspace = temp_dir("surveyd-bad-params");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let cases = [
        ("responses.import", json!({ "group": "padres", "records": [] })),
        ("responses.import", json!({ "group": "docentes" })),
        ("calc.statementFrequencies", json!({ "group": "docentes" })),
        (
            "calc.statementFrequencies",
            json!({ "statementId": "com-1", "group": "docentes", "school": 5 }),
        ),
        ("report.generate", json!({})),
    ];
    for (i, (method, params)) in cases.iter().enumerate() {
        let resp = request(&mut stdin, &mut reader, &format!("b{}", i), method, params.clone());
        assert_eq!(error_code(&resp), Some("bad_params"), "{}: {}", method, resp);
    }

    let missing = request(
        &mut stdin,
        &mut reader,
        "nf",
        "calc.statementFrequencies",
        json!({ "statementId": "zzz-9", "group": "docentes" }),
    );
    assert_eq!(error_code(&missing), Some("not_found"));
}
