mod test_support;

use serde_json::json;
use test_support::{error_code, request, request_ok, spawn_sidecar, temp_dir};

fn select(
    stdin: &mut std::process::ChildStdin,
    reader: &mut std::io::BufReader<std::process::ChildStdout>,
    workspace: &std::path::Path,
) {
    let _ = request_ok(
        stdin,
        reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
}

#[test]
fn report_without_school_is_cover_narrative_and_info() {
    let workspace = temp_dir("surveyd-report-all");
    let out = workspace.join("out").join("consolidado.pdf");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select(&mut stdin, &mut reader, &workspace);

    let res = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "report.generate",
        json!({ "outPath": out.to_string_lossy() }),
    );
    assert_eq!(res["pageCount"], json!(4));
    let bytes = std::fs::read(&out).expect("read pdf");
    assert!(bytes.starts_with(b"%PDF-"));
    assert_eq!(res["byteLength"], json!(bytes.len()));
}

#[test]
fn school_report_adds_demographics_summary_and_grid() {
    let workspace = temp_dir("surveyd-report-school");
    let out = workspace.join("san-jose.pdf");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select(&mut stdin, &mut reader, &workspace);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "responses.import",
        json!({
            "group": "estudiantes",
            "records": [
                { "institution": "Colegio San José", "answers": { "Género": "Femenino", "Grado": "Once" } },
                { "institution": "Colegio San José", "answers": { "Género": ["Masculino"], "Grado": "Décimo" } }
            ]
        }),
    );
    let res = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "report.generate",
        json!({ "school": "Colegio San José", "outPath": out.to_string_lossy() }),
    );
    let pages = res["pageCount"].as_u64().expect("pageCount");
    assert!(pages >= 6, "expected per-school sections, got {} pages", pages);
    assert!(std::fs::read(&out).expect("read pdf").starts_with(b"%PDF-"));
}

#[test]
fn generate_all_writes_one_file_per_institution() {
    let workspace = temp_dir("surveyd-report-batch");
    let out_dir = workspace.join("informes");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select(&mut stdin, &mut reader, &workspace);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "setup.update",
        json!({ "section": "report", "patch": { "workerCount": 2 } }),
    );
    let res = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "report.generateAll",
        json!({ "outDir": out_dir.to_string_lossy() }),
    );
    let catalog = request_ok(&mut stdin, &mut reader, "3", "catalog.get", json!({}));
    let institutions = catalog["institutions"].as_array().expect("institutions");
    let files = res["files"].as_array().expect("files");
    assert_eq!(files.len(), institutions.len());
    assert!(out_dir.join("colegio-san-jose.pdf").is_file());
    for f in files {
        assert!(f.get("error").is_none(), "write failed: {}", f);
        let path = f["outPath"].as_str().expect("outPath");
        assert!(std::fs::read(path).expect("read pdf").starts_with(b"%PDF-"));
        let name = std::path::Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .expect("file name");
        assert!(name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.'));
    }
}

#[test]
fn report_requires_a_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "report.generate",
        json!({ "outPath": "/tmp/never.pdf" }),
    );
    assert_eq!(error_code(&resp), Some("no_workspace"));
}
