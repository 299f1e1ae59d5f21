use crate::db;
use crate::render::document::PageSize;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const SETTINGS_KEY: &str = "setup.report";

/// Report appearance and batch knobs stored in the workspace settings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSettings {
    pub title: String,
    pub subtitle: String,
    pub logo_path: Option<String>,
    pub page_size: PageSize,
    pub margin_pt: f32,
    pub worker_count: usize,
    pub show_generated_at: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            title: "Informe de percepción de la comunidad educativa".to_string(),
            subtitle: "Encuesta a docentes, estudiantes y acudientes".to_string(),
            logo_path: None,
            page_size: PageSize::Letter,
            margin_pt: 50.0,
            worker_count: 4,
            show_generated_at: true,
        }
    }
}

fn parse_bool(v: &Value, key: &str) -> Result<bool, String> {
    v.as_bool().ok_or_else(|| format!("{} must be boolean", key))
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_f32_range(v: &Value, key: &str, min: f32, max: f32) -> Result<f32, String> {
    let n = v
        .as_f64()
        .ok_or_else(|| format!("{} must be a number", key))? as f32;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.chars().count() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

impl ReportSettings {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }

    /// Apply a partial update field by field. Nothing is changed when any
    /// field is rejected.
    pub fn merge_patch(&mut self, patch: &Map<String, Value>) -> Result<(), String> {
        let mut next = self.clone();
        for (k, v) in patch {
            match k.as_str() {
                "title" => {
                    let s = parse_string_max(v, k, 120)?;
                    if s.is_empty() {
                        return Err("title must not be empty".into());
                    }
                    next.title = s;
                }
                "subtitle" => {
                    next.subtitle = parse_string_max(v, k, 200)?;
                }
                "logoPath" => {
                    next.logo_path = if v.is_null() {
                        None
                    } else {
                        Some(parse_string_max(v, k, 1024)?).filter(|s| !s.is_empty())
                    };
                }
                "pageSize" => {
                    let s = parse_string_max(v, k, 8)?.to_ascii_lowercase();
                    next.page_size = match s.as_str() {
                        "letter" => PageSize::Letter,
                        "a4" => PageSize::A4,
                        _ => return Err("pageSize must be one of: letter, a4".into()),
                    };
                }
                "marginPt" => {
                    next.margin_pt = parse_f32_range(v, k, 18.0, 108.0)?;
                }
                "workerCount" => {
                    next.worker_count = parse_i64_range(v, k, 1, 16)? as usize;
                }
                "showGeneratedAt" => {
                    next.show_generated_at = parse_bool(v, k)?;
                }
                _ => return Err(format!("unknown report field: {}", k)),
            }
        }
        *self = next;
        Ok(())
    }

    /// Defaults overlaid with whatever valid fields were saved.
    pub fn load(conn: &rusqlite::Connection) -> anyhow::Result<Self> {
        let mut current = Self::default();
        if let Some(saved) = db::settings_get_json(conn, SETTINGS_KEY)? {
            if let Some(saved_obj) = saved.as_object() {
                for (k, v) in saved_obj {
                    let mut single = Map::new();
                    single.insert(k.clone(), v.clone());
                    if let Err(msg) = current.merge_patch(&single) {
                        tracing::debug!(field = %k, error = %msg, "ignoring saved report setting");
                    }
                }
            }
        }
        Ok(current)
    }

    pub fn save(&self, conn: &rusqlite::Connection) -> anyhow::Result<()> {
        db::settings_set_json(conn, SETTINGS_KEY, &self.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn patch_applies_valid_fields() {
        let mut s = ReportSettings::default();
        s.merge_patch(&patch(json!({
            "title": "  Informe 2024 ",
            "pageSize": "A4",
            "workerCount": 2,
            "logoPath": ""
        })))
        .unwrap();
        assert_eq!(s.title, "Informe 2024");
        assert_eq!(s.page_size, PageSize::A4);
        assert_eq!(s.worker_count, 2);
        assert_eq!(s.logo_path, None);
    }

    #[test]
    fn rejected_patch_leaves_settings_untouched() {
        let mut s = ReportSettings::default();
        let err = s
            .merge_patch(&patch(json!({ "title": "Nuevo", "workerCount": 0 })))
            .unwrap_err();
        assert!(err.contains("workerCount"));
        assert_eq!(s, ReportSettings::default());

        let err = s.merge_patch(&patch(json!({ "colour": "red" }))).unwrap_err();
        assert!(err.contains("unknown report field"));
    }

    #[test]
    fn load_skips_invalid_saved_fields() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        db::create_schema(&conn).unwrap();
        db::settings_set_json(
            &conn,
            SETTINGS_KEY,
            &json!({ "marginPt": 72, "pageSize": "legal" }),
        )
        .unwrap();
        let s = ReportSettings::load(&conn).unwrap();
        assert_eq!(s.margin_pt, 72.0);
        assert_eq!(s.page_size, PageSize::Letter);
    }
}
