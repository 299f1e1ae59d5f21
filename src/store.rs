use crate::catalog::RespondentGroup;
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One survey submission as exported by the form front-ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub institution: String,
    #[serde(default)]
    pub answers: Map<String, Value>,
}

/// Read-only view over the collected survey answers.
pub trait ResponseStore {
    /// Raw answer values for `question` from every record of `group` that
    /// contains the question, optionally restricted to one institution.
    fn answers(
        &self,
        group: RespondentGroup,
        question: &str,
        school: Option<&str>,
    ) -> anyhow::Result<Vec<Value>>;

    fn respondent_count(&self, group: RespondentGroup, school: Option<&str>)
        -> anyhow::Result<usize>;
}

impl<T: ResponseStore + ?Sized> ResponseStore for &T {
    fn answers(
        &self,
        group: RespondentGroup,
        question: &str,
        school: Option<&str>,
    ) -> anyhow::Result<Vec<Value>> {
        (**self).answers(group, question, school)
    }

    fn respondent_count(
        &self,
        group: RespondentGroup,
        school: Option<&str>,
    ) -> anyhow::Result<usize> {
        (**self).respondent_count(group, school)
    }
}

/// Opens an independent store handle per report worker.
pub trait StoreSource: Sync {
    fn open(&self) -> anyhow::Result<Box<dyn ResponseStore + '_>>;
}

fn school_param(school: Option<&str>) -> Option<String> {
    school.map(|s| s.trim().to_string())
}

impl ResponseStore for Connection {
    fn answers(
        &self,
        group: RespondentGroup,
        question: &str,
        school: Option<&str>,
    ) -> anyhow::Result<Vec<Value>> {
        let mut stmt = self.prepare_cached(
            "SELECT answers_json
             FROM responses
             WHERE respondent_group = ?1 AND (?2 IS NULL OR institution = ?2)
             ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map((group.key(), school_param(school)), |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Vec::new();
        for raw in rows {
            let answers: Map<String, Value> =
                serde_json::from_str(&raw).context("stored answers_json is not an object")?;
            if let Some(v) = answers.get(question) {
                out.push(v.clone());
            }
        }
        Ok(out)
    }

    fn respondent_count(
        &self,
        group: RespondentGroup,
        school: Option<&str>,
    ) -> anyhow::Result<usize> {
        let n: i64 = self.query_row(
            "SELECT COUNT(*)
             FROM responses
             WHERE respondent_group = ?1 AND (?2 IS NULL OR institution = ?2)",
            (group.key(), school_param(school)),
            |r| r.get(0),
        )?;
        Ok(n.max(0) as usize)
    }
}

/// Workspace database opened fresh for every batch worker.
pub struct SqliteSource {
    pub db_path: PathBuf,
}

impl StoreSource for SqliteSource {
    fn open(&self) -> anyhow::Result<Box<dyn ResponseStore + '_>> {
        let conn = Connection::open(&self.db_path).with_context(|| {
            format!("failed to open database {}", self.db_path.to_string_lossy())
        })?;
        Ok(Box::new(conn))
    }
}

/// In-memory store for unit tests of the aggregation and report pipeline.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<(RespondentGroup, ResponseRecord)>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, group: RespondentGroup, institution: &str, answers: Value) {
        let answers = answers.as_object().cloned().unwrap_or_default();
        self.records.push((
            group,
            ResponseRecord {
                institution: institution.trim().to_string(),
                answers,
            },
        ));
    }

    fn matching(
        &self,
        group: RespondentGroup,
        school: Option<&str>,
    ) -> impl Iterator<Item = &ResponseRecord> {
        let school = school_param(school);
        self.records
            .iter()
            .filter(move |(g, r)| {
                *g == group
                    && school
                        .as_deref()
                        .map(|s| r.institution == s)
                        .unwrap_or(true)
            })
            .map(|(_, r)| r)
    }
}

#[cfg(test)]
impl ResponseStore for MemoryStore {
    fn answers(
        &self,
        group: RespondentGroup,
        question: &str,
        school: Option<&str>,
    ) -> anyhow::Result<Vec<Value>> {
        Ok(self
            .matching(group, school)
            .filter_map(|r| r.answers.get(question).cloned())
            .collect())
    }

    fn respondent_count(
        &self,
        group: RespondentGroup,
        school: Option<&str>,
    ) -> anyhow::Result<usize> {
        Ok(self.matching(group, school).count())
    }
}

#[cfg(test)]
impl StoreSource for MemoryStore {
    fn open(&self) -> anyhow::Result<Box<dyn ResponseStore + '_>> {
        Ok(Box::new(self))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub inserted: usize,
    pub rejected: usize,
}

/// Insert raw records for one group. Records without an institution are
/// rejected rather than stored under an empty name.
pub fn insert_records(
    conn: &mut Connection,
    group: RespondentGroup,
    records: &[Value],
) -> anyhow::Result<ImportSummary> {
    let tx = conn.transaction()?;
    let mut summary = ImportSummary::default();
    let now = chrono::Utc::now().to_rfc3339();
    {
        let mut stmt = tx.prepare(
            "INSERT INTO responses(id, respondent_group, institution, answers_json, imported_at)
             VALUES(?, ?, ?, ?, ?)",
        )?;
        for raw in records {
            let record: ResponseRecord = match serde_json::from_value(raw.clone()) {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!(error = %e, "rejecting malformed response record");
                    summary.rejected += 1;
                    continue;
                }
            };
            let institution = record.institution.trim();
            if institution.is_empty() {
                summary.rejected += 1;
                continue;
            }
            let answers_json = serde_json::to_string(&record.answers)?;
            stmt.execute((
                uuid::Uuid::new_v4().to_string(),
                group.key(),
                institution,
                answers_json,
                &now,
            ))?;
            summary.inserted += 1;
        }
    }
    tx.commit()?;
    Ok(summary)
}

pub fn delete_records(conn: &Connection, group: Option<RespondentGroup>) -> anyhow::Result<usize> {
    let n = match group {
        Some(g) => conn.execute("DELETE FROM responses WHERE respondent_group = ?", [g.key()])?,
        None => conn.execute("DELETE FROM responses", [])?,
    };
    Ok(n)
}

/// Respondent counts keyed by institution, then by group key.
pub fn counts_by_institution(
    conn: &Connection,
) -> anyhow::Result<BTreeMap<String, BTreeMap<String, i64>>> {
    let mut stmt = conn.prepare(
        "SELECT institution, respondent_group, COUNT(*)
         FROM responses
         GROUP BY institution, respondent_group
         ORDER BY institution",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, i64>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    let mut out: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
    for (institution, group, n) in rows {
        out.entry(institution).or_default().insert(group, n);
    }
    Ok(out)
}

pub fn has_institution(conn: &Connection, institution: &str) -> anyhow::Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM responses WHERE institution = ? LIMIT 1",
            [institution.trim()],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        crate::db::create_schema(&conn).expect("schema");
        conn
    }

    #[test]
    fn sqlite_store_filters_by_group_school_and_question() {
        let mut conn = memory_conn();
        let summary = insert_records(
            &mut conn,
            RespondentGroup::Students,
            &[
                json!({ "institution": "A", "answers": { "q1": "Siempre" } }),
                json!({ "institution": " B ", "answers": { "q1": "Nunca", "q2": "A veces" } }),
                json!({ "institution": "", "answers": { "q1": "Siempre" } }),
                json!({ "answers": { "q1": "Siempre" } }),
            ],
        )
        .expect("insert");
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.rejected, 2);

        let all = conn
            .answers(RespondentGroup::Students, "q1", None)
            .expect("answers");
        assert_eq!(all, vec![json!("Siempre"), json!("Nunca")]);

        let b_only = conn
            .answers(RespondentGroup::Students, "q1", Some("B"))
            .expect("answers");
        assert_eq!(b_only, vec![json!("Nunca")]);

        let teachers = conn
            .answers(RespondentGroup::Teachers, "q1", None)
            .expect("answers");
        assert!(teachers.is_empty());

        assert_eq!(
            conn.respondent_count(RespondentGroup::Students, Some("A"))
                .expect("count"),
            1
        );
        assert!(has_institution(&conn, "B").expect("lookup"));

        let counts = counts_by_institution(&conn).expect("counts");
        assert_eq!(counts["A"]["estudiantes"], 1);
    }

    #[test]
    fn memory_store_skips_records_without_the_question() {
        let mut store = MemoryStore::new();
        store.push(RespondentGroup::Guardians, "A", json!({ "q": "Siempre" }));
        store.push(RespondentGroup::Guardians, "A", json!({ "other": "Nunca" }));
        let answers = store
            .answers(RespondentGroup::Guardians, "q", None)
            .expect("answers");
        assert_eq!(answers.len(), 1);
        assert_eq!(
            store
                .respondent_count(RespondentGroup::Guardians, None)
                .expect("count"),
            2
        );
    }
}
