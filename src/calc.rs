use crate::catalog::{Catalog, Category, RespondentGroup, Statement};
use crate::store::ResponseStore;
use serde::Serialize;
use serde_json::Value;

/// Frequency scale bucket, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Bucket {
    #[serde(rename = "S")]
    Always,
    #[serde(rename = "A")]
    Sometimes,
    #[serde(rename = "N")]
    Never,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Always, Bucket::Sometimes, Bucket::Never];

    pub fn label(self) -> &'static str {
        match self {
            Bucket::Always => "Siempre",
            Bucket::Sometimes => "A veces",
            Bucket::Never => "Nunca",
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            Bucket::Always => "S",
            Bucket::Sometimes => "A",
            Bucket::Never => "N",
        }
    }
}

/// Classify a free-text scale answer. Containment rather than equality so that
/// "Casi siempre" and "Casi nunca" land in the right bucket; the order of the
/// checks is the priority.
pub fn classify(answer: &str) -> Option<Bucket> {
    let t = answer.to_lowercase();
    if t.contains("siempre") {
        Some(Bucket::Always)
    } else if t.contains("veces") {
        Some(Bucket::Sometimes)
    } else if t.contains("nunca") {
        Some(Bucket::Never)
    } else {
        None
    }
}

/// Text of a scale answer as stored. A one-element string array is unwrapped;
/// every other non-string shape is malformed.
pub fn scale_text(raw: &Value) -> Option<&str> {
    match raw {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) if items.len() == 1 => items[0].as_str(),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketCounts {
    pub always: usize,
    pub sometimes: usize,
    pub never: usize,
    pub unrecognized: usize,
    pub malformed: usize,
}

impl BucketCounts {
    pub fn add(&mut self, raw: &Value) {
        let Some(text) = scale_text(raw) else {
            tracing::debug!(answer = %raw, "ignoring malformed scale answer");
            self.malformed += 1;
            return;
        };
        match classify(text) {
            Some(Bucket::Always) => self.always += 1,
            Some(Bucket::Sometimes) => self.sometimes += 1,
            Some(Bucket::Never) => self.never += 1,
            None => self.unrecognized += 1,
        }
    }

    pub fn recognized(&self) -> usize {
        self.always + self.sometimes + self.never
    }

    pub fn get(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::Always => self.always,
            Bucket::Sometimes => self.sometimes,
            Bucket::Never => self.never,
        }
    }
}

/// Percentages per bucket. All three are `-1` when there is no data; otherwise
/// they sum to exactly 100 (or are all zero for an empty category average).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrequencyResult {
    #[serde(rename = "S")]
    pub s: i32,
    #[serde(rename = "A")]
    pub a: i32,
    #[serde(rename = "N")]
    pub n: i32,
}

impl FrequencyResult {
    pub const NO_DATA: FrequencyResult = FrequencyResult { s: -1, a: -1, n: -1 };
    pub const ZERO: FrequencyResult = FrequencyResult { s: 0, a: 0, n: 0 };

    pub fn new(s: i32, a: i32, n: i32) -> Self {
        Self { s, a, n }
    }

    pub fn is_no_data(&self) -> bool {
        self.s == -1 || self.a == -1 || self.n == -1
    }

    pub fn is_zero(&self) -> bool {
        self.s == 0 && self.a == 0 && self.n == 0
    }

    pub fn total(&self) -> i32 {
        self.s + self.a + self.n
    }

    pub fn get(&self, bucket: Bucket) -> i32 {
        match bucket {
            Bucket::Always => self.s,
            Bucket::Sometimes => self.a,
            Bucket::Never => self.n,
        }
    }

    fn get_mut(&mut self, bucket: Bucket) -> &mut i32 {
        match bucket {
            Bucket::Always => &mut self.s,
            Bucket::Sometimes => &mut self.a,
            Bucket::Never => &mut self.n,
        }
    }

    pub fn from_counts(counts: &BucketCounts) -> Self {
        let total = counts.recognized();
        if total == 0 {
            return Self::NO_DATA;
        }
        let pct = |b: Bucket| ((counts.get(b) as f64) * 100.0 / (total as f64)).round() as i32;
        Self::new(
            pct(Bucket::Always),
            pct(Bucket::Sometimes),
            pct(Bucket::Never),
        )
        .corrected_to_100()
    }

    /// Push the rounding error into the bucket holding the largest share. Ties
    /// go to the earlier bucket (S, then A, then N).
    pub fn corrected_to_100(mut self) -> Self {
        if self.is_no_data() || self.is_zero() {
            return self;
        }
        let diff = 100 - self.total();
        if diff == 0 {
            return self;
        }
        let mut largest = Bucket::Always;
        for b in Bucket::ALL {
            if self.get(b) > self.get(largest) {
                largest = b;
            }
        }
        *self.get_mut(largest) += diff;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataReason {
    NotApplicable,
    NoResponses,
    NoRecognizedAnswers,
    StoreUnavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    pub result: FrequencyResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_data_reason: Option<NoDataReason>,
    pub counts: BucketCounts,
}

impl Aggregation {
    fn no_data(reason: NoDataReason, counts: BucketCounts) -> Self {
        Self {
            result: FrequencyResult::NO_DATA,
            no_data_reason: Some(reason),
            counts,
        }
    }
}

pub fn aggregate_detailed(
    store: &dyn ResponseStore,
    statement: &Statement,
    group: RespondentGroup,
    school: Option<&str>,
) -> Aggregation {
    let Some(question) = statement.question(group) else {
        return Aggregation::no_data(NoDataReason::NotApplicable, BucketCounts::default());
    };

    let answers = match store.answers(group, question, school) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(
                statement = %statement.id,
                group = group.key(),
                error = %e,
                "answer lookup failed; reporting no data"
            );
            return Aggregation::no_data(NoDataReason::StoreUnavailable, BucketCounts::default());
        }
    };
    if answers.is_empty() {
        return Aggregation::no_data(NoDataReason::NoResponses, BucketCounts::default());
    }

    let mut counts = BucketCounts::default();
    for raw in &answers {
        counts.add(raw);
    }
    if counts.recognized() == 0 {
        return Aggregation::no_data(NoDataReason::NoRecognizedAnswers, counts);
    }

    Aggregation {
        result: FrequencyResult::from_counts(&counts),
        no_data_reason: None,
        counts,
    }
}

pub fn aggregate(
    store: &dyn ResponseStore,
    statement: &Statement,
    group: RespondentGroup,
    school: Option<&str>,
) -> FrequencyResult {
    aggregate_detailed(store, statement, group, school).result
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridItem {
    pub statement_id: String,
    pub category_id: String,
    pub text: String,
    /// Indexed by `RespondentGroup::index`.
    pub results: [FrequencyResult; 3],
    #[serde(skip)]
    pub applicable: [bool; 3],
}

impl GridItem {
    pub fn result(&self, group: RespondentGroup) -> FrequencyResult {
        self.results[group.index()]
    }

    pub fn applies_to(&self, group: RespondentGroup) -> bool {
        self.applicable[group.index()]
    }
}

pub fn grid_item(
    store: &dyn ResponseStore,
    category: &Category,
    statement: &Statement,
    school: Option<&str>,
) -> GridItem {
    let mut results = [FrequencyResult::NO_DATA; 3];
    let mut applicable = [false; 3];
    for g in RespondentGroup::ALL {
        results[g.index()] = aggregate(store, statement, g, school);
        applicable[g.index()] = statement.applies_to(g);
    }
    GridItem {
        statement_id: statement.id.clone(),
        category_id: category.id.clone(),
        text: statement.text.clone(),
        results,
        applicable,
    }
}

pub fn build_grid(
    store: &dyn ResponseStore,
    catalog: &Catalog,
    school: Option<&str>,
) -> Vec<GridItem> {
    catalog
        .statements()
        .map(|(c, s)| grid_item(store, c, s, school))
        .collect()
}

/// Average of the non-sentinel results of `items` for one group. Nothing to
/// average yields all zeros so the summary still draws the row.
pub fn average_category(items: &[GridItem], group: RespondentGroup) -> FrequencyResult {
    let surviving: Vec<FrequencyResult> = items
        .iter()
        .map(|i| i.result(group))
        .filter(|r| !r.is_no_data())
        .collect();
    if surviving.is_empty() {
        return FrequencyResult::ZERO;
    }
    let n = surviving.len() as i32;
    let avg = |f: fn(&FrequencyResult) -> i32| -> i32 {
        let sum: i32 = surviving.iter().map(f).sum();
        (sum + n / 2) / n
    };
    FrequencyResult::new(avg(|r| r.s), avg(|r| r.a), avg(|r| r.n)).corrected_to_100()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAverage {
    pub category_id: String,
    pub name: String,
    pub results: [FrequencyResult; 3],
}

pub fn category_averages(catalog: &Catalog, grid: &[GridItem]) -> Vec<CategoryAverage> {
    catalog
        .categories
        .iter()
        .map(|c| {
            let items: Vec<GridItem> = grid
                .iter()
                .filter(|i| i.category_id == c.id)
                .cloned()
                .collect();
            let mut results = [FrequencyResult::ZERO; 3];
            for g in RespondentGroup::ALL {
                results[g.index()] = average_category(&items, g);
            }
            CategoryAverage {
                category_id: c.id.clone(),
                name: c.name.clone(),
                results,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct CalcError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CalcError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

pub fn statement_by_id<'a>(catalog: &'a Catalog, id: &str) -> Result<&'a Statement, CalcError> {
    catalog.find_statement(id).ok_or_else(|| CalcError {
        details: Some(serde_json::json!({ "statementId": id })),
        ..CalcError::new("not_found", "statement not found")
    })
}
