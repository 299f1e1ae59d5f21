use crate::render::geometry::LegendLayout;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RespondentGroup {
    #[serde(rename = "docentes")]
    Teachers,
    #[serde(rename = "estudiantes")]
    Students,
    #[serde(rename = "acudientes")]
    Guardians,
}

impl RespondentGroup {
    pub const ALL: [RespondentGroup; 3] = [
        RespondentGroup::Teachers,
        RespondentGroup::Students,
        RespondentGroup::Guardians,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docentes" | "teachers" => Some(Self::Teachers),
            "estudiantes" | "students" => Some(Self::Students),
            "acudientes" | "guardians" => Some(Self::Guardians),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Teachers => "docentes",
            Self::Students => "estudiantes",
            Self::Guardians => "acudientes",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Teachers => "Docentes",
            Self::Students => "Estudiantes",
            Self::Guardians => "Acudientes",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Teachers => 0,
            Self::Students => 1,
            Self::Guardians => 2,
        }
    }
}

/// Group-specific phrasing of a statement. `None` marks the statement as not
/// applicable for that group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupQuestions {
    #[serde(default)]
    pub docentes: Option<String>,
    #[serde(default)]
    pub estudiantes: Option<String>,
    #[serde(default)]
    pub acudientes: Option<String>,
}

impl GroupQuestions {
    pub fn get(&self, group: RespondentGroup) -> Option<&str> {
        let q = match group {
            RespondentGroup::Teachers => &self.docentes,
            RespondentGroup::Students => &self.estudiantes,
            RespondentGroup::Guardians => &self.acudientes,
        };
        q.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub id: String,
    pub text: String,
    pub questions: GroupQuestions,
}

impl Statement {
    pub fn question(&self, group: RespondentGroup) -> Option<&str> {
        self.questions.get(group)
    }

    pub fn applies_to(&self, group: RespondentGroup) -> bool {
        self.question(group).is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativePage {
    pub title: String,
    pub paragraphs: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pie,
    Bar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemographicQuestion {
    pub id: String,
    pub title: String,
    pub group: RespondentGroup,
    pub question: String,
    pub chart: ChartKind,
    #[serde(default)]
    pub legend: Option<LegendLayout>,
    /// Multi-select questions store an array of choices per respondent.
    #[serde(default)]
    pub multiple: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub institutions: Vec<String>,
    #[serde(default)]
    pub narrative: Vec<NarrativePage>,
    #[serde(default)]
    pub demographics: Vec<DemographicQuestion>,
    pub categories: Vec<Category>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog json is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog has no categories")]
    NoCategories,
    #[error("category {0} has no statements")]
    EmptyCategory(String),
    #[error("duplicate statement id: {0}")]
    DuplicateStatement(String),
    #[error("statement {0} has no question for any respondent group")]
    UnmappedStatement(String),
    #[error("institution {0} is listed twice or shares its file name with another")]
    DuplicateInstitution(String),
}

impl Catalog {
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let mut catalog: Catalog = serde_json::from_str(raw)?;
        catalog.institutions = catalog
            .institutions
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.categories.is_empty() {
            return Err(CatalogError::NoCategories);
        }
        let mut slugs = HashSet::new();
        for name in &self.institutions {
            if !slugs.insert(slug(name)) {
                return Err(CatalogError::DuplicateInstitution(name.clone()));
            }
        }
        let mut seen = HashSet::new();
        for category in &self.categories {
            if category.statements.is_empty() {
                return Err(CatalogError::EmptyCategory(category.name.clone()));
            }
            for st in &category.statements {
                if !seen.insert(st.id.as_str()) {
                    return Err(CatalogError::DuplicateStatement(st.id.clone()));
                }
                if !RespondentGroup::ALL.iter().any(|g| st.applies_to(*g)) {
                    return Err(CatalogError::UnmappedStatement(st.id.clone()));
                }
            }
        }
        Ok(())
    }

    pub fn statements(&self) -> impl Iterator<Item = (&Category, &Statement)> {
        self.categories
            .iter()
            .flat_map(|c| c.statements.iter().map(move |s| (c, s)))
    }

    pub fn find_statement(&self, id: &str) -> Option<&Statement> {
        self.statements().map(|(_, s)| s).find(|s| s.id == id)
    }

    pub fn statement_count(&self) -> usize {
        self.categories.iter().map(|c| c.statements.len()).sum()
    }
}

/// File-system safe, lower-case ASCII name for a school.
pub fn slug(name: &str) -> String {
    let mut out = String::new();
    for c in name.chars() {
        let c = match c {
            'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'a',
            'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
            'ñ' | 'Ñ' => 'n',
            c => c.to_ascii_lowercase(),
        };
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("institucion");
    }
    out
}

static BUILTIN: Lazy<Result<Catalog, String>> =
    Lazy::new(|| Catalog::from_json(include_str!("catalog.json")).map_err(|e| e.to_string()));

/// The question catalog shipped with the binary, parsed once per process.
pub fn builtin() -> anyhow::Result<&'static Catalog> {
    BUILTIN
        .as_ref()
        .map_err(|e| anyhow::anyhow!("built-in catalog is invalid: {}", e))
}
