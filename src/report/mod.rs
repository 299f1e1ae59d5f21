pub mod pages;
pub mod settings;

use crate::calc::{self, CategoryAverage, GridItem};
use crate::catalog::{self, Catalog};
use crate::render::composer::{Composer, PageGeometry};
use crate::render::document::Report;
use crate::render::pdf::render_pdf;
use crate::store::{ResponseStore, StoreSource};
use anyhow::Context;
use chrono::{DateTime, Local};
use pages::cover::CoverPage;
use pages::demographics::DemographicsPage;
use pages::grid::GridPage;
use pages::info::{error_page, InfoPage};
use pages::narrative::NarrativePage;
use pages::summary::SummaryPage;
use pages::{run_builder, PageBuilder};
use settings::ReportSettings;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Everything a page builder reads. Aggregation happens once, up front, so
/// the summary and the grid show the same numbers.
pub struct ReportContext<'a> {
    pub catalog: &'a Catalog,
    pub store: &'a dyn ResponseStore,
    pub school: Option<&'a str>,
    pub settings: &'a ReportSettings,
    pub generated_at: DateTime<Local>,
    pub grid: Vec<GridItem>,
    pub averages: Vec<CategoryAverage>,
}

impl<'a> ReportContext<'a> {
    pub fn new(
        catalog: &'a Catalog,
        store: &'a dyn ResponseStore,
        school: Option<&'a str>,
        settings: &'a ReportSettings,
    ) -> Self {
        let school = school.map(str::trim).filter(|s| !s.is_empty());
        let (grid, averages) = match school {
            Some(s) => {
                let grid = calc::build_grid(store, catalog, Some(s));
                let averages = calc::category_averages(catalog, &grid);
                (grid, averages)
            }
            None => (Vec::new(), Vec::new()),
        };
        Self {
            catalog,
            store,
            school,
            settings,
            generated_at: Local::now(),
            grid,
            averages,
        }
    }
}

fn geometry(settings: &ReportSettings) -> PageGeometry {
    let (w, h) = settings.page_size.dimensions();
    PageGeometry::new(w, h, settings.margin_pt)
}

/// Section order: cover and narrative always, then either the per-school
/// sections or the informational page.
fn builders(has_school: bool) -> Vec<Box<dyn PageBuilder>> {
    let mut out: Vec<Box<dyn PageBuilder>> = vec![
        Box::new(CoverPage),
        Box::new(NarrativePage { index: 0 }),
        Box::new(NarrativePage { index: 1 }),
    ];
    if has_school {
        out.push(Box::new(DemographicsPage));
        out.push(Box::new(SummaryPage));
        out.push(Box::new(GridPage));
    } else {
        out.push(Box::new(InfoPage));
    }
    out
}

pub fn build_report_with(
    catalog: &Catalog,
    store: &dyn ResponseStore,
    school: Option<&str>,
    settings: &ReportSettings,
) -> Report {
    let ctx = ReportContext::new(catalog, store, school, settings);
    let mut composer = Composer::new(geometry(settings));
    for builder in builders(ctx.school.is_some()) {
        run_builder(builder.as_ref(), &ctx, &mut composer);
    }
    composer.finish(1)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return s.to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "error interno".to_string()
}

pub fn error_report(settings: &ReportSettings, message: &str) -> Report {
    let mut composer = Composer::new(geometry(settings));
    error_page(&mut composer, message);
    composer.finish(usize::MAX)
}

fn try_build(
    store: &dyn ResponseStore,
    school: Option<&str>,
    settings: &ReportSettings,
) -> anyhow::Result<Report> {
    let catalog = catalog::builtin()?;
    catch_unwind(AssertUnwindSafe(|| {
        build_report_with(catalog, store, school, settings)
    }))
    .map_err(|payload| anyhow::anyhow!("{}", panic_message(payload.as_ref())))
}

/// Build the report for `school` (or all institutions). Never fails: a
/// pipeline failure yields a one-page error document.
pub fn build_report(
    store: &dyn ResponseStore,
    school: Option<&str>,
    settings: &ReportSettings,
) -> Report {
    match try_build(store, school, settings) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(school = ?school, error = %format!("{e:#}"), "report pipeline failed");
            error_report(settings, &format!("{e:#}"))
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub school: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

impl GeneratedReport {
    fn from_report(school: &str, report: &Report) -> Self {
        Self {
            school: school.to_string(),
            page_count: report.page_count(),
            bytes: render_pdf(report),
        }
    }
}

/// Build and serialize one report. An empty `school` in the result means
/// the all-institutions report.
pub fn generate_report(
    store: &dyn ResponseStore,
    school: Option<&str>,
    settings: &ReportSettings,
) -> GeneratedReport {
    let report = build_report(store, school, settings);
    GeneratedReport::from_report(school.unwrap_or_default(), &report)
}

fn generate_one(source: &dyn StoreSource, school: &str, settings: &ReportSettings) -> GeneratedReport {
    let generated = match source.open() {
        Ok(store) => generate_report(store.as_ref(), Some(school), settings),
        Err(e) => {
            tracing::error!(school, error = %format!("{e:#}"), "could not open store for worker");
            GeneratedReport::from_report(school, &error_report(settings, &format!("{e:#}")))
        }
    };
    tracing::info!(school, pages = generated.page_count, "report generated");
    generated
}

/// One report per catalog institution, built on a bounded worker pool where
/// each worker opens its own store handle.
pub fn generate_all_reports(
    catalog: &Catalog,
    source: &dyn StoreSource,
    settings: &ReportSettings,
) -> anyhow::Result<BTreeMap<String, GeneratedReport>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.worker_count.max(1))
        .build()
        .context("failed to start report workers")?;

    let reports: Vec<GeneratedReport> = pool.install(|| {
        use rayon::prelude::*;
        catalog
            .institutions
            .par_iter()
            .map(|school| generate_one(source, school, settings))
            .collect()
    });
    Ok(reports
        .into_iter()
        .map(|r| (r.school.clone(), r))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RespondentGroup;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn seeded_store() -> MemoryStore {
        let catalog = catalog::builtin().unwrap();
        let com1 = catalog.find_statement("com-1").unwrap();
        let q = com1.question(RespondentGroup::Teachers).unwrap();
        let mut store = MemoryStore::new();
        let mut answers = vec!["Siempre"; 6];
        answers.extend(["A veces"; 3]);
        answers.push("Nunca");
        for a in answers {
            store.push(RespondentGroup::Teachers, "Colegio San José", json!({ q: a }));
        }
        store
    }

    #[test]
    fn without_school_report_has_four_pages() {
        let store = seeded_store();
        let report = build_report(&store, None, &ReportSettings::default());
        assert_eq!(report.page_count(), 4);
        assert!(!report.pages[0].contains_text("Página"));
        assert!(report.pages[3].contains_text("Página 4 de 4"));
        assert!(report.pages[3].contains_text("Instituciones participantes"));
    }

    #[test]
    fn blank_school_counts_as_no_filter() {
        let report = build_report(&MemoryStore::new(), Some("   "), &ReportSettings::default());
        assert_eq!(report.page_count(), 4);
    }

    #[test]
    fn school_report_includes_every_section() {
        let store = seeded_store();
        let report = build_report(&store, Some("Colegio San José"), &ReportSettings::default());
        assert!(report.page_count() >= 6);
        let texts: Vec<&str> = report.pages.iter().flat_map(|p| p.texts()).collect();
        for needle in [
            "Caracterización de los encuestados",
            "Resumen por categoría",
            "Detalle por afirmación",
            "60%",
            "30%",
            "10%",
            "Sin datos",
            "No aplica",
        ] {
            assert!(texts.iter().any(|t| t.contains(needle)), "missing {needle}");
        }
        assert!(!texts.iter().any(|t| t.contains("No fue posible generar")));
    }

    #[test]
    fn error_report_is_a_single_unnumbered_page() {
        let report = error_report(&ReportSettings::default(), "catálogo inválido");
        assert_eq!(report.page_count(), 1);
        assert!(report.pages[0].contains_text("Error al generar el informe"));
        assert!(report.pages[0].contains_text("catálogo inválido"));
        assert!(!report.pages[0].contains_text("Página"));
    }

    #[test]
    fn generate_all_produces_one_pdf_per_institution() {
        let catalog = catalog::builtin().unwrap();
        let store = seeded_store();
        let settings = ReportSettings {
            worker_count: 2,
            ..ReportSettings::default()
        };
        let all = generate_all_reports(catalog, &store, &settings).unwrap();
        assert_eq!(all.len(), catalog.institutions.len());
        for (school, r) in &all {
            assert!(catalog.institutions.contains(school));
            assert!(r.bytes.starts_with(b"%PDF-"));
            assert!(r.page_count >= 6);
        }
    }

    #[test]
    fn generate_report_returns_pdf_bytes() {
        let generated = generate_report(&seeded_store(), None, &ReportSettings::default());
        assert_eq!(generated.page_count, 4);
        assert!(generated.school.is_empty());
        assert!(generated.bytes.starts_with(b"%PDF-"));
        assert!(String::from_utf8_lossy(&generated.bytes).contains("/Count 4"));
    }
}
