use super::{page_title, section_heading, PageBuilder};
use crate::catalog::{ChartKind, DemographicQuestion, RespondentGroup};
use crate::render::charts::{draw_bar_chart, draw_pie};
use crate::render::composer::{Composer, Cursor};
use crate::render::geometry::{
    bar_chart_height, legend_rows, BarOptions, ChartDatum, Color, LegendLayout, Rect,
    LEGEND_ROW_HEIGHT,
};
use crate::report::ReportContext;
use serde_json::Value;
use std::collections::BTreeMap;

const PIE_HEIGHT: f32 = 170.0;
const CHART_GAP: f32 = 18.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoiceCounts {
    pub counts: BTreeMap<String, usize>,
    pub rejected: usize,
}

fn choice_text(v: &Value) -> Option<&str> {
    v.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Tally answer choices. Single-choice answers are a string or an array
/// holding exactly one string. Multi-select answers must be arrays and count
/// every element.
pub fn count_choices(answers: &[Value], multiple: bool) -> ChoiceCounts {
    let mut out = ChoiceCounts::default();
    for raw in answers {
        let picked: Vec<&str> = match (raw, multiple) {
            (Value::Array(items), true) => items.iter().filter_map(choice_text).collect(),
            (_, true) => {
                tracing::debug!(answer = %raw, "multi-select answer is not an array");
                out.rejected += 1;
                continue;
            }
            (Value::String(_), false) => choice_text(raw).into_iter().collect(),
            (Value::Array(items), false) if items.len() == 1 => {
                choice_text(&items[0]).into_iter().collect()
            }
            _ => {
                tracing::debug!(answer = %raw, "malformed single-choice answer");
                out.rejected += 1;
                continue;
            }
        };
        for choice in picked {
            *out.counts.entry(choice.to_string()).or_insert(0) += 1;
        }
    }
    out
}

fn chart_data(counts: &ChoiceCounts) -> Vec<ChartDatum> {
    counts
        .counts
        .iter()
        .enumerate()
        .map(|(i, (label, n))| ChartDatum::new(label.clone(), *n as f64, Color::series(i)))
        .collect()
}

/// Pie box height including room for a legend placed below the plot.
fn pie_box_height(legend: LegendLayout, count: usize) -> f32 {
    match legend {
        LegendLayout::RightColumn => PIE_HEIGHT,
        _ => PIE_HEIGHT + legend_rows(legend, count) as f32 * LEGEND_ROW_HEIGHT + 6.0,
    }
}

pub struct DemographicsPage;

impl DemographicsPage {
    fn load_error(composer: &mut Composer, cursor: Cursor, width: f32, e: &anyhow::Error) -> Cursor {
        tracing::warn!(error = %e, "demographic data unavailable");
        composer.placeholder(
            cursor,
            width,
            "Error al cargar datos",
            &format!("No fue posible consultar las respuestas: {e:#}"),
        )
    }

    fn respondents_chart(&self, ctx: &ReportContext<'_>, composer: &mut Composer, cursor: Cursor) -> Cursor {
        let width = composer.geometry().content_width();
        let mut data = Vec::new();
        for g in RespondentGroup::ALL {
            match ctx.store.respondent_count(g, ctx.school) {
                Ok(n) => data.push(ChartDatum::new(
                    format!("{} ({})", g.label(), n),
                    n as f64,
                    Color::series(g.index()),
                )),
                Err(e) => {
                    let cursor = section_heading(composer, cursor, "Encuestados por grupo", 40.0);
                    return Self::load_error(composer, cursor, width, &e);
                }
            }
        }
        let cursor = section_heading(composer, cursor, "Encuestados por grupo", PIE_HEIGHT);
        draw_pie(
            composer,
            Rect::new(cursor.x, cursor.y, width, PIE_HEIGHT),
            &data,
            LegendLayout::RightColumn,
        );
        cursor.down(PIE_HEIGHT + CHART_GAP)
    }

    fn question_chart(
        &self,
        ctx: &ReportContext<'_>,
        composer: &mut Composer,
        cursor: Cursor,
        q: &DemographicQuestion,
    ) -> Cursor {
        let width = composer.geometry().content_width();
        let answers = match ctx.store.answers(q.group, &q.question, ctx.school) {
            Ok(v) => v,
            Err(e) => {
                let cursor = section_heading(composer, cursor, &q.title, 40.0);
                return Self::load_error(composer, cursor, width, &e);
            }
        };
        let counts = count_choices(&answers, q.multiple);
        if counts.rejected > 0 {
            tracing::debug!(question = %q.id, rejected = counts.rejected, "skipped malformed answers");
        }
        let data = chart_data(&counts);

        match q.chart {
            ChartKind::Pie => {
                let legend = q.legend.unwrap_or(LegendLayout::RightColumn);
                let height = pie_box_height(legend, data.len());
                let cursor = section_heading(composer, cursor, &q.title, height);
                draw_pie(composer, Rect::new(cursor.x, cursor.y, width, height), &data, legend);
                cursor.down(height + CHART_GAP)
            }
            ChartKind::Bar => {
                let opts = BarOptions::default();
                let height = bar_chart_height(data.len(), &opts);
                let cursor = section_heading(composer, cursor, &q.title, height);
                draw_bar_chart(composer, Rect::new(cursor.x, cursor.y, width, height), &data, &opts);
                cursor.down(height + CHART_GAP)
            }
        }
    }
}

impl PageBuilder for DemographicsPage {
    fn name(&self) -> &'static str {
        "caracterización"
    }

    fn build(
        &self,
        ctx: &ReportContext<'_>,
        composer: &mut Composer,
        cursor: &mut Cursor,
    ) -> anyhow::Result<()> {
        *cursor = page_title(composer, *cursor, "Caracterización de los encuestados");
        *cursor = self.respondents_chart(ctx, composer, *cursor);
        for q in &ctx.catalog.demographics {
            *cursor = self.question_chart(ctx, composer, *cursor, q);
        }
        Ok(())
    }
}
