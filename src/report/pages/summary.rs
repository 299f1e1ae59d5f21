use super::{page_title, section_heading, PageBuilder};
use crate::catalog::RespondentGroup;
use crate::render::charts::{bucket_legend_data, draw_legend, draw_stacked_bar};
use crate::render::composer::{Composer, Cursor};
use crate::render::document::TextStyle;
use crate::render::geometry::{Align, LegendLayout, Rect, LEGEND_ROW_HEIGHT};
use crate::report::ReportContext;

const BAR_HEIGHT: f32 = 14.0;
const ROW_GAP: f32 = 6.0;
const GROUP_LABEL_WIDTH: f32 = 90.0;

/// Category averages drawn as one stacked bar per respondent group.
pub struct SummaryPage;

impl PageBuilder for SummaryPage {
    fn name(&self) -> &'static str {
        "resumen"
    }

    fn build(
        &self,
        ctx: &ReportContext<'_>,
        composer: &mut Composer,
        cursor: &mut Cursor,
    ) -> anyhow::Result<()> {
        let width = composer.geometry().content_width();
        *cursor = page_title(composer, *cursor, "Resumen por categoría");

        let legend = bucket_legend_data();
        draw_legend(
            composer,
            &legend,
            LegendLayout::BelowRow,
            Rect::new(cursor.x, cursor.y, width.min(360.0), LEGEND_ROW_HEIGHT),
        );
        *cursor = cursor.down(LEGEND_ROW_HEIGHT + 10.0);

        let label_style = TextStyle::regular(9.0);
        let block = RespondentGroup::ALL.len() as f32 * (BAR_HEIGHT + ROW_GAP);
        for avg in &ctx.averages {
            *cursor = section_heading(composer, *cursor, &avg.name, block);
            for g in RespondentGroup::ALL {
                let row = Rect::new(
                    cursor.x + GROUP_LABEL_WIDTH,
                    cursor.y,
                    width - GROUP_LABEL_WIDTH,
                    BAR_HEIGHT,
                );
                composer.text_centered_v(
                    cursor.x,
                    row.center().y,
                    g.label(),
                    Align::Left,
                    label_style,
                );
                draw_stacked_bar(composer, row, &avg.results[g.index()]);
                *cursor = cursor.down(BAR_HEIGHT + ROW_GAP);
            }
            *cursor = cursor.down(8.0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::render::composer::PageGeometry;
    use crate::report::pages::run_builder;
    use crate::report::settings::ReportSettings;
    use crate::store::MemoryStore;

    #[test]
    fn empty_store_draws_placeholder_bars_for_every_group() {
        let catalog = catalog::builtin().unwrap();
        let store = MemoryStore::new();
        let settings = ReportSettings::default();
        let ctx = ReportContext::new(catalog, &store, Some("Colegio San José"), &settings);
        let mut composer = Composer::new(PageGeometry::new(612.0, 792.0, 50.0));
        run_builder(&SummaryPage, &ctx, &mut composer);
        let report = composer.finish(0);
        let page = &report.pages[0];
        for c in &catalog.categories {
            assert!(page.contains_text(&c.name));
        }
        let no_data = page.texts().filter(|t| *t == "Sin datos").count();
        assert_eq!(no_data, catalog.categories.len() * 3);
        assert!(page.contains_text("Siempre"));
    }
}
