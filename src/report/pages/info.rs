use super::{page_title, section_heading, PageBuilder, BODY_SIZE};
use crate::render::composer::{Composer, Cursor};
use crate::render::document::TextStyle;
use crate::render::geometry::{Align, Color, Point};
use crate::report::ReportContext;

/// Replaces the per-school sections when no institution was selected.
pub struct InfoPage;

impl PageBuilder for InfoPage {
    fn name(&self) -> &'static str {
        "información"
    }

    fn build(
        &self,
        ctx: &ReportContext<'_>,
        composer: &mut Composer,
        cursor: &mut Cursor,
    ) -> anyhow::Result<()> {
        let style = TextStyle::regular(BODY_SIZE);
        let width = composer.geometry().content_width();

        *cursor = page_title(composer, *cursor, "Informe consolidado");
        *cursor = composer.paragraph(
            *cursor,
            "La caracterización de los encuestados, el resumen por categoría y la tabla de \
             detalle se generan para una institución a la vez. Seleccione una institución \
             para obtener el informe completo.",
            width,
            style,
        );
        *cursor = cursor.down(12.0);

        *cursor = section_heading(composer, *cursor, "Instituciones participantes", style.line_height());
        for name in &ctx.catalog.institutions {
            *cursor = composer.ensure_space(*cursor, style.line_height());
            composer.text(
                Point::new(cursor.x + 8.0, cursor.y + style.size),
                format!("• {}", name),
                Align::Left,
                style,
            );
            *cursor = cursor.down(style.line_height());
        }
        Ok(())
    }
}

/// Single page standing in for a report whose pipeline failed.
pub fn error_page(composer: &mut Composer, message: &str) {
    let cursor = composer.begin_page();
    let cursor = page_title(composer, cursor, "Error al generar el informe");
    let width = composer.geometry().content_width();
    composer.paragraph(
        cursor,
        message,
        width,
        TextStyle::regular(BODY_SIZE).with_color(Color::ERROR),
    );
    composer.end_page();
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
    fn lists_every_catalog_institution() {
        let catalog = catalog::builtin().unwrap();
        let store = MemoryStore::new();
        let settings = ReportSettings::default();
        let ctx = ReportContext::new(catalog, &store, None, &settings);
        let mut composer = Composer::new(PageGeometry::new(612.0, 792.0, 50.0));
        run_builder(&InfoPage, &ctx, &mut composer);
        let report = composer.finish(0);
        for name in &catalog.institutions {
            assert!(report.pages[0].contains_text(name));
        }
    }
}
