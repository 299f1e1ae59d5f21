pub mod cover;
pub mod demographics;
pub mod grid;
pub mod info;
pub mod narrative;
pub mod summary;

use crate::render::composer::{Composer, Cursor};
use crate::render::document::{ShapeStyle, TextStyle};
use crate::render::geometry::{Align, Color, Point};
use crate::report::ReportContext;

/// One section of the report. A builder starts on a fresh page and moves the
/// cursor as it draws; on error the cursor marks where the failure placeholder
/// goes.
pub trait PageBuilder {
    fn name(&self) -> &'static str;

    fn build(
        &self,
        ctx: &ReportContext<'_>,
        composer: &mut Composer,
        cursor: &mut Cursor,
    ) -> anyhow::Result<()>;
}

/// Run `builder` on a new page and contain its failure to a placeholder box.
pub fn run_builder(builder: &dyn PageBuilder, ctx: &ReportContext<'_>, composer: &mut Composer) {
    let mut cursor = composer.begin_page();
    if let Err(e) = builder.build(ctx, composer, &mut cursor) {
        tracing::warn!(section = builder.name(), error = %e, "section failed; drawing placeholder");
        let width = composer.geometry().content_width();
        composer.placeholder(
            cursor,
            width,
            "No fue posible generar esta sección",
            &format!("{}: {:#}", builder.name(), e),
        );
    }
    composer.end_page();
}

pub const TITLE_SIZE: f32 = 18.0;
pub const HEADING_SIZE: f32 = 12.0;
pub const BODY_SIZE: f32 = 10.0;

/// Page title with a rule underneath.
pub fn page_title(composer: &mut Composer, cursor: Cursor, title: &str) -> Cursor {
    let style = TextStyle::bold(TITLE_SIZE).with_color(Color::ACCENT);
    let width = composer.geometry().content_width();
    let cursor = composer.ensure_space(cursor, style.line_height() + 12.0);
    composer.text(
        Point::new(cursor.x, cursor.y + style.size),
        title,
        Align::Left,
        style,
    );
    let rule_y = cursor.y + style.line_height() + 2.0;
    composer.line(
        Point::new(cursor.x, rule_y),
        Point::new(cursor.x + width, rule_y),
        ShapeStyle::stroke(Color::ACCENT, 1.0),
    );
    cursor.down(style.line_height() + 12.0)
}

/// Section heading kept on the same page as the first `keep_with` points of
/// what follows it.
pub fn section_heading(composer: &mut Composer, cursor: Cursor, text: &str, keep_with: f32) -> Cursor {
    let style = TextStyle::bold(HEADING_SIZE);
    let height = style.line_height() + 4.0;
    let cursor = composer.ensure_space(cursor, height + keep_with);
    composer.text(
        Point::new(cursor.x, cursor.y + style.size),
        text,
        Align::Left,
        style,
    );
    cursor.down(height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::render::composer::PageGeometry;
    use crate::report::settings::ReportSettings;
    use crate::store::MemoryStore;
    use anyhow::anyhow;

    struct Broken;

    impl PageBuilder for Broken {
        fn name(&self) -> &'static str {
            "resumen"
        }

        fn build(
            &self,
            _ctx: &ReportContext<'_>,
            composer: &mut Composer,
            cursor: &mut Cursor,
        ) -> anyhow::Result<()> {
            *cursor = page_title(composer, *cursor, "Resumen por categoría");
            Err(anyhow!("categoría sin afirmaciones"))
        }
    }

    #[test]
    fn failing_builder_leaves_placeholder_below_its_output() {
        let catalog = catalog::builtin().unwrap();
        let store = MemoryStore::new();
        let settings = ReportSettings::default();
        let ctx = ReportContext::new(catalog, &store, Some("Colegio San José"), &settings);
        let mut composer = Composer::new(PageGeometry::new(612.0, 792.0, 50.0));

        run_builder(&Broken, &ctx, &mut composer);

        let report = composer.finish(0);
        assert_eq!(report.page_count(), 1);
        let page = &report.pages[0];
        assert!(page.contains_text("Resumen por categoría"));
        assert!(page.contains_text("No fue posible generar esta sección"));
        assert!(page.contains_text("categoría sin afirmaciones"));
    }
}
