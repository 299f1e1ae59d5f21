use super::{page_title, PageBuilder, BODY_SIZE};
use crate::render::composer::{Composer, Cursor};
use crate::render::document::TextStyle;
use crate::report::ReportContext;
use anyhow::anyhow;

/// One of the fixed explanatory pages, taken from the catalog by position.
pub struct NarrativePage {
    pub index: usize,
}

impl PageBuilder for NarrativePage {
    fn name(&self) -> &'static str {
        "presentación"
    }

    fn build(
        &self,
        ctx: &ReportContext<'_>,
        composer: &mut Composer,
        cursor: &mut Cursor,
    ) -> anyhow::Result<()> {
        let page = ctx
            .catalog
            .narrative
            .get(self.index)
            .ok_or_else(|| anyhow!("el catálogo no define la página narrativa {}", self.index + 1))?;

        *cursor = page_title(composer, *cursor, &page.title);
        let style = TextStyle::regular(BODY_SIZE);
        let width = composer.geometry().content_width();
        for paragraph in &page.paragraphs {
            *cursor = composer.paragraph(*cursor, paragraph, width, style);
            *cursor = cursor.down(style.size * 0.8);
        }
        Ok(())
    }
}
