use super::{page_title, PageBuilder};
use crate::calc::{Bucket, GridItem};
use crate::catalog::RespondentGroup;
use crate::render::composer::{Composer, Cursor, PageGeometry};
use crate::render::document::{ShapeStyle, TextStyle};
use crate::render::geometry::{Align, Color, Point, Rect, NO_DATA_LABEL};
use crate::render::text::{truncate_to_width, wrap};
use crate::report::ReportContext;

const VALUE_COL: f32 = 30.0;
const HEADER_ROW: f32 = 14.0;
const CATEGORY_ROW: f32 = 16.0;
const MIN_ROW: f32 = 16.0;
const CELL_PAD: f32 = 4.0;
pub const NOT_APPLICABLE_LABEL: &str = "No aplica";

/// Column positions shared by the header and every row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    left: f32,
    width: f32,
    text_width: f32,
    /// Tallest row that still fits under a repeated header on a fresh page.
    max_row: f32,
}

impl Columns {
    fn new(geometry: &PageGeometry) -> Self {
        let width = geometry.content_width();
        Self {
            left: geometry.left(),
            width,
            text_width: width - VALUE_COL * 9.0,
            max_row: (geometry.bottom() - geometry.top() - HEADER_ROW * 2.0).max(MIN_ROW),
        }
    }

    fn group_left(&self, group: RespondentGroup) -> f32 {
        self.left + self.text_width + group.index() as f32 * VALUE_COL * 3.0
    }

    fn value_center(&self, group: RespondentGroup, bucket_idx: usize) -> f32 {
        self.group_left(group) + bucket_idx as f32 * VALUE_COL + VALUE_COL / 2.0
    }
}

fn text_style() -> TextStyle {
    TextStyle::regular(8.0)
}

/// Statement text wrapped inside its column. Text that would make the row
/// taller than a page is cut with an ellipsis on the last line kept.
fn row_lines(item: &GridItem, cols: &Columns) -> Vec<String> {
    let style = text_style();
    let max_width = cols.text_width - 2.0 * CELL_PAD;
    let mut lines = wrap(&item.text, style.font, style.size, max_width);
    let max_lines = (((cols.max_row - 2.0 * CELL_PAD) / style.line_height()).floor() as usize).max(1);
    if lines.len() > max_lines {
        let rest = lines.split_off(max_lines - 1).join(" ");
        lines.push(truncate_to_width(&rest, style.font, style.size, max_width));
    }
    lines
}

/// Height of the row for `item`.
fn row_height(item: &GridItem, cols: &Columns) -> f32 {
    let lines = row_lines(item, cols).len();
    (lines as f32 * text_style().line_height() + 2.0 * CELL_PAD).max(MIN_ROW)
}

fn draw_header(composer: &mut Composer, cursor: Cursor, cols: &Columns) -> Cursor {
    let height = HEADER_ROW * 2.0;
    composer.rect(
        Rect::new(cols.left, cursor.y, cols.width, height),
        ShapeStyle::fill(Color::ACCENT),
    );
    let style = TextStyle::bold(8.0).with_color(Color::WHITE);
    composer.text_centered_v(
        cols.left + CELL_PAD,
        cursor.y + height / 2.0,
        "Afirmación",
        Align::Left,
        style,
    );
    for g in RespondentGroup::ALL {
        composer.text_centered_v(
            cols.group_left(g) + VALUE_COL * 1.5,
            cursor.y + HEADER_ROW / 2.0,
            g.label(),
            Align::Center,
            style,
        );
        for (i, b) in Bucket::ALL.iter().enumerate() {
            composer.text_centered_v(
                cols.value_center(g, i),
                cursor.y + HEADER_ROW * 1.5,
                b.short(),
                Align::Center,
                style,
            );
        }
    }
    cursor.down(height)
}

/// Break the page before a block of `height` that would not fit, repeating
/// the column header on the new page.
fn ensure_rows(composer: &mut Composer, cursor: Cursor, height: f32, cols: &Columns) -> Cursor {
    if composer.fits(cursor, height) {
        return cursor;
    }
    let before = composer.page_count();
    let cursor = composer.ensure_space(cursor, height + HEADER_ROW * 2.0);
    if composer.page_count() != before {
        return draw_header(composer, cursor, cols);
    }
    cursor
}

fn draw_category_row(composer: &mut Composer, cursor: Cursor, cols: &Columns, name: &str) -> Cursor {
    composer.rect(
        Rect::new(cols.left, cursor.y, cols.width, CATEGORY_ROW),
        ShapeStyle::fill(Color::BAND),
    );
    composer.text_centered_v(
        cols.left + CELL_PAD,
        cursor.y + CATEGORY_ROW / 2.0,
        name,
        Align::Left,
        TextStyle::bold(9.0),
    );
    cursor.down(CATEGORY_ROW)
}

fn draw_item_row(composer: &mut Composer, cursor: Cursor, cols: &Columns, item: &GridItem) -> Cursor {
    let style = text_style();
    let height = row_height(item, cols);
    for (i, line) in row_lines(item, cols).into_iter().enumerate() {
        composer.text(
            Point::new(
                cols.left + CELL_PAD,
                cursor.y + CELL_PAD + style.size + i as f32 * style.line_height(),
            ),
            line,
            Align::Left,
            style,
        );
    }

    let mid = cursor.y + height / 2.0;
    let muted = style.with_color(Color::MUTED);
    for g in RespondentGroup::ALL {
        let span_center = cols.group_left(g) + VALUE_COL * 1.5;
        let result = item.result(g);
        if !item.applies_to(g) {
            composer.text_centered_v(span_center, mid, NOT_APPLICABLE_LABEL, Align::Center, muted);
        } else if result.is_no_data() {
            composer.text_centered_v(span_center, mid, NO_DATA_LABEL, Align::Center, muted);
        } else {
            for (i, b) in Bucket::ALL.iter().enumerate() {
                composer.text_centered_v(
                    cols.value_center(g, i),
                    mid,
                    format!("{}%", result.get(*b)),
                    Align::Center,
                    style,
                );
            }
        }
    }

    let bottom = cursor.y + height;
    composer.line(
        Point::new(cols.left, bottom),
        Point::new(cols.left + cols.width, bottom),
        ShapeStyle::stroke(Color::RULE, 0.5),
    );
    cursor.down(height)
}

/// Every statement with its per-group distribution.
pub struct GridPage;

impl PageBuilder for GridPage {
    fn name(&self) -> &'static str {
        "detalle"
    }

    fn build(
        &self,
        ctx: &ReportContext<'_>,
        composer: &mut Composer,
        cursor: &mut Cursor,
    ) -> anyhow::Result<()> {
        let cols = Columns::new(composer.geometry());
        *cursor = page_title(composer, *cursor, "Detalle por afirmación");
        *cursor = composer.ensure_space(*cursor, HEADER_ROW * 2.0 + CATEGORY_ROW + MIN_ROW);
        *cursor = draw_header(composer, *cursor, &cols);

        for category in &ctx.catalog.categories {
            let items: Vec<&GridItem> = ctx
                .grid
                .iter()
                .filter(|i| i.category_id == category.id)
                .collect();
            let first = items.first().map(|i| row_height(i, &cols)).unwrap_or(0.0);
            *cursor = ensure_rows(composer, *cursor, CATEGORY_ROW + first, &cols);
            *cursor = draw_category_row(composer, *cursor, &cols, &category.name);
            for item in items {
                *cursor = ensure_rows(composer, *cursor, row_height(item, &cols), &cols);
                *cursor = draw_item_row(composer, *cursor, &cols, item);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::FrequencyResult;
    use crate::catalog;
    use crate::render::document::DrawOp;
    use crate::report::pages::run_builder;
    use crate::report::settings::ReportSettings;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn render(store: &MemoryStore, geometry: PageGeometry) -> crate::render::document::Report {
        let catalog = catalog::builtin().unwrap();
        let settings = ReportSettings::default();
        let ctx = ReportContext::new(catalog, store, Some("Colegio San José"), &settings);
        let mut composer = Composer::new(geometry);
        run_builder(&GridPage, &ctx, &mut composer);
        composer.finish(0)
    }

    #[test]
    fn marks_not_applicable_and_no_data_cells() {
        let catalog = catalog::builtin().unwrap();
        let com1 = catalog.find_statement("com-1").unwrap();
        let q = com1.question(RespondentGroup::Teachers).unwrap();
        let mut store = MemoryStore::new();
        for answer in ["Siempre", "Siempre", "A veces", "Nunca"] {
            store.push(RespondentGroup::Teachers, "Colegio San José", json!({ q: answer }));
        }

        let report = render(&store, PageGeometry::new(612.0, 792.0, 50.0));
        let texts: Vec<&str> = report.pages.iter().flat_map(|p| p.texts()).collect();
        assert!(texts.contains(&"50%"));
        assert!(texts.contains(&"25%"));
        assert!(texts.contains(&NOT_APPLICABLE_LABEL));
        assert!(texts.contains(&NO_DATA_LABEL));
        for c in &catalog.categories {
            assert!(texts.contains(&c.name.as_str()));
        }
    }

    fn long_item(words: usize) -> GridItem {
        GridItem {
            statement_id: "x-1".to_string(),
            category_id: "x".to_string(),
            text: vec!["comunicación"; words].join(" "),
            results: [FrequencyResult::new(60, 30, 10); 3],
            applicable: [true; 3],
        }
    }

    #[test]
    fn oversized_row_is_cut_to_fit_under_the_header() {
        let geometry = PageGeometry::new(612.0, 200.0, 40.0);
        let cols = Columns::new(&geometry);
        let item = long_item(400);
        assert!(row_height(&item, &cols) <= cols.max_row);
        let lines = row_lines(&item, &cols);
        assert!(lines.last().unwrap().ends_with('…'));

        let mut composer = Composer::new(geometry);
        let cursor = composer.begin_page();
        let cursor = ensure_rows(&mut composer, cursor.down(60.0), row_height(&item, &cols), &cols);
        assert_eq!(composer.page_count(), 2);
        let cursor = draw_item_row(&mut composer, cursor, &cols, &item);
        assert!(cursor.y <= geometry.bottom() + 1e-3);
    }

    #[test]
    fn short_rows_keep_their_full_text() {
        let geometry = PageGeometry::new(612.0, 792.0, 50.0);
        let cols = Columns::new(&geometry);
        let item = long_item(3);
        assert_eq!(row_lines(&item, &cols), vec![item.text.clone()]);
        let single = text_style().line_height() + 2.0 * CELL_PAD;
        assert_eq!(row_height(&item, &cols), single.max(MIN_ROW));
    }

    #[test]
    fn header_repeats_and_rows_stay_whole_across_pages() {
        // A short page leaves room for only a few rows.
        let geometry = PageGeometry::new(612.0, 300.0, 50.0);
        let report = render(&MemoryStore::new(), geometry);
        assert!(report.page_count() > 1);
        for page in &report.pages {
            assert!(page.contains_text("Afirmación"));
            for op in &page.ops {
                if let DrawOp::Line { from, .. } = op {
                    assert!(from.y <= geometry.bottom() + 1e-3);
                }
            }
        }
    }
}
