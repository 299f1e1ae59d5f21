use crate::calc::{Bucket, FrequencyResult};
use crate::render::composer::Composer;
use crate::render::document::{DrawOp, ShapeStyle, TextStyle};
use crate::render::geometry::{
    bar_layout, legend_layout, pie_layout, split_for_legend, stacked_bar_layout, Align,
    BarOptions, ChartDatum, Color, LegendLayout, PieLayout, Point, Rect, StackedBar, TextAnchor,
};
use crate::render::text::truncate_to_width;

fn anchor(composer: &mut Composer, label: &TextAnchor, style: TextStyle) {
    composer.text_centered_v(label.at.x, label.at.y, label.text.clone(), label.align, style);
}

pub fn draw_legend(composer: &mut Composer, data: &[ChartDatum], layout: LegendLayout, area: Rect) {
    let style = TextStyle::regular(8.0);
    for item in legend_layout(data.len(), layout, area) {
        let d = &data[item.index];
        composer.rect(item.swatch, ShapeStyle::fill(d.color));
        let text = truncate_to_width(&d.label, style.font, style.size, item.max_text_width);
        composer.text_centered_v(item.text_at.x, item.text_at.y, text, Align::Left, style);
    }
}

/// Pie in `bbox` with the legend placed per `legend`.
pub fn draw_pie(composer: &mut Composer, bbox: Rect, data: &[ChartDatum], legend: LegendLayout) {
    let (plot, legend_area) = split_for_legend(bbox, legend, data.len());
    let radius = (plot.w.min(plot.h) / 2.0 - 4.0).max(0.0);
    match pie_layout(data, plot.center(), radius) {
        PieLayout::NoData(label) => {
            composer.push(DrawOp::Rect {
                rect: Rect::new(
                    plot.center().x - radius,
                    plot.center().y - radius,
                    radius * 2.0,
                    radius * 2.0,
                ),
                style: ShapeStyle::stroke(Color::NEUTRAL, 0.8),
            });
            anchor(composer, &label, TextStyle::regular(9.0).with_color(Color::MUTED));
        }
        PieLayout::Segments(segments) => {
            for seg in &segments {
                composer.push(DrawOp::Path {
                    segs: seg.path.clone(),
                    style: ShapeStyle::fill_and_stroke(data[seg.index].color, Color::WHITE, 0.8),
                });
            }
            let label_style = TextStyle::bold(8.0).with_color(Color::WHITE);
            for label in segments.iter().filter_map(|s| s.label.as_ref()) {
                anchor(composer, label, label_style);
            }
        }
    }
    draw_legend(composer, data, legend, legend_area);
}

pub fn draw_bar_chart(composer: &mut Composer, bbox: Rect, data: &[ChartDatum], opts: &BarOptions) {
    let layout = bar_layout(data, bbox, opts);
    if layout.bars.is_empty() {
        composer.text_centered_v(
            bbox.center().x,
            bbox.center().y,
            crate::render::geometry::NO_DATA_LABEL,
            Align::Center,
            TextStyle::regular(9.0).with_color(Color::MUTED),
        );
        return;
    }
    let label_style = TextStyle::regular(opts.font_size);
    let value_style = TextStyle::bold(opts.font_size);
    let label_room = layout.plot.x - bbox.x - 8.0;
    composer.line(
        Point::new(layout.plot.x, bbox.y),
        Point::new(layout.plot.x, bbox.bottom()),
        ShapeStyle::stroke(Color::RULE, 0.5),
    );
    for bar in &layout.bars {
        if bar.bar.w > 0.0 {
            composer.rect(bar.bar, ShapeStyle::fill(data[bar.index].color));
        }
        let label = TextAnchor {
            text: truncate_to_width(&bar.label.text, label_style.font, label_style.size, label_room),
            ..bar.label.clone()
        };
        anchor(composer, &label, label_style);
        anchor(composer, &bar.value, value_style);
    }
}

pub fn bucket_legend_data() -> Vec<ChartDatum> {
    Bucket::ALL
        .iter()
        .map(|b| ChartDatum::new(b.label(), 1.0, Color::for_bucket(*b)))
        .collect()
}

pub fn draw_stacked_bar(composer: &mut Composer, bbox: Rect, result: &FrequencyResult) {
    let font_size = 7.0;
    match stacked_bar_layout(result, bbox, font_size) {
        StackedBar::NoData { rect, label } => {
            composer.rect(rect, ShapeStyle::fill_and_stroke(Color::BAND, Color::NEUTRAL, 0.5));
            anchor(composer, &label, TextStyle::regular(font_size).with_color(Color::MUTED));
        }
        StackedBar::Segments(segments) => {
            for seg in &segments {
                composer.rect(seg.rect, ShapeStyle::fill(Color::for_bucket(seg.bucket)));
            }
            let style = TextStyle::bold(font_size).with_color(Color::WHITE);
            for label in segments.iter().filter_map(|s| s.label.as_ref()) {
                anchor(composer, label, style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::composer::PageGeometry;

    #[test]
    fn empty_pie_draws_placeholder_and_legend() {
        let mut c = Composer::new(PageGeometry::new(612.0, 792.0, 50.0));
        c.begin_page();
        let data = vec![
            ChartDatum::new("Docentes", 0.0, Color::series(0)),
            ChartDatum::new("Estudiantes", 0.0, Color::series(1)),
        ];
        draw_pie(&mut c, Rect::new(50.0, 50.0, 400.0, 160.0), &data, LegendLayout::RightColumn);
        let report = c.finish(0);
        let page = &report.pages[0];
        assert!(page.contains_text("Sin datos"));
        assert!(page.contains_text("Docentes"));
        assert!(!page.ops.iter().any(|op| matches!(op, DrawOp::Path { .. })));
    }

    #[test]
    fn stacked_zero_draws_no_zero_width_segments() {
        let mut c = Composer::new(PageGeometry::new(612.0, 792.0, 50.0));
        c.begin_page();
        draw_stacked_bar(&mut c, Rect::new(50.0, 50.0, 300.0, 14.0), &FrequencyResult::ZERO);
        let report = c.finish(0);
        let rects: Vec<_> = report.pages[0]
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Rect { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect();
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].w, 300.0);
        assert!(report.pages[0].contains_text("Sin datos"));
    }
}
