use crate::render::document::{DrawOp, Report, ShapeStyle};
use crate::render::geometry::{Align, Color, PathSeg, Point};
use crate::render::text::{text_width, to_winansi, Font};
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str};

fn rgb(c: Color) -> (f32, f32, f32) {
    (c.r as f32 / 255.0, c.g as f32 / 255.0, c.b as f32 / 255.0)
}

fn image_name(i: usize) -> String {
    format!("Im{}", i + 1)
}

struct Flipper {
    height: f32,
}

impl Flipper {
    fn y(&self, y: f32) -> f32 {
        self.height - y
    }

    fn point(&self, p: Point) -> (f32, f32) {
        (p.x, self.y(p.y))
    }
}

fn apply_shape_style(content: &mut Content, style: &ShapeStyle) {
    if let Some(fill) = style.fill {
        let (r, g, b) = rgb(fill);
        content.set_fill_rgb(r, g, b);
    }
    if let Some(stroke) = style.stroke {
        let (r, g, b) = rgb(stroke);
        content.set_stroke_rgb(r, g, b);
        content.set_line_width(style.line_width);
    }
}

fn paint(content: &mut Content, style: &ShapeStyle) {
    match (style.fill.is_some(), style.stroke.is_some()) {
        (true, true) => {
            content.fill_nonzero_and_stroke();
        }
        (true, false) => {
            content.fill_nonzero();
        }
        (false, true) => {
            content.stroke();
        }
        (false, false) => {
            content.end_path();
        }
    }
}

fn write_op(content: &mut Content, op: &DrawOp, flip: &Flipper) {
    match op {
        DrawOp::Text {
            at,
            text,
            align,
            style,
        } => {
            if text.is_empty() {
                return;
            }
            let width = text_width(text, style.font, style.size);
            let x = match align {
                Align::Left => at.x,
                Align::Center => at.x - width / 2.0,
                Align::Right => at.x - width,
            };
            let (r, g, b) = rgb(style.color);
            let bytes = to_winansi(text);
            content.save_state();
            content.set_fill_rgb(r, g, b);
            content
                .begin_text()
                .set_font(Name(style.font.resource_name().as_bytes()), style.size)
                .next_line(x, flip.y(at.y))
                .show(Str(&bytes))
                .end_text();
            content.restore_state();
        }
        DrawOp::Rect { rect, style } => {
            content.save_state();
            apply_shape_style(content, style);
            content.rect(rect.x, flip.y(rect.bottom()), rect.w, rect.h);
            paint(content, style);
            content.restore_state();
        }
        DrawOp::Line { from, to, style } => {
            content.save_state();
            apply_shape_style(content, style);
            let (x0, y0) = flip.point(*from);
            let (x1, y1) = flip.point(*to);
            content.move_to(x0, y0);
            content.line_to(x1, y1);
            content.stroke();
            content.restore_state();
        }
        DrawOp::Path { segs, style } => {
            content.save_state();
            apply_shape_style(content, style);
            for seg in segs {
                match seg {
                    PathSeg::MoveTo(p) => {
                        let (x, y) = flip.point(*p);
                        content.move_to(x, y);
                    }
                    PathSeg::LineTo(p) => {
                        let (x, y) = flip.point(*p);
                        content.line_to(x, y);
                    }
                    PathSeg::CubicTo(c1, c2, p) => {
                        let (x1, y1) = flip.point(*c1);
                        let (x2, y2) = flip.point(*c2);
                        let (x3, y3) = flip.point(*p);
                        content.cubic_to(x1, y1, x2, y2, x3, y3);
                    }
                    PathSeg::Close => {
                        content.close_path();
                    }
                }
            }
            paint(content, style);
            content.restore_state();
        }
        DrawOp::Image { rect, image } => {
            let name = image_name(*image);
            content.save_state();
            content.transform([rect.w, 0.0, 0.0, rect.h, rect.x, flip.y(rect.bottom())]);
            content.x_object(Name(name.as_bytes()));
            content.restore_state();
        }
    }
}

/// Serialize `report` as a PDF document using the base-14 Helvetica fonts.
pub fn render_pdf(report: &Report) -> Vec<u8> {
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();

    let font_refs: Vec<(Font, Ref)> = Font::ALL.iter().map(|f| (*f, alloc())).collect();
    for (font, id) in &font_refs {
        pdf.type1_font(*id)
            .base_font(Name(font.base_font().as_bytes()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }

    let image_refs: Vec<Ref> = report.images.iter().map(|_| alloc()).collect();
    for (img, id) in report.images.iter().zip(&image_refs) {
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&img.rgb, 6);
        let mut xobj = pdf.image_xobject(*id, &compressed);
        xobj.filter(Filter::FlateDecode);
        xobj.width(img.width as i32);
        xobj.height(img.height as i32);
        xobj.color_space().device_rgb();
        xobj.bits_per_component(8);
    }

    let n = report.pages.len();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    let flip = Flipper {
        height: report.height,
    };
    for (i, page) in report.pages.iter().enumerate() {
        let mut content = Content::new();
        for op in &page.ops {
            write_op(&mut content, op, &flip);
        }
        let raw = content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed)
            .filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);

    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(Rect::new(0.0, 0.0, report.width, report.height))
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        {
            let mut fonts = resources.fonts();
            for (font, id) in &font_refs {
                fonts.pair(Name(font.resource_name().as_bytes()), *id);
            }
        }
        if !image_refs.is_empty() {
            let mut xobjects = resources.x_objects();
            for (idx, id) in image_refs.iter().enumerate() {
                let name = image_name(idx);
                xobjects.pair(Name(name.as_bytes()), *id);
            }
        }
    }

    pdf.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::composer::{Composer, PageGeometry};
    use crate::render::document::{ImageResource, TextStyle};
    use crate::render::geometry::Rect as Box2;

    #[test]
    fn writes_one_pdf_page_per_report_page() {
        let mut c = Composer::new(PageGeometry::new(612.0, 792.0, 50.0));
        let top = c.begin_page();
        c.text(
            Point::new(top.x, top.y + 12.0),
            "Convivencia escolar",
            Align::Left,
            TextStyle::bold(12.0),
        );
        c.begin_page();
        c.rect(Box2::new(60.0, 60.0, 100.0, 20.0), ShapeStyle::fill(Color::ACCENT));
        let img = c.add_image(ImageResource {
            width: 1,
            height: 1,
            rgb: vec![255, 0, 0],
        });
        c.push(DrawOp::Image {
            rect: Box2::new(200.0, 200.0, 50.0, 50.0),
            image: img,
        });
        let report = c.finish(1);

        let bytes = render_pdf(&report);
        assert!(bytes.starts_with(b"%PDF-"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Count 2"));
        assert!(text.contains("/Helvetica-Bold"));
        assert!(text.contains("/WinAnsiEncoding"));
        assert!(text.contains("/Im1"));
    }
}
