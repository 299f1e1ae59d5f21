use super::PageBuilder;
use crate::render::composer::{Composer, Cursor};
use crate::render::document::{DrawOp, ImageResource, ShapeStyle, TextStyle};
use crate::render::geometry::{Align, Color, Point, Rect};
use crate::render::text::wrap;
use crate::report::ReportContext;
use anyhow::Context;
use std::path::Path;

const LOGO_BOX: f32 = 120.0;

pub struct CoverPage;

pub fn load_logo(path: &Path) -> anyhow::Result<ImageResource> {
    let img = image::open(path)
        .with_context(|| format!("failed to read logo {}", path.to_string_lossy()))?
        .to_rgb8();
    let (width, height) = img.dimensions();
    Ok(ImageResource {
        width,
        height,
        rgb: img.into_raw(),
    })
}

/// Largest rect with the image's aspect ratio centred in `bbox`.
fn fit_image(bbox: Rect, width: u32, height: u32) -> Rect {
    if width == 0 || height == 0 {
        return bbox;
    }
    let scale = (bbox.w / width as f32).min(bbox.h / height as f32);
    let (w, h) = (width as f32 * scale, height as f32 * scale);
    Rect::new(bbox.x + (bbox.w - w) / 2.0, bbox.y + (bbox.h - h) / 2.0, w, h)
}

fn centered_lines(composer: &mut Composer, y: f32, text: &str, style: TextStyle) -> f32 {
    let g = *composer.geometry();
    let mid = g.width / 2.0;
    let mut y = y;
    for line in wrap(text, style.font, style.size, g.content_width()) {
        composer.text(Point::new(mid, y + style.size), line, Align::Center, style);
        y += style.line_height();
    }
    y
}

impl PageBuilder for CoverPage {
    fn name(&self) -> &'static str {
        "portada"
    }

    fn build(
        &self,
        ctx: &ReportContext<'_>,
        composer: &mut Composer,
        cursor: &mut Cursor,
    ) -> anyhow::Result<()> {
        let g = *composer.geometry();
        let logo_box = Rect::new(
            g.width / 2.0 - LOGO_BOX / 2.0,
            g.top() + 40.0,
            LOGO_BOX,
            LOGO_BOX,
        );

        if let Some(path) = ctx.settings.logo_path.as_deref() {
            match load_logo(Path::new(path)) {
                Ok(img) => {
                    let rect = fit_image(logo_box, img.width, img.height);
                    let image = composer.add_image(img);
                    composer.push(DrawOp::Image { rect, image });
                }
                Err(e) => {
                    tracing::warn!(error = %format!("{e:#}"), "logo unavailable; drawing placeholder");
                    composer.rect(
                        logo_box,
                        ShapeStyle::fill_and_stroke(Color::BAND, Color::NEUTRAL, 0.8),
                    );
                    composer.text_centered_v(
                        logo_box.center().x,
                        logo_box.center().y,
                        "Imagen no disponible",
                        Align::Center,
                        TextStyle::regular(9.0).with_color(Color::MUTED),
                    );
                }
            }
        }

        let mut y = logo_box.bottom() + 60.0;
        y = centered_lines(
            composer,
            y,
            &ctx.settings.title,
            TextStyle::bold(24.0).with_color(Color::ACCENT),
        );
        if !ctx.settings.subtitle.is_empty() {
            y = centered_lines(
                composer,
                y + 8.0,
                &ctx.settings.subtitle,
                TextStyle::regular(14.0).with_color(Color::MUTED),
            );
        }
        y = centered_lines(
            composer,
            y + 40.0,
            ctx.school.unwrap_or("Todas las instituciones"),
            TextStyle::bold(16.0),
        );

        if ctx.settings.show_generated_at {
            let date = format!("Generado el {}", ctx.generated_at.format("%d/%m/%Y"));
            y = centered_lines(
                composer,
                y + 24.0,
                &date,
                TextStyle::regular(10.0).with_color(Color::MUTED),
            );
        }

        *cursor = Cursor { x: g.left(), y };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::render::composer::PageGeometry;
    use crate::report::settings::ReportSettings;
    use crate::store::MemoryStore;

    fn build_cover(settings: &ReportSettings) -> crate::render::document::Report {
        let catalog = catalog::builtin().unwrap();
        let store = MemoryStore::new();
        let ctx = ReportContext::new(catalog, &store, None, settings);
        let mut composer = Composer::new(PageGeometry::new(612.0, 792.0, 50.0));
        super::super::run_builder(&CoverPage, &ctx, &mut composer);
        composer.finish(1)
    }

    #[test]
    fn missing_logo_becomes_placeholder() {
        let settings = ReportSettings {
            logo_path: Some("/nonexistent/escudo.png".to_string()),
            ..ReportSettings::default()
        };
        let report = build_cover(&settings);
        assert!(report.images.is_empty());
        let page = &report.pages[0];
        assert!(page.contains_text("Imagen no disponible"));
        assert!(page.contains_text("Todas las instituciones"));
        assert!(page.contains_text("Generado el"));
        assert!(!page.contains_text("Página"));
    }

    #[test]
    fn logo_is_embedded_with_its_aspect_ratio() {
        let dir = std::env::temp_dir().join(format!("surveyd-logo-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("escudo.png");
        image::RgbImage::from_pixel(40, 20, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let settings = ReportSettings {
            logo_path: Some(path.to_string_lossy().to_string()),
            show_generated_at: false,
            ..ReportSettings::default()
        };
        let report = build_cover(&settings);
        assert_eq!(report.images.len(), 1);
        assert_eq!(report.images[0].rgb.len(), 40 * 20 * 3);
        let rect = report.pages[0]
            .ops
            .iter()
            .find_map(|op| match op {
                DrawOp::Image { rect, .. } => Some(*rect),
                _ => None,
            })
            .unwrap();
        assert!((rect.w - LOGO_BOX).abs() < 1e-3);
        assert!((rect.h - LOGO_BOX / 2.0).abs() < 1e-3);
        assert!(!report.pages[0].contains_text("Generado el"));

        let _ = std::fs::remove_dir_all(dir);
    }
}
