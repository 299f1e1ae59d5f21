use crate::render::document::{DrawOp, ImageResource, Page, Report, ShapeStyle, TextStyle};
use crate::render::geometry::{Align, Color, Point, Rect};
use crate::render::text::wrap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    /// Strip above the bottom margin kept free for the page number.
    pub footer: f32,
}

impl PageGeometry {
    pub fn new(width: f32, height: f32, margin: f32) -> Self {
        Self {
            width,
            height,
            margin,
            footer: 18.0,
        }
    }

    pub fn left(&self) -> f32 {
        self.margin
    }

    pub fn right(&self) -> f32 {
        self.width - self.margin
    }

    pub fn top(&self) -> f32 {
        self.margin
    }

    /// Lowest y content may reach.
    pub fn bottom(&self) -> f32 {
        self.height - self.margin - self.footer
    }

    pub fn content_width(&self) -> f32 {
        self.right() - self.left()
    }
}

/// Drawing position threaded through the page builders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub x: f32,
    pub y: f32,
}

impl Cursor {
    pub fn down(self, dy: f32) -> Self {
        Self {
            x: self.x,
            y: self.y + dy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerState {
    NoPage,
    PageOpen,
}

pub struct Composer {
    geometry: PageGeometry,
    pages: Vec<Page>,
    images: Vec<ImageResource>,
    state: ComposerState,
}

impl Composer {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: Vec::new(),
            images: Vec::new(),
            state: ComposerState::NoPage,
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    #[cfg(test)]
    pub fn state(&self) -> ComposerState {
        self.state
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn top_cursor(&self) -> Cursor {
        Cursor {
            x: self.geometry.left(),
            y: self.geometry.top(),
        }
    }

    /// Close the current page (if any) and open a fresh one.
    pub fn begin_page(&mut self) -> Cursor {
        self.pages.push(Page::default());
        self.state = ComposerState::PageOpen;
        self.top_cursor()
    }

    pub fn end_page(&mut self) {
        self.state = ComposerState::NoPage;
    }

    pub fn fits(&self, cursor: Cursor, height: f32) -> bool {
        self.state == ComposerState::PageOpen && cursor.y + height <= self.geometry.bottom()
    }

    /// Make room for a block of `height` before drawing it. Breaks the page
    /// when the block would cross the bottom margin. A block taller than a
    /// whole page still starts at the top of a fresh page.
    pub fn ensure_space(&mut self, cursor: Cursor, height: f32) -> Cursor {
        if self.fits(cursor, height) {
            return cursor;
        }
        if self.state == ComposerState::PageOpen && cursor.y <= self.geometry.top() {
            return cursor;
        }
        self.begin_page()
    }

    pub fn push(&mut self, op: DrawOp) {
        if self.state == ComposerState::NoPage {
            self.begin_page();
        }
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    pub fn add_image(&mut self, image: ImageResource) -> usize {
        self.images.push(image);
        self.images.len() - 1
    }

    pub fn text(&mut self, at: Point, text: impl Into<String>, align: Align, style: TextStyle) {
        self.push(DrawOp::Text {
            at,
            text: text.into(),
            align,
            style,
        });
    }

    pub fn rect(&mut self, rect: Rect, style: ShapeStyle) {
        self.push(DrawOp::Rect { rect, style });
    }

    pub fn line(&mut self, from: Point, to: Point, style: ShapeStyle) {
        self.push(DrawOp::Line { from, to, style });
    }

    /// Text whose vertical middle sits at `mid_y`.
    pub fn text_centered_v(
        &mut self,
        x: f32,
        mid_y: f32,
        text: impl Into<String>,
        align: Align,
        style: TextStyle,
    ) {
        self.text(Point::new(x, mid_y + style.size * 0.35), text, align, style);
    }

    /// Wrapped paragraph; breaks the page between lines when needed.
    pub fn paragraph(&mut self, cursor: Cursor, text: &str, width: f32, style: TextStyle) -> Cursor {
        let mut cursor = cursor;
        let lh = style.line_height();
        for line in wrap(text, style.font, style.size, width) {
            cursor = self.ensure_space(cursor, lh);
            self.text(
                Point::new(cursor.x, cursor.y + style.size),
                line,
                Align::Left,
                style,
            );
            cursor = cursor.down(lh);
        }
        cursor
    }

    /// Height of `text` wrapped to `width`.
    pub fn measure_paragraph(text: &str, width: f32, style: TextStyle) -> f32 {
        wrap(text, style.font, style.size, width).len() as f32 * style.line_height()
    }

    /// Bordered box with a title and an explanation, drawn in place of
    /// content that could not be produced.
    pub fn placeholder(&mut self, cursor: Cursor, width: f32, title: &str, message: &str) -> Cursor {
        let title_style = TextStyle::bold(10.0).with_color(Color::ERROR);
        let body_style = TextStyle::regular(9.0).with_color(Color::MUTED);
        let inner = width - 16.0;
        let height = 8.0
            + title_style.line_height()
            + Self::measure_paragraph(message, inner, body_style)
            + 8.0;
        let cursor = self.ensure_space(cursor, height);
        self.rect(
            Rect::new(cursor.x, cursor.y, width, height),
            ShapeStyle::fill_and_stroke(Color::BAND, Color::ERROR, 0.8),
        );
        self.text(
            Point::new(cursor.x + 8.0, cursor.y + 8.0 + title_style.size),
            title,
            Align::Left,
            title_style,
        );
        let body = Cursor {
            x: cursor.x + 8.0,
            y: cursor.y + 8.0 + title_style.line_height(),
        };
        for (i, line) in wrap(message, body_style.font, body_style.size, inner)
            .into_iter()
            .enumerate()
        {
            self.text(
                Point::new(
                    body.x,
                    body.y + body_style.size + i as f32 * body_style.line_height(),
                ),
                line,
                Align::Left,
                body_style,
            );
        }
        cursor.down(height + 10.0)
    }

    /// Stamp "Página i de n" on every page from `first_numbered` on and hand
    /// the pages over.
    pub fn finish(mut self, first_numbered: usize) -> Report {
        let total = self.pages.len();
        let style = TextStyle::regular(8.0).with_color(Color::MUTED);
        let y = self.geometry.height - self.geometry.margin + style.size;
        let x = self.geometry.width / 2.0;
        for (i, page) in self.pages.iter_mut().enumerate().skip(first_numbered) {
            page.ops.push(DrawOp::Text {
                at: Point::new(x, y),
                text: format!("Página {} de {}", i + 1, total),
                align: Align::Center,
                style,
            });
        }
        Report {
            width: self.geometry.width,
            height: self.geometry.height,
            pages: self.pages,
            images: self.images,
        }
    }
}
