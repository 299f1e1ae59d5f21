use crate::render::geometry::{Align, Color, PathSeg, Point, Rect};
use crate::render::text::Font;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: Font,
    pub size: f32,
    pub color: Color,
}

impl TextStyle {
    pub fn regular(size: f32) -> Self {
        Self {
            font: Font::Regular,
            size,
            color: Color::TEXT,
        }
    }

    pub fn bold(size: f32) -> Self {
        Self {
            font: Font::Bold,
            size,
            color: Color::TEXT,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Distance between consecutive baselines.
    pub fn line_height(&self) -> f32 {
        self.size * 1.3
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeStyle {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub line_width: f32,
}

impl ShapeStyle {
    pub fn fill(color: Color) -> Self {
        Self {
            fill: Some(color),
            stroke: None,
            line_width: 0.0,
        }
    }

    pub fn stroke(color: Color, line_width: f32) -> Self {
        Self {
            fill: None,
            stroke: Some(color),
            line_width,
        }
    }

    pub fn fill_and_stroke(fill: Color, stroke: Color, line_width: f32) -> Self {
        Self {
            fill: Some(fill),
            stroke: Some(stroke),
            line_width,
        }
    }
}

/// One draw operation in page coordinates (origin top-left, y downward).
/// Every operation carries its own style; nothing is inherited from the
/// previous operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// `at.y` is the baseline.
    Text {
        at: Point,
        text: String,
        align: Align,
        style: TextStyle,
    },
    Rect {
        rect: Rect,
        style: ShapeStyle,
    },
    Line {
        from: Point,
        to: Point,
        style: ShapeStyle,
    },
    Path {
        segs: Vec<PathSeg>,
        style: ShapeStyle,
    },
    Image {
        rect: Rect,
        image: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

#[cfg(test)]
impl Page {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().any(|t| t.contains(needle))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageResource {
    pub width: u32,
    pub height: u32,
    /// Packed 8-bit RGB samples.
    pub rgb: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    Letter,
    A4,
}

impl PageSize {
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            PageSize::Letter => (612.0, 792.0),
            PageSize::A4 => (595.0, 842.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub width: f32,
    pub height: f32,
    pub pages: Vec<Page>,
    pub images: Vec<ImageResource>,
}

impl Report {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}
