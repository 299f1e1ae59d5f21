//! Chart geometry: pure layout functions for pies, horizontal bars, stacked
//! bars and legends. Coordinates are page points with y growing downward.

use crate::calc::{Bucket, FrequencyResult};
use crate::render::text::{text_width, Font};
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, TAU};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn polar(center: Point, radius: f32, angle: f32) -> Self {
        Self::new(
            center.x + radius * angle.cos(),
            center.y + radius * angle.sin(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TEXT: Color = Color::rgb(33, 37, 41);
    pub const MUTED: Color = Color::rgb(108, 117, 125);
    pub const RULE: Color = Color::rgb(206, 212, 218);
    pub const BAND: Color = Color::rgb(233, 236, 239);
    pub const NEUTRAL: Color = Color::rgb(200, 200, 200);
    pub const ACCENT: Color = Color::rgb(31, 78, 121);
    pub const ERROR: Color = Color::rgb(176, 42, 55);

    pub fn for_bucket(bucket: Bucket) -> Color {
        match bucket {
            Bucket::Always => Color::rgb(46, 139, 87),
            Bucket::Sometimes => Color::rgb(240, 173, 78),
            Bucket::Never => Color::rgb(217, 83, 79),
        }
    }

    /// Categorical palette for pies and bars.
    pub fn series(i: usize) -> Color {
        const PALETTE: [Color; 8] = [
            Color::rgb(31, 119, 180),
            Color::rgb(255, 127, 14),
            Color::rgb(44, 160, 44),
            Color::rgb(214, 39, 40),
            Color::rgb(148, 103, 189),
            Color::rgb(140, 86, 75),
            Color::rgb(227, 119, 194),
            Color::rgb(127, 127, 127),
        ];
        PALETTE[i % PALETTE.len()]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartDatum {
    pub label: String,
    pub value: f64,
    pub color: Color,
}

impl ChartDatum {
    pub fn new(label: impl Into<String>, value: f64, color: Color) -> Self {
        Self {
            label: label.into(),
            value: value.max(0.0),
            color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSeg {
    MoveTo(Point),
    LineTo(Point),
    CubicTo(Point, Point, Point),
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// A label positioned by its vertical middle; `align` says which edge (or the
/// centre) `at.x` refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct TextAnchor {
    pub text: String,
    pub at: Point,
    pub align: Align,
}

pub const NO_DATA_LABEL: &str = "Sin datos";

/// Segments below this share of the circle get no percentage label.
pub const PIE_LABEL_MIN_FRACTION: f32 = 0.05;
pub const PIE_LABEL_RADIUS: f32 = 0.68;

#[derive(Debug, Clone, PartialEq)]
pub struct PieSegment {
    pub index: usize,
    pub start: f32,
    pub sweep: f32,
    pub path: Vec<PathSeg>,
    pub label: Option<TextAnchor>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PieLayout {
    Segments(Vec<PieSegment>),
    NoData(TextAnchor),
}

fn arc_path(center: Point, radius: f32, start: f32, sweep: f32) -> Vec<PathSeg> {
    let mut path = vec![
        PathSeg::MoveTo(center),
        PathSeg::LineTo(Point::polar(center, radius, start)),
    ];
    let pieces = (sweep / FRAC_PI_2).ceil().max(1.0) as usize;
    let step = sweep / pieces as f32;
    let k = 4.0 / 3.0 * (step / 4.0).tan();
    for i in 0..pieces {
        let a0 = start + step * i as f32;
        let a1 = a0 + step;
        let p0 = Point::polar(center, radius, a0);
        let p3 = Point::polar(center, radius, a1);
        let c1 = Point::new(p0.x - k * radius * a0.sin(), p0.y + k * radius * a0.cos());
        let c2 = Point::new(p3.x + k * radius * a1.sin(), p3.y - k * radius * a1.cos());
        path.push(PathSeg::CubicTo(c1, c2, p3));
    }
    path.push(PathSeg::Close);
    path
}

pub fn pie_layout(data: &[ChartDatum], center: Point, radius: f32) -> PieLayout {
    let total: f64 = data.iter().map(|d| d.value).sum();
    if total <= 0.0 {
        return PieLayout::NoData(TextAnchor {
            text: NO_DATA_LABEL.to_string(),
            at: center,
            align: Align::Center,
        });
    }

    let mut segments = Vec::new();
    let mut start = 0.0f32;
    for (index, d) in data.iter().enumerate() {
        let fraction = (d.value / total) as f32;
        let sweep = fraction * TAU;
        if sweep <= 0.0 {
            continue;
        }
        let label = (fraction > PIE_LABEL_MIN_FRACTION).then(|| TextAnchor {
            text: format!("{}%", (fraction * 100.0).round() as i32),
            at: Point::polar(center, radius * PIE_LABEL_RADIUS, start + sweep / 2.0),
            align: Align::Center,
        });
        segments.push(PieSegment {
            index,
            start,
            sweep,
            path: arc_path(center, radius, start, sweep),
            label,
        });
        start += sweep;
    }
    PieLayout::Segments(segments)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegendLayout {
    #[serde(rename = "right")]
    RightColumn,
    #[serde(rename = "below")]
    BelowRow,
    #[serde(rename = "rows")]
    BelowRows(usize),
}

pub const LEGEND_ROW_HEIGHT: f32 = 14.0;
pub const LEGEND_SWATCH: f32 = 9.0;
const LEGEND_RIGHT_MAX_WIDTH: f32 = 170.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegendItem {
    pub index: usize,
    pub swatch: Rect,
    /// Left edge and vertical middle of the label text.
    pub text_at: Point,
    pub max_text_width: f32,
}

pub(crate) fn legend_rows(layout: LegendLayout, count: usize) -> usize {
    match layout {
        LegendLayout::RightColumn => count,
        LegendLayout::BelowRow => 1,
        LegendLayout::BelowRows(n) => n.clamp(1, count.max(1)),
    }
}

/// Row and column of item `index` when `count` items share `rows` rows: each
/// row holds `count / rows` items and the first `count % rows` rows one more.
fn legend_cell(index: usize, count: usize, rows: usize) -> (usize, usize) {
    let base = count / rows;
    let long_rows = count % rows;
    let long_items = long_rows * (base + 1);
    if index < long_items {
        (index / (base + 1), index % (base + 1))
    } else {
        let rest = index - long_items;
        (long_rows + rest / base, rest % base)
    }
}

/// Split `bbox` into the plot area and the legend area for `count` items.
pub fn split_for_legend(bbox: Rect, layout: LegendLayout, count: usize) -> (Rect, Rect) {
    match layout {
        LegendLayout::RightColumn => {
            let w = (bbox.w * 0.4).min(LEGEND_RIGHT_MAX_WIDTH);
            (
                Rect::new(bbox.x, bbox.y, bbox.w - w, bbox.h),
                Rect::new(bbox.right() - w, bbox.y, w, bbox.h),
            )
        }
        LegendLayout::BelowRow | LegendLayout::BelowRows(_) => {
            let h = legend_rows(layout, count) as f32 * LEGEND_ROW_HEIGHT + 6.0;
            (
                Rect::new(bbox.x, bbox.y, bbox.w, (bbox.h - h).max(0.0)),
                Rect::new(bbox.x, bbox.bottom() - h + 6.0, bbox.w, h - 6.0),
            )
        }
    }
}

pub fn legend_layout(count: usize, layout: LegendLayout, area: Rect) -> Vec<LegendItem> {
    if count == 0 {
        return Vec::new();
    }
    let rows = legend_rows(layout, count);
    let col_w = match layout {
        LegendLayout::RightColumn => area.w,
        _ => area.w / count.div_ceil(rows) as f32,
    };
    let top = match layout {
        LegendLayout::RightColumn => {
            area.y + ((area.h - count as f32 * LEGEND_ROW_HEIGHT) / 2.0).max(0.0)
        }
        _ => area.y,
    };

    (0..count)
        .map(|index| {
            let (row, col) = match layout {
                LegendLayout::RightColumn => (index, 0),
                _ => legend_cell(index, count, rows),
            };
            let x = area.x + col as f32 * col_w + 6.0;
            let mid = top + row as f32 * LEGEND_ROW_HEIGHT + LEGEND_ROW_HEIGHT / 2.0;
            LegendItem {
                index,
                swatch: Rect::new(x, mid - LEGEND_SWATCH / 2.0, LEGEND_SWATCH, LEGEND_SWATCH),
                text_at: Point::new(x + LEGEND_SWATCH + 4.0, mid),
                max_text_width: (col_w - LEGEND_SWATCH - 14.0).max(0.0),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarOptions {
    pub max_thickness: f32,
    pub gap: f32,
    pub font_size: f32,
    pub min_label_margin: f32,
    /// Space kept right of the longest bar for its value text.
    pub value_margin: f32,
}

impl Default for BarOptions {
    fn default() -> Self {
        Self {
            max_thickness: 16.0,
            gap: 6.0,
            font_size: 8.0,
            min_label_margin: 60.0,
            value_margin: 36.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarPlacement {
    pub index: usize,
    pub bar: Rect,
    pub label: TextAnchor,
    pub value: TextAnchor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChartLayout {
    pub plot: Rect,
    pub thickness: f32,
    pub bars: Vec<BarPlacement>,
}

pub fn format_value(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        format!("{:.1}", v)
    }
}

/// Height a bar chart of `n` bars needs when bars are drawn at full thickness.
pub fn bar_chart_height(n: usize, opts: &BarOptions) -> f32 {
    if n == 0 {
        return opts.max_thickness;
    }
    n as f32 * opts.max_thickness + (n - 1) as f32 * opts.gap
}

pub fn bar_layout(data: &[ChartDatum], bbox: Rect, opts: &BarOptions) -> BarChartLayout {
    let widest_label = data
        .iter()
        .map(|d| text_width(&d.label, Font::Regular, opts.font_size))
        .fold(0.0f32, f32::max);
    let label_margin = (widest_label + 8.0)
        .max(opts.min_label_margin)
        .min(bbox.w * 0.4);
    let plot = Rect::new(
        bbox.x + label_margin,
        bbox.y,
        (bbox.w - label_margin - opts.value_margin).max(0.0),
        bbox.h,
    );

    let n = data.len();
    if n == 0 {
        return BarChartLayout {
            plot,
            thickness: 0.0,
            bars: Vec::new(),
        };
    }
    let thickness = opts
        .max_thickness
        .min((bbox.h - (n - 1) as f32 * opts.gap) / n as f32)
        .max(0.0);
    let max_value = data.iter().map(|d| d.value).fold(0.0f64, f64::max).max(1.0);

    let bars = data
        .iter()
        .enumerate()
        .map(|(index, d)| {
            let y = bbox.y + index as f32 * (thickness + opts.gap);
            let len = (d.value / max_value) as f32 * plot.w;
            let mid = y + thickness / 2.0;
            BarPlacement {
                index,
                bar: Rect::new(plot.x, y, len, thickness),
                label: TextAnchor {
                    text: d.label.clone(),
                    at: Point::new(plot.x - 6.0, mid),
                    align: Align::Right,
                },
                value: TextAnchor {
                    text: format_value(d.value),
                    at: Point::new(plot.x + len + 4.0, mid),
                    align: Align::Left,
                },
            }
        })
        .collect();

    BarChartLayout {
        plot,
        thickness,
        bars,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackSegment {
    pub bucket: Bucket,
    pub rect: Rect,
    pub label: Option<TextAnchor>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StackedBar {
    Segments(Vec<StackSegment>),
    NoData { rect: Rect, label: TextAnchor },
}

pub fn stacked_bar_layout(result: &FrequencyResult, bbox: Rect, font_size: f32) -> StackedBar {
    let total = result.total();
    if result.is_no_data() || result.is_zero() || total <= 0 {
        return StackedBar::NoData {
            rect: bbox,
            label: TextAnchor {
                text: NO_DATA_LABEL.to_string(),
                at: bbox.center(),
                align: Align::Center,
            },
        };
    }

    let mut x = bbox.x;
    let mut segments = Vec::new();
    for bucket in Bucket::ALL {
        let v = result.get(bucket);
        if v <= 0 {
            continue;
        }
        let w = v as f32 / total as f32 * bbox.w;
        let rect = Rect::new(x, bbox.y, w, bbox.h);
        let text = format!("{}%", v);
        let label = (text_width(&text, Font::Bold, font_size) + 4.0 <= w).then(|| TextAnchor {
            text,
            at: rect.center(),
            align: Align::Center,
        });
        segments.push(StackSegment {
            bucket,
            rect,
            label,
        });
        x += w;
    }
    StackedBar::Segments(segments)
}
