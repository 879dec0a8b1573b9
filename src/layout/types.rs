use serde::Serialize;

use crate::ir::ChartKind;

/// One normalized record: its share of the total and its position in the
/// caller's input (`id`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueItem {
    pub id: usize,
    pub category: String,
    pub raw_value: f64,
    pub share: f64,
}

/// Linear taper from `min_width` at `y = 0` to `max_width` at `y = max_height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Envelope {
    pub max_width: f64,
    pub max_height: f64,
    pub min_width: f64,
}

impl Envelope {
    pub fn triangle(max_width: f64, max_height: f64) -> Self {
        Self::trapezoid(0.0, max_width, max_height)
    }

    pub fn trapezoid(min_width: f64, max_width: f64, max_height: f64) -> Self {
        let max_width = max_width.max(0.0);
        Self {
            max_width,
            max_height: max_height.max(0.0),
            min_width: min_width.clamp(0.0, max_width),
        }
    }

    pub fn area(&self) -> f64 {
        (self.min_width + self.max_width) * self.max_height / 2.0
    }

    /// Width gained per unit of height.
    pub fn taper(&self) -> f64 {
        if self.max_height <= 0.0 {
            return 0.0;
        }
        (self.max_width - self.min_width) / self.max_height
    }

    pub fn width_at(&self, y: f64) -> f64 {
        (self.min_width + self.taper() * y).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub item: ValueItem,
    pub top_y: f64,
    pub bottom_y: f64,
    pub top_width: f64,
    pub bottom_width: f64,
}

impl Segment {
    pub fn height(&self) -> f64 {
        (self.bottom_y - self.top_y).max(0.0)
    }

    pub fn area(&self) -> f64 {
        (self.top_width + self.bottom_width) * self.height() / 2.0
    }

    pub fn mid_width(&self) -> f64 {
        (self.top_width + self.bottom_width) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    /// Narrow end at the top (pyramid).
    ApexTop,
    /// Narrow end at the bottom (funnel).
    ApexBottom,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackedSegment {
    pub segment: Segment,
    pub display_top: f64,
    pub display_bottom: f64,
    pub visible: bool,
}

impl StackedSegment {
    /// Trapezoid corners clockwise from top-left, centred on `center_x`.
    pub fn polygon(&self, center_x: f64) -> [(f64, f64); 4] {
        let top = self.segment.top_width / 2.0;
        let bottom = self.segment.bottom_width / 2.0;
        [
            (center_x - top, self.display_top),
            (center_x + top, self.display_top),
            (center_x + bottom, self.display_bottom),
            (center_x - bottom, self.display_bottom),
        ]
    }

    pub fn display_center_y(&self) -> f64 {
        (self.display_top + self.display_bottom) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentStack {
    pub envelope: Envelope,
    pub orientation: Orientation,
    pub gap: f64,
    pub offset_y: f64,
    pub segments: Vec<StackedSegment>,
}

impl SegmentStack {
    pub fn visible(&self) -> impl Iterator<Item = &StackedSegment> {
        self.segments.iter().filter(|seg| seg.visible)
    }

    pub fn total_area(&self) -> f64 {
        self.segments.iter().map(|seg| seg.segment.area()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
    pub center_x: f64,
    pub center_y: f64,
    pub cell_width: f64,
    pub cell_height: f64,
    pub max_radius: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Circle,
    Triangle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeInstance {
    pub item: ValueItem,
    pub cell: GridCell,
    pub kind: ShapeKind,
    /// Radius for circles, side length for triangles.
    pub size: f64,
}

impl ShapeInstance {
    /// Distance from the cell centre to the shape's top and bottom edges.
    pub fn vertical_extent(&self) -> (f64, f64) {
        match self.kind {
            ShapeKind::Circle => (self.size, self.size),
            ShapeKind::Triangle => {
                let height = self.size * 3f64.sqrt() / 2.0;
                (height * 2.0 / 3.0, height / 3.0)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Middle => "middle",
            Self::End => "end",
        }
    }
}

/// Unit offset direction for a label relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelCandidate {
    pub dx: f64,
    pub dy: f64,
    pub anchor: TextAnchor,
    pub priority: u8,
}

/// Axis-aligned box, `x1 <= x2`, `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Bounds {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Touching edges do not count as an intersection.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x1 < other.x2 && other.x1 < self.x2 && self.y1 < other.y2 && other.y1 < self.y2
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        const EPS: f64 = 1e-9;
        other.x1 >= self.x1 - EPS
            && other.y1 >= self.y1 - EPS
            && other.x2 <= self.x2 + EPS
            && other.y2 <= self.y2 + EPS
    }

    pub fn intersects_circle(&self, cx: f64, cy: f64, radius: f64) -> bool {
        if radius <= 0.0 {
            return false;
        }
        let nearest_x = cx.clamp(self.x1, self.x2);
        let nearest_y = cy.clamp(self.y1, self.y2);
        let dx = cx - nearest_x;
        let dy = cy - nearest_y;
        dx * dx + dy * dy < radius * radius
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedLabel {
    pub anchor_id: String,
    /// Text anchor point; `y` is the vertical centre of the label box.
    pub x: f64,
    pub y: f64,
    pub anchor: TextAnchor,
    pub bounds: Bounds,
    pub candidate: u8,
    /// Set when no candidate was free and the highest-priority one was forced.
    pub overlapping: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedText {
    pub text: String,
    pub font_size: f64,
    pub scale: f64,
    pub width: f64,
    pub truncated: bool,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedText {
    pub x: f64,
    pub y: f64,
    pub anchor: TextAnchor,
    pub text: FittedText,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentLabel {
    pub segment: usize,
    pub category: PositionedText,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentChartLayout {
    pub center_x: f64,
    pub stack: SegmentStack,
    pub labels: Vec<SegmentLabel>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeChartLayout {
    pub rows: usize,
    pub cols: usize,
    pub shapes: Vec<ShapeInstance>,
    pub category_labels: Vec<PositionedText>,
    pub value_labels: Vec<PositionedText>,
    pub max_value: f64,
}

/// A scatter marker with its measured label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementAnchor {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub marker_radius: f64,
    pub label_width: f64,
    pub label_height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterLayout {
    pub anchors: Vec<PlacementAnchor>,
    pub texts: Vec<FittedText>,
    pub labels: Vec<PlacedLabel>,
    pub passes: usize,
    pub overlaps: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EmptyReason {
    NoValidRecords,
    NonPositiveTotal,
    NoPoints,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DiagramData {
    Segments(SegmentChartLayout),
    Shapes(ShapeChartLayout),
    Scatter(ScatterLayout),
    Empty(EmptyReason),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub kind: ChartKind,
    pub width: f64,
    pub height: f64,
    pub title: Option<PositionedText>,
    pub diagram: DiagramData,
}

impl Layout {
    pub fn is_empty(&self) -> bool {
        matches!(self.diagram, DiagramData::Empty(_))
    }
}
