use crate::ir::ChartKind;
use crate::layout::grid::triangle_points;
use crate::layout::{
    DiagramData, EmptyReason, Layout, PositionedText, ScatterLayout, SegmentChartLayout,
    ShapeChartLayout, ShapeKind,
};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Flat, renderer-friendly view of a `Layout`: polygons and text runs in
/// chart coordinates.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub kind: ChartKind,
    pub width: f64,
    pub height: f64,
    pub title: Option<TextDump>,
    pub empty: Option<EmptyReason>,
    pub segments: Vec<SegmentDump>,
    pub shapes: Vec<ShapeDump>,
    pub labels: Vec<LabelDump>,
    pub label_passes: usize,
    pub label_overlaps: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDump {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub anchor: &'static str,
    pub font_size: f64,
    pub width: f64,
    pub truncated: bool,
    pub hidden: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDump {
    pub id: usize,
    pub category: String,
    pub value: f64,
    pub share: f64,
    pub points: Vec<[f64; 2]>,
    pub label: Option<TextDump>,
    pub value_text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeDump {
    pub id: usize,
    pub category: String,
    pub value: f64,
    pub kind: ShapeKind,
    pub cx: f64,
    pub cy: f64,
    pub size: f64,
    /// Triangle vertices; empty for circles.
    pub points: Vec<[f64; 2]>,
    pub category_label: Option<TextDump>,
    pub value_label: Option<TextDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDump {
    pub anchor_id: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub anchor: &'static str,
    pub bounds: [f64; 4],
    pub candidate: u8,
    pub overlapping: bool,
}

impl TextDump {
    fn from_positioned(text: &PositionedText) -> Self {
        TextDump {
            text: text.text.text.clone(),
            x: text.x,
            y: text.y,
            anchor: text.anchor.as_str(),
            font_size: text.text.font_size,
            width: text.text.width,
            truncated: text.text.truncated,
            hidden: text.text.hidden,
        }
    }
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout) -> Self {
        let mut dump = LayoutDump {
            kind: layout.kind,
            width: layout.width,
            height: layout.height,
            title: layout.title.as_ref().map(TextDump::from_positioned),
            empty: None,
            segments: Vec::new(),
            shapes: Vec::new(),
            labels: Vec::new(),
            label_passes: 0,
            label_overlaps: 0,
        };
        match &layout.diagram {
            DiagramData::Segments(chart) => dump.segments = dump_segments(chart),
            DiagramData::Shapes(chart) => dump.shapes = dump_shapes(chart),
            DiagramData::Scatter(chart) => {
                dump.labels = dump_labels(chart);
                dump.label_passes = chart.passes;
                dump.label_overlaps = chart.overlaps;
            }
            DiagramData::Empty(reason) => dump.empty = Some(*reason),
        }
        dump
    }
}

fn dump_segments(chart: &SegmentChartLayout) -> Vec<SegmentDump> {
    chart
        .stack
        .segments
        .iter()
        .enumerate()
        .filter(|(_, stacked)| stacked.visible)
        .map(|(idx, stacked)| {
            let label = chart.labels.iter().find(|label| label.segment == idx);
            let item = &stacked.segment.item;
            SegmentDump {
                id: item.id,
                category: item.category.clone(),
                value: item.raw_value,
                share: item.share,
                points: stacked
                    .polygon(chart.center_x)
                    .iter()
                    .map(|(x, y)| [*x, *y])
                    .collect(),
                label: label.map(|label| TextDump::from_positioned(&label.category)),
                value_text: label.map(|label| label.value.clone()),
            }
        })
        .collect()
}

fn dump_shapes(chart: &ShapeChartLayout) -> Vec<ShapeDump> {
    chart
        .shapes
        .iter()
        .enumerate()
        .map(|(idx, shape)| {
            let points = match shape.kind {
                ShapeKind::Circle => Vec::new(),
                ShapeKind::Triangle => {
                    triangle_points(shape.cell.center_x, shape.cell.center_y, shape.size)
                        .iter()
                        .map(|(x, y)| [*x, *y])
                        .collect()
                }
            };
            ShapeDump {
                id: shape.item.id,
                category: shape.item.category.clone(),
                value: shape.item.raw_value,
                kind: shape.kind,
                cx: shape.cell.center_x,
                cy: shape.cell.center_y,
                size: shape.size,
                points,
                category_label: chart
                    .category_labels
                    .get(idx)
                    .map(TextDump::from_positioned),
                value_label: chart.value_labels.get(idx).map(TextDump::from_positioned),
            }
        })
        .collect()
}

fn dump_labels(chart: &ScatterLayout) -> Vec<LabelDump> {
    chart
        .labels
        .iter()
        .zip(chart.texts.iter())
        .filter(|(_, text)| !text.hidden)
        .map(|(label, text)| LabelDump {
            anchor_id: label.anchor_id.clone(),
            text: text.text.clone(),
            x: label.x,
            y: label.y,
            anchor: label.anchor.as_str(),
            bounds: [
                label.bounds.x1,
                label.bounds.y1,
                label.bounds.x2,
                label.bounds.y2,
            ],
            candidate: label.candidate,
            overlapping: label.overlapping,
        })
        .collect()
}

pub fn layout_dump_json(layout: &Layout, pretty: bool) -> anyhow::Result<String> {
    let dump = LayoutDump::from_layout(layout);
    let json = if pretty {
        serde_json::to_string_pretty(&dump)?
    } else {
        serde_json::to_string(&dump)?
    };
    Ok(json)
}

pub fn write_layout_dump(path: &Path, layout: &Layout, pretty: bool) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, &dump)?;
    } else {
        serde_json::to_writer(&mut writer, &dump)?;
    }
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
