pub mod grid;
pub mod label_placement;
pub mod normalize;
pub mod segment;
pub mod text;
pub(crate) mod types;
pub use types::*;

use grid::{grid_dimensions, size_shapes};
use label_placement::{resolve_labels, resolve_labels_in_order};
use normalize::{Normalized, normalize_values};
use segment::layout_segments;
use text::{
    TextMetricsProvider, fit_font_size, fit_text, fit_text_in_box, measure_block, truncate_to_fit,
};

use crate::config::LayoutConfig;
use crate::ir::{ChartKind, ChartRequest};
use crate::theme::Theme;

/// Lay out one chart. Degenerate data yields `DiagramData::Empty`, never an
/// error.
pub fn compute_layout(
    request: &ChartRequest,
    theme: &Theme,
    config: &LayoutConfig,
    metrics: &dyn TextMetricsProvider,
) -> Layout {
    let width = positive_or(request.width, config.width);
    let height = positive_or(request.height, config.height);
    let mut plot = plot_bounds(width, height, config.margin);

    let title = request
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(|title| {
            let fitted = fit_text(title, &theme.title_font(), plot.width(), &config.text, metrics);
            let band = fitted.font_size * config.text.line_height.max(1.0);
            let positioned = PositionedText {
                x: width / 2.0,
                y: plot.y1 + band / 2.0,
                anchor: TextAnchor::Middle,
                text: fitted,
            };
            plot.y1 = (plot.y1 + band + config.text.padding.max(0.0)).min(plot.y2);
            positioned
        });

    let diagram = match request.kind {
        ChartKind::Pyramid | ChartKind::Funnel => {
            compute_segment_chart(request, theme, config, metrics, &plot)
        }
        ChartKind::Circles => {
            compute_shape_chart(request, ShapeKind::Circle, theme, config, metrics, &plot)
        }
        ChartKind::Triangles => {
            compute_shape_chart(request, ShapeKind::Triangle, theme, config, metrics, &plot)
        }
        ChartKind::Scatter => compute_scatter_chart(request, theme, config, metrics, &plot),
    };
    if let DiagramData::Empty(reason) = &diagram {
        tracing::debug!(chart = request.kind.as_str(), ?reason, "nothing to lay out");
    }

    Layout {
        kind: request.kind,
        width,
        height,
        title,
        diagram,
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

fn plot_bounds(width: f64, height: f64, margin: f64) -> Bounds {
    let margin = margin.max(0.0).min(width / 2.0).min(height / 2.0);
    Bounds::new(margin, margin, width - margin, height - margin)
}

fn compute_segment_chart(
    request: &ChartRequest,
    theme: &Theme,
    config: &LayoutConfig,
    metrics: &dyn TextMetricsProvider,
    plot: &Bounds,
) -> DiagramData {
    let funnel = request.kind == ChartKind::Funnel;
    let default_sort = if funnel {
        config.normalize.funnel_sort
    } else {
        config.normalize.pyramid_sort
    };
    let sort = request.sort.unwrap_or(default_sort);
    let (items, total) = match normalize_values(&request.records, sort, request.validity) {
        Normalized::Items { items, total } => (items, total),
        Normalized::Empty(reason) => return DiagramData::Empty(reason),
    };

    let seg_cfg = &config.segments;
    let gap = seg_cfg.gap.max(0.0);
    let visible = items.iter().filter(|item| item.share > 0.0).count();
    let max_height = (plot.height() - gap * visible.saturating_sub(1) as f64).max(0.0);
    let max_width = plot.width() * seg_cfg.width_ratio.clamp(0.0, 1.0);
    let (envelope, orientation) = if funnel {
        let neck = max_width * seg_cfg.funnel_neck_ratio.clamp(0.0, 1.0);
        (
            Envelope::trapezoid(neck, max_width, max_height),
            Orientation::ApexBottom,
        )
    } else {
        (
            Envelope::triangle(max_width, max_height),
            Orientation::ApexTop,
        )
    };

    let mut stack = layout_segments(&items, &envelope, orientation, plot.height(), seg_cfg);
    // Into chart coordinates.
    stack.offset_y += plot.y1;
    for stacked in stack.segments.iter_mut() {
        stacked.display_top += plot.y1;
        stacked.display_bottom += plot.y1;
    }

    let center_x = (plot.x1 + plot.x2) / 2.0;
    let category_font = theme.category_font();
    let labels = stack
        .segments
        .iter()
        .enumerate()
        .filter(|(_, stacked)| stacked.visible)
        .map(|(idx, stacked)| {
            let available_width =
                (stacked.segment.mid_width() - 2.0 * seg_cfg.label_padding).max(0.0);
            let fitted = fit_text_in_box(
                &stacked.segment.item.category,
                &category_font,
                available_width,
                stacked.segment.height(),
                &config.text,
                metrics,
            );
            SegmentLabel {
                segment: idx,
                category: PositionedText {
                    x: center_x,
                    y: stacked.display_center_y(),
                    anchor: TextAnchor::Middle,
                    text: fitted,
                },
                value: format_percent(stacked.segment.item.share),
            }
        })
        .collect();

    DiagramData::Segments(SegmentChartLayout {
        center_x,
        stack,
        labels,
        total,
    })
}

fn compute_shape_chart(
    request: &ChartRequest,
    kind: ShapeKind,
    theme: &Theme,
    config: &LayoutConfig,
    metrics: &dyn TextMetricsProvider,
    plot: &Bounds,
) -> DiagramData {
    let sort = request.sort.unwrap_or(config.normalize.shape_sort);
    let items = match normalize_values(&request.records, sort, request.validity) {
        Normalized::Items { items, .. } => items,
        Normalized::Empty(reason) => return DiagramData::Empty(reason),
    };
    let (rows, cols) = grid_dimensions(items.len());
    let shapes = size_shapes(&items, plot, kind, &config.shapes);
    let max_value = items
        .iter()
        .map(|item| item.raw_value)
        .fold(0.0f64, f64::max);

    let category_font = theme.category_font();
    let value_font = theme.value_font();
    let line_height = config.text.line_height.max(1.0);
    let keep = (1.0 - config.shapes.spacing_ratio).clamp(0.0, 1.0);
    let label_gap = config.shapes.label_gap.max(0.0);

    let mut category_labels = Vec::with_capacity(shapes.len());
    let mut value_labels = Vec::with_capacity(shapes.len());
    for shape in &shapes {
        let band = shape.cell.cell_width * keep;
        let (above, below) = shape.vertical_extent();

        let category = truncate_to_fit(
            &shape.item.category,
            &category_font,
            band,
            &config.text,
            metrics,
        );
        let category_half = category.font_size * line_height / 2.0;
        category_labels.push(PositionedText {
            x: shape.cell.center_x,
            y: shape.cell.center_y - above - label_gap - category_half,
            anchor: TextAnchor::Middle,
            text: category,
        });

        let value = fit_font_size(
            &format_value(shape.item.raw_value),
            &value_font,
            band,
            &config.text,
            metrics,
        );
        let value_half = value.font_size * line_height / 2.0;
        value_labels.push(PositionedText {
            x: shape.cell.center_x,
            y: shape.cell.center_y + below + label_gap + value_half,
            anchor: TextAnchor::Middle,
            text: value,
        });
    }

    DiagramData::Shapes(ShapeChartLayout {
        rows,
        cols,
        shapes,
        category_labels,
        value_labels,
        max_value,
    })
}

fn compute_scatter_chart(
    request: &ChartRequest,
    theme: &Theme,
    config: &LayoutConfig,
    metrics: &dyn TextMetricsProvider,
    plot: &Bounds,
) -> DiagramData {
    if request.points.is_empty() {
        return DiagramData::Empty(EmptyReason::NoPoints);
    }
    let font = theme.point_font();
    let line_height = config.text.line_height.max(1.0);
    let mut anchors = Vec::with_capacity(request.points.len());
    let mut texts = Vec::with_capacity(request.points.len());
    for point in &request.points {
        let label = if point.label.trim().is_empty() {
            point.id.as_str()
        } else {
            point.label.as_str()
        };
        let fitted = truncate_to_fit(
            label,
            &font,
            config.labels.max_label_width,
            &config.text,
            metrics,
        );
        let (label_width, label_height) = if fitted.hidden {
            (0.0, 0.0)
        } else {
            measure_block(&fitted.text, &font, line_height, metrics)
        };
        anchors.push(PlacementAnchor {
            id: point.id.clone(),
            x: point.x,
            y: point.y,
            marker_radius: point
                .radius
                .filter(|r| r.is_finite() && *r >= 0.0)
                .unwrap_or(config.labels.default_marker_radius),
            label_width,
            label_height,
        });
        texts.push(fitted);
    }

    let resolution = match request.order.as_deref() {
        Some(order) => resolve_labels_in_order(&anchors, order, plot, &config.labels),
        None => resolve_labels(&anchors, plot, &config.labels),
    };
    DiagramData::Scatter(ScatterLayout {
        anchors,
        texts,
        labels: resolution.labels,
        passes: resolution.passes,
        overlaps: resolution.overlaps,
    })
}

/// Two decimals at most, integers without a fraction.
pub fn format_value(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if (rounded - rounded.round()).abs() < 0.001 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.2}", rounded)
    }
}

pub fn format_percent(share: f64) -> String {
    format!("{}%", format_value(share * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SegmentConfig, TruncationFallback};
    use crate::ir::{DataRecord, ScatterPoint};
    use super::text::FixedAdvanceMeasurer;

    fn records(values: &[(&str, f64)]) -> Vec<DataRecord> {
        values
            .iter()
            .map(|(category, value)| DataRecord::new(*category, *value))
            .collect()
    }

    fn tight_config() -> LayoutConfig {
        LayoutConfig {
            margin: 0.0,
            segments: SegmentConfig {
                gap: 0.0,
                ..SegmentConfig::default()
            },
            ..LayoutConfig::default()
        }
    }

    fn segments(layout: &Layout) -> &SegmentChartLayout {
        match &layout.diagram {
            DiagramData::Segments(chart) => chart,
            other => panic!("expected segments, got {other:?}"),
        }
    }

    #[test]
    fn pyramid_segments_fill_plot_with_proportional_areas() {
        let request = ChartRequest::new(ChartKind::Pyramid, 300.0, 200.0).with_records(records(&[
            ("C", 70.0),
            ("A", 10.0),
            ("B", 20.0),
        ]));
        let layout = compute_layout(
            &request,
            &Theme::default(),
            &tight_config(),
            &FixedAdvanceMeasurer::default(),
        );
        let chart = segments(&layout);
        assert_eq!(chart.total, 100.0);
        assert_eq!(chart.center_x, 150.0);
        let areas: Vec<f64> = chart.stack.segments.iter().map(|s| s.segment.area()).collect();
        let total_area: f64 = areas.iter().sum();
        assert!((total_area - 30_000.0).abs() < 1e-6 * 30_000.0);
        assert!((areas[1] / areas[0] - 2.0).abs() < 0.02);
        assert!((areas[2] / areas[0] - 7.0).abs() < 0.07);
        assert!(chart.stack.segments[0].display_top.abs() < 1e-9);
        let values: Vec<&str> = chart.labels.iter().map(|l| l.value.as_str()).collect();
        assert_eq!(values, vec!["10%", "20%", "70%"]);
    }

    #[test]
    fn funnel_puts_first_item_at_wide_top() {
        let request = ChartRequest::new(ChartKind::Funnel, 300.0, 200.0).with_records(records(&[
            ("Sales", 10.0),
            ("Visits", 100.0),
            ("Leads", 50.0),
        ]));
        let layout = compute_layout(
            &request,
            &Theme::default(),
            &tight_config(),
            &FixedAdvanceMeasurer::default(),
        );
        let chart = segments(&layout);
        let stack = &chart.stack.segments;
        assert_eq!(stack[0].segment.item.category, "Visits");
        assert!((stack[0].segment.top_width - 300.0).abs() < 1e-6);
        assert!((stack[2].segment.bottom_width - 60.0).abs() < 1e-6);
        assert!(stack[0].display_top < stack[1].display_top);
        assert!(stack[1].display_top < stack[2].display_top);
    }

    #[test]
    fn narrow_segment_label_is_scaled_then_truncated() {
        let request = ChartRequest::new(ChartKind::Pyramid, 300.0, 200.0).with_records(records(&[
            ("Extremely long category name", 10.0),
            ("B", 20.0),
            ("C", 70.0),
        ]));
        let config = tight_config();
        let layout = compute_layout(
            &request,
            &Theme::default(),
            &config,
            &FixedAdvanceMeasurer::default(),
        );
        let chart = segments(&layout);
        let label = &chart.labels[0].category.text;
        let available =
            chart.stack.segments[0].segment.mid_width() - 2.0 * config.segments.label_padding;
        assert!(label.truncated);
        assert_eq!(label.font_size, config.text.min_font_size);
        assert!(label.width <= available + 1e-9);
        assert!(label.text.ends_with('…'));
    }

    #[test]
    fn title_reserves_band_above_plot() {
        let request = ChartRequest::new(ChartKind::Pyramid, 600.0, 400.0)
            .with_title("Sales")
            .with_records(records(&[("A", 1.0), ("B", 2.0)]));
        let layout = compute_layout(
            &request,
            &Theme::default(),
            &LayoutConfig::default(),
            &FixedAdvanceMeasurer::default(),
        );
        let title = layout.title.as_ref().expect("title");
        assert_eq!(title.text.text, "Sales");
        assert_eq!(title.x, 300.0);
        let chart = segments(&layout);
        // margin 20 + 20px title at 1.2 line height + 4px padding
        assert!(chart.stack.segments[0].display_top >= 48.0 - 1e-9);
        let last = chart.stack.segments.last().expect("segments");
        assert!(last.display_bottom <= 380.0 + 1e-9);
    }

    #[test]
    fn degenerate_records_produce_empty_layout() {
        let request = ChartRequest::new(ChartKind::Funnel, 300.0, 200.0)
            .with_records(records(&[("a", 0.0), ("b", -1.0)]));
        let layout = compute_layout(
            &request,
            &Theme::default(),
            &LayoutConfig::default(),
            &FixedAdvanceMeasurer::default(),
        );
        assert!(layout.is_empty());
        assert_eq!(
            layout.diagram,
            DiagramData::Empty(EmptyReason::NoValidRecords)
        );

        let scatter = ChartRequest::new(ChartKind::Scatter, 300.0, 200.0);
        let layout = compute_layout(
            &scatter,
            &Theme::default(),
            &LayoutConfig::default(),
            &FixedAdvanceMeasurer::default(),
        );
        assert_eq!(layout.diagram, DiagramData::Empty(EmptyReason::NoPoints));
    }

    #[test]
    fn shape_labels_sit_above_and_below_each_shape() {
        let request = ChartRequest::new(ChartKind::Circles, 600.0, 400.0).with_records(records(&[
            ("North", 40.0),
            ("South", 10.0),
            ("East", 25.0),
            ("West", 5.0),
        ]));
        let layout = compute_layout(
            &request,
            &Theme::default(),
            &LayoutConfig::default(),
            &FixedAdvanceMeasurer::default(),
        );
        let DiagramData::Shapes(chart) = &layout.diagram else {
            panic!("expected shapes");
        };
        assert_eq!((chart.rows, chart.cols), (2, 2));
        assert_eq!(chart.max_value, 40.0);
        assert_eq!(chart.shapes.len(), 4);
        for (idx, shape) in chart.shapes.iter().enumerate() {
            assert!(chart.category_labels[idx].y < shape.cell.center_y - shape.size);
            assert!(chart.value_labels[idx].y > shape.cell.center_y + shape.size);
        }
        assert_eq!(chart.value_labels[0].text.text, "40");
        assert!(chart.shapes[0].size > chart.shapes[1].size);
    }

    #[test]
    fn scatter_labels_resolve_without_overlap() {
        let point = |id: &str, x: f64, y: f64| ScatterPoint {
            id: id.to_string(),
            x,
            y,
            radius: None,
            label: id.to_string(),
        };
        let mut request = ChartRequest::new(ChartKind::Scatter, 600.0, 400.0).with_points(vec![
            point("alpha", 100.0, 100.0),
            point("beta", 300.0, 200.0),
            point("gamma", 450.0, 300.0),
        ]);
        request.order = Some(vec![2, 1, 0]);
        let layout = compute_layout(
            &request,
            &Theme::default(),
            &LayoutConfig::default(),
            &FixedAdvanceMeasurer::default(),
        );
        let DiagramData::Scatter(chart) = &layout.diagram else {
            panic!("expected scatter");
        };
        assert_eq!(chart.labels.len(), 3);
        assert_eq!(chart.overlaps, 0);
        assert_eq!(chart.anchors[0].marker_radius, 4.0);
        assert!((chart.anchors[0].label_width - 36.0).abs() < 1e-9);
        assert!(chart.labels.iter().all(|label| label.candidate == 0));
    }

    fn scatter(layout: &Layout) -> &ScatterLayout {
        match &layout.diagram {
            DiagramData::Scatter(chart) => chart,
            other => panic!("expected scatter, got {other:?}"),
        }
    }

    #[test]
    fn hidden_scatter_labels_take_no_space() {
        let mut config = LayoutConfig::default();
        config.text.truncation_fallback = TruncationFallback::Hide;
        config.labels.max_label_width = 1.0;
        let request = ChartRequest::new(ChartKind::Scatter, 600.0, 400.0).with_points(vec![
            ScatterPoint {
                id: "alpha".to_string(),
                x: 100.0,
                y: 100.0,
                radius: None,
                label: "alpha".to_string(),
            },
            ScatterPoint {
                id: "beta".to_string(),
                x: 110.0,
                y: 100.0,
                radius: None,
                label: "beta".to_string(),
            },
        ]);
        let layout = compute_layout(
            &request,
            &Theme::default(),
            &config,
            &FixedAdvanceMeasurer::default(),
        );
        let chart = scatter(&layout);
        assert!(chart.texts.iter().all(|text| text.hidden));
        assert!(
            chart
                .anchors
                .iter()
                .all(|a| a.label_width == 0.0 && a.label_height == 0.0)
        );
        assert_eq!(chart.overlaps, 0);
        assert!(chart.labels.iter().all(|label| !label.overlapping));
    }

    #[test]
    fn enormous_bubble_radius_still_lays_out() {
        let request = ChartRequest::new(ChartKind::Scatter, 600.0, 400.0).with_points(vec![
            ScatterPoint {
                id: "big".to_string(),
                x: 100.0,
                y: 100.0,
                radius: Some(1e6),
                label: "big".to_string(),
            },
            ScatterPoint {
                id: "small".to_string(),
                x: 300.0,
                y: 200.0,
                radius: None,
                label: "small".to_string(),
            },
        ]);
        let layout = compute_layout(
            &request,
            &Theme::default(),
            &LayoutConfig::default(),
            &FixedAdvanceMeasurer::default(),
        );
        let chart = scatter(&layout);
        assert_eq!(chart.labels.len(), 2);
        assert_eq!(chart.anchors[0].marker_radius, 1e6);
        assert!(chart.passes <= LayoutConfig::default().labels.max_passes);
    }

    #[test]
    fn value_formatting_drops_integer_fraction() {
        assert_eq!(format_value(40.0), "40");
        assert_eq!(format_value(12.346), "12.35");
        assert_eq!(format_percent(0.1), "10%");
        assert_eq!(format_percent(1.0 / 3.0), "33.33%");
    }
}
