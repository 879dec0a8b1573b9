//! Area-proportional subdivision of a tapering envelope (pyramid and funnel
//! charts).
//!
//! Segments are solved one at a time from the apex: the width at the current
//! stacked height is the known edge of the next trapezoid, and its height is
//! the positive root of the trapezoid-area quadratic. Successive solves drift
//! slightly, so the stack is rescaled to the envelope height afterwards, with
//! widths recomputed from the taper rather than scaled.

use crate::config::SegmentConfig;

use super::{Envelope, Orientation, Segment, SegmentStack, StackedSegment, ValueItem};

/// Stack segments from the narrow end (`y = 0`) towards the wide end.
pub fn segment_envelope(
    items: &[ValueItem],
    envelope: &Envelope,
    config: &SegmentConfig,
) -> Vec<Segment> {
    if items.is_empty() || envelope.max_height <= 0.0 {
        return Vec::new();
    }
    let taper = envelope.taper();
    let total_area = envelope.area();

    let mut accumulated = 0.0;
    let mut segments = Vec::with_capacity(items.len());
    for item in items {
        let boundary = envelope.width_at(accumulated);
        let target = total_area * item.share;
        let height = solve_segment_height(
            taper / 2.0,
            boundary,
            -target,
            envelope.max_height * item.share,
            config.coefficient_epsilon,
        );
        segments.push(Segment {
            item: item.clone(),
            top_y: accumulated,
            bottom_y: accumulated + height,
            top_width: boundary,
            bottom_width: boundary + taper * height,
        });
        accumulated += height;
    }

    normalize_heights(&mut segments, envelope, accumulated, config.height_epsilon);
    segments
}

/// Positive root of `a·h² + b·h + c = 0` for a segment height.
///
/// `a ≈ 0` degrades to the linear solve `b·h = -c` (and to zero when `b` is
/// also ≈ 0). A negative discriminant returns `fallback`.
pub fn solve_segment_height(a: f64, b: f64, c: f64, fallback: f64, epsilon: f64) -> f64 {
    if a.abs() <= epsilon {
        if b.abs() <= epsilon {
            return 0.0;
        }
        return (-c / b).max(0.0);
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        tracing::warn!(
            a,
            b,
            c,
            fallback,
            "negative discriminant, using proportional height"
        );
        return fallback.max(0.0);
    }
    let root = discriminant.sqrt();
    // (-b + √d) / 2a rewritten as -2c / (b + √d) to avoid cancellation when
    // the taper is shallow.
    let denominator = b + root;
    let height = if denominator.abs() > epsilon {
        -2.0 * c / denominator
    } else {
        (-b + root) / (2.0 * a)
    };
    if height.is_finite() {
        height.max(0.0)
    } else {
        fallback.max(0.0)
    }
}

fn normalize_heights(
    segments: &mut [Segment],
    envelope: &Envelope,
    accumulated: f64,
    epsilon: f64,
) {
    if segments.is_empty() {
        return;
    }
    if accumulated <= epsilon {
        // Every solve degenerated; lay proportional heights end to end.
        tracing::warn!(
            count = segments.len(),
            "degenerate envelope, using proportional heights"
        );
        let mut y = 0.0;
        for segment in segments.iter_mut() {
            let height = envelope.max_height * segment.item.share;
            set_span(segment, envelope, y, y + height);
            y += height;
        }
        return;
    }
    if (accumulated - envelope.max_height).abs() <= epsilon {
        return;
    }
    let scale = envelope.max_height / accumulated;
    tracing::debug!(accumulated, scale, "rescaling segment stack to envelope height");
    for segment in segments.iter_mut() {
        let top = segment.top_y * scale;
        let bottom = segment.bottom_y * scale;
        set_span(segment, envelope, top, bottom);
    }
}

fn set_span(segment: &mut Segment, envelope: &Envelope, top: f64, bottom: f64) {
    segment.top_y = top;
    segment.bottom_y = bottom.max(top);
    segment.top_width = envelope.width_at(segment.top_y);
    segment.bottom_width = envelope.width_at(segment.bottom_y);
}

/// Segment the envelope in `orientation`, then add the display gaps and
/// centre the stack vertically in `available_height`.
///
/// For `ApexBottom` the items are solved from the bottom apex in reverse and
/// mirrored, so `items[0]` always ends up at the top of the stack and the
/// returned segments keep input order.
pub fn layout_segments(
    items: &[ValueItem],
    envelope: &Envelope,
    orientation: Orientation,
    available_height: f64,
    config: &SegmentConfig,
) -> SegmentStack {
    let segments = match orientation {
        Orientation::ApexTop => segment_envelope(items, envelope, config),
        Orientation::ApexBottom => {
            let reversed: Vec<ValueItem> = items.iter().rev().cloned().collect();
            let mut solved = segment_envelope(&reversed, envelope, config);
            for segment in solved.iter_mut() {
                let top = envelope.max_height - segment.bottom_y;
                let bottom = envelope.max_height - segment.top_y;
                std::mem::swap(&mut segment.top_width, &mut segment.bottom_width);
                segment.top_y = top.max(0.0);
                segment.bottom_y = bottom.max(segment.top_y);
            }
            solved.reverse();
            solved
        }
    };

    let gap = config.gap.max(0.0);
    let visible_count = segments
        .iter()
        .filter(|seg| seg.height() > config.height_epsilon)
        .count();
    let gaps_total = gap * visible_count.saturating_sub(1) as f64;
    let stacked_height = segments.last().map(|seg| seg.bottom_y).unwrap_or(0.0);
    let offset_y = (available_height - (stacked_height + gaps_total)) / 2.0;

    let mut gaps_before = 0usize;
    let mut stacked = Vec::with_capacity(segments.len());
    for segment in segments {
        let visible = segment.height() > config.height_epsilon;
        let shift = offset_y + gap * gaps_before as f64;
        if visible {
            gaps_before += 1;
        }
        stacked.push(StackedSegment {
            display_top: segment.top_y + shift,
            display_bottom: segment.bottom_y + shift,
            visible,
            segment,
        });
    }

    SegmentStack {
        envelope: *envelope,
        orientation,
        gap,
        offset_y,
        segments: stacked,
    }
}
