// Label placement and collision avoidance for scatter and bubble markers.
// Pure geometry: anchors arrive already positioned and measured.
//
// Each anchor tries a fixed list of eight offsets in priority order and keeps
// the first whose box stays inside the plot, misses every label placed so far
// and misses every other marker's exclusion zone. The pass is greedy and
// order-dependent; a few bounded refinement passes re-run it with the
// previous pass's placements as extra obstacles.

use std::collections::{HashMap, HashSet};

use crate::config::LabelPlacementConfig;

use super::{Bounds, LabelCandidate, PlacedLabel, PlacementAnchor, TextAnchor};

const DIAGONAL: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Right, top, left, bottom, then the four diagonals.
pub const SCATTER_CANDIDATES: [LabelCandidate; 8] = [
    LabelCandidate {
        dx: 1.0,
        dy: 0.0,
        anchor: TextAnchor::Start,
        priority: 0,
    },
    LabelCandidate {
        dx: 0.0,
        dy: -1.0,
        anchor: TextAnchor::Middle,
        priority: 1,
    },
    LabelCandidate {
        dx: -1.0,
        dy: 0.0,
        anchor: TextAnchor::End,
        priority: 2,
    },
    LabelCandidate {
        dx: 0.0,
        dy: 1.0,
        anchor: TextAnchor::Middle,
        priority: 3,
    },
    LabelCandidate {
        dx: DIAGONAL,
        dy: -DIAGONAL,
        anchor: TextAnchor::Start,
        priority: 4,
    },
    LabelCandidate {
        dx: -DIAGONAL,
        dy: -DIAGONAL,
        anchor: TextAnchor::End,
        priority: 5,
    },
    LabelCandidate {
        dx: -DIAGONAL,
        dy: DIAGONAL,
        anchor: TextAnchor::End,
        priority: 6,
    },
    LabelCandidate {
        dx: DIAGONAL,
        dy: DIAGONAL,
        anchor: TextAnchor::Start,
        priority: 7,
    },
];

#[derive(Debug, Clone, PartialEq)]
pub struct LabelResolution {
    /// One label per anchor, in anchor input order.
    pub labels: Vec<PlacedLabel>,
    pub passes: usize,
    pub overlaps: usize,
}

/// Resolve labels processing anchors in input order.
pub fn resolve_labels(
    anchors: &[PlacementAnchor],
    plot: &Bounds,
    config: &LabelPlacementConfig,
) -> LabelResolution {
    let order: Vec<usize> = (0..anchors.len()).collect();
    resolve_labels_in_order(anchors, &order, plot, config)
}

/// Resolve labels processing anchors in `order`. Out-of-range and repeated
/// indices are skipped; anchors missing from `order` are processed after it,
/// in input order.
pub fn resolve_labels_in_order(
    anchors: &[PlacementAnchor],
    order: &[usize],
    plot: &Bounds,
    config: &LabelPlacementConfig,
) -> LabelResolution {
    if anchors.is_empty() {
        return LabelResolution {
            labels: Vec::new(),
            passes: 0,
            overlaps: 0,
        };
    }
    let order = complete_order(order, anchors.len());
    let markers = MarkerIndex::new(anchors, config);
    let max_passes = config.max_passes.max(1);

    let mut best = run_pass(anchors, &order, plot, config, &markers, None);
    let mut best_overlaps = count_overlaps(&best, anchors, config);
    let mut passes = 1;
    while passes < max_passes && best_overlaps > 0 {
        let next = run_pass(anchors, &order, plot, config, &markers, Some(&best));
        passes += 1;
        let overlaps = count_overlaps(&next, anchors, config);
        tracing::debug!(pass = passes, overlaps, "label refinement pass");
        if overlaps >= best_overlaps {
            break;
        }
        best = next;
        best_overlaps = overlaps;
    }

    LabelResolution {
        labels: best,
        passes,
        overlaps: best_overlaps,
    }
}

fn complete_order(order: &[usize], len: usize) -> Vec<usize> {
    let mut seen = vec![false; len];
    let mut full = Vec::with_capacity(len);
    for &idx in order {
        if idx < len && !seen[idx] {
            seen[idx] = true;
            full.push(idx);
        }
    }
    full.extend((0..len).filter(|idx| !seen[*idx]));
    full
}

fn run_pass(
    anchors: &[PlacementAnchor],
    order: &[usize],
    plot: &Bounds,
    config: &LabelPlacementConfig,
    markers: &MarkerIndex,
    previous: Option<&[PlacedLabel]>,
) -> Vec<PlacedLabel> {
    let mut placed: Vec<Option<PlacedLabel>> = vec![None; anchors.len()];
    let mut placed_grid = ObstacleGrid::new(config.grid_cell);
    let mut pending_grid = ObstacleGrid::new(config.grid_cell);
    if let Some(previous) = previous {
        for (idx, label) in previous.iter().enumerate() {
            if has_label(&anchors[idx]) {
                pending_grid.insert(idx, &label.bounds);
            }
        }
    }
    let mut processed = vec![false; anchors.len()];

    for &idx in order {
        let anchor = &anchors[idx];
        if !has_label(anchor) {
            placed[idx] = Some(candidate_label(anchor, &SCATTER_CANDIDATES[0], config));
            processed[idx] = true;
            continue;
        }
        let mut chosen: Option<PlacedLabel> = None;
        for candidate in &SCATTER_CANDIDATES {
            let label = candidate_label(anchor, candidate, config);
            if !plot.contains(&label.bounds) {
                continue;
            }
            let hits_placed = placed_grid.query(&label.bounds).any(|other| {
                placed[other]
                    .as_ref()
                    .is_some_and(|p| p.bounds.intersects(&label.bounds))
            });
            if hits_placed {
                continue;
            }
            let hits_pending = previous.is_some_and(|previous| {
                pending_grid.query(&label.bounds).any(|other| {
                    other != idx
                        && !processed[other]
                        && previous[other].bounds.intersects(&label.bounds)
                })
            });
            if hits_pending {
                continue;
            }
            if markers.hits(&label.bounds, idx) {
                continue;
            }
            chosen = Some(label);
            break;
        }
        let label = chosen.unwrap_or_else(|| {
            tracing::warn!(anchor = %anchor.id, "no free label candidate, forcing first");
            let mut forced = candidate_label(anchor, &SCATTER_CANDIDATES[0], config);
            forced.overlapping = true;
            forced
        });
        placed_grid.insert(idx, &label.bounds);
        placed[idx] = Some(label);
        processed[idx] = true;
    }

    placed.into_iter().flatten().collect()
}

/// Label position and box for `anchor` at `candidate`.
///
/// Offsets are measured from the marker edge: `marker_radius + label_gap`.
/// Vertical candidates also move by half the label height so the box, not
/// its centre line, clears the marker.
pub fn candidate_label(
    anchor: &PlacementAnchor,
    candidate: &LabelCandidate,
    config: &LabelPlacementConfig,
) -> PlacedLabel {
    let distance = anchor.marker_radius.max(0.0) + config.label_gap;
    let half_h = anchor.label_height / 2.0;
    let vertical_sign = if candidate.dy > 0.0 {
        1.0
    } else if candidate.dy < 0.0 {
        -1.0
    } else {
        0.0
    };
    let x = anchor.x + candidate.dx * distance;
    let y = anchor.y + candidate.dy * distance + vertical_sign * half_h;
    let (x1, x2) = match candidate.anchor {
        TextAnchor::Start => (x, x + anchor.label_width),
        TextAnchor::Middle => (x - anchor.label_width / 2.0, x + anchor.label_width / 2.0),
        TextAnchor::End => (x - anchor.label_width, x),
    };
    PlacedLabel {
        anchor_id: anchor.id.clone(),
        x,
        y,
        anchor: candidate.anchor,
        bounds: Bounds::new(x1, y - half_h, x2, y + half_h),
        candidate: candidate.priority,
        overlapping: false,
    }
}

/// Label-label intersections plus labels entering another marker's
/// exclusion zone. `labels[i]` belongs to `anchors[i]`; hidden labels
/// count for nothing.
pub fn count_overlaps(
    labels: &[PlacedLabel],
    anchors: &[PlacementAnchor],
    config: &LabelPlacementConfig,
) -> usize {
    let visible = |i: usize| anchors.get(i).is_none_or(has_label);
    let mut count = 0;
    for (i, a) in labels.iter().enumerate() {
        if !visible(i) {
            continue;
        }
        for (j, b) in labels.iter().enumerate().skip(i + 1) {
            if visible(j) && a.bounds.intersects(&b.bounds) {
                count += 1;
            }
        }
    }
    for (i, label) in labels.iter().enumerate() {
        if !visible(i) {
            continue;
        }
        for (j, anchor) in anchors.iter().enumerate() {
            if i == j {
                continue;
            }
            let radius = exclusion_radius(anchor, config);
            if label.bounds.intersects_circle(anchor.x, anchor.y, radius) {
                count += 1;
            }
        }
    }
    count
}

fn exclusion_radius(anchor: &PlacementAnchor, config: &LabelPlacementConfig) -> f64 {
    anchor.marker_radius.max(config.exclusion_radius)
}

/// Hidden labels are placed but never block or count.
fn has_label(anchor: &PlacementAnchor) -> bool {
    anchor.label_width > 0.0 && anchor.label_height > 0.0
}

/// Obstacles spanning more grid cells than this skip the buckets.
const MAX_SPAN_CELLS: i128 = 64;

struct MarkerIndex<'a> {
    anchors: &'a [PlacementAnchor],
    radii: Vec<f64>,
    grid: ObstacleGrid,
}

impl<'a> MarkerIndex<'a> {
    fn new(anchors: &'a [PlacementAnchor], config: &LabelPlacementConfig) -> Self {
        let mut grid = ObstacleGrid::new(config.grid_cell);
        let mut radii = Vec::with_capacity(anchors.len());
        for (idx, anchor) in anchors.iter().enumerate() {
            let radius = exclusion_radius(anchor, config);
            grid.insert(
                idx,
                &Bounds::new(
                    anchor.x - radius,
                    anchor.y - radius,
                    anchor.x + radius,
                    anchor.y + radius,
                ),
            );
            radii.push(radius);
        }
        Self {
            anchors,
            radii,
            grid,
        }
    }

    fn hits(&self, rect: &Bounds, own: usize) -> bool {
        self.grid.query(rect).any(|idx| {
            let anchor = &self.anchors[idx];
            idx != own && rect.intersects_circle(anchor.x, anchor.y, self.radii[idx])
        })
    }
}

/// Uniform grid over obstacle boxes for fast candidate queries.
///
/// Boxes covering more than `MAX_SPAN_CELLS` cells go to `wide` and are
/// returned by every query, so work stays linear in the obstacle count
/// whatever the marker radius.
struct ObstacleGrid {
    cell: f64,
    /// Maps grid cell (ix, iy) to obstacle indices.
    cells: HashMap<(i64, i64), Vec<usize>>,
    wide: Vec<usize>,
    all: Vec<usize>,
}

impl ObstacleGrid {
    fn new(cell: f64) -> Self {
        Self {
            cell: cell.max(16.0),
            cells: HashMap::new(),
            wide: Vec::new(),
            all: Vec::new(),
        }
    }

    /// Cell range covered by `rect`, or `None` when it is too large to walk.
    fn span(&self, rect: &Bounds) -> Option<(i64, i64, i64, i64)> {
        let x0 = (rect.x1 / self.cell).floor() as i64;
        let y0 = (rect.y1 / self.cell).floor() as i64;
        let x1 = (rect.x2 / self.cell).floor() as i64;
        let y1 = (rect.y2 / self.cell).floor() as i64;
        let cols = (x1 as i128 - x0 as i128 + 1).max(0);
        let rows = (y1 as i128 - y0 as i128 + 1).max(0);
        (cols * rows <= MAX_SPAN_CELLS).then_some((x0, y0, x1, y1))
    }

    fn insert(&mut self, idx: usize, rect: &Bounds) {
        self.all.push(idx);
        let Some((x0, y0, x1, y1)) = self.span(rect) else {
            self.wide.push(idx);
            return;
        };
        for ix in x0..=x1 {
            for iy in y0..=y1 {
                self.cells.entry((ix, iy)).or_default().push(idx);
            }
        }
    }

    /// Indices of obstacles that could overlap `rect`.
    fn query(&self, rect: &Bounds) -> Box<dyn Iterator<Item = usize> + '_> {
        let Some((x0, y0, x1, y1)) = self.span(rect) else {
            return Box::new(self.all.iter().copied());
        };
        let mut seen = HashSet::new();
        let bucketed = (x0..=x1)
            .flat_map(move |ix| (y0..=y1).map(move |iy| (ix, iy)))
            .flat_map(move |key| {
                self.cells
                    .get(&key)
                    .map(|v| v.as_slice())
                    .unwrap_or(&[])
                    .iter()
                    .copied()
            });
        Box::new(
            self.wide
                .iter()
                .copied()
                .chain(bucketed)
                .filter(move |idx| seen.insert(*idx)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(id: &str, x: f64, y: f64) -> PlacementAnchor {
        PlacementAnchor {
            id: id.to_string(),
            x,
            y,
            marker_radius: 4.0,
            label_width: 40.0,
            label_height: 12.0,
        }
    }

    fn pairwise_intersections(labels: &[PlacedLabel]) -> usize {
        let mut count = 0;
        for (i, a) in labels.iter().enumerate() {
            for b in &labels[i + 1..] {
                if a.bounds.intersects(&b.bounds) {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn candidates_are_priority_ordered() {
        for (idx, candidate) in SCATTER_CANDIDATES.iter().enumerate() {
            assert_eq!(candidate.priority as usize, idx);
        }
    }

    #[test]
    fn right_candidate_box_starts_past_marker() {
        let config = LabelPlacementConfig::default();
        let label = candidate_label(&anchor("a", 100.0, 100.0), &SCATTER_CANDIDATES[0], &config);
        assert_eq!(label.x, 108.0);
        assert_eq!(label.bounds, Bounds::new(108.0, 94.0, 148.0, 106.0));
        let top = candidate_label(&anchor("a", 100.0, 100.0), &SCATTER_CANDIDATES[1], &config);
        assert_eq!(top.bounds, Bounds::new(80.0, 80.0, 120.0, 92.0));
    }

    #[test]
    fn well_separated_anchors_do_not_overlap() {
        let anchors = vec![
            anchor("a", 50.0, 50.0),
            anchor("b", 200.0, 120.0),
            anchor("c", 100.0, 250.0),
        ];
        let plot = Bounds::from_size(400.0, 400.0);
        let result = resolve_labels(&anchors, &plot, &LabelPlacementConfig::default());
        assert_eq!(result.labels.len(), 3);
        assert_eq!(pairwise_intersections(&result.labels), 0);
        assert_eq!(result.overlaps, 0);
        assert_eq!(result.passes, 1);
        assert!(result.labels.iter().all(|l| l.candidate == 0 && !l.overlapping));
    }

    #[test]
    fn crowded_neighbour_moves_to_another_side() {
        // b sits where a's right-hand label would go.
        let anchors = vec![anchor("a", 100.0, 100.0), anchor("b", 130.0, 100.0)];
        let plot = Bounds::from_size(400.0, 400.0);
        let result = resolve_labels(&anchors, &plot, &LabelPlacementConfig::default());
        assert_ne!(result.labels[0].candidate, 0);
        assert_eq!(pairwise_intersections(&result.labels), 0);
    }

    #[test]
    fn plot_edge_rejects_candidates() {
        let anchors = vec![anchor("edge", 390.0, 200.0)];
        let plot = Bounds::from_size(400.0, 400.0);
        let result = resolve_labels(&anchors, &plot, &LabelPlacementConfig::default());
        // Right and centred-top both cross x = 400; left fits.
        assert_eq!(result.labels[0].candidate, 2);
        assert_eq!(result.labels[0].anchor, TextAnchor::End);
        assert!(plot.contains(&result.labels[0].bounds));
    }

    #[test]
    fn impossible_layout_forces_first_candidate() {
        let anchors = vec![anchor("tiny", 10.0, 10.0)];
        let plot = Bounds::from_size(20.0, 20.0);
        let result = resolve_labels(&anchors, &plot, &LabelPlacementConfig::default());
        assert_eq!(result.labels.len(), 1);
        assert_eq!(result.labels[0].candidate, 0);
        assert!(result.labels[0].overlapping);
    }

    #[test]
    fn explicit_order_changes_who_gets_first_pick() {
        // Right-hand labels of a and b overlap vertically.
        let anchors = vec![anchor("a", 100.0, 100.0), anchor("b", 100.0, 110.0)];
        let plot = Bounds::from_size(400.0, 400.0);
        let config = LabelPlacementConfig::default();
        let forward = resolve_labels_in_order(&anchors, &[0, 1], &plot, &config);
        let backward = resolve_labels_in_order(&anchors, &[1, 0], &plot, &config);
        assert_eq!(forward.labels[0].candidate, 0);
        assert_eq!(forward.labels[1].candidate, 2);
        assert_eq!(backward.labels[1].candidate, 0);
        assert_eq!(backward.labels[0].candidate, 1);
        // Labels always come back in input order.
        assert_eq!(backward.labels[0].anchor_id, "a");
        assert_eq!(backward.labels[1].anchor_id, "b");
        assert_eq!(forward.overlaps, 0);
        assert_eq!(backward.overlaps, 0);
    }

    #[test]
    fn order_is_completed_and_deduplicated() {
        assert_eq!(complete_order(&[2, 2, 9, 0], 4), vec![2, 0, 1, 3]);
    }

    #[test]
    fn resolution_is_deterministic() {
        let anchors: Vec<PlacementAnchor> = (0..30)
            .map(|i| anchor(&format!("p{i}"), (i * 37 % 300) as f64 + 20.0, (i * 53 % 300) as f64 + 20.0))
            .collect();
        let plot = Bounds::from_size(360.0, 360.0);
        let config = LabelPlacementConfig::default();
        let first = resolve_labels(&anchors, &plot, &config);
        let second = resolve_labels(&anchors, &plot, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn hundred_random_points_stay_within_pass_cap() {
        // xorshift keeps the fixture reproducible without a rand dependency.
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 10_000) as f64 / 10_000.0
        };
        let anchors: Vec<PlacementAnchor> = (0..100)
            .map(|i| anchor(&format!("p{i}"), next() * 500.0, next() * 500.0))
            .collect();
        let plot = Bounds::from_size(500.0, 500.0);
        let config = LabelPlacementConfig::default();
        let result = resolve_labels(&anchors, &plot, &config);
        assert_eq!(result.labels.len(), 100);
        assert!(result.passes >= 1 && result.passes <= config.max_passes);
        assert_eq!(result.overlaps, count_overlaps(&result.labels, &anchors, &config));
    }

    #[test]
    fn duplicate_ids_still_count_neighbour_overlaps() {
        let config = LabelPlacementConfig::default();
        let count_with = |first: &str, second: &str| {
            let anchors = vec![anchor(first, 100.0, 100.0), anchor(second, 120.0, 100.0)];
            let labels: Vec<PlacedLabel> = anchors
                .iter()
                .map(|a| candidate_label(a, &SCATTER_CANDIDATES[0], &config))
                .collect();
            count_overlaps(&labels, &anchors, &config)
        };
        assert_eq!(count_with("dup", "dup"), count_with("x", "y"));
        assert!(count_with("dup", "dup") >= 2);
    }

    #[test]
    fn huge_marker_radius_terminates() {
        let mut big = anchor("big", 100.0, 100.0);
        big.marker_radius = 1e6;
        let anchors = vec![big, anchor("small", 300.0, 200.0)];
        let plot = Bounds::from_size(600.0, 400.0);
        let result = resolve_labels(&anchors, &plot, &LabelPlacementConfig::default());
        assert_eq!(result.labels.len(), 2);
        // Every candidate of both anchors leaves the plot or enters the big marker.
        assert!(result.labels.iter().all(|label| label.overlapping));
    }

    #[test]
    fn hidden_labels_do_not_block_neighbours() {
        let mut hidden = anchor("hidden", 100.0, 100.0);
        hidden.label_width = 0.0;
        // b's right-hand box crosses the line a zero-width box would occupy.
        let anchors = vec![hidden, anchor("b", 98.0, 110.0)];
        let plot = Bounds::from_size(400.0, 400.0);
        let result = resolve_labels(&anchors, &plot, &LabelPlacementConfig::default());
        assert!(!result.labels[0].overlapping);
        assert_eq!(result.labels[1].candidate, 0);
        assert_eq!(result.overlaps, 0);
    }

    #[test]
    fn second_pass_frees_a_forced_label() {
        // a can only go up or left; b only fits right or bottom-right, and a's
        // top box covers both. Pass two sends a left because b held that spot.
        let config = LabelPlacementConfig::default();
        let mut b = anchor("b", 10.0, 12.0);
        b.label_width = 100.0;
        let anchors = vec![anchor("a", 100.0, 36.0), b];
        let plot = Bounds::from_size(130.0, 60.0);

        let single = resolve_labels(
            &anchors,
            &plot,
            &LabelPlacementConfig {
                max_passes: 1,
                ..config.clone()
            },
        );
        assert_eq!(single.labels[0].candidate, 1);
        assert!(single.labels[1].overlapping);
        assert_eq!(single.overlaps, 1);

        let refined = resolve_labels(&anchors, &plot, &config);
        assert_eq!(refined.passes, 2);
        assert_eq!(refined.overlaps, 0);
        assert_eq!(refined.labels[0].candidate, 2);
        assert_eq!(refined.labels[1].candidate, 0);
        assert!(refined.labels.iter().all(|label| !label.overlapping));
    }

    #[test]
    fn worse_second_pass_keeps_the_first() {
        // A 24px strip leaves only right and left candidates. c's label is
        // wider than the plot, so it is always forced across the strip; in
        // pass two a must dodge it and is forced onto p's marker.
        let config = LabelPlacementConfig::default();
        let mut c = anchor("c", 40.0, 12.0);
        c.label_width = 1000.0;
        let anchors = vec![anchor("p", 130.0, 12.0), anchor("a", 100.0, 12.0), c];
        let plot = Bounds::from_size(250.0, 24.0);

        let result = resolve_labels(&anchors, &plot, &config);
        assert_eq!(result.passes, 2);
        assert_eq!(result.overlaps, 4);
        assert_eq!(result.labels[0].candidate, 0);
        assert!(!result.labels[0].overlapping);
        assert_eq!(result.labels[1].candidate, 2);
        assert!(!result.labels[1].overlapping);
        assert!(result.labels[2].overlapping);
        assert_eq!(result.overlaps, count_overlaps(&result.labels, &anchors, &config));
    }

    #[test]
    fn obstacle_grid_keeps_wide_boxes_out_of_buckets() {
        let mut grid = ObstacleGrid::new(16.0);
        grid.insert(0, &Bounds::new(-1e6, -1e6, 1e6, 1e6));
        grid.insert(1, &Bounds::new(10.0, 10.0, 20.0, 20.0));
        assert!(grid.cells.len() <= 4);
        let hits: Vec<usize> = grid.query(&Bounds::new(500.0, 500.0, 510.0, 510.0)).collect();
        assert_eq!(hits, vec![0]);
        let all: Vec<usize> = grid.query(&Bounds::new(-1e7, -1e7, 1e7, 1e7)).collect();
        assert_eq!(all, vec![0, 1]);
    }

    #[test]
    fn obstacle_grid_query_finds_nearby_rect() {
        let mut grid = ObstacleGrid::new(20.0);
        grid.insert(0, &Bounds::new(10.0, 10.0, 40.0, 40.0));
        let hits: Vec<usize> = grid.query(&Bounds::new(15.0, 15.0, 20.0, 20.0)).collect();
        assert!(hits.contains(&0));
        let misses: Vec<usize> = grid.query(&Bounds::new(200.0, 200.0, 205.0, 205.0)).collect();
        assert!(misses.is_empty());
    }
}
