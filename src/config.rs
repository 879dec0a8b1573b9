use crate::ir::SortOrder;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What truncate-to-fit does when even one character plus the ellipsis
/// overflows the band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TruncationFallback {
    #[default]
    FirstChar,
    Hide,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    pub pyramid_sort: SortOrder,
    pub funnel_sort: SortOrder,
    pub shape_sort: SortOrder,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            pyramid_sort: SortOrder::Ascending,
            funnel_sort: SortOrder::Descending,
            shape_sort: SortOrder::None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Allowed drift between the stacked height and the envelope height.
    pub height_epsilon: f64,
    /// Magnitude under which a quadratic coefficient counts as zero.
    pub coefficient_epsilon: f64,
    pub gap: f64,
    /// Share of the plot width used by the wide end of the envelope.
    pub width_ratio: f64,
    /// Narrow-end width of funnels relative to the wide end.
    pub funnel_neck_ratio: f64,
    pub label_padding: f64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            height_epsilon: 1e-6,
            coefficient_epsilon: 1e-9,
            gap: 4.0,
            width_ratio: 1.0,
            funnel_neck_ratio: 0.2,
            label_padding: 6.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeGridConfig {
    /// Fraction of each cell axis given up to spacing between shapes.
    pub spacing_ratio: f64,
    pub padding: f64,
    /// Divisor on the inner cell height; the excess is label room above and below the shape.
    pub label_room_factor: f64,
    /// Smallest size a non-zero value is drawn with.
    pub min_visible_size: f64,
    pub label_gap: f64,
}

impl Default for ShapeGridConfig {
    fn default() -> Self {
        Self {
            spacing_ratio: 0.15,
            padding: 2.0,
            label_room_factor: 2.2,
            min_visible_size: 3.0,
            label_gap: 4.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextFitConfig {
    pub padding: f64,
    pub min_font_size: f64,
    pub ellipsis: String,
    pub truncation_fallback: TruncationFallback,
    pub line_height: f64,
}

impl Default for TextFitConfig {
    fn default() -> Self {
        Self {
            padding: 4.0,
            min_font_size: 8.0,
            ellipsis: "\u{2026}".to_string(),
            truncation_fallback: TruncationFallback::FirstChar,
            line_height: 1.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelPlacementConfig {
    /// Distance between a marker's edge and its label.
    pub label_gap: f64,
    /// Minimum clearance kept around every other marker.
    pub exclusion_radius: f64,
    pub default_marker_radius: f64,
    pub max_passes: usize,
    pub max_label_width: f64,
    pub grid_cell: f64,
}

impl Default for LabelPlacementConfig {
    fn default() -> Self {
        Self {
            label_gap: 4.0,
            exclusion_radius: 5.0,
            default_marker_radius: 4.0,
            max_passes: 3,
            max_label_width: 140.0,
            grid_cell: 48.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    pub normalize: NormalizeConfig,
    pub segments: SegmentConfig,
    pub shapes: ShapeGridConfig,
    pub text: TextFitConfig,
    pub labels: LabelPlacementConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 400.0,
            margin: 20.0,
            normalize: NormalizeConfig::default(),
            segments: SegmentConfig::default(),
            shapes: ShapeGridConfig::default(),
            text: TextFitConfig::default(),
            labels: LabelPlacementConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<NumberOrString>,
    title_font_size: Option<NumberOrString>,
    title_font_weight: Option<String>,
    category_font_size: Option<NumberOrString>,
    category_font_weight: Option<String>,
    value_font_size: Option<NumberOrString>,
    value_font_weight: Option<String>,
    point_font_size: Option<NumberOrString>,
    point_font_weight: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum NumberOrString {
    Number(f64),
    String(String),
}

impl NumberOrString {
    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            NumberOrString::Number(val) => Some(*val),
            NumberOrString::String(val) => val.trim().trim_end_matches("px").parse::<f64>().ok(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct NormalizeConfigFile {
    pyramid_sort: Option<SortOrder>,
    funnel_sort: Option<SortOrder>,
    shape_sort: Option<SortOrder>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SegmentConfigFile {
    height_epsilon: Option<f64>,
    coefficient_epsilon: Option<f64>,
    gap: Option<f64>,
    width_ratio: Option<f64>,
    funnel_neck_ratio: Option<f64>,
    label_padding: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ShapeGridConfigFile {
    spacing_ratio: Option<f64>,
    padding: Option<f64>,
    label_room_factor: Option<f64>,
    min_visible_size: Option<f64>,
    label_gap: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct TextFitConfigFile {
    padding: Option<f64>,
    min_font_size: Option<f64>,
    ellipsis: Option<String>,
    truncation_fallback: Option<TruncationFallback>,
    line_height: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LabelPlacementConfigFile {
    label_gap: Option<f64>,
    exclusion_radius: Option<f64>,
    default_marker_radius: Option<f64>,
    max_passes: Option<usize>,
    max_label_width: Option<f64>,
    grid_cell: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    width: Option<f64>,
    height: Option<f64>,
    margin: Option<f64>,
    normalize: Option<NormalizeConfigFile>,
    segments: Option<SegmentConfigFile>,
    shapes: Option<ShapeGridConfigFile>,
    text: Option<TextFitConfigFile>,
    labels: Option<LabelPlacementConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = serde_json::from_str(contents)?;
    let mut config = Config::default();

    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "compact" => config.theme = Theme::compact(),
            "default" | "base" => config.theme = Theme::default_theme(),
            other => tracing::warn!(theme = other, "unknown theme name, keeping default"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        if let Some(v) = vars.font_family {
            theme.font_family = v;
        }
        if let Some(v) = vars.font_size.as_ref().and_then(NumberOrString::as_f64) {
            theme.font_size = v;
        }
        if let Some(v) = vars.title_font_size.as_ref().and_then(NumberOrString::as_f64) {
            theme.title_font_size = v;
        }
        if let Some(v) = vars.title_font_weight {
            theme.title_font_weight = v;
        }
        if let Some(v) = vars
            .category_font_size
            .as_ref()
            .and_then(NumberOrString::as_f64)
        {
            theme.category_font_size = v;
        }
        if let Some(v) = vars.category_font_weight {
            theme.category_font_weight = v;
        }
        if let Some(v) = vars.value_font_size.as_ref().and_then(NumberOrString::as_f64) {
            theme.value_font_size = v;
        }
        if let Some(v) = vars.value_font_weight {
            theme.value_font_weight = v;
        }
        if let Some(v) = vars.point_font_size.as_ref().and_then(NumberOrString::as_f64) {
            theme.point_font_size = v;
        }
        if let Some(v) = vars.point_font_weight {
            theme.point_font_weight = v;
        }
    }

    let layout = &mut config.layout;
    if let Some(v) = parsed.width {
        layout.width = v;
    }
    if let Some(v) = parsed.height {
        layout.height = v;
    }
    if let Some(v) = parsed.margin {
        layout.margin = v;
    }

    if let Some(normalize) = parsed.normalize {
        if let Some(v) = normalize.pyramid_sort {
            layout.normalize.pyramid_sort = v;
        }
        if let Some(v) = normalize.funnel_sort {
            layout.normalize.funnel_sort = v;
        }
        if let Some(v) = normalize.shape_sort {
            layout.normalize.shape_sort = v;
        }
    }

    if let Some(segments) = parsed.segments {
        let cfg = &mut layout.segments;
        if let Some(v) = segments.height_epsilon {
            cfg.height_epsilon = v;
        }
        if let Some(v) = segments.coefficient_epsilon {
            cfg.coefficient_epsilon = v;
        }
        if let Some(v) = segments.gap {
            cfg.gap = v;
        }
        if let Some(v) = segments.width_ratio {
            cfg.width_ratio = v;
        }
        if let Some(v) = segments.funnel_neck_ratio {
            cfg.funnel_neck_ratio = v;
        }
        if let Some(v) = segments.label_padding {
            cfg.label_padding = v;
        }
    }

    if let Some(shapes) = parsed.shapes {
        let cfg = &mut layout.shapes;
        if let Some(v) = shapes.spacing_ratio {
            cfg.spacing_ratio = v;
        }
        if let Some(v) = shapes.padding {
            cfg.padding = v;
        }
        if let Some(v) = shapes.label_room_factor {
            cfg.label_room_factor = v;
        }
        if let Some(v) = shapes.min_visible_size {
            cfg.min_visible_size = v;
        }
        if let Some(v) = shapes.label_gap {
            cfg.label_gap = v;
        }
    }

    if let Some(text) = parsed.text {
        let cfg = &mut layout.text;
        if let Some(v) = text.padding {
            cfg.padding = v;
        }
        if let Some(v) = text.min_font_size {
            cfg.min_font_size = v;
        }
        if let Some(v) = text.ellipsis {
            cfg.ellipsis = v;
        }
        if let Some(v) = text.truncation_fallback {
            cfg.truncation_fallback = v;
        }
        if let Some(v) = text.line_height {
            cfg.line_height = v;
        }
    }

    if let Some(labels) = parsed.labels {
        let cfg = &mut layout.labels;
        if let Some(v) = labels.label_gap {
            cfg.label_gap = v;
        }
        if let Some(v) = labels.exclusion_radius {
            cfg.exclusion_radius = v;
        }
        if let Some(v) = labels.default_marker_radius {
            cfg.default_marker_radius = v;
        }
        if let Some(v) = labels.max_passes {
            cfg.max_passes = v;
        }
        if let Some(v) = labels.max_label_width {
            cfg.max_label_width = v;
        }
        if let Some(v) = labels.grid_cell {
            cfg.grid_cell = v;
        }
    }

    Ok(config)
}
