use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pyramid,
    Funnel,
    Circles,
    Triangles,
    Scatter,
}

impl ChartKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "pyramid" => Some(Self::Pyramid),
            "funnel" => Some(Self::Funnel),
            "circles" | "circle" | "proportional-circles" => Some(Self::Circles),
            "triangles" | "triangle" | "proportional-triangles" => Some(Self::Triangles),
            "scatter" | "bubble" => Some(Self::Scatter),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pyramid => "pyramid",
            Self::Funnel => "funnel",
            Self::Circles => "circles",
            Self::Triangles => "triangles",
            Self::Scatter => "scatter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
    #[default]
    None,
}

impl SortOrder {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Ascending),
            "desc" | "descending" => Some(Self::Descending),
            "none" | "" => Some(Self::None),
            _ => None,
        }
    }
}

/// Which raw values survive normalization. Non-finite values never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Validity {
    #[default]
    Positive,
    NonNegative,
}

impl Validity {
    pub fn accepts(self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            Self::Positive => value > 0.0,
            Self::NonNegative => value >= 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRecord {
    pub category: String,
    pub value: f64,
}

impl DataRecord {
    pub fn new(category: impl Into<String>, value: f64) -> Self {
        Self {
            category: category.into(),
            value,
        }
    }
}

/// A marker already positioned by the upstream chart (scatter position or
/// bubble simulation output), in plot coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub radius: Option<f64>,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub title: Option<String>,
    pub records: Vec<DataRecord>,
    pub points: Vec<ScatterPoint>,
    pub width: f64,
    pub height: f64,
    pub sort: Option<SortOrder>,
    pub validity: Validity,
    /// Explicit label processing order for scatter charts (indices into `points`).
    pub order: Option<Vec<usize>>,
}

impl ChartRequest {
    pub fn new(kind: ChartKind, width: f64, height: f64) -> Self {
        Self {
            kind,
            title: None,
            records: Vec::new(),
            points: Vec::new(),
            width,
            height,
            sort: None,
            validity: Validity::default(),
            order: None,
        }
    }

    pub fn with_records(mut self, records: Vec<DataRecord>) -> Self {
        self.records = records;
        self
    }

    pub fn with_points(mut self, points: Vec<ScatterPoint>) -> Self {
        self.points = points;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}
