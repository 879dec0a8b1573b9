use serde::Deserialize;

use crate::config::NumberOrString;
use crate::ir::{ChartKind, ChartRequest, DataRecord, ScatterPoint, SortOrder, Validity};

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("Invalid chart request: {message}")]
    Syntax { message: String },

    #[error("Unknown chart type: {chart}")]
    UnknownChart { chart: String },

    #[error("Unknown sort order: {sort}")]
    UnknownSort { sort: String },

    #[error("Invalid {field}: {value}")]
    InvalidDimension { field: &'static str, value: String },

    #[error("Point {index} has no usable position")]
    InvalidPoint { index: usize },

    #[error("Label order index {index} is out of range for {len} points")]
    InvalidOrder { index: usize, len: usize },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestFile {
    #[serde(alias = "type")]
    chart: String,
    title: Option<String>,
    #[serde(default)]
    data: Vec<RecordFile>,
    #[serde(default)]
    points: Vec<PointFile>,
    width: Option<NumberOrString>,
    height: Option<NumberOrString>,
    sort: Option<String>,
    validity: Option<Validity>,
    order: Option<Vec<usize>>,
}

/// `{"category": "A", "value": 10}` or the short `["A", 10]` form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordFile {
    Object {
        #[serde(alias = "label", alias = "name")]
        category: String,
        value: Option<NumberOrString>,
    },
    Pair(String, NumberOrString),
}

#[derive(Debug, Deserialize)]
struct PointFile {
    id: Option<String>,
    x: NumberOrString,
    y: NumberOrString,
    #[serde(alias = "r")]
    radius: Option<NumberOrString>,
    label: Option<String>,
}

/// Parse a JSON chart request, retrying as JSON5 so hand-written files may
/// carry comments and trailing commas.
pub fn parse_request(input: &str) -> Result<ChartRequest, RequestError> {
    let file: RequestFile = match serde_json::from_str(input) {
        Ok(file) => file,
        Err(json_err) => json5::from_str(input).map_err(|_| RequestError::Syntax {
            message: json_err.to_string(),
        })?,
    };

    let kind = ChartKind::from_token(&file.chart).ok_or_else(|| RequestError::UnknownChart {
        chart: file.chart.clone(),
    })?;
    let width = dimension("width", file.width.as_ref())?;
    let height = dimension("height", file.height.as_ref())?;

    let sort = match file.sort.as_deref() {
        Some(token) => Some(
            SortOrder::from_token(token).ok_or_else(|| RequestError::UnknownSort {
                sort: token.to_string(),
            })?,
        ),
        None => None,
    };

    // Unparseable values become NaN and are dropped by the normalizer.
    let records = file
        .data
        .into_iter()
        .map(|record| match record {
            RecordFile::Object { category, value } => DataRecord::new(
                category,
                value
                    .as_ref()
                    .and_then(NumberOrString::as_f64)
                    .unwrap_or(f64::NAN),
            ),
            RecordFile::Pair(category, value) => {
                DataRecord::new(category, value.as_f64().unwrap_or(f64::NAN))
            }
        })
        .collect();

    let mut points = Vec::with_capacity(file.points.len());
    for (index, point) in file.points.into_iter().enumerate() {
        let (Some(x), Some(y)) = (point.x.as_f64(), point.y.as_f64()) else {
            return Err(RequestError::InvalidPoint { index });
        };
        if !x.is_finite() || !y.is_finite() {
            return Err(RequestError::InvalidPoint { index });
        }
        let id = point.id.unwrap_or_else(|| format!("p{index}"));
        points.push(ScatterPoint {
            label: point.label.unwrap_or_else(|| id.clone()),
            id,
            x,
            y,
            radius: point.radius.as_ref().and_then(NumberOrString::as_f64),
        });
    }

    if let Some(&index) = file.order.iter().flatten().find(|idx| **idx >= points.len()) {
        return Err(RequestError::InvalidOrder {
            index,
            len: points.len(),
        });
    }

    let mut request = ChartRequest::new(kind, width, height)
        .with_records(records)
        .with_points(points);
    request.title = file.title;
    request.sort = sort;
    request.validity = file.validity.unwrap_or_default();
    request.order = file.order;
    Ok(request)
}

/// Missing dimensions stay 0 so the layout falls back to its configured size.
fn dimension(field: &'static str, value: Option<&NumberOrString>) -> Result<f64, RequestError> {
    let Some(value) = value else {
        return Ok(0.0);
    };
    match value.as_f64() {
        Some(parsed) if parsed.is_finite() && parsed > 0.0 => Ok(parsed),
        _ => Err(RequestError::InvalidDimension {
            field,
            value: match value {
                NumberOrString::Number(num) => num.to_string(),
                NumberOrString::String(text) => text.clone(),
            },
        }),
    }
}
