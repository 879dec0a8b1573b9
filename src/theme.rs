use serde::{Deserialize, Serialize};

/// Font descriptor handed to a text metrics provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub size: f64,
    pub weight: String,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size: f64, weight: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            size,
            weight: weight.into(),
        }
    }

    pub fn with_size(&self, size: f64) -> Self {
        Self {
            size,
            ..self.clone()
        }
    }

    /// CSS-style numeric weight (`normal` = 400, `bold` = 700).
    pub fn numeric_weight(&self) -> u16 {
        let raw = self.weight.trim().to_ascii_lowercase();
        match raw.as_str() {
            "" | "normal" => 400,
            "bold" | "bolder" => 700,
            "lighter" => 300,
            other => other
                .parse::<u16>()
                .ok()
                .filter(|w| (1..=1000).contains(w))
                .unwrap_or(400),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f64,
    pub title_font_size: f64,
    pub title_font_weight: String,
    pub category_font_size: f64,
    pub category_font_weight: String,
    pub value_font_size: f64,
    pub value_font_weight: String,
    pub point_font_size: f64,
    pub point_font_weight: String,
}

impl Theme {
    pub fn default_theme() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 16.0,
            title_font_size: 20.0,
            title_font_weight: "bold".to_string(),
            category_font_size: 14.0,
            category_font_weight: "600".to_string(),
            value_font_size: 12.0,
            value_font_weight: "normal".to_string(),
            point_font_size: 12.0,
            point_font_weight: "normal".to_string(),
        }
    }

    pub fn compact() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            title_font_size: 16.0,
            title_font_weight: "600".to_string(),
            category_font_size: 12.0,
            category_font_weight: "500".to_string(),
            value_font_size: 11.0,
            value_font_weight: "normal".to_string(),
            point_font_size: 11.0,
            point_font_weight: "normal".to_string(),
        }
    }

    pub fn title_font(&self) -> FontSpec {
        FontSpec::new(
            &self.font_family,
            self.title_font_size,
            &self.title_font_weight,
        )
    }

    pub fn category_font(&self) -> FontSpec {
        FontSpec::new(
            &self.font_family,
            self.category_font_size,
            &self.category_font_weight,
        )
    }

    pub fn value_font(&self) -> FontSpec {
        FontSpec::new(
            &self.font_family,
            self.value_font_size,
            &self.value_font_weight,
        )
    }

    pub fn point_font(&self) -> FontSpec {
        FontSpec::new(
            &self.font_family,
            self.point_font_size,
            &self.point_font_weight,
        )
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_theme()
    }
}
