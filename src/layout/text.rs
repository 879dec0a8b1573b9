use crate::config::{TextFitConfig, TruncationFallback};
use crate::text_metrics;
use crate::theme::FontSpec;

use super::FittedText;

/// Pixel width of a single line of text. The only seam between layout and a
/// rendering backend; shared providers must be reentrant.
pub trait TextMetricsProvider: Send + Sync {
    fn measure(&self, text: &str, font: &FontSpec) -> f64;
}

/// `chars · factor · size`. Deterministic, for tests and headless runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedAdvanceMeasurer {
    pub char_width_factor: f64,
}

impl Default for FixedAdvanceMeasurer {
    fn default() -> Self {
        Self {
            char_width_factor: 0.6,
        }
    }
}

impl TextMetricsProvider for FixedAdvanceMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> f64 {
        text.chars().filter(|ch| *ch != '\n').count() as f64 * self.char_width_factor * font.size
    }
}

/// Per-character width table, no font files needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalibratedMeasurer;

impl TextMetricsProvider for CalibratedMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> f64 {
        let weight_scale = if font.numeric_weight() >= 600 { 1.05 } else { 1.0 };
        fallback_text_width(text, font.size) * weight_scale
    }
}

/// System fonts through fontdb, falling back to the calibrated table when
/// no face matches the family.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFontMeasurer;

impl TextMetricsProvider for SystemFontMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> f64 {
        text_metrics::measure_text_width(text, font)
            .unwrap_or_else(|| CalibratedMeasurer.measure(text, font))
    }
}

pub(crate) fn char_width_factor(ch: char) -> f64 {
    // Advance widths of the default sans-serif stack, relative to font size.
    match ch {
        ' ' => 0.306,
        '\\' | '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        'A' => 0.652,
        'B' => 0.648,
        'C' => 0.734,
        'D' => 0.723,
        'E' => 0.594,
        'F' => 0.575,
        'G' | 'H' => 0.742,
        'I' => 0.272,
        'J' => 0.557,
        'K' => 0.648,
        'L' => 0.559,
        'M' => 0.903,
        'N' => 0.763,
        'O' => 0.754,
        'P' => 0.623,
        'Q' => 0.755,
        'R' => 0.637,
        'S' => 0.633,
        'T' => 0.599,
        'U' => 0.746,
        'V' => 0.661,
        'W' => 0.958,
        'X' => 0.655,
        'Y' => 0.646,
        'Z' => 0.621,
        'a' => 0.550,
        'b' => 0.603,
        'c' => 0.547,
        'd' => 0.609,
        'e' => 0.570,
        'f' => 0.340,
        'g' | 'h' => 0.600,
        'i' => 0.235,
        'j' => 0.227,
        'k' => 0.522,
        'l' => 0.239,
        'm' => 0.867,
        'n' => 0.585,
        'o' => 0.574,
        'p' => 0.595,
        'q' => 0.585,
        'r' => 0.364,
        's' => 0.523,
        't' => 0.305,
        'u' => 0.585,
        'v' => 0.545,
        'w' => 0.811,
        'x' => 0.538,
        'y' => 0.556,
        'z' => 0.550,
        '0' => 0.613,
        '1' => 0.396,
        '2' => 0.609,
        '3' => 0.597,
        '4' => 0.614,
        '5' => 0.586,
        '6' => 0.608,
        '7' => 0.559,
        '8' => 0.611,
        '9' => 0.595,
        '%' | '@' | '#' | '&' => 0.946,
        '\u{2026}' => 0.9,
        _ => 0.568,
    }
}

fn fallback_text_width(text: &str, font_size: f64) -> f64 {
    text.chars()
        .filter(|ch| *ch != '\n')
        .map(char_width_factor)
        .sum::<f64>()
        * font_size
}

pub(crate) fn split_lines(text: &str) -> Vec<String> {
    let current = text
        .replace("<br/>", "\n")
        .replace("<br>", "\n")
        .replace("\\n", "\n");
    current.split('\n').map(|line| line.trim().to_string()).collect()
}

/// Width of the widest line and the height of all lines.
pub fn measure_block(
    text: &str,
    font: &FontSpec,
    line_height: f64,
    metrics: &dyn TextMetricsProvider,
) -> (f64, f64) {
    let lines = split_lines(text);
    let width = lines
        .iter()
        .map(|line| metrics.measure(line, font))
        .fold(0.0, f64::max);
    let height = lines.len().max(1) as f64 * font.size * line_height;
    (width, height)
}

/// Factor to apply to the font size so `measured` fits `available`. Never
/// above 1.
pub fn scale_factor(measured: f64, available: f64, padding: f64) -> f64 {
    if measured <= available || measured <= 0.0 {
        return 1.0;
    }
    if available <= 0.0 {
        return 0.0;
    }
    (available / (measured + padding.max(0.0))).min(1.0)
}

/// Shrink the font until `text` fits `available_width`, stopping at the
/// configured floor.
pub fn fit_font_size(
    text: &str,
    font: &FontSpec,
    available_width: f64,
    config: &TextFitConfig,
    metrics: &dyn TextMetricsProvider,
) -> FittedText {
    let measured = metrics.measure(text, font);
    let scale = scale_factor(measured, available_width, config.padding);
    if scale >= 1.0 {
        return FittedText {
            text: text.to_string(),
            font_size: font.size,
            scale: 1.0,
            width: measured,
            truncated: false,
            hidden: false,
        };
    }
    let floor = config.min_font_size.min(font.size);
    let font_size = (font.size * scale).max(floor);
    let width = metrics.measure(text, &font.with_size(font_size));
    FittedText {
        text: text.to_string(),
        font_size,
        scale: font_size / font.size,
        width,
        truncated: false,
        hidden: false,
    }
}

/// Drop trailing characters until `prefix + ellipsis` fits `band_width`.
pub fn truncate_to_fit(
    text: &str,
    font: &FontSpec,
    band_width: f64,
    config: &TextFitConfig,
    metrics: &dyn TextMetricsProvider,
) -> FittedText {
    let full_width = metrics.measure(text, font);
    if full_width <= band_width || text.is_empty() {
        return FittedText {
            text: text.to_string(),
            font_size: font.size,
            scale: 1.0,
            width: full_width,
            truncated: false,
            hidden: false,
        };
    }

    let chars: Vec<char> = text.chars().collect();
    for end in (1..chars.len()).rev() {
        let prefix: String = chars[..end].iter().collect();
        let prefix = prefix.trim_end();
        if prefix.is_empty() {
            continue;
        }
        let candidate = format!("{prefix}{}", config.ellipsis);
        let width = metrics.measure(&candidate, font);
        if width <= band_width {
            return FittedText {
                text: candidate,
                font_size: font.size,
                scale: 1.0,
                width,
                truncated: true,
                hidden: false,
            };
        }
    }

    match config.truncation_fallback {
        TruncationFallback::FirstChar => {
            let first = chars
                .iter()
                .copied()
                .find(|ch| !ch.is_whitespace())
                .unwrap_or(chars[0])
                .to_string();
            let width = metrics.measure(&first, font);
            FittedText {
                text: first,
                font_size: font.size,
                scale: 1.0,
                width,
                truncated: true,
                hidden: false,
            }
        }
        TruncationFallback::Hide => FittedText {
            text: String::new(),
            font_size: font.size,
            scale: 1.0,
            width: 0.0,
            truncated: true,
            hidden: true,
        },
    }
}

/// Scale first; if the floored size still overflows, truncate at that size.
pub fn fit_text(
    text: &str,
    font: &FontSpec,
    available_width: f64,
    config: &TextFitConfig,
    metrics: &dyn TextMetricsProvider,
) -> FittedText {
    let scaled = fit_font_size(text, font, available_width, config, metrics);
    if scaled.width <= available_width {
        return scaled;
    }
    let floored = font.with_size(scaled.font_size);
    let mut truncated = truncate_to_fit(text, &floored, available_width, config, metrics);
    truncated.scale = scaled.scale;
    truncated
}

/// `fit_text` inside a box: the font is first capped so one line fits
/// `available_height`.
pub fn fit_text_in_box(
    text: &str,
    font: &FontSpec,
    available_width: f64,
    available_height: f64,
    config: &TextFitConfig,
    metrics: &dyn TextMetricsProvider,
) -> FittedText {
    let line_height = config.line_height.max(1.0);
    let height_cap = (available_height / line_height).max(config.min_font_size.min(font.size));
    let capped = if font.size > height_cap {
        font.with_size(height_cap)
    } else {
        font.clone()
    };
    let mut fitted = fit_text(text, &capped, available_width, config, metrics);
    fitted.scale = fitted.font_size / font.size;
    fitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn font(size: f64) -> FontSpec {
        FontSpec::new("sans-serif", size, "normal")
    }

    fn stub() -> FixedAdvanceMeasurer {
        FixedAdvanceMeasurer {
            char_width_factor: 0.5,
        }
    }

    #[test]
    fn split_lines_handles_br_tags() {
        assert_eq!(split_lines("a<br/>b"), vec!["a", "b"]);
        assert_eq!(split_lines("a<br>b"), vec!["a", "b"]);
        assert_eq!(split_lines("a\\nb"), vec!["a", "b"]);
        assert_eq!(split_lines("  hello  \n  world  "), vec!["hello", "world"]);
    }

    #[test]
    fn char_width_factor_returns_positive_values() {
        for ch in ['a', 'Z', ' ', '0', '@', '\u{4e2d}', '\u{2026}'] {
            assert!(char_width_factor(ch) > 0.0, "char {:?} has zero width", ch);
        }
    }

    #[test]
    fn calibrated_width_scales_with_font_size() {
        let w16 = CalibratedMeasurer.measure("Hello", &font(16.0));
        let w32 = CalibratedMeasurer.measure("Hello", &font(32.0));
        assert!((w32 - w16 * 2.0).abs() < 0.01);
    }

    #[test]
    fn scale_factor_never_upscales() {
        assert_eq!(scale_factor(50.0, 100.0, 4.0), 1.0);
        assert_eq!(scale_factor(100.0, 100.0, 4.0), 1.0);
        assert!((scale_factor(196.0, 100.0, 4.0) - 0.5).abs() < 1e-12);
        assert_eq!(scale_factor(10.0, 0.0, 4.0), 0.0);
    }

    #[test]
    fn fit_font_size_shrinks_to_fit() {
        // "abcdefghij" at 20px is 100px wide with the stub.
        let fitted = fit_font_size("abcdefghij", &font(20.0), 48.0, &TextFitConfig::default(), &stub());
        assert!((fitted.font_size - 20.0 * 48.0 / 104.0).abs() < 1e-9);
        assert!(fitted.width <= 48.0);
        assert!(!fitted.truncated);
    }

    #[test]
    fn fit_font_size_respects_floor() {
        let fitted = fit_font_size("abcdefghij", &font(20.0), 10.0, &TextFitConfig::default(), &stub());
        assert_eq!(fitted.font_size, 8.0);
        assert!(fitted.width > 10.0);
    }

    #[test]
    fn truncate_appends_ellipsis() {
        // 10px per char at 20px: "abcdef" is 60px; "abc…" is 40px.
        let fitted = truncate_to_fit("abcdef", &font(20.0), 45.0, &TextFitConfig::default(), &stub());
        assert_eq!(fitted.text, "abc\u{2026}");
        assert!(fitted.truncated);
        assert!(fitted.width <= 45.0);
    }

    #[test]
    fn truncate_leaves_fitting_text_alone() {
        let fitted = truncate_to_fit("abc", &font(20.0), 30.0, &TextFitConfig::default(), &stub());
        assert_eq!(fitted.text, "abc");
        assert!(!fitted.truncated);
    }

    #[test]
    fn truncate_fallback_policies() {
        let mut config = TextFitConfig::default();
        let narrow = truncate_to_fit("abcdef", &font(20.0), 15.0, &config, &stub());
        assert_eq!(narrow.text, "a");
        assert!(!narrow.hidden);

        config.truncation_fallback = TruncationFallback::Hide;
        let hidden = truncate_to_fit("abcdef", &font(20.0), 15.0, &config, &stub());
        assert!(hidden.hidden);
        assert!(hidden.text.is_empty());
    }

    #[test]
    fn whitespace_only_prefix_is_never_ellipsised() {
        // " …" would trim to a bare ellipsis; fall back instead.
        let mut config = TextFitConfig::default();
        let fitted = truncate_to_fit(" wxyz", &font(20.0), 15.0, &config, &stub());
        assert_eq!(fitted.text, "w");
        assert!(fitted.truncated);

        config.truncation_fallback = TruncationFallback::Hide;
        let hidden = truncate_to_fit(" wxyz", &font(20.0), 15.0, &config, &stub());
        assert!(hidden.hidden);
    }

    #[test]
    fn fit_text_truncates_after_reaching_floor() {
        let fitted = fit_text("abcdefghijklmnop", &font(16.0), 30.0, &TextFitConfig::default(), &stub());
        assert_eq!(fitted.font_size, 8.0);
        assert!(fitted.truncated);
        assert!(fitted.width <= 30.0);
    }

    #[test]
    fn box_height_caps_font_size() {
        let fitted = fit_text_in_box("ab", &font(20.0), 500.0, 12.0, &TextFitConfig::default(), &stub());
        assert!((fitted.font_size - 10.0).abs() < 1e-9);
        assert!((fitted.scale - 0.5).abs() < 1e-9);
    }

    #[test]
    fn measure_block_counts_lines() {
        let (w, h) = measure_block("ab\ncdef", &font(10.0), 1.2, &stub());
        assert!((w - 20.0).abs() < 1e-9);
        assert!((h - 24.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn truncation_never_exceeds_band(s in "[a-zA-Z0-9 ]{1,60}", band in 20.0f64..400.0) {
            let fitted = truncate_to_fit(&s, &font(16.0), band, &TextFitConfig::default(), &stub());
            prop_assert!(fitted.width <= band);
        }
    }
}
