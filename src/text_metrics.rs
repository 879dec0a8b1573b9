use crate::theme::FontSpec;
use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Mutex;
use ttf_parser::Face;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Width of `text` in the system font that best matches `font`, or `None`
/// when no face resolves.
pub fn measure_text_width(text: &str, font: &FontSpec) -> Option<f64> {
    if text.is_empty() || font.size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font)
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<String, Option<FontFace>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font: &FontSpec) -> Option<f64> {
        let key = face_key(&font.family, font.numeric_weight());
        if !self.cache.contains_key(&key) {
            let face = self.load_face(&font.family, font.numeric_weight());
            self.cache.insert(key.clone(), face);
        }
        let face = self.cache.get_mut(&key).and_then(|face| face.as_mut())?;
        let normalized = text.replace('\t', "    ");
        Some(face.measure_width(&normalized, font.size))
    }

    fn load_face(&mut self, font_family: &str, weight: u16) -> Option<FontFace> {
        let key = face_key(font_family, weight);
        if let Some(face) = load_cached_face(&key) {
            return Some(face);
        }

        #[derive(Clone, Copy)]
        enum FamilyToken {
            Generic(Family<'static>),
            Name(usize),
        }

        let mut names: Vec<String> = Vec::new();
        let mut order: Vec<FamilyToken> = Vec::new();
        for part in font_family.split(',') {
            let raw = part.trim().trim_matches('"').trim_matches('\'');
            if raw.is_empty() {
                continue;
            }
            match raw.to_ascii_lowercase().as_str() {
                "serif" => order.push(FamilyToken::Generic(Family::Serif)),
                "sans-serif" => order.push(FamilyToken::Generic(Family::SansSerif)),
                "monospace" | "ui-monospace" => {
                    order.push(FamilyToken::Generic(Family::Monospace))
                }
                "cursive" => order.push(FamilyToken::Generic(Family::Cursive)),
                "fantasy" => order.push(FamilyToken::Generic(Family::Fantasy)),
                "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    order.push(FamilyToken::Generic(Family::SansSerif))
                }
                _ => {
                    order.push(FamilyToken::Name(names.len()));
                    names.push(raw.to_string());
                }
            }
        }
        if order.is_empty() {
            order.push(FamilyToken::Generic(Family::SansSerif));
        }

        let families: Vec<Family<'_>> = order
            .iter()
            .map(|token| match *token {
                FamilyToken::Generic(family) => family,
                FamilyToken::Name(idx) => Family::Name(names[idx].as_str()),
            })
            .collect();

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight(weight),
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        let mut loaded: Option<FontFace> = None;
        self.db.with_face_data(id, |data, index| {
            let bytes = data.to_vec();
            if Face::parse(&bytes, index).is_ok() {
                if let Some((font_path, meta_path)) = cache_paths(&key)
                    && !font_path.exists()
                {
                    if let Some(parent) = font_path.parent() {
                        let _ = fs::create_dir_all(parent);
                    }
                    let _ = fs::write(&font_path, &bytes);
                    let _ = fs::write(&meta_path, index.to_string());
                }
                loaded = FontFace::new(bytes, index);
            }
        });
        if loaded.is_none() {
            tracing::debug!(family = font_family, weight, "no usable face for font family");
        }
        loaded
    }
}

/// Parsed advance data for one face. Glyph advances outside ASCII are looked
/// up lazily by re-parsing the face from the owned bytes.
struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    ascii_advances: [u16; 128],
    advance_cache: HashMap<char, Option<u16>>,
}

impl FontFace {
    fn new(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let units_per_em = face.units_per_em().max(1);
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph_id) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph_id).unwrap_or(0);
            }
        }
        Some(Self {
            data,
            index,
            units_per_em,
            ascii_advances,
            advance_cache: HashMap::new(),
        })
    }

    fn measure_width(&mut self, text: &str, font_size: f64) -> f64 {
        let scale = font_size / self.units_per_em as f64;
        let fallback = font_size * 0.56;

        let mut missing: Vec<char> = text
            .chars()
            .filter(|ch| !ch.is_ascii() && !self.advance_cache.contains_key(ch))
            .collect();
        if !missing.is_empty() {
            missing.dedup();
            let face = Face::parse(&self.data, self.index).ok();
            for ch in missing {
                let advance = face.as_ref().and_then(|face| {
                    face.glyph_index(ch)
                        .and_then(|glyph| face.glyph_hor_advance(glyph))
                });
                self.advance_cache.insert(ch, advance);
            }
        }

        let mut width = 0.0f64;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let advance = if ch.is_ascii() {
                Some(self.ascii_advances[ch as usize]).filter(|adv| *adv > 0)
            } else {
                self.advance_cache.get(&ch).copied().flatten()
            };
            match advance {
                Some(adv) => width += adv as f64 * scale,
                None => width += fallback,
            }
        }
        width.max(0.0)
    }
}

fn face_key(font_family: &str, weight: u16) -> String {
    let trimmed = font_family.trim();
    let family = if trimmed.is_empty() {
        "sans-serif"
    } else {
        trimmed
    };
    format!("{family}@{weight}")
}

fn cache_paths(face_key: &str) -> Option<(PathBuf, PathBuf)> {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))?;
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    face_key.hash(&mut hasher);
    let hash = hasher.finish();
    let dir = base.join("chartfit").join("font-cache");
    Some((
        dir.join(format!("{hash:x}.font")),
        dir.join(format!("{hash:x}.meta")),
    ))
}

fn load_cached_face(face_key: &str) -> Option<FontFace> {
    let (font_path, meta_path) = cache_paths(face_key)?;
    if !font_path.exists() || !meta_path.exists() {
        return None;
    }
    let bytes = fs::read(font_path).ok()?;
    let index: u32 = fs::read_to_string(meta_path).ok()?.trim().parse().ok()?;
    FontFace::new(bytes, index)
}
