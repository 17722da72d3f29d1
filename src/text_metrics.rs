use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;
use ttf_parser::Face;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Rendered size of a label, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBlock {
    pub width: f32,
    pub height: f32,
}

/// Width of one line of text. Uses the first installed family from the CSS
/// style `font_family` list, or an em-based estimate when none is available.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> f32 {
    if text.is_empty() || !(font_size > 0.0) {
        return 0.0;
    }
    let measured = TEXT_MEASURER
        .lock()
        .ok()
        .and_then(|mut guard| guard.measure(text, font_size, font_family));
    measured.unwrap_or_else(|| estimate_width(text, font_size))
}

/// Bounding block of a possibly multi-line label.
pub fn measure_label(text: &str, font_size: f32, font_family: &str, line_height: f32) -> TextBlock {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() || !(font_size > 0.0) {
        return TextBlock {
            width: 0.0,
            height: 0.0,
        };
    }
    let width = lines
        .iter()
        .map(|line| measure_text_width(line, font_size, font_family))
        .fold(0.0f32, f32::max);
    let line_height = if line_height > 0.0 { line_height } else { 1.0 };
    TextBlock {
        width,
        height: font_size * line_height * lines.len() as f32,
    }
}

/// Em-based width guess: full width for CJK and other wide characters.
pub fn estimate_width(text: &str, font_size: f32) -> f32 {
    text.chars()
        .filter(|ch| *ch != '\n')
        .map(|ch| if is_wide(ch) { 1.0 } else { 0.56 })
        .sum::<f32>()
        * font_size
}

fn is_wide(ch: char) -> bool {
    matches!(ch as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x20000..=0x2FFFD)
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    faces: HashMap<String, Option<FontFace>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            faces: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = normalize_family_key(font_family);
        if !self.faces.contains_key(&key) {
            let face = self.load_face(&key);
            if face.is_none() {
                debug!(family = %key, "no installed font matched, estimating label widths");
            }
            self.faces.insert(key.clone(), face);
        }
        let face = self.faces.get_mut(&key)?.as_mut()?;
        face.measure_width(&text.replace('\t', "    "), font_size)
    }

    fn load_face(&mut self, font_family: &str) -> Option<FontFace> {
        let names: Vec<&str> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\''))
            .filter(|raw| !raw.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|raw| match raw.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    Family::SansSerif
                }
                "monospace" | "ui-monospace" => Family::Monospace,
                "cursive" => Family::Cursive,
                "fantasy" => Family::Fantasy,
                _ => Family::Name(raw),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| FontFace::new(data.to_vec(), index))
            .flatten()
    }
}

/// Font bytes plus a per-character advance cache. The face is parsed on
/// demand so no borrow of `data` outlives a call.
struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    advances: HashMap<char, Option<u16>>,
}

impl FontFace {
    fn new(data: Vec<u8>, index: u32) -> Option<Self> {
        let units_per_em = Face::parse(&data, index).ok()?.units_per_em().max(1);
        Some(Self {
            data,
            index,
            units_per_em,
            advances: HashMap::new(),
        })
    }

    fn measure_width(&mut self, text: &str, font_size: f32) -> Option<f32> {
        let missing: Vec<char> = text
            .chars()
            .filter(|ch| *ch != '\n' && !self.advances.contains_key(ch))
            .collect();
        if !missing.is_empty() {
            let face = Face::parse(&self.data, self.index).ok()?;
            for ch in missing {
                let advance = face
                    .glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph))
                    .filter(|advance| *advance > 0);
                self.advances.insert(ch, advance);
            }
        }

        let scale = font_size / self.units_per_em as f32;
        let width = text
            .chars()
            .filter(|ch| *ch != '\n')
            .map(|ch| match self.advances.get(&ch).copied().flatten() {
                Some(advance) => advance as f32 * scale,
                None => estimate_width(ch.encode_utf8(&mut [0; 4]), font_size),
            })
            .sum::<f32>();
        Some(width.max(0.0))
    }
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}
