use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use tiny_skia::{FillRule, Mask, PathBuilder, Transform};
use tracing::debug;
use ttf_parser::{Face, OutlineBuilder, name_id};
use usvg::fontdb;

use crate::layout::LayoutError;

/// Identifies a scalable font: a file (resolved against the fonts directory
/// when relative) or an installed system family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FontRef {
    File(PathBuf),
    Family(String),
}

impl FontRef {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        FontRef::File(path.into())
    }

    pub fn family(name: impl Into<String>) -> Self {
        FontRef::Family(name.into())
    }

    /// `family:NAME` selects a system family, anything else is a file name.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        match value.strip_prefix("family:") {
            Some(name) => FontRef::Family(name.trim().to_string()),
            None => FontRef::File(PathBuf::from(value)),
        }
    }
}

impl fmt::Display for FontRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontRef::File(path) => write!(f, "{}", path.display()),
            FontRef::Family(name) => write!(f, "family:{}", name),
        }
    }
}

/// Font-unit metrics and outlines for one face.
///
/// Everything here is in font units; [`ScaledFont`] turns it into pixels.
pub trait Typeface: Send + Sync {
    fn units_per_em(&self) -> f32;

    /// Distance from the baseline up to the top of the line.
    fn ascender(&self) -> f32;

    /// Distance from the baseline down to the bottom of the line, positive.
    fn descender(&self) -> f32;

    /// Sum of horizontal advances of `text`.
    fn text_advance(&self, text: &str) -> f32;

    /// Emits the outlines of `text` laid out left to right from the origin,
    /// y pointing up.
    fn outline_text(&self, text: &str, builder: &mut dyn OutlineBuilder);
}

#[derive(Clone)]
pub struct FontFace {
    data: Arc<Vec<u8>>,
    face_index: u32,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    space_advance: u16,
    /// Horizontal advance of every mapped char, read once from `hmtx`.
    advances: Arc<HashMap<char, u16>>,
    family: Option<String>,
}

impl FontFace {
    pub fn from_path(path: &Path) -> Result<Self, LayoutError> {
        let data = std::fs::read(path).map_err(|err| LayoutError::font(path.display(), err))?;
        Self::from_data(data, None).map_err(|reason| LayoutError::font(path.display(), reason))
    }

    /// Parses the first face of `data`, or the face whose family matches
    /// `preferred_family` when the data is a collection.
    pub fn from_data(data: Vec<u8>, preferred_family: Option<&str>) -> Result<Self, String> {
        let data = Arc::new(data);
        let mut fallback = None;
        let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
        for index in 0..count {
            let Some(parsed) = Self::parse(&data, index) else {
                continue;
            };
            if let (Some(preferred), Some(found)) = (preferred_family, parsed.family()) {
                if found.eq_ignore_ascii_case(preferred) {
                    return Ok(parsed);
                }
            }
            if fallback.is_none() {
                fallback = Some(parsed);
            }
        }
        fallback.ok_or_else(|| "failed to parse font data".to_string())
    }

    /// Parses exactly the face at `index` of a font file or collection.
    pub fn from_data_index(data: Vec<u8>, index: u32) -> Result<Self, String> {
        Self::parse(&Arc::new(data), index)
            .ok_or_else(|| format!("failed to parse face {} of font data", index))
    }

    fn parse(data: &Arc<Vec<u8>>, index: u32) -> Option<Self> {
        let face = Face::parse(data, index).ok()?;
        let units_per_em = face.units_per_em().max(1);
        let space_advance = face
            .glyph_index(' ')
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(units_per_em / 2);
        Some(FontFace {
            data: Arc::clone(data),
            face_index: index,
            units_per_em,
            ascender: face.ascender(),
            descender: face.descender(),
            space_advance,
            advances: Arc::new(char_advances(&face)),
            family: extract_family_name(&face),
        })
    }

    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, self.face_index).ok()
    }
}

fn char_advances(face: &Face<'_>) -> HashMap<char, u16> {
    let mut advances = HashMap::new();
    let Some(cmap) = face.tables().cmap else {
        return advances;
    };
    for subtable in cmap.subtables {
        if !subtable.is_unicode() {
            continue;
        }
        subtable.codepoints(|codepoint| {
            let Some(ch) = char::from_u32(codepoint) else {
                return;
            };
            if let Some(advance) = face
                .glyph_index(ch)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
            {
                advances.insert(ch, advance);
            }
        });
    }
    advances
}

impl Typeface for FontFace {
    fn units_per_em(&self) -> f32 {
        self.units_per_em as f32
    }

    fn ascender(&self) -> f32 {
        self.ascender as f32
    }

    fn descender(&self) -> f32 {
        (self.descender as f32).abs()
    }

    fn text_advance(&self, text: &str) -> f32 {
        text.chars()
            .filter(|ch| *ch != '\n')
            .map(|ch| *self.advances.get(&ch).unwrap_or(&self.space_advance) as u32)
            .fold(0u32, u32::saturating_add) as f32
    }

    fn outline_text(&self, text: &str, builder: &mut dyn OutlineBuilder) {
        let Some(face) = self.face() else {
            return;
        };
        let mut pen = 0.0;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let advance = match face.glyph_index(ch) {
                Some(glyph) => {
                    let mut shifted = Shifted {
                        inner: &mut *builder,
                        dx: pen,
                    };
                    face.outline_glyph(glyph, &mut shifted);
                    face.glyph_hor_advance(glyph).unwrap_or(self.space_advance)
                }
                None => self.space_advance,
            };
            pen += advance as f32;
        }
    }
}

struct Shifted<'a, B: ?Sized> {
    inner: &'a mut B,
    dx: f32,
}

impl<B: OutlineBuilder + ?Sized> OutlineBuilder for Shifted<'_, B> {
    fn move_to(&mut self, x: f32, y: f32) {
        self.inner.move_to(x + self.dx, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.inner.line_to(x + self.dx, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.inner.quad_to(x1 + self.dx, y1, x + self.dx, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.inner
            .curve_to(x1 + self.dx, y1, x2 + self.dx, y2, x + self.dx, y);
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

struct MaskPath(PathBuilder);

impl OutlineBuilder for MaskPath {
    fn move_to(&mut self, x: f32, y: f32) {
        self.0.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.0.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.0.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.0.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.0.close();
    }
}

/// A face at a pixel size.
#[derive(Clone)]
pub struct ScaledFont {
    face: Arc<dyn Typeface>,
    size: f32,
}

impl ScaledFont {
    pub fn new(face: Arc<dyn Typeface>, size: f32) -> Self {
        Self { face, size }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    fn scale(&self) -> f32 {
        self.size / self.face.units_per_em().max(1.0)
    }

    fn to_pixels(&self, units: f32) -> f32 {
        units * self.size / self.face.units_per_em().max(1.0)
    }

    pub fn ascent(&self) -> f32 {
        self.to_pixels(self.face.ascender())
    }

    pub fn descent(&self) -> f32 {
        self.to_pixels(self.face.descender())
    }

    pub fn line_height(&self, leading_offset: f32) -> f32 {
        self.ascent() + self.descent() + leading_offset
    }

    /// Advance width of `text` in pixels.
    pub fn measure(&self, text: &str) -> f32 {
        self.to_pixels(self.face.text_advance(text))
    }

    /// Fills `text` into `mask` with the top of its line box at `(x, top)`.
    pub fn draw_line(&self, mask: &mut Mask, text: &str, x: f32, top: f32) {
        let mut outline = MaskPath(PathBuilder::new());
        self.face.outline_text(text, &mut outline);
        let Some(path) = outline.0.finish() else {
            return;
        };
        let scale = self.scale();
        let baseline = top + self.ascent();
        let transform = Transform::from_row(scale, 0.0, 0.0, -scale, x, baseline);
        mask.fill_path(&path, FillRule::Winding, true, transform);
    }
}

impl fmt::Debug for ScaledFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScaledFont").field("size", &self.size).finish()
    }
}

/// Hands out fonts at a pixel size.
pub trait FontSource {
    fn font(&self, reference: &FontRef, size: f32) -> Result<ScaledFont, LayoutError>;
}

/// Read-through font cache shared by every render of a run.
///
/// Parsed faces are kept per [`FontRef`], scaled handles per reference and
/// size in 1/64 px. A missing face is loaded while the write lock is held, so
/// concurrent callers never build the same face twice.
pub struct FontCache {
    fonts_dir: PathBuf,
    faces: RwLock<HashMap<FontRef, Arc<FontFace>>>,
    scaled: RwLock<HashMap<(FontRef, u32), ScaledFont>>,
    system: OnceLock<fontdb::Database>,
}

impl FontCache {
    pub fn new(fonts_dir: impl Into<PathBuf>) -> Self {
        Self {
            fonts_dir: fonts_dir.into(),
            faces: RwLock::new(HashMap::new()),
            scaled: RwLock::new(HashMap::new()),
            system: OnceLock::new(),
        }
    }

    pub fn face(&self, reference: &FontRef) -> Result<Arc<FontFace>, LayoutError> {
        if let Some(face) = read_lock(&self.faces).get(reference) {
            return Ok(Arc::clone(face));
        }
        let mut faces = write_lock(&self.faces);
        if let Some(face) = faces.get(reference) {
            return Ok(Arc::clone(face));
        }
        let face = Arc::new(self.load(reference)?);
        debug!(
            font = %reference,
            family = face.family().unwrap_or("unknown"),
            "loaded font face"
        );
        faces.insert(reference.clone(), Arc::clone(&face));
        Ok(face)
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || path.exists() {
            path.to_path_buf()
        } else {
            self.fonts_dir.join(path)
        }
    }

    fn load(&self, reference: &FontRef) -> Result<FontFace, LayoutError> {
        match reference {
            FontRef::File(path) => FontFace::from_path(&self.resolve_path(path)),
            FontRef::Family(family) => self.load_family(family),
        }
    }

    fn load_family(&self, family: &str) -> Result<FontFace, LayoutError> {
        let db = self.system.get_or_init(|| {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            db
        });
        let is_sans = family.eq_ignore_ascii_case("sans-serif");
        let families = if is_sans {
            vec![fontdb::Family::SansSerif]
        } else {
            vec![fontdb::Family::Name(family)]
        };
        let query = fontdb::Query {
            families: &families,
            ..Default::default()
        };
        let id = db
            .query(&query)
            .ok_or_else(|| LayoutError::font(family, "not installed"))?;
        let (data, index) = db
            .with_face_data(id, |data, index| (data.to_vec(), index))
            .ok_or_else(|| LayoutError::font(family, "failed to load font data"))?;
        FontFace::from_data_index(data, index).map_err(|reason| LayoutError::font(family, reason))
    }
}

impl FontSource for FontCache {
    fn font(&self, reference: &FontRef, size: f32) -> Result<ScaledFont, LayoutError> {
        if size.is_nan() || size <= 0.0 {
            return Err(LayoutError::font(reference, format!("invalid size {}", size)));
        }
        let key = (reference.clone(), (size * 64.0).round() as u32);
        if let Some(font) = read_lock(&self.scaled).get(&key) {
            return Ok(font.clone());
        }
        let face: Arc<dyn Typeface> = self.face(reference)?;
        let font = ScaledFont::new(face, size);
        write_lock(&self.scaled).insert(key, font.clone());
        Ok(font)
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::BlockFace;

    #[test]
    fn parses_font_references() {
        assert_eq!(
            FontRef::parse("Chalfont_Medium.otf"),
            FontRef::file("Chalfont_Medium.otf")
        );
        assert_eq!(
            FontRef::parse(" family: DejaVu Sans "),
            FontRef::family("DejaVu Sans")
        );
        assert_eq!(FontRef::family("Serif").to_string(), "family:Serif");
    }

    #[test]
    fn scaled_metrics_follow_the_pixel_size() {
        let font = ScaledFont::new(Arc::new(BlockFace), 20.0);
        assert_eq!(font.ascent(), 16.0);
        assert_eq!(font.descent(), 4.0);
        assert_eq!(font.line_height(3.0), 23.0);
        assert_eq!(font.measure("Ki"), 24.0);
    }

    #[test]
    fn draw_line_fills_glyph_boxes() {
        let font = ScaledFont::new(Arc::new(BlockFace), 10.0);
        let mut mask = Mask::new(40, 20).expect("mask");
        font.draw_line(&mut mask, "a b", 0.0, 0.0);
        let at = |x: u32, y: u32| mask.data()[(y * 40 + x) as usize];
        // First glyph spans x 0.5..5.5, y 1..8 at 10px.
        assert!(at(2, 4) > 200);
        // The space draws nothing.
        assert_eq!(at(8, 4), 0);
        // Third glyph starts at 12.5.
        assert!(at(14, 4) > 200);
        // Below the baseline stays empty.
        assert_eq!(at(2, 9), 0);
    }

    #[test]
    fn missing_font_file_is_a_font_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = FontCache::new(dir.path());
        let err = cache
            .font(&FontRef::file("Nope.otf"), 12.0)
            .expect_err("missing font");
        assert!(matches!(err, LayoutError::Font { .. }));
    }

    const FIXTURE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");
    const MONO: &str = "DejaVuSansMono.ttf";

    fn fixture_data() -> Vec<u8> {
        std::fs::read(Path::new(FIXTURE_DIR).join(MONO)).expect("fixture font")
    }

    #[test]
    fn real_face_measures_with_hmtx_advances() {
        let data = fixture_data();
        let face = Face::parse(&data, 0).expect("parse");
        let upem = face.units_per_em() as f32;
        let advance = |ch: char| {
            face.glyph_index(ch)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
                .expect("advance") as f32
        };
        let expected = (advance('K') + advance('i') + advance(' ') + advance('!')) * 32.0 / upem;

        let cache = FontCache::new(FIXTURE_DIR);
        let font = cache.font(&FontRef::file(MONO), 32.0).expect("font");
        assert!((font.measure("Ki !") - expected).abs() < 1e-3);
        // Monospaced: every glyph advances the same amount.
        assert!((font.measure("iiii") - font.measure("WWWW")).abs() < 1e-3);
        assert!(font.ascent() > font.descent() && font.descent() > 0.0);
        assert_eq!(
            cache.face(&FontRef::file(MONO)).expect("face").family(),
            Some("DejaVu Sans Mono")
        );
    }

    #[test]
    fn real_glyphs_ink_inside_their_advance_box() {
        let cache = FontCache::new(FIXTURE_DIR);
        let font = cache.font(&FontRef::file(MONO), 40.0).expect("font");
        let width = font.measure("HI").ceil() as u32;
        let height = (font.ascent() + font.descent()).ceil() as u32;
        let mut mask = Mask::new(width + 40, height + 40).expect("mask");
        font.draw_line(&mut mask, "HI", 20.0, 20.0);

        let stride = mask.width();
        let inked: Vec<(u32, u32)> = mask
            .data()
            .iter()
            .enumerate()
            .filter(|(_, value)| **value > 0)
            .map(|(offset, _)| (offset as u32 % stride, offset as u32 / stride))
            .collect();
        assert!(!inked.is_empty());
        let half = font.measure("H");
        for (x, y) in &inked {
            assert!(*x >= 20 && *x <= 20 + width, "x {}", x);
            assert!(*y >= 20 && *y <= 20 + height, "y {}", y);
        }
        // The pen offset puts the second glyph in the second half.
        assert!(inked.iter().any(|(x, _)| *x as f32 > 20.0 + half));
        assert!(inked.iter().any(|(x, _)| (*x as f32) < 20.0 + half));
    }

    #[test]
    fn cache_hands_out_the_same_face() {
        let cache = FontCache::new(FIXTURE_DIR);
        let reference = FontRef::file(MONO);
        let first = cache.face(&reference).expect("face");
        let second = cache.face(&reference).expect("face");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn face_index_selects_one_face() {
        let face = FontFace::from_data_index(fixture_data(), 0).expect("face 0");
        assert_eq!(face.family(), Some("DejaVu Sans Mono"));
        assert!(FontFace::from_data_index(b"not a font".to_vec(), 0).is_err());
    }

    #[test]
    fn garbage_font_data_is_rejected() {
        assert!(FontFace::from_data(b"not a font".to_vec(), None).is_err());
    }

    #[test]
    fn non_positive_sizes_are_rejected() {
        let cache = FontCache::new(".");
        let err = cache
            .font(&FontRef::file("any.otf"), 0.0)
            .expect_err("zero size");
        assert!(matches!(err, LayoutError::Font { .. }));
    }
}
