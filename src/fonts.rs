use lopdf::{Object, StringFormat};
use owned_ttf_parser::{AsFaceRef as _, Face, OwnedFace};
use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
    sync::Arc,
};

use crate::error::{ContextError, ErrorKind};

/// The vertical metrics of a font, expressed in font units.
#[derive(Clone, Copy, Debug, Default)]
pub struct FontMetrics {
    /// The ascent of the font.
    pub ascent: i16,
    /// The descent of the font (negative for fonts drawing below the baseline).
    pub descent: i16,
    /// The number of units per em of the font.
    pub units_per_em: u16,
}

/// The metrics associated to a single glyph of a font, in font units.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlyphMetrics {
    /// The horizontal advance of the glyph.
    pub width: u32,
    /// The height of the glyph.
    pub height: u32,
}

/// A font face parsed from a TTF font, shared between clones of the same `Font`.
#[derive(Clone, Debug)]
struct TtfFontFace {
    inner: Arc<OwnedFace>,
    units_per_em: u16,
}

impl TtfFontFace {
    fn from_bytes(data: &[u8]) -> Result<Self, ContextError> {
        let face = OwnedFace::from_vec(data.to_vec(), 0).map_err(|error| {
            ContextError::with_error(ErrorKind::Font, "Failed to parse font", &error)
        })?;
        let units_per_em = face.as_face_ref().units_per_em();

        Ok(Self {
            inner: Arc::new(face),
            units_per_em,
        })
    }

    fn face(&self) -> &Face<'_> {
        self.inner.as_face_ref()
    }

    fn font_metrics(&self) -> FontMetrics {
        FontMetrics {
            ascent: self.face().ascender(),
            descent: self.face().descender(),
            units_per_em: self.units_per_em,
        }
    }

    /// The glyph drawing the given character, ignoring the `.notdef` glyph.
    fn glyph_id(&self, character: char) -> Option<u16> {
        self.face()
            .glyph_index(character)
            .map(|glyph_id| glyph_id.0)
            .filter(|glyph_id| *glyph_id > 0)
    }

    /// Maps every glyph reachable from a unicode cmap subtable back to its character.
    fn glyph_ids(&self) -> HashMap<u16, char> {
        let Some(cmap) = self.face().tables().cmap else {
            return HashMap::new();
        };

        let mut gid_to_codepoint_map =
            HashMap::with_capacity(self.face().number_of_glyphs().into());
        for subtable in cmap.subtables.into_iter().filter(|table| table.is_unicode()) {
            subtable.codepoints(|codepoint| {
                let Ok(character) = char::try_from(codepoint) else {
                    return;
                };
                if let Some(glyph_index) = subtable.glyph_index(codepoint).filter(|id| id.0 > 0) {
                    gid_to_codepoint_map
                        .entry(glyph_index.0)
                        .or_insert(character);
                }
            })
        }

        gid_to_codepoint_map
    }

    fn glyph_count(&self) -> u16 {
        self.face().number_of_glyphs()
    }

    fn glyph_metrics(&self, glyph_id: u16) -> Option<GlyphMetrics> {
        let glyph_id = owned_ttf_parser::GlyphId(glyph_id);
        let width = self.face().glyph_hor_advance(glyph_id)? as u32;
        // Glyphs without outlines (spaces) fall back to a full em
        let height = self
            .face()
            .glyph_bounding_box(glyph_id)
            .map(|bounding_box| bounding_box.y_max - bounding_box.y_min - self.face().descender())
            .unwrap_or(1000) as u32;

        Some(GlyphMetrics { width, height })
    }
}

/// A TTF font loaded into memory, ready to be measured and embedded into a PDF document.
///
/// Clones share both the raw bytes and the parsed face.
#[derive(Debug, Clone)]
pub struct Font {
    bytes: Arc<Vec<u8>>,
    ttf_face: TtfFontFace,
    face_identifier: String,
}

impl Font {
    /// Parses a font from raw TTF/OTF data, naming its face with the given resource identifier (e.g. `F0`).
    pub fn from_bytes(bytes: Vec<u8>, face_identifier: String) -> Result<Self, ContextError> {
        let ttf_face = TtfFontFace::from_bytes(&bytes)?;

        Ok(Font {
            bytes: Arc::new(bytes),
            ttf_face,
            face_identifier,
        })
    }

    /// Reads and parses the font at the given path.
    pub fn from_path(font_path: &Path, face_identifier: String) -> Result<Self, ContextError> {
        let bytes = std::fs::read(font_path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Font,
                format!("Failed to read font {:?}", font_path),
                &error,
            )
        })?;
        log::debug!("Loaded font {:?} as {}", font_path, face_identifier);

        Self::from_bytes(bytes, face_identifier)
    }

    /// The name under which the font is referenced from the page resources.
    pub fn face_identifier(&self) -> &str {
        &self.face_identifier
    }

    pub fn metrics(&self) -> FontMetrics {
        self.ttf_face.font_metrics()
    }

    /// Whether the font has a real glyph for the character.
    pub fn has_glyph(&self, character: char) -> bool {
        self.ttf_face.glyph_id(character).is_some()
    }

    pub fn glyph_id(&self, character: char) -> Option<u16> {
        self.ttf_face.glyph_id(character)
    }

    /// The width of the text in points when set at the given size. Missing glyphs count as zero.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let units: u32 = text
            .chars()
            .filter_map(|character| self.ttf_face.glyph_id(character))
            .filter_map(|glyph_id| self.ttf_face.glyph_metrics(glyph_id))
            .map(|metrics| metrics.width)
            .sum();

        units as f32 * font_size / self.ttf_face.units_per_em as f32
    }

    /// The distance from the baseline to the top of the line, in points.
    pub fn ascender(&self, font_size: f32) -> f32 {
        let metrics = self.metrics();
        metrics.ascent as f32 * font_size / metrics.units_per_em as f32
    }

    /// The distance from the baseline to the bottom of the line, in points (negative).
    pub fn descender(&self, font_size: f32) -> f32 {
        let metrics = self.metrics();
        metrics.descent as f32 * font_size / metrics.units_per_em as f32
    }

    pub fn line_height(&self, font_size: f32) -> f32 {
        self.ascender(font_size) - self.descender(font_size)
    }

    /// Encodes the text as big-endian glyph IDs, as expected by the `Identity-H` encoding.
    pub fn encode_text(&self, text: &str) -> Vec<u8> {
        text.chars()
            .filter_map(|character| self.ttf_face.glyph_id(character))
            .flat_map(|glyph_id| glyph_id.to_be_bytes())
            .collect()
    }

    /// Inserts the font program, its descriptor and its ToUnicode map into the document,
    /// returning the Type0 font dictionary to be referenced from the page resources.
    pub(crate) fn insert_into_document(
        &self,
        inner_document: &mut lopdf::Document,
    ) -> lopdf::Dictionary {
        use lopdf::Object::*;
        let face_metrics = self.ttf_face.font_metrics();

        let font_stream = lopdf::Stream::new(
            lopdf::Dictionary::from_iter(vec![("Length1", Integer(self.bytes.len() as i64))]),
            self.bytes.to_vec(),
        )
        .with_compression(false);

        let mut font_vector: Vec<(::std::string::String, Object)> = vec![
            ("Type".into(), Name("Font".into())),
            ("Subtype".into(), Name("Type0".into())),
            ("BaseFont".into(), Name(self.face_identifier.clone().into_bytes())),
            ("Encoding".into(), Name("Identity-H".into())),
        ];

        let mut font_descriptor_vector: Vec<(::std::string::String, Object)> = vec![
            ("Type".into(), Name("FontDescriptor".into())),
            ("FontName".into(), Name(self.face_identifier.clone().into_bytes())),
            ("Ascent".into(), Integer(i64::from(face_metrics.ascent))),
            ("Descent".into(), Integer(i64::from(face_metrics.descent))),
            ("CapHeight".into(), Integer(i64::from(face_metrics.ascent))),
            ("ItalicAngle".into(), Integer(0)),
            // Nonsymbolic: the font uses the standard Latin character set
            ("Flags".into(), Integer(32)),
            ("StemV".into(), Integer(80)),
        ];

        let mut maximum_character_height = 0;
        let mut total_width = 0;

        // Glyph ID -> (codepoint, width, height)
        let mut gid_to_glyph_properties_map = BTreeMap::<u32, (u32, u32, u32)>::new();
        gid_to_glyph_properties_map.insert(0, (0, 1000, 1000));

        for (glyph_id, character) in self.ttf_face.glyph_ids() {
            if let Some(glyph_metrics) = self.ttf_face.glyph_metrics(glyph_id) {
                maximum_character_height = maximum_character_height.max(glyph_metrics.height);
                total_width += glyph_metrics.width;
                gid_to_glyph_properties_map.insert(
                    glyph_id as u32,
                    (character as u32, glyph_metrics.width, glyph_metrics.height),
                );
            }
        }

        // A bfchar block may hold at most 100 entries, all sharing the same high byte
        let mut current_high_byte: u32 = 0;
        let mut all_gid_to_character_blocks = Vec::new();
        let mut current_gid_to_character_block = Vec::new();
        for (glyph_id, (character, _, _)) in gid_to_glyph_properties_map.iter() {
            if (*glyph_id >> 8) != current_high_byte
                || current_gid_to_character_block.len() >= 100
            {
                all_gid_to_character_blocks
                    .push(std::mem::take(&mut current_gid_to_character_block));
                current_high_byte = *glyph_id >> 8;
            }
            current_gid_to_character_block.push((*glyph_id, *character));
        }
        all_gid_to_character_blocks.push(current_gid_to_character_block);

        let cid_to_unicode_map =
            generate_cid_to_unicode_map(&self.face_identifier, all_gid_to_character_blocks);
        let cid_to_unicode_map_stream = lopdf::Stream::new(
            lopdf::Dictionary::new(),
            cid_to_unicode_map.into_bytes(),
        );
        let cid_to_unicode_map_stream_id = inner_document.add_object(cid_to_unicode_map_stream);

        // The W array groups consecutive glyph IDs: `first [w1 w2 ...]`, widths scaled to 1000 units per em
        let mut width_objects = Vec::<Object>::new();
        let mut current_lower_glyph_id = 0;
        let mut current_upper_glyph_id = 0;
        let mut current_widths_vector = Vec::<Object>::new();
        let font_scaling = 1000.0 / (face_metrics.units_per_em as f32);

        for glyph_id in 0..self.ttf_face.glyph_count() {
            let Some(GlyphMetrics { width, .. }) = self.ttf_face.glyph_metrics(glyph_id) else {
                log::warn!(
                    "Glyph ID {} of the font {:?} has no width, skipping it",
                    glyph_id,
                    self.face_identifier
                );
                continue;
            };
            if glyph_id != current_upper_glyph_id {
                width_objects.push(Integer(current_lower_glyph_id as i64));
                width_objects.push(Array(std::mem::take(&mut current_widths_vector)));
                current_lower_glyph_id = glyph_id;
            }
            current_widths_vector.push(Integer((width as f32 * font_scaling) as i64));
            current_upper_glyph_id = glyph_id + 1;
        }
        width_objects.push(Integer(current_lower_glyph_id as i64));
        width_objects.push(Array(current_widths_vector));

        let mut descendant_font = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Font".into())),
            ("Subtype", Name("CIDFontType2".into())),
            ("BaseFont", Name(self.face_identifier.clone().into())),
            (
                "CIDSystemInfo",
                Dictionary(lopdf::Dictionary::from_iter(vec![
                    ("Registry", String("Adobe".into(), StringFormat::Literal)),
                    ("Ordering", String("Identity".into(), StringFormat::Literal)),
                    ("Supplement", Integer(0)),
                ])),
            ),
            ("W", Array(width_objects)),
            ("DW", Integer(1000)),
        ]);

        let font_bounding_box = vec![
            Integer(0),
            Integer(maximum_character_height as i64),
            Integer(total_width as i64),
            Integer(maximum_character_height as i64),
        ];
        font_descriptor_vector.push((
            "FontFile2".into(),
            Reference(inner_document.add_object(font_stream)),
        ));
        // Not required by the format, but Adobe Reader refuses the font without it
        font_descriptor_vector.push(("FontBBox".into(), Array(font_bounding_box)));

        let font_descriptor_id =
            inner_document.add_object(lopdf::Dictionary::from_iter(font_descriptor_vector));
        descendant_font.set("FontDescriptor", Reference(font_descriptor_id));

        font_vector.push((
            "DescendantFonts".into(),
            Array(vec![Dictionary(descendant_font)]),
        ));
        font_vector.push(("ToUnicode".into(), Reference(cid_to_unicode_map_stream_id)));

        lopdf::Dictionary::from_iter(font_vector)
    }
}

type GlyphId = u32;
type UnicodeCodePoint = u32;
type CmapBlock = Vec<(GlyphId, UnicodeCodePoint)>;

/// Builds the ToUnicode CMap of a font from its bfchar blocks, so that text can be copied out of the PDF.
fn generate_cid_to_unicode_map(face_name: &str, all_cmap_blocks: Vec<CmapBlock>) -> String {
    let mut cid_to_unicode_map =
        format!(include_str!("../assets/gid_to_unicode_beg.txt"), face_name);

    for cmap_block in all_cmap_blocks.into_iter().filter(|block| !block.is_empty()) {
        cid_to_unicode_map.push_str(&format!("{} beginbfchar\r\n", cmap_block.len()));
        for (glyph_id, unicode) in cmap_block {
            cid_to_unicode_map.push_str(&format!("<{glyph_id:04x}> <{unicode:04x}>\n"));
        }
        cid_to_unicode_map.push_str("endbfchar\r\n");
    }

    cid_to_unicode_map.push_str(include_str!("../assets/gid_to_unicode_end.txt"));

    cid_to_unicode_map
}
