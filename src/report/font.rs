//! TrueType / OpenType font programs embedded into reports, so text outside
//! the built-in Helvetica repertoire (CJK in particular) prints as written.

use std::fmt;
use std::path::Path;

use thiserror::Error;
use ttf_parser::{Face, GlyphId, Tag, name_id};

#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid font data: {0}")]
    Parse(String),
}

/// Outline format of the font program, which decides how it is embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outlines {
    TrueType,
    Cff,
}

pub struct EmbeddedFont {
    data: Vec<u8>,
    postscript_name: String,
    outlines: Outlines,
    units_per_em: f32,
    ascender: i16,
    descender: i16,
    cap_height: i16,
    bbox: [i16; 4],
}

impl EmbeddedFont {
    pub fn load(path: &Path) -> Result<Self, FontError> {
        let data = std::fs::read(path).map_err(|source| FontError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, FontError> {
        let face = Face::parse(&data, 0).map_err(|e| FontError::Parse(e.to_string()))?;

        let outlines = if face.raw_face().table(Tag::from_bytes(b"CFF ")).is_some() {
            Outlines::Cff
        } else {
            Outlines::TrueType
        };

        let postscript_name = face
            .names()
            .into_iter()
            .filter(|name| name.name_id == name_id::POST_SCRIPT_NAME)
            .find_map(|name| name.to_string())
            .map(|name| pdf_name(&name))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "EmbeddedFont".to_string());

        let rect = face.global_bounding_box();
        let units_per_em = f32::from(face.units_per_em());
        let ascender = face.ascender();
        let descender = face.descender();
        let cap_height = face.capital_height().unwrap_or(ascender);

        Ok(Self {
            data,
            postscript_name,
            outlines,
            units_per_em,
            ascender,
            descender,
            cap_height,
            bbox: [rect.x_min, rect.y_min, rect.x_max, rect.y_max],
        })
    }

    /// Parsed view of the font program. Cheap: only the table directory is
    /// read up front.
    pub fn face(&self) -> Result<Face<'_>, FontError> {
        Face::parse(&self.data, 0).map_err(|e| FontError::Parse(e.to_string()))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn postscript_name(&self) -> &str {
        &self.postscript_name
    }

    pub fn outlines(&self) -> Outlines {
        self.outlines
    }

    /// Converts font units to thousandths of an em.
    pub fn to_glyph_space(&self, units: f32) -> f32 {
        units * 1000.0 / self.units_per_em
    }

    pub fn ascent(&self) -> f32 {
        self.to_glyph_space(f32::from(self.ascender))
    }

    pub fn descent(&self) -> f32 {
        self.to_glyph_space(f32::from(self.descender))
    }

    pub fn cap_height(&self) -> f32 {
        self.to_glyph_space(f32::from(self.cap_height))
    }

    pub fn bbox(&self) -> [f32; 4] {
        self.bbox.map(|v| self.to_glyph_space(f32::from(v)))
    }
}

impl fmt::Debug for EmbeddedFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedFont")
            .field("postscript_name", &self.postscript_name)
            .field("outlines", &self.outlines)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Glyph id and advance (in thousandths of an em) of `c`. Characters the
/// font has no glyph for map to `.notdef`.
pub fn glyph_metrics(font: &EmbeddedFont, face: &Face<'_>, c: char) -> (u16, f32) {
    let glyph = face.glyph_index(c).unwrap_or(GlyphId(0));
    let advance = face.glyph_hor_advance(glyph).unwrap_or(0);
    (glyph.0, font.to_glyph_space(f32::from(advance)))
}

fn pdf_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
        .collect()
}

/// Minimal in-memory TrueType font for tests: glyph 0 is `.notdef`, glyph
/// `i + 1` is `chars[i]`, and every glyph advances 1000 units on a 1000-unit em
/// except `.notdef` at 500.
#[cfg(test)]
pub(crate) fn test_font(chars: &[char]) -> Vec<u8> {
    fn be16(out: &mut Vec<u8>, v: u16) {
        out.extend_from_slice(&v.to_be_bytes());
    }
    fn be32(out: &mut Vec<u8>, v: u32) {
        out.extend_from_slice(&v.to_be_bytes());
    }

    let num_glyphs = chars.len() as u16 + 1;

    let mut head = Vec::new();
    be32(&mut head, 0x0001_0000);
    be32(&mut head, 0x0001_0000);
    be32(&mut head, 0);
    be32(&mut head, 0x5F0F_3CF5);
    be16(&mut head, 0);
    be16(&mut head, 1000);
    head.extend_from_slice(&[0; 16]);
    for v in [0i16, -120, 1000, 880] {
        be16(&mut head, v as u16);
    }
    be16(&mut head, 0);
    be16(&mut head, 8);
    be16(&mut head, 2);
    be16(&mut head, 0);
    be16(&mut head, 0);
    assert_eq!(head.len(), 54);

    let mut hhea = Vec::new();
    be32(&mut hhea, 0x0001_0000);
    be16(&mut hhea, 880);
    be16(&mut hhea, (-120i16) as u16);
    be16(&mut hhea, 0);
    be16(&mut hhea, 1000);
    hhea.extend_from_slice(&[0; 6]);
    be16(&mut hhea, 1);
    hhea.extend_from_slice(&[0; 14]);
    be16(&mut hhea, num_glyphs);
    assert_eq!(hhea.len(), 36);

    let mut maxp = Vec::new();
    be32(&mut maxp, 0x0000_5000);
    be16(&mut maxp, num_glyphs);

    let mut hmtx = Vec::new();
    be16(&mut hmtx, 500);
    be16(&mut hmtx, 0);
    for _ in chars {
        be16(&mut hmtx, 1000);
        be16(&mut hmtx, 0);
    }

    // Format 4 subtable: one single-character segment per glyph, plus the
    // mandatory 0xFFFF terminator.
    let mut segments: Vec<(u16, u16)> = chars
        .iter()
        .enumerate()
        .map(|(i, c)| (*c as u32 as u16, i as u16 + 1))
        .collect();
    segments.sort_unstable();
    segments.push((0xFFFF, 0));
    let seg_count = segments.len() as u16;

    let mut cmap = Vec::new();
    be16(&mut cmap, 0);
    be16(&mut cmap, 1);
    be16(&mut cmap, 3);
    be16(&mut cmap, 1);
    be32(&mut cmap, 12);
    be16(&mut cmap, 4);
    be16(&mut cmap, 16 + 8 * seg_count);
    be16(&mut cmap, 0);
    be16(&mut cmap, seg_count * 2);
    be16(&mut cmap, 2);
    be16(&mut cmap, 0);
    be16(&mut cmap, 0);
    for (code, _) in &segments {
        be16(&mut cmap, *code);
    }
    be16(&mut cmap, 0);
    for (code, _) in &segments {
        be16(&mut cmap, *code);
    }
    for (code, glyph) in &segments {
        let delta = if *code == 0xFFFF {
            1
        } else {
            glyph.wrapping_sub(*code)
        };
        be16(&mut cmap, delta);
    }
    for _ in &segments {
        be16(&mut cmap, 0);
    }

    let tables: [(&[u8; 4], Vec<u8>); 5] = [
        (b"cmap", cmap),
        (b"head", head),
        (b"hhea", hhea),
        (b"hmtx", hmtx),
        (b"maxp", maxp),
    ];

    let mut font = Vec::new();
    be32(&mut font, 0x0001_0000);
    be16(&mut font, tables.len() as u16);
    be16(&mut font, 64);
    be16(&mut font, 2);
    be16(&mut font, 16);

    let mut offset = 12 + 16 * tables.len();
    let mut body = Vec::new();
    for (tag, data) in &tables {
        font.extend_from_slice(*tag);
        be32(&mut font, 0);
        be32(&mut font, offset as u32);
        be32(&mut font, data.len() as u32);

        body.extend_from_slice(data);
        while body.len() % 4 != 0 {
            body.push(0);
        }
        offset = 12 + 16 * tables.len() + body.len();
    }
    font.extend_from_slice(&body);
    font
}
