use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use super::canvas::{
    Align, Canvas, CanvasError, Color, TextStyle, helvetica_width, text_width, wrap_text,
};
use super::font::{EmbeddedFont, Outlines, glyph_metrics};

pub const A4: (f32, f32) = (595.28, 841.89);
pub const MARGIN: f32 = 50.0;
const MAX_PAGES: usize = 500;
// Helvetica ascender, used to place the baseline under a line's top edge.
const HELVETICA_ASCENT: f32 = 0.718;
const TO_UNICODE_CHUNK: usize = 100;

/// A4 PDF canvas. Text is set in the built-in Helvetica unless an embedded
/// font is supplied, in which case every string is drawn with that font as a
/// Type0 font under Identity-H encoding.
pub struct PdfCanvas {
    title: String,
    pages: Vec<String>,
    font: Option<Arc<EmbeddedFont>>,
    // glyph id -> (advance in glyph space, first character drawn with it)
    used_glyphs: BTreeMap<u16, (f32, char)>,
}

/// One wrapped line ready to be shown: its width in points and the string
/// operand for `Tj`.
struct Run {
    width: f32,
    operand: String,
}

impl PdfCanvas {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            pages: Vec::new(),
            font: None,
            used_glyphs: BTreeMap::new(),
        }
    }

    pub fn with_font(mut self, font: Arc<EmbeddedFont>) -> Self {
        self.font = Some(font);
        self
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn current_page(&mut self) -> Result<&mut String, CanvasError> {
        if self.pages.is_empty() {
            self.add_page()?;
        }
        self.pages.last_mut().ok_or(CanvasError::Empty)
    }

    fn helvetica_runs(text: &str, width: f32, size: f32) -> Vec<Run> {
        let advance = |c: char| helvetica_width(c, size);
        wrap_text(text, width, advance)
            .into_iter()
            .map(|line| Run {
                width: text_width(&line, advance),
                operand: format!("({})", encode_text(&line)),
            })
            .collect()
    }

    fn embedded_runs(
        &mut self,
        font: &EmbeddedFont,
        text: &str,
        width: f32,
        size: f32,
    ) -> Result<Vec<Run>, CanvasError> {
        let face = font.face().map_err(|e| CanvasError::Font(e.to_string()))?;
        let advance = |c: char| glyph_metrics(font, &face, c).1 * size / 1000.0;

        let mut runs = Vec::new();
        for line in wrap_text(text, width, advance) {
            let mut operand = String::from("<");
            let mut line_width = 0.0;
            for c in line.chars().filter(|c| !c.is_control()) {
                let (glyph, glyph_width) = glyph_metrics(font, &face, c);
                self.used_glyphs.entry(glyph).or_insert((glyph_width, c));
                let _ = write!(operand, "{glyph:04X}");
                line_width += glyph_width * size / 1000.0;
            }
            operand.push('>');
            runs.push(Run {
                width: line_width,
                operand,
            });
        }
        Ok(runs)
    }

    fn font_objects(&self, font: &EmbeddedFont, first_id: usize) -> Vec<Vec<u8>> {
        let cid_font_id = first_id + 1;
        let descriptor_id = first_id + 2;
        let file_id = first_id + 3;
        let to_unicode_id = first_id + 4;
        let name = font.postscript_name();

        let widths = self
            .used_glyphs
            .iter()
            .map(|(glyph, (width, _))| format!("{glyph} [{}]", num(*width)))
            .collect::<Vec<_>>()
            .join(" ");

        let (subtype, cid_to_gid, file_key, file_dict) = match font.outlines() {
            Outlines::TrueType => (
                "CIDFontType2",
                " /CIDToGIDMap /Identity",
                "FontFile2",
                format!(" /Length1 {}", font.data().len()),
            ),
            Outlines::Cff => ("CIDFontType0", "", "FontFile3", " /Subtype /OpenType".to_string()),
        };

        let [x_min, y_min, x_max, y_max] = font.bbox();

        vec![
            format!(
                "<< /Type /Font /Subtype /Type0 /BaseFont /{name} /Encoding /Identity-H \
                 /DescendantFonts [{cid_font_id} 0 R] /ToUnicode {to_unicode_id} 0 R >>"
            )
            .into_bytes(),
            format!(
                "<< /Type /Font /Subtype /{subtype} /BaseFont /{name} \
                 /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
                 /FontDescriptor {descriptor_id} 0 R /DW 1000 /W [{widths}]{cid_to_gid} >>"
            )
            .into_bytes(),
            format!(
                "<< /Type /FontDescriptor /FontName /{name} /Flags 4 \
                 /FontBBox [{} {} {} {}] /ItalicAngle 0 /Ascent {} /Descent {} \
                 /CapHeight {} /StemV 80 /{file_key} {file_id} 0 R >>",
                num(x_min),
                num(y_min),
                num(x_max),
                num(y_max),
                num(font.ascent()),
                num(font.descent()),
                num(font.cap_height()),
            )
            .into_bytes(),
            stream_object(&file_dict, font.data()),
            stream_object("", self.to_unicode_cmap().as_bytes()),
        ]
    }

    /// Maps glyph ids back to the characters they were drawn for, so text can
    /// be searched and copied out of the document.
    fn to_unicode_cmap(&self) -> String {
        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
        );

        let entries: Vec<(&u16, &(f32, char))> = self.used_glyphs.iter().collect();
        for chunk in entries.chunks(TO_UNICODE_CHUNK) {
            let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
            for (glyph, (_, c)) in chunk {
                let mut units = [0u16; 2];
                let utf16: String = c
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|unit| format!("{unit:04X}"))
                    .collect();
                let _ = writeln!(cmap, "<{glyph:04X}> <{utf16}>");
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str(
            "endcmap\n\
             CMapName currentdict /CMap defineresource pop\n\
             end\n\
             end\n",
        );
        cmap
    }
}

impl Canvas for PdfCanvas {
    fn page_size(&self) -> (f32, f32) {
        A4
    }

    fn add_page(&mut self) -> Result<(), CanvasError> {
        if self.pages.len() >= MAX_PAGES {
            return Err(CanvasError::TooManyPages(MAX_PAGES));
        }
        self.pages.push(String::new());
        Ok(())
    }

    fn text(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        text: &str,
        style: &TextStyle,
    ) -> Result<f32, CanvasError> {
        let (_, page_height) = A4;
        let line_height = style.size * 1.15 + style.line_gap;
        let bottom = page_height - MARGIN;

        let (resource, ascent, runs) = match self.font.clone() {
            Some(font) => (
                "F2",
                font.ascent() / 1000.0,
                self.embedded_runs(&font, text, width, style.size)?,
            ),
            None => (
                "F1",
                HELVETICA_ASCENT,
                Self::helvetica_runs(text, width, style.size),
            ),
        };

        let mut top = y;
        for run in runs {
            if top + line_height > bottom {
                self.add_page()?;
                top = MARGIN;
            }

            if run.width > 0.0 {
                let line_x = match style.align {
                    Align::Left => x,
                    Align::Center => x + (width - run.width).max(0.0) / 2.0,
                };
                let baseline = page_height - (top + style.size * ascent);
                let Color { r, g, b } = style.color;
                let page = self.current_page()?;
                let _ = writeln!(
                    page,
                    "BT /{resource} {} Tf {} {} {} rg {} {} Td {} Tj ET",
                    num(style.size),
                    num(r),
                    num(g),
                    num(b),
                    num(line_x),
                    num(baseline),
                    run.operand
                );
            }

            top += line_height;
        }

        Ok(top)
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color) {
        let (_, page_height) = A4;
        if let Ok(page) = self.current_page() {
            let _ = writeln!(
                page,
                "{} w {} {} {} RG {} {} m {} {} l S",
                num(width),
                num(color.r),
                num(color.g),
                num(color.b),
                num(from.0),
                num(page_height - from.1),
                num(to.0),
                num(page_height - to.1)
            );
        }
    }

    fn finish(self) -> Result<Vec<u8>, CanvasError> {
        if self.pages.is_empty() {
            return Err(CanvasError::Empty);
        }

        // Objects 1-4 are fixed, then the embedded font objects if any, then
        // a page object and a content stream per page.
        let font_objects = match &self.font {
            Some(font) => self.font_objects(font, 5),
            None => Vec::new(),
        };
        let first_page_id = 5 + font_objects.len();
        let page_ids: Vec<usize> = (0..self.pages.len())
            .map(|i| first_page_id + i * 2)
            .collect();
        let kids = page_ids
            .iter()
            .map(|id| format!("{id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");
        let font_resources = if font_objects.is_empty() {
            "/F1 3 0 R".to_string()
        } else {
            "/F1 3 0 R /F2 5 0 R".to_string()
        };

        let mut objects: Vec<Vec<u8>> = vec![
            b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
            format!(
                "<< /Type /Pages /Kids [{kids}] /Count {} >>",
                self.pages.len()
            )
            .into_bytes(),
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_vec(),
            format!(
                "<< /Title ({}) /Producer (privacy-prism) >>",
                encode_text(&self.title)
            )
            .into_bytes(),
        ];
        objects.extend(font_objects);

        for (page_id, content) in page_ids.iter().zip(&self.pages) {
            objects.push(
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                     /Resources << /Font << {font_resources} >> >> /Contents {} 0 R >>",
                    num(A4.0),
                    num(A4.1),
                    page_id + 1
                )
                .into_bytes(),
            );
            objects.push(stream_object("", content.as_bytes()));
        }

        // OpenType (CFF) font programs need PDF 1.6.
        let version = match self.font.as_deref().map(EmbeddedFont::outlines) {
            Some(Outlines::Cff) => "1.6",
            _ => "1.4",
        };

        let mut out = format!("%PDF-{version}\n").into_bytes();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        let mut trailer = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            let _ = write!(trailer, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            trailer,
            "trailer\n<< /Size {} /Root 1 0 R /Info 4 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            objects.len() + 1
        );
        out.extend_from_slice(trailer.as_bytes());

        Ok(out)
    }
}

fn stream_object(dict_entries: &str, data: &[u8]) -> Vec<u8> {
    let mut object = format!("<< /Length {}{dict_entries} >>\nstream\n", data.len()).into_bytes();
    object.extend_from_slice(data);
    object.extend_from_slice(b"\nendstream");
    object
}

fn num(value: f32) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

/// PDF literal string body in WinAnsi for the built-in font. Characters it
/// cannot show become `?`; everything outside printable ASCII is
/// octal-escaped.
pub(crate) fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\t' => out.push(' '),
            ' '..='~' => out.push(c),
            _ => match winansi_byte(c) {
                Some(byte) => {
                    let _ = write!(out, "\\{byte:03o}");
                }
                None if c.is_control() => {}
                None => out.push('?'),
            },
        }
    }
    out
}

fn winansi_byte(c: char) -> Option<u8> {
    match c {
        '\u{a0}'..='\u{ff}' => Some(c as u32 as u8),
        '\u{2018}' => Some(0x91),
        '\u{2019}' => Some(0x92),
        '\u{201c}' => Some(0x93),
        '\u{201d}' => Some(0x94),
        '\u{2022}' => Some(0x95),
        '\u{2013}' => Some(0x96),
        '\u{2014}' => Some(0x97),
        '\u{2026}' => Some(0x85),
        '\u{20ac}' => Some(0x80),
        _ => None,
    }
}
