//! Drawing capability the report layout paints onto.
//!
//! Coordinates are in points with the origin at the top-left corner of the
//! page; implementations convert to whatever their backend expects.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub size: f32,
    pub color: Color,
    pub align: Align,
    pub line_gap: f32,
}

impl TextStyle {
    pub const fn new(size: f32, color: Color) -> Self {
        Self {
            size,
            color,
            align: Align::Left,
            line_gap: 0.0,
        }
    }

    pub const fn centered(mut self) -> Self {
        self.align = Align::Center;
        self
    }

    pub const fn with_line_gap(mut self, line_gap: f32) -> Self {
        self.line_gap = line_gap;
        self
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CanvasError {
    #[error("document has no pages")]
    Empty,

    #[error("document exceeds the limit of {0} pages")]
    TooManyPages(usize),

    #[error("font error: {0}")]
    Font(String),
}

pub trait Canvas {
    fn page_size(&self) -> (f32, f32);

    fn add_page(&mut self) -> Result<(), CanvasError>;

    /// Draws `text` wrapped to `width`, starting with its first line's top
    /// at `y`. Text that runs past the bottom margin continues on a new
    /// page. Returns the y position below the last line drawn.
    fn text(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        text: &str,
        style: &TextStyle,
    ) -> Result<f32, CanvasError>;

    fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color);

    fn finish(self) -> Result<Vec<u8>, CanvasError>
    where
        Self: Sized;
}

/// Standard Helvetica advance widths for printable ASCII, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Advance width of `c` in the built-in Helvetica, in points.
pub fn helvetica_width(c: char, size: f32) -> f32 {
    let units = match c as u32 {
        code @ 32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
        _ => 556,
    };
    f32::from(units) * size / 1000.0
}

pub fn text_width(text: &str, char_width: impl Fn(char) -> f32) -> f32 {
    text.chars().map(char_width).sum()
}

/// Greedy word wrap using `char_width` for advances. Explicit newlines start
/// new lines, blank lines are kept, and words wider than `width` are broken
/// by character, which is also how unspaced CJK runs wrap.
pub fn wrap_text(text: &str, width: f32, char_width: impl Fn(char) -> f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let mut current = String::new();
        let mut current_width = 0.0;

        for word in paragraph.split_whitespace() {
            let word_width = text_width(word, &char_width);
            let space = if current.is_empty() {
                0.0
            } else {
                char_width(' ')
            };

            if current_width + space + word_width <= width {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                current_width += space + word_width;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
            }

            if word_width <= width {
                current.push_str(word);
                current_width = word_width;
            } else {
                for c in word.chars() {
                    let w = char_width(c);
                    if current_width + w > width && !current.is_empty() {
                        lines.push(std::mem::take(&mut current));
                        current_width = 0.0;
                    }
                    current.push(c);
                    current_width += w;
                }
            }
        }

        lines.push(current);
    }

    lines
}
