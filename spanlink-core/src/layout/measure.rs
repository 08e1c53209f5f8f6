//! Render measurement feed.
//!
//! A [`Measurer`] plays the host text renderer: it lays the document text out
//! and reports one bounding rectangle per character, plus the render nodes the
//! offset resolver walks. [`GridMeasurer`] is the monospace cell grid used by
//! the terminal front-ends.

use unicode_width::UnicodeWidthChar;

use crate::selection::{ContainerId, RenderNodes};

use super::CharRect;

/// Inputs that change where characters land
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasureParams {
    pub font_size: f32,
    pub line_height: f32,
    pub viewport_width: f32,
}

/// Per-character rectangles, indexed by character offset
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub rects: Vec<CharRect>,
    pub nodes: RenderNodes,
}

pub trait Measurer {
    fn params(&self) -> MeasureParams;
    fn measure(&mut self, text: &str) -> Measurement;
}

/// Word-wrapping monospace layout in terminal cells.
///
/// Every text row is `line_height` cells below the previous one, leaving
/// blank rows above it for relation arcs. Each visual row is one render node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMeasurer {
    pub container: ContainerId,
    pub width: u16,
    pub line_height: u16,
}

impl GridMeasurer {
    pub fn new(container: ContainerId, width: u16, line_height: u16) -> Self {
        Self {
            container,
            width: width.max(1),
            line_height: line_height.max(1),
        }
    }

    /// Blank rows above the first text row
    pub fn top_padding(&self) -> u16 {
        self.line_height - 1
    }

    /// Cell row of visual text row `row`
    pub fn row_y(&self, row: usize) -> f32 {
        self.top_padding() as f32 + row as f32 * self.line_height as f32
    }
}

fn cell_width(ch: char) -> u16 {
    ch.width().unwrap_or(1) as u16
}

impl Measurer for GridMeasurer {
    fn params(&self) -> MeasureParams {
        MeasureParams {
            font_size: 1.0,
            line_height: self.line_height as f32,
            viewport_width: self.width as f32,
        }
    }

    fn measure(&mut self, text: &str) -> Measurement {
        let chars: Vec<char> = text.chars().collect();
        let mut rects = Vec::with_capacity(chars.len());
        let mut node_lens = Vec::new();
        let (mut row, mut col, mut row_len) = (0usize, 0u16, 0usize);

        for (i, &ch) in chars.iter().enumerate() {
            if ch == '\n' {
                rects.push(CharRect::new(col as f32, self.row_y(row), 0.0, 1.0));
                node_lens.push(row_len + 1);
                row += 1;
                col = 0;
                row_len = 0;
                continue;
            }

            let w = cell_width(ch);
            let starts_word = !ch.is_whitespace() && (i == 0 || chars[i - 1].is_whitespace());
            let overflow = if starts_word {
                // Keep a word on one row when it fits on an empty one
                let word: u16 = chars[i..]
                    .iter()
                    .take_while(|c| !c.is_whitespace())
                    .map(|&c| cell_width(c))
                    .sum();
                col + word > self.width && word <= self.width
            } else {
                false
            };

            // Whitespace may hang past the edge instead of opening a row
            if col > 0 && !ch.is_whitespace() && (overflow || col + w > self.width) {
                node_lens.push(row_len);
                row += 1;
                col = 0;
                row_len = 0;
            }

            rects.push(CharRect::new(col as f32, self.row_y(row), w as f32, 1.0));
            col += w;
            row_len += 1;
        }
        node_lens.push(row_len);

        Measurement {
            rects,
            nodes: RenderNodes::new(self.container, node_lens),
        }
    }
}
