use crate::layout::CharRect;

/// Rows closer than this are the same visual row
const ROW_EPSILON: f32 = 0.5;

/// Keyboard caret over the measured character grid.
///
/// The caret always sits on a character (never past the end), so a visual
/// selection from anchor to caret covers both endpoints.
#[derive(Debug, Clone, Default)]
pub struct CursorState {
    offset: usize,
    len: usize,
    /// Column remembered across vertical moves over shorter rows
    preferred_x: Option<f32>,
}

impl CursorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a document of `len` characters
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        self.offset = 0;
        self.preferred_x = None;
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset.min(self.len.saturating_sub(1));
        self.preferred_x = None;
    }

    pub fn move_left(&mut self) {
        self.set_offset(self.offset.saturating_sub(1));
    }

    pub fn move_right(&mut self) {
        self.set_offset(self.offset + 1);
    }

    pub fn move_to_top(&mut self) {
        self.set_offset(0);
    }

    pub fn move_to_bottom(&mut self) {
        self.set_offset(self.len);
    }

    pub fn move_up(&mut self, rects: &[CharRect]) {
        self.move_vertical(rects, false);
    }

    pub fn move_down(&mut self, rects: &[CharRect]) {
        self.move_vertical(rects, true);
    }

    fn move_vertical(&mut self, rects: &[CharRect], down: bool) {
        let Some(current) = rects.get(self.offset) else {
            return;
        };
        let x = *self.preferred_x.get_or_insert(current.x);

        let target_y = rects
            .iter()
            .map(|r| r.y)
            .filter(|&y| {
                if down {
                    y > current.y + ROW_EPSILON
                } else {
                    y < current.y - ROW_EPSILON
                }
            })
            .reduce(|a, b| if down { a.min(b) } else { a.max(b) });
        let Some(target_y) = target_y else {
            return;
        };

        let nearest = rects
            .iter()
            .enumerate()
            .filter(|(_, r)| (r.y - target_y).abs() < ROW_EPSILON)
            .min_by(|(_, a), (_, b)| (a.x - x).abs().total_cmp(&(b.x - x).abs()))
            .map(|(i, _)| i);
        if let Some(i) = nearest {
            self.offset = i.min(self.len.saturating_sub(1));
        }
    }

    pub fn move_word_forward(&mut self, text: &str) {
        let chars: Vec<char> = text.chars().collect();
        let mut i = self.offset;

        // Skip current word (non-whitespace)
        while i < chars.len() && !chars[i].is_whitespace() {
            i += 1;
        }
        // Skip whitespace
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        self.set_offset(i);
    }

    pub fn move_word_back(&mut self, text: &str) {
        let chars: Vec<char> = text.chars().collect();
        let mut i = self.offset.min(chars.len());

        while i > 0 && chars[i - 1].is_whitespace() {
            i -= 1;
        }
        while i > 0 && !chars[i - 1].is_whitespace() {
            i -= 1;
        }
        self.set_offset(i);
    }
}
