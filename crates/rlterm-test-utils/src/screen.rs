//! Virtual screen for checking what emitted escape sequences do

use rlterm_terminal::{EscapeBuilder, Request};

/// A vt100 screen that requests are written to
pub struct ScreenProbe {
    parser: vt100::Parser,
    builder: EscapeBuilder,
}

impl Default for ScreenProbe {
    fn default() -> Self {
        Self::new(24, 80)
    }
}

impl ScreenProbe {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            parser: vt100::Parser::new(rows, cols, 0),
            builder: EscapeBuilder::new(),
        }
    }

    /// Apply one request through the builder
    pub fn apply(&mut self, request: &Request) -> &mut Self {
        let bytes = self.builder.get(request).to_string();
        self.parser.process(bytes.as_bytes());
        self
    }

    /// Feed raw text, e.g. content to style
    pub fn print(&mut self, text: &str) -> &mut Self {
        self.parser.process(text.as_bytes());
        self
    }

    pub fn screen(&self) -> &vt100::Screen {
        self.parser.screen()
    }

    /// Cursor as (row, column), 0-based
    pub fn cursor(&self) -> (u16, u16) {
        self.parser.screen().cursor_position()
    }

    pub fn cell(&self, row: u16, col: u16) -> Option<&vt100::Cell> {
        self.parser.screen().cell(row, col)
    }

    pub fn fg_at(&self, row: u16, col: u16) -> vt100::Color {
        self.cell(row, col)
            .map(|cell| cell.fgcolor())
            .unwrap_or(vt100::Color::Default)
    }

    pub fn bg_at(&self, row: u16, col: u16) -> vt100::Color {
        self.cell(row, col)
            .map(|cell| cell.bgcolor())
            .unwrap_or(vt100::Color::Default)
    }

    pub fn row_text(&self, row: u16) -> String {
        let cols = self.parser.screen().size().1;
        self.parser
            .screen()
            .contents_between(row, 0, row, cols)
            .trim_end()
            .to_string()
    }
}
