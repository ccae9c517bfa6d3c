//! Cursor-based document canvas over pdf-writer
//!
//! Provides the stateful drawing surface block renderers mutate: a
//! cursor in millimeter coordinates that advances down the page, with
//! automatic page breaks when it passes the bottom margin. One canvas
//! is scoped to one render call and consumed by `finish()`.

use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str};
use qrcode::QrCode;

use crate::error::{RenderError, RenderResult};
use crate::text_encoding::to_winansi;
use crate::types::{Color, PageOptions};

/// Millimeters to PDF points.
const MM_TO_PT: f64 = 72.0 / 25.4;

/// Approximate advance width of a Helvetica glyph, in ems. Used for
/// line wrapping and cell clipping; exact metrics are not needed for
/// either.
const AVG_GLYPH_WIDTH_EM: f64 = 0.5;

/// Horizontal padding inside bordered cells, in millimeters.
const CELL_PADDING: f64 = 1.5;

/// Font selection for text drawing. F1/F2 are the page resource names
/// of the two registered base-14 fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
}

impl FontStyle {
    fn resource_name(self) -> Name<'static> {
        match self {
            FontStyle::Regular => Name(b"F1"),
            FontStyle::Bold => Name(b"F2"),
        }
    }
}

/// Drawing surface for one render call.
///
/// The cursor starts at the top-left margin of each page. `cursor_y`
/// grows downward; conversion to PDF's bottom-up point coordinates
/// happens at draw time.
pub struct DocumentCanvas {
    pdf: Pdf,
    options: PageOptions,
    page_tree_id: Ref,
    font_regular_id: Ref,
    font_bold_id: Ref,
    next_ref_id: i32,
    pages: Vec<Ref>,
    current: Option<(Ref, Ref, Content)>, // (page_id, content_id, content)
    cursor_x: f64,
    cursor_y: f64,
    font_style: FontStyle,
    font_size: f64,
}

impl DocumentCanvas {
    pub fn new(options: PageOptions) -> Self {
        let mut pdf = Pdf::new();

        let catalog_id = Ref::new(1);
        let page_tree_id = Ref::new(2);
        let font_regular_id = Ref::new(3);
        let font_bold_id = Ref::new(4);

        pdf.catalog(catalog_id).pages(page_tree_id);
        pdf.type1_font(font_regular_id)
            .base_font(Name(b"Helvetica"));
        pdf.type1_font(font_bold_id)
            .base_font(Name(b"Helvetica-Bold"));

        let margin = options.margin;
        let body_font_size = options.body_font_size;
        Self {
            pdf,
            options,
            page_tree_id,
            font_regular_id,
            font_bold_id,
            next_ref_id: 5,
            pages: Vec::new(),
            current: None,
            cursor_x: margin,
            cursor_y: margin,
            font_style: FontStyle::Regular,
            font_size: body_font_size,
        }
    }

    fn next_ref(&mut self) -> Ref {
        let id = Ref::new(self.next_ref_id);
        self.next_ref_id += 1;
        id
    }

    pub fn options(&self) -> &PageOptions {
        &self.options
    }

    pub fn cursor_x(&self) -> f64 {
        self.cursor_x
    }

    pub fn cursor_y(&self) -> f64 {
        self.cursor_y
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    // ===== Pages =====

    /// Finalize the current page (if any) and start a new one with the
    /// cursor at the top-left margin.
    pub fn add_page(&mut self) {
        self.finalize_current_page();
        let page_id = self.next_ref();
        let content_id = self.next_ref();
        self.pages.push(page_id);
        self.current = Some((page_id, content_id, Content::new()));
        self.cursor_x = self.options.margin;
        self.cursor_y = self.options.margin;
    }

    fn ensure_page(&mut self) {
        if self.current.is_none() {
            self.add_page();
        }
    }

    /// Start a new page if fewer than `needed` millimeters remain above
    /// the bottom margin.
    pub fn ensure_space(&mut self, needed: f64) {
        self.ensure_page();
        if self.cursor_y + needed > self.options.page_height - self.options.margin {
            self.add_page();
        }
    }

    fn finalize_current_page(&mut self) {
        if let Some((page_id, content_id, content)) = self.current.take() {
            let bytes = content.finish();
            self.pdf.stream(content_id, &bytes);

            let width_pt = (self.options.page_width * MM_TO_PT) as f32;
            let height_pt = (self.options.page_height * MM_TO_PT) as f32;
            let mut page = self.pdf.page(page_id);
            page.media_box(Rect::new(0.0, 0.0, width_pt, height_pt));
            page.parent(self.page_tree_id);
            page.contents(content_id);
            {
                let mut resources = page.resources();
                let mut fonts = resources.fonts();
                fonts.pair(Name(b"F1"), self.font_regular_id);
                fonts.pair(Name(b"F2"), self.font_bold_id);
            }
            page.finish();
        }
    }

    // ===== Cursor =====

    /// Move to the next line: down one line height, back to the left
    /// margin. Breaks to a new page when past the bottom margin.
    pub fn advance_line(&mut self) {
        self.advance_by(self.options.line_height);
    }

    /// Move the cursor down by `height` millimeters and back to the
    /// left margin, breaking to a new page when past the bottom margin.
    pub fn advance_by(&mut self, height: f64) {
        self.ensure_page();
        self.cursor_y += height;
        self.cursor_x = self.options.margin;
        if self.cursor_y + self.options.line_height > self.options.page_height - self.options.margin
        {
            self.add_page();
        }
    }

    pub fn set_cursor_x(&mut self, x: f64) {
        self.cursor_x = x;
    }

    // ===== Fonts & measurement =====

    pub fn set_font(&mut self, style: FontStyle, size: f64) {
        self.font_style = style;
        self.font_size = size;
    }

    fn glyph_width(&self) -> f64 {
        self.font_size * AVG_GLYPH_WIDTH_EM / MM_TO_PT
    }

    /// Estimated width of `text` in millimeters at the current font.
    pub fn text_width(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.glyph_width()
    }

    fn chars_that_fit(&self, width: f64) -> usize {
        (width / self.glyph_width()).floor() as usize
    }

    /// Greedy word wrap of `text` into lines no wider than `width`
    /// millimeters. Words wider than a full line are hard-split.
    pub fn wrap_text(&self, text: &str, width: f64) -> Vec<String> {
        let width = width.max(self.glyph_width());
        let mut lines = Vec::new();
        let mut line = String::new();
        for word in text.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", line, word)
            };
            if self.text_width(&candidate) <= width {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let mut rest = word;
            while self.text_width(rest) > width {
                let take = self.chars_that_fit(width).max(1);
                let split_at = rest
                    .char_indices()
                    .nth(take)
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                let (head, tail) = rest.split_at(split_at);
                lines.push(head.to_string());
                rest = tail;
            }
            line = rest.to_string();
        }
        if !line.is_empty() {
            lines.push(line);
        }
        lines
    }

    fn truncate_to_width(&self, text: &str, width: f64) -> String {
        let max_chars = self.chars_that_fit(width);
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        text.chars().take(max_chars).collect()
    }

    // ===== Text =====

    fn baseline(&self, y_top: f64) -> f64 {
        y_top + 0.5 * self.options.line_height + 0.35 * (self.font_size / MM_TO_PT)
    }

    /// Draw one line of text at an explicit position. Does not move the
    /// cursor.
    pub fn draw_text_at(&mut self, x: f64, y_top: f64, text: &str) {
        self.ensure_page();
        let font = self.font_style.resource_name();
        let size = self.font_size as f32;
        let x_pt = (x * MM_TO_PT) as f32;
        let y_pt = ((self.options.page_height - self.baseline(y_top)) * MM_TO_PT) as f32;
        let bytes = to_winansi(text);
        if let Some((_, _, content)) = self.current.as_mut() {
            content.begin_text();
            content.set_font(font, size);
            content.next_line(x_pt, y_pt);
            content.show(Str(&bytes));
            content.end_text();
        }
    }

    /// Draw one line of text at the cursor. Does not move the cursor;
    /// callers advance explicitly.
    pub fn draw_text_line(&mut self, text: &str) {
        let (x, y) = (self.cursor_x, self.cursor_y);
        self.draw_text_at(x, y, text);
    }

    /// Draw one bordered, line-height cell at the cursor and move the
    /// cursor right by `width`. Text that does not fit is clipped.
    pub fn draw_cell(&mut self, width: f64, text: &str, border: bool) {
        self.ensure_page();
        let (x, y) = (self.cursor_x, self.cursor_y);
        if border {
            self.stroke_rect(x, y, width, self.options.line_height);
        }
        let clipped = self.truncate_to_width(text, width - 2.0 * CELL_PADDING);
        self.draw_text_at(x + CELL_PADDING, y, &clipped);
        self.cursor_x += width;
    }

    // ===== Shapes =====

    fn rect_pt(&self, x: f64, y_top: f64, width: f64, height: f64) -> (f32, f32, f32, f32) {
        (
            (x * MM_TO_PT) as f32,
            ((self.options.page_height - y_top - height) * MM_TO_PT) as f32,
            (width * MM_TO_PT) as f32,
            (height * MM_TO_PT) as f32,
        )
    }

    pub fn stroke_rect(&mut self, x: f64, y_top: f64, width: f64, height: f64) {
        self.ensure_page();
        let (x_pt, y_pt, w_pt, h_pt) = self.rect_pt(x, y_top, width, height);
        if let Some((_, _, content)) = self.current.as_mut() {
            content.set_line_width(0.5);
            content.rect(x_pt, y_pt, w_pt, h_pt);
            content.stroke();
        }
    }

    /// Fill a rectangle and restore the fill color to black so later
    /// text stays black.
    pub fn fill_rect(&mut self, x: f64, y_top: f64, width: f64, height: f64, color: Color) {
        self.ensure_page();
        let (x_pt, y_pt, w_pt, h_pt) = self.rect_pt(x, y_top, width, height);
        if let Some((_, _, content)) = self.current.as_mut() {
            content.set_fill_rgb(
                color.r as f32 / 255.0,
                color.g as f32 / 255.0,
                color.b as f32 / 255.0,
            );
            content.rect(x_pt, y_pt, w_pt, h_pt);
            content.fill_nonzero();
            content.set_fill_rgb(0.0, 0.0, 0.0);
        }
    }

    // ===== Barcodes =====

    /// Draw a QR symbol at the cursor, `size` millimeters square.
    /// Modules are drawn as filled rectangles; no image embedding.
    pub fn draw_qr(&mut self, data: &str, size: f64) -> RenderResult<()> {
        let code = QrCode::new(data.as_bytes()).map_err(|e| RenderError::QrError(e.to_string()))?;
        let modules = code.to_colors();
        let width = code.width();
        let module = size / width as f64;
        self.ensure_page();
        let (origin_x, origin_y) = (self.cursor_x, self.cursor_y);
        let page_height = self.options.page_height;
        if let Some((_, _, content)) = self.current.as_mut() {
            content.set_fill_rgb(0.0, 0.0, 0.0);
            for y in 0..width {
                for x in 0..width {
                    if modules[y * width + x] != qrcode::Color::Dark {
                        continue;
                    }
                    let x_mm = origin_x + x as f64 * module;
                    let y_mm = origin_y + y as f64 * module;
                    content.rect(
                        (x_mm * MM_TO_PT) as f32,
                        ((page_height - y_mm - module) * MM_TO_PT) as f32,
                        (module * MM_TO_PT) as f32,
                        (module * MM_TO_PT) as f32,
                    );
                    content.fill_nonzero();
                }
            }
        }
        Ok(())
    }

    // ===== Output =====

    /// Finalize all pages and return the document bytes. Consumes the
    /// canvas; no drawing is possible afterwards.
    pub fn finish(mut self) -> Vec<u8> {
        self.finalize_current_page();
        let count = self.pages.len() as i32;
        let mut pages_writer = self.pdf.pages(self.page_tree_id);
        if self.pages.is_empty() {
            pages_writer.count(0);
        } else {
            pages_writer.kids(self.pages.iter().copied()).count(count);
        }
        pages_writer.finish();
        self.pdf.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn canvas() -> DocumentCanvas {
        DocumentCanvas::new(PageOptions::default())
    }

    #[test]
    fn wrap_respects_width() {
        let c = canvas();
        // 10pt body font, ~1.76mm per glyph: 30mm fits about 17 chars.
        let lines = c.wrap_text("the quick brown fox jumps over the lazy dog", 30.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(c.text_width(line) <= 30.0, "line too wide: {}", line);
        }
    }

    #[test]
    fn wrap_hard_splits_overlong_words() {
        let c = canvas();
        let lines = c.wrap_text(&"x".repeat(200), 30.0);
        assert!(lines.len() > 1);
    }

    #[test]
    fn advancing_past_bottom_breaks_page() {
        let mut c = canvas();
        c.add_page();
        assert_eq!(c.page_count(), 1);
        // A4 body holds (297 - 30) / 6 = 44 lines; 60 advances must
        // spill onto a second page.
        for _ in 0..60 {
            c.advance_line();
        }
        assert_eq!(c.page_count(), 2);
        assert_eq!(c.cursor_x(), c.options().margin);
    }

    #[test]
    fn finish_produces_pdf_bytes() {
        let mut c = canvas();
        c.add_page();
        c.draw_text_line("hello");
        let bytes = c.finish();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn qr_rejects_oversized_payload() {
        let mut c = canvas();
        c.add_page();
        let err = c.draw_qr(&"x".repeat(8000), 30.0).unwrap_err();
        assert!(matches!(err, RenderError::QrError(_)));
    }
}
