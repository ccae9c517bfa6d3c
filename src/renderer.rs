//! Template renderer: walks a layout and draws it onto a fresh canvas
//!
//! One render call is a synchronous, single-threaded walk: sections in
//! order, each section's grid left-to-right and top-to-bottom, then the
//! footer. The canvas is created here, handed to the block renderers,
//! and flushed to bytes before the call returns; errors surface
//! synchronously and yield no document at all.

use log::debug;

use crate::blocks::BlockRenderer;
use crate::canvas::{DocumentCanvas, FontStyle};
use crate::context::Context;
use crate::error::{RenderError, RenderResult};
use crate::types::{Layout, PageOptions, Section};
use crate::variable::VariableResolver;

/// Renders layouts against a context into paginated PDF documents.
///
/// Holds only page options; every call allocates its own canvas, so
/// independent renders may run concurrently on separate threads.
pub struct TemplateRenderer {
    options: PageOptions,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(PageOptions::default())
    }
}

impl TemplateRenderer {
    pub fn new(options: PageOptions) -> Self {
        Self { options }
    }

    /// Render `layout` against `context` and return the document bytes.
    ///
    /// `locale` selects entries of localized text fields; a locale with
    /// no entry falls back to each map's first entry.
    pub fn render(
        &self,
        layout: &Layout,
        context: &Context,
        locale: &str,
    ) -> RenderResult<Vec<u8>> {
        let mut canvas = DocumentCanvas::new(self.options.clone());
        self.render_onto(&mut canvas, layout, context, locale)?;
        Ok(canvas.finish())
    }

    fn render_onto(
        &self,
        canvas: &mut DocumentCanvas,
        layout: &Layout,
        context: &Context,
        locale: &str,
    ) -> RenderResult<()> {
        debug!(
            "rendering layout: {} sections, locale {}",
            layout.sections.len(),
            locale
        );
        let resolver = VariableResolver::new();
        canvas.add_page();
        for (section_index, section) in layout.sections.iter().enumerate() {
            self.render_section(canvas, &resolver, context, locale, section, section_index)?;
        }
        canvas.advance_line();
        let footer = resolver.resolve(layout.footer.text.for_locale(locale), context);
        canvas.set_font(FontStyle::Regular, self.options.body_font_size);
        canvas.draw_text_line(&footer);
        Ok(())
    }

    fn render_section(
        &self,
        canvas: &mut DocumentCanvas,
        resolver: &VariableResolver,
        context: &Context,
        locale: &str,
        section: &Section,
        section_index: usize,
    ) -> RenderResult<()> {
        if section.grid.columns == 0 {
            return Err(RenderError::MalformedLayout(format!(
                "section {} declares zero grid columns",
                section_index
            )));
        }

        canvas.advance_line();
        let title = resolver.resolve(section.title.for_locale(locale), context);
        canvas.set_font(FontStyle::Bold, self.options.heading_font_size);
        canvas.draw_text_line(&title);
        canvas.set_font(FontStyle::Regular, self.options.body_font_size);
        canvas.advance_line();

        let columns = section.grid.columns as usize;
        let col_width = self.options.content_width() / columns as f64;
        let margin = self.options.margin;
        for (i, item) in section.grid.items.iter().enumerate() {
            canvas.set_cursor_x(margin + (i % columns) as f64 * col_width);
            BlockRenderer::render_block(
                canvas,
                resolver,
                context,
                locale,
                item,
                section_index,
                i,
                0,
            )?;
            if (i + 1) % columns == 0 {
                canvas.advance_line();
            }
        }
        if section.grid.items.len() % columns != 0 {
            canvas.advance_line();
        }
        Ok(())
    }
}
