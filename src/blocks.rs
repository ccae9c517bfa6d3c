//! Block parsing and rendering
//!
//! A block descriptor is a JSON object tagged by `type`. Descriptors
//! are converted to the closed [`Block`] sum type at dispatch time so
//! an unknown tag or missing field is reported with the section and
//! item index it came from, and dispatch itself is an exhaustive match
//! instead of a string-keyed fallthrough.

use log::debug;
use serde_json::Value;

use crate::canvas::{DocumentCanvas, FontStyle};
use crate::context::Context;
use crate::error::{RenderError, RenderResult};
use crate::json_helpers;
use crate::types::{Color, LocalizedText};
use crate::variable::{value_to_string, VariableResolver};

/// Maximum nesting depth for conditional/grid/section blocks. Layouts
/// deeper than this are treated as malformed rather than walked until
/// the stack gives out.
pub(crate) const MAX_BLOCK_DEPTH: usize = 16;

/// QR symbol size in millimeters.
const QR_SIZE: f64 = 30.0;

/// Column widths for key/value rows (json_table), in millimeters.
const KEY_COLUMN_WIDTH: f64 = 60.0;
const VALUE_COLUMN_WIDTH: f64 = 120.0;

/// Inner padding of colored boxes, in millimeters.
const BOX_PADDING: f64 = 2.0;

/// One renderable unit within a grid. The `type` tag of the JSON
/// descriptor selects the variant; each variant carries exactly the
/// fields its renderer needs.
#[derive(Debug, Clone)]
pub enum Block {
    Text {
        content: String,
    },
    /// Renders `child` only when `condition` resolves to a non-empty
    /// string. The child stays raw JSON until the recursive dispatch.
    Conditional {
        condition: String,
        child: Value,
    },
    Table {
        columns: u32,
        /// Explicit column widths in millimeters; missing entries fall
        /// back to an equal split of the content width.
        widths: Vec<f64>,
        rows: Vec<Value>,
    },
    /// Key/value rows drawn from the context's `data_json` map.
    JsonTable,
    Grid {
        columns: u32,
        items: Vec<Value>,
    },
    Section {
        title: LocalizedText,
        items: Vec<Value>,
    },
    Chart {
        data: Value,
    },
    QrCode {
        value: String,
    },
    Signature,
    ColoredBox {
        content: String,
        color: Color,
    },
}

impl Block {
    /// Convert a raw descriptor into a typed block. `section` and
    /// `index` locate the descriptor for error reporting.
    pub fn from_value(value: &Value, section: usize, index: usize) -> RenderResult<Self> {
        if !value.is_object() {
            return Err(RenderError::MalformedLayout(format!(
                "block at section {}, item {} is not an object",
                section, index
            )));
        }
        let kind = json_helpers::get_str_opt(value, "type").ok_or_else(|| {
            RenderError::MalformedLayout(format!(
                "block at section {}, item {} has no type tag",
                section, index
            ))
        })?;
        let missing = |block: &'static str, field: &'static str| RenderError::MissingField {
            block,
            field,
        };

        match kind {
            "text" => Ok(Block::Text {
                content: json_helpers::get_str_opt(value, "content")
                    .ok_or_else(|| missing("text", "content"))?
                    .to_string(),
            }),
            "conditional" => Ok(Block::Conditional {
                condition: json_helpers::get_str_opt(value, "condition")
                    .ok_or_else(|| missing("conditional", "condition"))?
                    .to_string(),
                child: value
                    .get("block")
                    .cloned()
                    .ok_or_else(|| missing("conditional", "block"))?,
            }),
            "table" => Ok(Block::Table {
                columns: json_helpers::get_u32_opt(value, "columns")
                    .ok_or_else(|| missing("table", "columns"))?,
                widths: json_helpers::get_f64_array(value, "widths"),
                rows: json_helpers::get_array_opt(value, "rows")
                    .ok_or_else(|| missing("table", "rows"))?
                    .clone(),
            }),
            "json_table" => Ok(Block::JsonTable),
            "grid" => Ok(Block::Grid {
                columns: json_helpers::get_u32_opt(value, "columns")
                    .ok_or_else(|| missing("grid", "columns"))?,
                items: json_helpers::get_array_opt(value, "items")
                    .ok_or_else(|| missing("grid", "items"))?
                    .clone(),
            }),
            "section" => {
                let title = value
                    .get("title")
                    .cloned()
                    .ok_or_else(|| missing("section", "title"))?;
                let title: LocalizedText =
                    serde_json::from_value(title).map_err(|_| missing("section", "title"))?;
                Ok(Block::Section {
                    title,
                    items: json_helpers::get_array_opt(value, "items")
                        .ok_or_else(|| missing("section", "items"))?
                        .clone(),
                })
            }
            "chart" => Ok(Block::Chart {
                data: value
                    .get("data")
                    .cloned()
                    .ok_or_else(|| missing("chart", "data"))?,
            }),
            "qrcode" => Ok(Block::QrCode {
                value: json_helpers::get_str_opt(value, "value")
                    .ok_or_else(|| missing("qrcode", "value"))?
                    .to_string(),
            }),
            "signature" => Ok(Block::Signature),
            "colored_box" => Ok(Block::ColoredBox {
                content: json_helpers::get_str_opt(value, "content")
                    .ok_or_else(|| missing("colored_box", "content"))?
                    .to_string(),
                color: value
                    .get("color")
                    .and_then(Color::from_triple)
                    .unwrap_or_else(Color::light_gray),
            }),
            other => Err(RenderError::UnknownBlockType {
                kind: other.to_string(),
                section,
                index,
            }),
        }
    }
}

/// Facade for rendering blocks onto a [`DocumentCanvas`].
pub(crate) struct BlockRenderer;

impl BlockRenderer {
    /// The single dispatch point for every block, including blocks
    /// nested inside conditional/grid/section blocks. Re-entrant:
    /// container variants call back into this function with an
    /// incremented depth.
    #[allow(clippy::too_many_arguments)]
    pub fn render_block(
        canvas: &mut DocumentCanvas,
        resolver: &VariableResolver,
        context: &Context,
        locale: &str,
        value: &Value,
        section: usize,
        index: usize,
        depth: usize,
    ) -> RenderResult<()> {
        if depth > MAX_BLOCK_DEPTH {
            return Err(RenderError::DepthExceeded(MAX_BLOCK_DEPTH));
        }
        match Block::from_value(value, section, index)? {
            Block::Text { content } => {
                Self::render_flowing_text(canvas, &resolver.resolve(&content, context));
                Ok(())
            }
            Block::Conditional { condition, child } => {
                if resolver.resolve(&condition, context).is_empty() {
                    return Ok(());
                }
                Self::render_block(
                    canvas, resolver, context, locale, &child, section, index, depth + 1,
                )
            }
            Block::Table {
                columns,
                widths,
                rows,
            } => Self::render_table(canvas, resolver, context, columns, &widths, &rows),
            Block::JsonTable => {
                Self::render_json_table(canvas, context);
                Ok(())
            }
            Block::Grid { columns, items } => Self::render_grid(
                canvas, resolver, context, locale, columns, &items, section, depth,
            ),
            Block::Section { title, items } => Self::render_section(
                canvas, resolver, context, locale, &title, &items, section, depth,
            ),
            Block::Chart { data } => {
                Self::render_chart(canvas, &data);
                Ok(())
            }
            Block::QrCode { value } => {
                let resolved = resolver.resolve(&value, context);
                canvas.ensure_space(QR_SIZE);
                canvas.draw_qr(&resolved, QR_SIZE)?;
                canvas.advance_by(QR_SIZE);
                Ok(())
            }
            Block::Signature => {
                canvas.advance_line();
                canvas.draw_text_line("Signature: ______");
                canvas.advance_line();
                Ok(())
            }
            Block::ColoredBox { content, color } => {
                Self::render_colored_box(canvas, &resolver.resolve(&content, context), color);
                Ok(())
            }
        }
    }

    /// Wrap `text` into the space right of the cursor and draw it,
    /// finishing with a line advance.
    fn render_flowing_text(canvas: &mut DocumentCanvas, text: &str) {
        let available =
            canvas.options().page_width - canvas.options().margin - canvas.cursor_x();
        let lines = canvas.wrap_text(text, available);
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                canvas.advance_line();
            }
            canvas.draw_text_line(line);
        }
        canvas.advance_line();
    }

    fn render_table(
        canvas: &mut DocumentCanvas,
        resolver: &VariableResolver,
        context: &Context,
        columns: u32,
        widths: &[f64],
        rows: &[Value],
    ) -> RenderResult<()> {
        if columns == 0 {
            return Err(RenderError::MalformedLayout(
                "table columns must be at least 1".to_string(),
            ));
        }
        let default_width = canvas.options().content_width() / columns as f64;
        let line_height = canvas.options().line_height;
        let start_x = canvas.cursor_x();
        for row in rows {
            let cells = row.as_array().ok_or_else(|| {
                RenderError::MalformedLayout("table row is not an array of cells".to_string())
            })?;
            canvas.ensure_space(line_height);
            canvas.set_cursor_x(start_x);
            for (i, cell) in cells.iter().take(columns as usize).enumerate() {
                let text = match cell {
                    Value::String(s) => resolver.resolve(s, context),
                    other => value_to_string(other),
                };
                let width = widths.get(i).copied().unwrap_or(default_width);
                canvas.draw_cell(width, &text, true);
            }
            canvas.advance_line();
        }
        Ok(())
    }

    fn render_json_table(canvas: &mut DocumentCanvas, context: &Context) {
        let Some(data) = context.get_path("data_json").and_then(|v| v.as_object()) else {
            debug!("json_table block: context has no data_json map");
            return;
        };
        let line_height = canvas.options().line_height;
        let start_x = canvas.cursor_x();
        for (key, value) in data {
            canvas.ensure_space(line_height);
            canvas.set_cursor_x(start_x);
            canvas.draw_cell(KEY_COLUMN_WIDTH, key, true);
            canvas.draw_cell(VALUE_COLUMN_WIDTH, &value_to_string(value), true);
            canvas.advance_line();
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn render_grid(
        canvas: &mut DocumentCanvas,
        resolver: &VariableResolver,
        context: &Context,
        locale: &str,
        columns: u32,
        items: &[Value],
        section: usize,
        depth: usize,
    ) -> RenderResult<()> {
        if columns == 0 {
            return Err(RenderError::MalformedLayout(
                "grid columns must be at least 1".to_string(),
            ));
        }
        let columns = columns as usize;
        let col_width = canvas.options().content_width() / columns as f64;
        let margin = canvas.options().margin;
        for (i, item) in items.iter().enumerate() {
            canvas.set_cursor_x(margin + (i % columns) as f64 * col_width);
            Self::render_block(
                canvas, resolver, context, locale, item, section, i, depth + 1,
            )?;
            if (i + 1) % columns == 0 {
                canvas.advance_line();
            }
        }
        if items.len() % columns != 0 {
            canvas.advance_line();
        }
        Ok(())
    }

    /// Nested section: bold heading, then a vertical stack of items
    /// with no column layout.
    #[allow(clippy::too_many_arguments)]
    fn render_section(
        canvas: &mut DocumentCanvas,
        resolver: &VariableResolver,
        context: &Context,
        locale: &str,
        title: &LocalizedText,
        items: &[Value],
        section: usize,
        depth: usize,
    ) -> RenderResult<()> {
        let heading = resolver.resolve(title.for_locale(locale), context);
        let heading_size = canvas.options().heading_font_size;
        let body_size = canvas.options().body_font_size;
        let margin = canvas.options().margin;
        canvas.set_font(FontStyle::Bold, heading_size);
        canvas.draw_text_line(&heading);
        canvas.set_font(FontStyle::Regular, body_size);
        canvas.advance_line();
        for (i, item) in items.iter().enumerate() {
            canvas.set_cursor_x(margin);
            Self::render_block(
                canvas, resolver, context, locale, item, section, i, depth + 1,
            )?;
            canvas.advance_line();
        }
        Ok(())
    }

    /// Chart drawing is not implemented; the data is written as a JSON
    /// dump so the information still reaches the page.
    fn render_chart(canvas: &mut DocumentCanvas, data: &Value) {
        let dump = serde_json::to_string(data).unwrap_or_default();
        debug!("chart block rendered as a {} byte JSON dump", dump.len());
        Self::render_flowing_text(canvas, &dump);
    }

    fn render_colored_box(canvas: &mut DocumentCanvas, text: &str, color: Color) {
        let margin = canvas.options().margin;
        let content_width = canvas.options().content_width();
        let line_height = canvas.options().line_height;
        let lines = canvas.wrap_text(text, content_width - 2.0 * BOX_PADDING);
        let height = lines.len().max(1) as f64 * line_height + 2.0 * BOX_PADDING;
        canvas.ensure_space(height);
        let y = canvas.cursor_y();
        canvas.fill_rect(margin, y, content_width, height, color);
        for (i, line) in lines.iter().enumerate() {
            canvas.draw_text_at(
                margin + BOX_PADDING,
                y + BOX_PADDING + i as f64 * line_height,
                line,
            );
        }
        canvas.advance_by(height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn unknown_type_is_reported_with_position() {
        let err = Block::from_value(&json!({"type": "bogus"}), 2, 5).unwrap_err();
        match err {
            RenderError::UnknownBlockType {
                kind,
                section,
                index,
            } => {
                assert_eq!(kind, "bogus");
                assert_eq!(section, 2);
                assert_eq!(index, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_required_fields_fail_fast() {
        let err = Block::from_value(&json!({"type": "text"}), 0, 0).unwrap_err();
        assert!(matches!(
            err,
            RenderError::MissingField {
                block: "text",
                field: "content"
            }
        ));

        let err =
            Block::from_value(&json!({"type": "conditional", "condition": "x"}), 0, 0).unwrap_err();
        assert!(matches!(
            err,
            RenderError::MissingField {
                block: "conditional",
                field: "block"
            }
        ));

        let err = Block::from_value(&json!({"type": "qrcode"}), 0, 0).unwrap_err();
        assert!(matches!(
            err,
            RenderError::MissingField {
                block: "qrcode",
                field: "value"
            }
        ));
    }

    #[test]
    fn untagged_and_non_object_blocks_are_malformed() {
        let err = Block::from_value(&json!({"content": "x"}), 0, 1).unwrap_err();
        assert!(matches!(err, RenderError::MalformedLayout(_)));

        let err = Block::from_value(&json!("text"), 0, 1).unwrap_err();
        assert!(matches!(err, RenderError::MalformedLayout(_)));
    }

    #[test]
    fn colored_box_defaults_to_light_gray() {
        let block =
            Block::from_value(&json!({"type": "colored_box", "content": "x"}), 0, 0).unwrap();
        match block {
            Block::ColoredBox { color, .. } => assert_eq!(color, Color::light_gray()),
            other => panic!("unexpected block: {other:?}"),
        }
    }

    #[test]
    fn colored_box_accepts_rgb_triple() {
        let block = Block::from_value(
            &json!({"type": "colored_box", "content": "x", "color": [10, 20, 30]}),
            0,
            0,
        )
        .unwrap();
        match block {
            Block::ColoredBox { color, .. } => assert_eq!(color, Color::rgb(10, 20, 30)),
            other => panic!("unexpected block: {other:?}"),
        }
    }

    #[test]
    fn signature_and_json_table_need_no_fields() {
        assert!(matches!(
            Block::from_value(&json!({"type": "signature"}), 0, 0).unwrap(),
            Block::Signature
        ));
        assert!(matches!(
            Block::from_value(&json!({"type": "json_table"}), 0, 0).unwrap(),
            Block::JsonTable
        ));
    }
}
