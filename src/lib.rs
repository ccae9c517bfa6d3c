//! Block-based PDF template rendering
//!
//! Takes a JSON layout description plus a data context and renders a
//! paginated PDF document. A layout is a list of titled sections, each
//! holding a grid of typed blocks (text, tables, QR codes,
//! conditionals, nested grids); string fields may contain `{{path}}`
//! placeholders resolved against the context.
//!
//! ```no_run
//! use pdf_template_renderer::{Context, Layout, TemplateRenderer};
//!
//! # fn main() -> Result<(), pdf_template_renderer::RenderError> {
//! let layout = Layout::fallback()?;
//! let context = Context::from_value(serde_json::json!({
//!     "patient": {"full_name": "Jane Doe"}
//! }));
//! let pdf = TemplateRenderer::default().render(&layout, &context, "en")?;
//! # let _ = pdf;
//! # Ok(())
//! # }
//! ```

mod blocks;
mod canvas;
mod context;
mod error;
mod json_helpers;
mod renderer;
mod text_encoding;
mod types;
mod variable;

pub use blocks::Block;
pub use context::{Author, Context, ContextBuilder, MedicalRecord, Organization, Patient, Visit};
pub use error::{RenderError, RenderResult};
pub use renderer::TemplateRenderer;
pub use types::{Color, Footer, Grid, Layout, LocalizedText, PageOptions, Section};
pub use variable::VariableResolver;
