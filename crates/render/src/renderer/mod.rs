use crate::error::RenderError;
use model::core::value::Value;

pub mod csv;
pub mod json;
pub mod json_object;
pub mod text;
pub mod utf16;

/// Writes one result set in a specific output encoding.
///
/// A run calls `write_header` once, then `write_row` for every row in cursor
/// order, then `write_footer` once. `write_header(None)` announces an empty
/// result; the renderer must still produce a well-formed document.
pub trait Renderer: Send {
    fn write_header(&mut self, columns: Option<&[String]>) -> Result<(), RenderError>;

    fn write_row(&mut self, row: &[Value]) -> Result<(), RenderError>;

    /// Emits closing framing and flushes the sink.
    fn write_footer(&mut self) -> Result<(), RenderError>;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn write_header(&mut self, columns: Option<&[String]>) -> Result<(), RenderError> {
        (**self).write_header(columns)
    }

    fn write_row(&mut self, row: &[Value]) -> Result<(), RenderError> {
        (**self).write_row(row)
    }

    fn write_footer(&mut self) -> Result<(), RenderError> {
        (**self).write_footer()
    }
}

/// Separator in front of each element of a bracketed JSON document.
#[derive(Debug, Default)]
struct ElementPrefix {
    started: bool,
}

impl ElementPrefix {
    fn next(&mut self) -> &'static [u8] {
        if std::mem::replace(&mut self.started, true) {
            b","
        } else {
            b" "
        }
    }
}
