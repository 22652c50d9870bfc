use crate::{error::RenderError, renderer::Renderer};
use model::core::value::Value;
use std::io::Write;

/// Space-separated values, one row per line, NULL printed as `NULL`.
pub struct TextRenderer<W: Write> {
    sink: W,
    line: String,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            line: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write + Send> Renderer for TextRenderer<W> {
    fn write_header(&mut self, _columns: Option<&[String]>) -> Result<(), RenderError> {
        Ok(())
    }

    fn write_row(&mut self, row: &[Value]) -> Result<(), RenderError> {
        self.line.clear();
        for (idx, value) in row.iter().enumerate() {
            if idx > 0 {
                self.line.push(' ');
            }
            match value.as_text() {
                Some(text) => self.line.push_str(&text),
                None => self.line.push_str("NULL"),
            }
        }
        self.line.push('\n');
        self.sink.write_all(self.line.as_bytes())?;
        Ok(())
    }

    fn write_footer(&mut self) -> Result<(), RenderError> {
        self.sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_rows_are_space_separated_lines() {
        let mut renderer = TextRenderer::new(Vec::new());
        renderer
            .write_header(Some(&["id".into(), "name".into()]))
            .unwrap();
        renderer
            .write_row(&[Value::Int(1), Value::from("Ann Lee")])
            .unwrap();
        renderer.write_row(&[Value::Int(2), Value::Null]).unwrap();
        renderer.write_footer().unwrap();

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out, "1 Ann Lee\n2 NULL\n");
    }

    #[test]
    fn test_timestamps_use_utc_text_form() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut renderer = TextRenderer::new(Vec::new());
        renderer.write_header(Some(&["at".into()])).unwrap();
        renderer.write_row(&[Value::Timestamp(ts)]).unwrap();
        renderer.write_footer().unwrap();

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out, "2024-05-01 08:00:00 UTC\n");
    }

    #[test]
    fn test_empty_result_emits_nothing() {
        let mut renderer = TextRenderer::new(Vec::new());
        renderer.write_header(None).unwrap();
        renderer.write_footer().unwrap();
        assert!(renderer.into_inner().is_empty());
    }
}
