use crate::{
    error::RenderError,
    renderer::{Renderer, utf16::Utf16LeWriter},
};
use csv::{Terminator, Writer, WriterBuilder};
use model::core::value::Value;
use std::io::Write;

/// Line Excel reads to pick the field separator.
const EXCEL_SEPARATOR_HINT: &str = "sep=;\n";

/// RFC 4180 style records. NULL is written as an empty field.
pub struct CsvRenderer<W: Write> {
    writer: Writer<W>,
    record: Vec<String>,
}

impl<W: Write> CsvRenderer<W> {
    pub fn new(sink: W) -> Self {
        Self::with_delimiter(sink, b',')
    }

    fn with_delimiter(sink: W, delimiter: u8) -> Self {
        let writer = WriterBuilder::new()
            .delimiter(delimiter)
            .terminator(Terminator::Any(b'\n'))
            .flexible(false)
            .from_writer(sink);
        Self {
            writer,
            record: Vec::new(),
        }
    }

    pub fn into_inner(self) -> Result<W, RenderError> {
        self.writer
            .into_inner()
            .map_err(|e| RenderError::Sink(e.into_error()))
    }
}

impl<W: Write> CsvRenderer<Utf16LeWriter<W>> {
    /// `;`-separated CSV in UTF-16LE with a BOM and a `sep=;` hint line,
    /// the shape spreadsheet tools open without an import dialog.
    pub fn excel(sink: W) -> Self {
        Self::with_delimiter(
            Utf16LeWriter::with_preamble(sink, EXCEL_SEPARATOR_HINT),
            b';',
        )
    }
}

impl<W: Write + Send> Renderer for CsvRenderer<W> {
    fn write_header(&mut self, columns: Option<&[String]>) -> Result<(), RenderError> {
        if let Some(columns) = columns {
            self.writer.write_record(columns)?;
        }
        Ok(())
    }

    fn write_row(&mut self, row: &[Value]) -> Result<(), RenderError> {
        self.record.resize_with(row.len(), String::new);
        for (field, value) in self.record.iter_mut().zip(row) {
            field.clear();
            if let Some(text) = value.as_text() {
                field.push_str(&text);
            }
        }
        self.writer.write_record(&self.record)?;
        Ok(())
    }

    fn write_footer(&mut self) -> Result<(), RenderError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    #[test]
    fn test_header_and_quoted_fields() {
        let mut renderer = CsvRenderer::new(Vec::new());
        renderer
            .write_header(Some(&["id".into(), "note".into()]))
            .unwrap();
        renderer
            .write_row(&[Value::Int(1), Value::from("a,\"b")])
            .unwrap();
        renderer.write_row(&[Value::Int(2), Value::Null]).unwrap();
        renderer.write_footer().unwrap();

        let out = String::from_utf8(renderer.into_inner().unwrap()).unwrap();
        assert_eq!(out, "id,note\n1,\"a,\"\"b\"\n2,\n");
    }

    #[test]
    fn test_binary_is_written_as_text() {
        let mut renderer = CsvRenderer::new(Vec::new());
        renderer.write_header(Some(&["blob".into()])).unwrap();
        renderer
            .write_row(&[Value::Bytes(b"raw bytes".to_vec())])
            .unwrap();
        renderer.write_footer().unwrap();

        let out = String::from_utf8(renderer.into_inner().unwrap()).unwrap();
        assert_eq!(out, "blob\nraw bytes\n");
    }

    #[test]
    fn test_row_width_change_is_rejected() {
        let mut renderer = CsvRenderer::new(Vec::new());
        renderer
            .write_header(Some(&["a".into(), "b".into()]))
            .unwrap();
        let err = renderer.write_row(&[Value::Int(1)]).unwrap_err();
        assert_eq!(err.kind(), "encode");
    }

    #[test]
    fn test_empty_result_emits_nothing() {
        let mut renderer = CsvRenderer::new(Vec::new());
        renderer.write_header(None).unwrap();
        renderer.write_footer().unwrap();
        assert!(renderer.into_inner().unwrap().is_empty());
    }

    #[test]
    fn test_excel_preamble_precedes_header() {
        let mut renderer = CsvRenderer::excel(Vec::new());
        renderer
            .write_header(Some(&["id".into(), "name".into()]))
            .unwrap();
        renderer
            .write_row(&[Value::Int(1), Value::from("x")])
            .unwrap();
        renderer.write_footer().unwrap();

        let out = renderer.into_inner().unwrap().into_inner().unwrap();
        let mut expected = vec![0xFF, 0xFE];
        expected.extend(utf16le("sep=;\nid;name\n1;x\n"));
        assert_eq!(out, expected);
    }

    #[test]
    fn test_excel_empty_result_keeps_bom_and_hint() {
        let mut renderer = CsvRenderer::excel(Vec::new());
        renderer.write_header(None).unwrap();
        renderer.write_footer().unwrap();

        let out = renderer.into_inner().unwrap().into_inner().unwrap();
        let mut expected = vec![0xFF, 0xFE];
        expected.extend(utf16le("sep=;\n"));
        assert_eq!(out, expected);
    }
}
