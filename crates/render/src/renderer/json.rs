use crate::{
    error::RenderError,
    renderer::{ElementPrefix, Renderer},
};
use model::core::value::Value;
use std::io::Write;

/// One JSON array per line. The header, when present, is the first line.
pub struct JsonLinesRenderer<W: Write> {
    sink: W,
}

impl<W: Write> JsonLinesRenderer<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write + Send> Renderer for JsonLinesRenderer<W> {
    fn write_header(&mut self, columns: Option<&[String]>) -> Result<(), RenderError> {
        if let Some(columns) = columns {
            serde_json::to_writer(&mut self.sink, columns)?;
            self.sink.write_all(b"\n")?;
        }
        Ok(())
    }

    fn write_row(&mut self, row: &[Value]) -> Result<(), RenderError> {
        serde_json::to_writer(&mut self.sink, row)?;
        self.sink.write_all(b"\n")?;
        Ok(())
    }

    fn write_footer(&mut self) -> Result<(), RenderError> {
        self.sink.flush()?;
        Ok(())
    }
}

/// A single JSON document: an array of row arrays, one element per line.
///
/// With `include_header` the column names are the document's first element.
pub struct JsonArrayRenderer<W: Write> {
    sink: W,
    include_header: bool,
    prefix: ElementPrefix,
    row: Vec<u8>,
}

impl<W: Write> JsonArrayRenderer<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            include_header: false,
            prefix: ElementPrefix::default(),
            row: Vec::new(),
        }
    }

    pub fn with_header(sink: W) -> Self {
        Self {
            include_header: true,
            ..Self::new(sink)
        }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write + Send> Renderer for JsonArrayRenderer<W> {
    fn write_header(&mut self, columns: Option<&[String]>) -> Result<(), RenderError> {
        self.sink.write_all(b"[\n")?;
        if let (true, Some(columns)) = (self.include_header, columns) {
            // the header takes the first slot unprefixed; rows follow with `,`
            self.prefix.next();
            serde_json::to_writer(&mut self.sink, columns)?;
            self.sink.write_all(b"\n")?;
        }
        Ok(())
    }

    fn write_row(&mut self, row: &[Value]) -> Result<(), RenderError> {
        // encode first so a value that cannot be encoded leaves no partial element
        self.row.clear();
        serde_json::to_writer(&mut self.row, row)?;
        self.row.push(b'\n');

        self.sink.write_all(self.prefix.next())?;
        self.sink.write_all(&self.row)?;
        Ok(())
    }

    fn write_footer(&mut self) -> Result<(), RenderError> {
        self.sink.write_all(b"]\n")?;
        self.sink.flush()?;
        Ok(())
    }
}
