use crate::{
    error::RenderError,
    renderer::{ElementPrefix, Renderer},
};
use model::core::value::Value;
use std::io::Write;

/// A JSON array of objects keyed by column name.
///
/// Keys are encoded once in `write_header`; each row only encodes its values.
pub struct JsonObjectRenderer<W: Write> {
    sink: W,
    keys: Vec<Vec<u8>>,
    prefix: ElementPrefix,
    row: Vec<u8>,
}

impl<W: Write> JsonObjectRenderer<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            keys: Vec::new(),
            prefix: ElementPrefix::default(),
            row: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// `"name":`, with a leading comma for every key after the first.
fn key_fragment(idx: usize, name: &str) -> Result<Vec<u8>, RenderError> {
    let mut fragment = Vec::with_capacity(name.len() + 4);
    if idx > 0 {
        fragment.push(b',');
    }
    serde_json::to_writer(&mut fragment, name)?;
    fragment.push(b':');
    Ok(fragment)
}

impl<W: Write + Send> Renderer for JsonObjectRenderer<W> {
    fn write_header(&mut self, columns: Option<&[String]>) -> Result<(), RenderError> {
        if let Some(columns) = columns {
            self.keys = columns
                .iter()
                .enumerate()
                .map(|(idx, name)| key_fragment(idx, name))
                .collect::<Result<_, _>>()?;
        }
        self.sink.write_all(b"[\n")?;
        Ok(())
    }

    fn write_row(&mut self, row: &[Value]) -> Result<(), RenderError> {
        if row.len() != self.keys.len() {
            return Err(RenderError::RowWidth {
                expected: self.keys.len(),
                found: row.len(),
            });
        }

        self.row.clear();
        self.row.push(b'{');
        for (key, value) in self.keys.iter().zip(row) {
            self.row.extend_from_slice(key);
            serde_json::to_writer(&mut self.row, value)?;
        }
        self.row.extend_from_slice(b"}\n");

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
