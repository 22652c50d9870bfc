use crate::{
    error::RenderError,
    renderer::{
        Renderer, csv::CsvRenderer, json::JsonArrayRenderer, json::JsonLinesRenderer,
        json_object::JsonObjectRenderer, text::TextRenderer,
    },
};
use lazy_static::lazy_static;
use std::{collections::HashMap, fmt, io::Write, str::FromStr};

/// Destination of the rendered bytes.
pub type Sink = Box<dyn Write + Send>;

type Builder = fn(Sink) -> Box<dyn Renderer>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Csv,
    CsvExcel,
    JsonLinesArray,
    JsonArray,
    JsonArrayHeader,
    JsonObject,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 7] = [
        OutputFormat::Text,
        OutputFormat::Csv,
        OutputFormat::CsvExcel,
        OutputFormat::JsonLinesArray,
        OutputFormat::JsonArray,
        OutputFormat::JsonArrayHeader,
        OutputFormat::JsonObject,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Csv => "csv",
            OutputFormat::CsvExcel => "csv-excel",
            OutputFormat::JsonLinesArray => "json-lines-array",
            OutputFormat::JsonArray => "json-array",
            OutputFormat::JsonArrayHeader => "json-array-header",
            OutputFormat::JsonObject => "json-object",
        }
    }

    pub fn help(&self) -> &'static str {
        self.entry().0
    }

    /// Help text and renderer constructor. Exhaustive, so a new format
    /// cannot compile without both.
    fn entry(&self) -> (&'static str, Builder) {
        match self {
            OutputFormat::Text => (
                "space separated values, one row per line",
                |sink| Box::new(TextRenderer::new(sink)),
            ),
            OutputFormat::Csv => (
                "comma separated values with a header record",
                |sink| Box::new(CsvRenderer::new(sink)),
            ),
            OutputFormat::CsvExcel => (
                "semicolon separated UTF-16LE values for spreadsheet tools",
                |sink| Box::new(CsvRenderer::excel(sink)),
            ),
            OutputFormat::JsonLinesArray => (
                "one JSON array per line, column names first",
                |sink| Box::new(JsonLinesRenderer::new(sink)),
            ),
            OutputFormat::JsonArray => (
                "a JSON document holding an array of row arrays",
                |sink| Box::new(JsonArrayRenderer::new(sink)),
            ),
            OutputFormat::JsonArrayHeader => (
                "as json-array, with the column names as first element",
                |sink| Box::new(JsonArrayRenderer::with_header(sink)),
            ),
            OutputFormat::JsonObject => (
                "a JSON document holding an array of objects keyed by column",
                |sink| Box::new(JsonObjectRenderer::new(sink)),
            ),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for OutputFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FORMATS
            .get(s.trim().to_lowercase().as_str())
            .copied()
            .ok_or_else(|| RenderError::UnknownFormat {
                token: s.to_string(),
                expected: tokens().join(", "),
            })
    }
}

lazy_static! {
    static ref FORMATS: HashMap<&'static str, OutputFormat> = OutputFormat::ALL
        .into_iter()
        .map(|format| (format.token(), format))
        .collect();
}

/// Valid format tokens, in declaration order.
pub fn tokens() -> Vec<&'static str> {
    OutputFormat::ALL.iter().map(OutputFormat::token).collect()
}

/// Builds the renderer for `format` over `sink`.
pub fn create_renderer(format: OutputFormat, sink: Sink) -> Box<dyn Renderer> {
    let (_, build) = format.entry();
    build(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::value::Value;
    use std::sync::{Arc, Mutex};

    /// Sink whose bytes stay readable after the renderer takes ownership.
    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_every_token_resolves() {
        for format in OutputFormat::ALL {
            let parsed: OutputFormat = format.token().parse().unwrap();
            assert_eq!(parsed, format);
            assert_eq!(parsed.to_string(), format.token());
            assert!(!format.help().is_empty(), "{format} has no help text");
        }
        assert_eq!(
            " JSON-Object ".parse::<OutputFormat>().unwrap(),
            OutputFormat::JsonObject
        );
    }

    #[test]
    fn test_unknown_token_lists_valid_ones() {
        let err = "xml".parse::<OutputFormat>().unwrap_err();
        assert_eq!(err.kind(), "config");
        let message = err.to_string();
        assert!(message.contains("'xml'"));
        assert!(message.contains("json-array-header"));
    }

    #[test]
    fn test_every_format_builds_its_own_renderer() {
        let expected: [(OutputFormat, &[u8]); 3] = [
            (OutputFormat::Text, b""),
            (OutputFormat::JsonArray, b"[\n]\n"),
            (OutputFormat::JsonObject, b"[\n]\n"),
        ];
        for (format, empty) in expected {
            let sink = SharedSink::default();
            let mut renderer = create_renderer(format, Box::new(sink.clone()));
            renderer.write_header(None).unwrap();
            renderer.write_footer().unwrap();
            assert_eq!(sink.0.lock().unwrap().as_slice(), empty, "{format}");
        }
    }

    #[test]
    fn test_default_is_text() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }

    #[test]
    fn test_created_renderer_matches_format() {
        let sink = SharedSink::default();
        let mut renderer = create_renderer(OutputFormat::JsonObject, Box::new(sink.clone()));
        renderer.write_header(Some(&["n".into()])).unwrap();
        renderer.write_row(&[Value::Int(5)]).unwrap();
        renderer.write_footer().unwrap();

        let out = sink.0.lock().unwrap().clone();
        assert_eq!(out, b"[\n {\"n\":5}\n]\n");
    }
}
