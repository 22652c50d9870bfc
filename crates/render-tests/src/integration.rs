#[cfg(test)]
mod tests {
    use crate::utils::{
        BrokenSink, SharedSink, customer_cursor, customer_rows, decode_utf16le, empty_cursor,
        render,
    };
    use connectors::memory::MemoryCursor;
    use model::core::{
        column::{ColumnDescriptor, ScanType, SemanticType},
        value::Value,
    };
    use render::{
        convert::ConverterRegistry,
        error::RenderError,
        registry::{OutputFormat, create_renderer},
        renderer::Renderer,
        stream::run,
    };
    use serde_json::json;
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;

    #[traced_test]
    #[tokio::test]
    async fn text_output() {
        let (result, out) = render(OutputFormat::Text, &mut customer_cursor()).await;
        assert_eq!(result.unwrap().rows, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1 Mary Smith 2006-02-14 2024-03-15 09:30:00 UTC prefers email\n\
             2 O'Neil, \"Pat\" NULL NULL NULL\n"
        );
        assert!(logs_contain("Result set rendered"));
    }

    #[traced_test]
    #[tokio::test]
    async fn single_precision_floats_print_short() {
        let cursor = || {
            MemoryCursor::new(
                vec![ColumnDescriptor::new("ratio", "FLOAT", SemanticType::Other, ScanType::Float)],
                vec![vec![Value::Float32(1.1)]],
            )
        };

        let (result, out) = render(OutputFormat::Text, &mut cursor()).await;
        result.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1.1\n");

        let (result, out) = render(OutputFormat::JsonArray, &mut cursor()).await;
        result.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[\n [1.1]\n]\n");
    }

    #[traced_test]
    #[tokio::test]
    async fn csv_output_decodes_back() {
        let (result, out) = render(OutputFormat::Csv, &mut customer_cursor()).await;
        result.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("id,name,joined,last_seen,notes\n"));
        assert!(text.contains("2,\"O'Neil, \"\"Pat\"\"\",,,\n"));

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let records: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        assert_eq!(
            records,
            vec![
                vec![
                    "1",
                    "Mary Smith",
                    "2006-02-14",
                    "2024-03-15 09:30:00 UTC",
                    "prefers email"
                ],
                vec!["2", "O'Neil, \"Pat\"", "", "", ""],
            ]
        );
    }

    #[traced_test]
    #[tokio::test]
    async fn csv_quotes_embedded_delimiters() {
        let mut cursor = MemoryCursor::new(
            vec![ColumnDescriptor::new(
                "v",
                "VARCHAR",
                SemanticType::ShortText,
                ScanType::Text,
            )],
            vec![vec![Value::from("a,\"b")]],
        );
        let (result, out) = render(OutputFormat::Csv, &mut cursor).await;
        result.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "v\n\"a,\"\"b\"\n");
    }

    #[traced_test]
    #[tokio::test]
    async fn csv_excel_layout() {
        let (result, out) = render(OutputFormat::CsvExcel, &mut customer_cursor()).await;
        result.unwrap();

        assert_eq!(&out[..2], &[0xFF, 0xFE]);
        let text = decode_utf16le(&out[2..]);
        assert_eq!(
            text,
            "sep=;\n\
             id;name;joined;last_seen;notes\n\
             1;Mary Smith;2006-02-14;2024-03-15 09:30:00 UTC;prefers email\n\
             2;\"O'Neil, \"\"Pat\"\"\";;;\n"
        );
    }

    #[traced_test]
    #[tokio::test]
    async fn json_lines_array_round_trip() {
        let mut cursor = MemoryCursor::new(
            vec![
                ColumnDescriptor::new("s", "VARCHAR", SemanticType::ShortText, ScanType::Text),
                ColumnDescriptor::new("n", "INT", SemanticType::Other, ScanType::Int),
                ColumnDescriptor::new("z", "INT", SemanticType::Other, ScanType::Int),
            ],
            vec![vec![Value::from("a<b>&c"), Value::Int(42), Value::Null]],
        );
        let (result, out) = render(OutputFormat::JsonLinesArray, &mut cursor).await;
        result.unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], r#"["a<b>&c",42,null]"#);
        let decoded: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(decoded, json!(["a<b>&c", 42, null]));
    }

    #[traced_test]
    #[tokio::test]
    async fn json_array_documents() {
        let (result, out) = render(OutputFormat::JsonArray, &mut customer_cursor()).await;
        result.unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            decoded,
            json!([
                [1, "Mary Smith", "2006-02-14", "2024-03-15T09:30:00Z", "prefers email"],
                [2, "O'Neil, \"Pat\"", null, null, null],
            ])
        );

        let (result, out) = render(OutputFormat::JsonArrayHeader, &mut customer_cursor()).await;
        result.unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(decoded[0], json!(["id", "name", "joined", "last_seen", "notes"]));
        assert_eq!(decoded.as_array().map(Vec::len), Some(3));
    }

    #[traced_test]
    #[tokio::test]
    async fn json_object_document() {
        let (result, out) = render(OutputFormat::JsonObject, &mut customer_cursor()).await;
        result.unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            decoded,
            json!([
                {
                    "id": 1,
                    "name": "Mary Smith",
                    "joined": "2006-02-14",
                    "last_seen": "2024-03-15T09:30:00Z",
                    "notes": "prefers email"
                },
                {
                    "id": 2,
                    "name": "O'Neil, \"Pat\"",
                    "joined": null,
                    "last_seen": null,
                    "notes": null
                }
            ])
        );
    }

    #[traced_test]
    #[tokio::test]
    async fn empty_results_per_format() {
        let mut excel = vec![0xFF, 0xFE];
        excel.extend("sep=;\n".encode_utf16().flat_map(u16::to_le_bytes));

        let cases: Vec<(OutputFormat, Vec<u8>)> = vec![
            (OutputFormat::Text, Vec::new()),
            (OutputFormat::Csv, Vec::new()),
            (OutputFormat::CsvExcel, excel),
            (OutputFormat::JsonLinesArray, Vec::new()),
            (OutputFormat::JsonArray, b"[\n]\n".to_vec()),
            (OutputFormat::JsonArrayHeader, b"[\n]\n".to_vec()),
            (OutputFormat::JsonObject, b"[\n]\n".to_vec()),
        ];

        for (format, expected) in cases {
            let mut cursor = empty_cursor();
            let (result, out) = render(format, &mut cursor).await;
            assert_eq!(result.unwrap().rows, 0, "{format}");
            assert_eq!(out, expected, "{format}");
            assert!(cursor.is_closed(), "{format}");
        }
    }

    #[traced_test]
    #[tokio::test]
    async fn timestamp_column_keeps_null_and_structure() {
        let (result, out) = render(OutputFormat::JsonLinesArray, &mut customer_cursor()).await;
        result.unwrap();
        let text = String::from_utf8(out).unwrap();
        let rows: Vec<serde_json::Value> = text
            .lines()
            .skip(1)
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(rows[0][3], json!("2024-03-15T09:30:00Z"));
        assert_eq!(rows[1][3], json!(null));
    }

    #[traced_test]
    #[tokio::test]
    async fn scan_failure_leaves_partial_document() {
        let mut rows = customer_rows();
        rows[1][3] = Value::from("not a timestamp");
        let mut cursor = MemoryCursor::new(crate::utils::customer_columns(), rows);

        let (result, out) = render(OutputFormat::JsonArray, &mut cursor).await;
        let err = result.unwrap_err();
        assert!(matches!(err, RenderError::Scan { row: 2, .. }));
        assert!(cursor.is_closed());

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("[\n [1,"));
        assert_eq!(text.lines().count(), 2, "opening bracket and first row: {text}");
        assert!(!text.contains("\n]\n"));
        assert!(logs_contain("Rendering failed"));
    }

    #[traced_test]
    #[tokio::test]
    async fn sink_failure_is_reported() {
        let mut renderer = create_renderer(
            OutputFormat::JsonLinesArray,
            Box::new(BrokenSink {
                limit: 50,
                written: 0,
            }),
        );
        let mut cursor = customer_cursor();

        let err = run(
            &mut cursor,
            renderer.as_mut(),
            &ConverterRegistry::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), "sink");
        assert!(cursor.is_closed());
    }

    /// Cancels the run from inside the first `write_row`.
    struct CancelOnFirstRow {
        inner: Box<dyn Renderer>,
        cancel: CancellationToken,
    }

    impl Renderer for CancelOnFirstRow {
        fn write_header(&mut self, columns: Option<&[String]>) -> Result<(), RenderError> {
            self.inner.write_header(columns)
        }

        fn write_row(&mut self, row: &[Value]) -> Result<(), RenderError> {
            self.cancel.cancel();
            self.inner.write_row(row)
        }

        fn write_footer(&mut self) -> Result<(), RenderError> {
            self.inner.write_footer()
        }
    }

    #[traced_test]
    #[tokio::test]
    async fn cancellation_stops_at_next_advance() {
        let sink = SharedSink::default();
        let cancel = CancellationToken::new();
        let mut renderer = CancelOnFirstRow {
            inner: create_renderer(OutputFormat::JsonArray, Box::new(sink.clone())),
            cancel: cancel.clone(),
        };
        let mut cursor = customer_cursor();

        let err = run(
            &mut cursor,
            &mut renderer,
            &ConverterRegistry::default(),
            &cancel,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RenderError::Cancelled));
        assert!(cursor.is_closed());
        let text = sink.text();
        assert_eq!(text.matches('\n').count(), 2, "header and one row: {text}");
        assert!(logs_contain("Rendering cancelled"));
    }
}
