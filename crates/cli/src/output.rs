use crate::error::CliError;
use render::registry::Sink;
use std::{
    fs::File,
    io::{self, BufWriter},
    path::Path,
};

/// Buffered sink for the rendered result: the file at `path`, or stdout.
pub fn open_sink(path: Option<&Path>) -> Result<Sink, CliError> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|source| CliError::Output {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_sink_receives_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut sink = open_sink(Some(&path)).unwrap();
        sink.write_all(b"id\n1\n").unwrap();
        sink.flush().unwrap();
        drop(sink);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "id\n1\n");
    }

    #[test]
    fn test_unwritable_path_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");

        assert!(matches!(
            open_sink(Some(&path)),
            Err(CliError::Output { .. })
        ));
    }
}
