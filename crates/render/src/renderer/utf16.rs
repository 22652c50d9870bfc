use std::io::{self, Write};

const BOM: [u8; 2] = [0xFF, 0xFE];

/// Transcodes a UTF-8 byte stream to UTF-16LE, BOM first.
///
/// Multi-byte sequences split across `write` calls are held back until they
/// complete. Invalid bytes are replaced with U+FFFD.
pub struct Utf16LeWriter<W: Write> {
    inner: W,
    pending: Vec<u8>,
    preamble: &'static str,
    bom_written: bool,
}

impl<W: Write> Utf16LeWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_preamble(inner, "")
    }

    /// Emits `preamble` right after the BOM, on the first write, flush or
    /// `into_inner`, whichever comes first.
    pub fn with_preamble(inner: W, preamble: &'static str) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            preamble,
            bom_written: false,
        }
    }

    /// Flushes any dangling partial sequence as U+FFFD and returns the sink.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.write_bom()?;
        if !self.pending.is_empty() {
            self.pending.clear();
            let mut out = Vec::with_capacity(2);
            encode_into("\u{FFFD}", &mut out);
            self.inner.write_all(&out)?;
        }
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn write_bom(&mut self) -> io::Result<()> {
        if !self.bom_written {
            let mut out = Vec::with_capacity(BOM.len() + self.preamble.len() * 2);
            out.extend_from_slice(&BOM);
            encode_into(self.preamble, &mut out);
            self.inner.write_all(&out)?;
            self.bom_written = true;
        }
        Ok(())
    }
}

impl<W: Write> Write for Utf16LeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bom()?;
        self.pending.extend_from_slice(buf);

        let mut out = Vec::with_capacity(self.pending.len() * 2);
        let mut consumed = 0;
        loop {
            let rest = &self.pending[consumed..];
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    encode_into(valid, &mut out);
                    consumed = self.pending.len();
                    break;
                }
                Err(err) => {
                    let valid_len = err.valid_up_to();
                    let valid = std::str::from_utf8(&rest[..valid_len]).unwrap_or_default();
                    encode_into(valid, &mut out);
                    match err.error_len() {
                        Some(invalid_len) => {
                            encode_into("\u{FFFD}", &mut out);
                            consumed += valid_len + invalid_len;
                        }
                        // incomplete sequence at the end, wait for more input
                        None => {
                            consumed += valid_len;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..consumed);

        self.inner.write_all(&out)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.write_bom()?;
        self.inner.flush()
    }
}

fn encode_into(text: &str, out: &mut Vec<u8>) {
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
}
