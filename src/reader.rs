use crate::error::{Ctx19Error, ParseError};
use log::trace;
use miette::NamedSource;
use std::collections::VecDeque;
use std::io::BufRead;

/// A byte cursor over a buffered stream with explicit rewind.
///
/// Every byte pulled from the stream is recorded so errors can point into
/// the text consumed so far, with line numbers that match the file. That
/// record grows with the input: a reader over a large stream holds all of
/// it by the time it reaches the end. Rewound bytes go into a lookahead
/// queue and are handed out again before the stream is touched.
pub struct LineReader<R> {
    inner: R,
    name: String,
    lookahead: VecDeque<u8>,
    consumed: Vec<u8>,
    offset: usize,
    line: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
            lookahead: VecDeque::new(),
            consumed: Vec::new(),
            offset: 0,
            line: 1,
        }
    }

    /// Reads up to (excluding) `delimiter` and steps past it.
    ///
    /// # Errors
    /// `UnexpectedEndOfInput` if the stream ends before `delimiter` shows up,
    /// `MalformedLine` if the bytes read are not UTF-8.
    pub fn read_until(&mut self, delimiter: u8) -> Result<String, Ctx19Error> {
        let start = self.offset;
        let line = self.line;
        let mut captured = Vec::new();
        loop {
            match self.next_byte()? {
                Some(byte) if byte == delimiter => break,
                Some(byte) => captured.push(byte),
                None => {
                    return Err(self.unexpected_eof(&describe_delimiter(delimiter)));
                }
            }
        }
        String::from_utf8(captured).map_err(|err| {
            let bytes = err.as_bytes();
            ParseError::MalformedLine {
                src: self.source(),
                span: (start, bytes.len()).into(),
                text: String::from_utf8_lossy(bytes).into_owned(),
                reason: "line is not valid UTF-8".to_string(),
                line,
            }
            .into()
        })
    }

    /// Reads exactly `n` bytes, or fewer if the stream runs out first.
    ///
    /// The bytes stay consumed; hand them to [`LineReader::rewind`] to undo.
    pub fn peek_fixed(&mut self, n: usize) -> Result<Vec<u8>, Ctx19Error> {
        let mut bytes = Vec::with_capacity(n);
        while bytes.len() < n {
            match self.next_byte()? {
                Some(byte) => bytes.push(byte),
                None => break,
            }
        }
        Ok(bytes)
    }

    /// Pushes `bytes` back so they are read again, in order.
    pub fn rewind(&mut self, bytes: &[u8]) {
        for &byte in bytes.iter().rev() {
            self.lookahead.push_front(byte);
            if byte == b'\n' {
                self.line -= 1;
            }
        }
        self.offset -= bytes.len();
    }

    /// Consumes `marker` if the stream continues with it, otherwise leaves
    /// the position untouched.
    pub fn accept(&mut self, marker: &[u8]) -> Result<bool, Ctx19Error> {
        let bytes = self.peek_fixed(marker.len())?;
        if bytes == marker {
            return Ok(true);
        }
        trace!(
            "wanted {:?} at byte {} but saw {:?}, rewinding {} byte(s)",
            String::from_utf8_lossy(marker),
            self.offset - bytes.len(),
            String::from_utf8_lossy(&bytes),
            bytes.len()
        );
        self.rewind(&bytes);
        Ok(false)
    }

    pub fn at_end(&mut self) -> Result<bool, Ctx19Error> {
        if !self.lookahead.is_empty() {
            return Ok(false);
        }
        Ok(self.inner.fill_buf()?.is_empty())
    }

    /// Byte offset of the next unread byte.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// 1-based line number of the next unread byte.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Everything read from the stream so far, for diagnostics. Invalid
    /// UTF-8 shows up as replacement characters.
    #[must_use]
    pub fn source(&self) -> NamedSource<String> {
        NamedSource::new(
            self.name.clone(),
            String::from_utf8_lossy(&self.consumed).into_owned(),
        )
    }

    pub fn unexpected_eof(&self, expected: &str) -> Ctx19Error {
        ParseError::UnexpectedEndOfInput {
            src: self.source(),
            span: (self.offset, 0).into(),
            expected: expected.to_string(),
            line: self.line,
        }
        .into()
    }

    fn next_byte(&mut self) -> Result<Option<u8>, Ctx19Error> {
        let byte = match self.lookahead.pop_front() {
            Some(byte) => byte,
            None => {
                let buf = self.inner.fill_buf()?;
                let Some(&byte) = buf.first() else {
                    return Ok(None);
                };
                self.inner.consume(1);
                self.consumed.push(byte);
                byte
            }
        };
        self.offset += 1;
        if byte == b'\n' {
            self.line += 1;
        }
        Ok(Some(byte))
    }
}

fn describe_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\n' => "a line break".to_string(),
        b'\t' => "a tab".to_string(),
        b' ' => "a space".to_string(),
        other => format!("{:?}", other as char),
    }
}
