use crate::events::Record;

const DELIMITER: u8 = b'\n';

/// Splits a byte stream into newline-delimited records
///
/// Bytes are accumulated with [`LineExtractor::feed`] and complete lines are
/// taken out with [`LineExtractor::drain`]. Anything after the last newline is
/// held back as a pending fragment until a later chunk terminates it, so a
/// line that is still being written is never emitted.
#[derive(Debug, Default)]
pub struct LineExtractor {
    /// Bytes fed but not yet handed out
    buffer: Vec<u8>,
    /// Remove one trailing `\r` from each record
    strip_carriage_return: bool,
}

impl LineExtractor {
    pub fn new(strip_carriage_return: bool) -> Self {
        Self {
            buffer: Vec::new(),
            strip_carriage_return,
        }
    }

    /// Append a chunk of raw bytes
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Take every complete record out of the buffer
    ///
    /// The returned iterator yields records in file order. Bytes after the last
    /// delimiter stay buffered. Complete lines are removed from the buffer as
    /// soon as the iterator is created, so calling `drain` again without new
    /// input yields nothing even if the previous iterator was not exhausted.
    pub fn drain(&mut self) -> Drain {
        let complete = match self.buffer.iter().rposition(|&b| b == DELIMITER) {
            Some(last) => {
                let rest = self.buffer.split_off(last + 1);
                std::mem::replace(&mut self.buffer, rest)
            }
            None => Vec::new(),
        };

        Drain {
            data: complete,
            pos: 0,
            strip_carriage_return: self.strip_carriage_return,
        }
    }

    /// Bytes read but not yet terminated by a newline
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of pending bytes
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop the pending fragment (used when the underlying file is replaced)
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

/// Lazy sequence of records produced by [`LineExtractor::drain`]
#[derive(Debug)]
pub struct Drain {
    data: Vec<u8>,
    pos: usize,
    strip_carriage_return: bool,
}

impl Iterator for Drain {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.pos >= self.data.len() {
            return None;
        }

        let rest = &self.data[self.pos..];
        // `data` always ends with a delimiter
        let end = rest.iter().position(|&b| b == DELIMITER)?;
        let mut line = &rest[..end];
        self.pos += end + 1;

        if self.strip_carriage_return {
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }
        }

        Some(Record::new(line))
    }
}
