//! Cursors over the two vector files.
//!
//! Both files are sequences of blocks separated by blank lines, and the
//! first token of a block's first line is the test name. A cursor is just
//! a position over the file's lines; the text itself is never modified.

use crate::error::{GenError, Result, Stream};

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// First whitespace-separated token of a line.
pub fn first_token(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

#[derive(Debug, Clone)]
pub struct VectorCursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
    stream: Stream,
}

impl<'a> VectorCursor<'a> {
    pub fn new(text: &'a str, stream: Stream) -> Self {
        Self {
            lines: text.lines().collect(),
            pos: 0,
            stream,
        }
    }

    /// 1-based number of the last line handed out.
    pub fn line_number(&self) -> usize {
        self.pos
    }

    fn skip_blank(&mut self) {
        while self.lines.get(self.pos).is_some_and(|l| is_blank(l)) {
            self.pos += 1;
        }
    }

    /// Position the cursor at the block whose name is `name`.
    ///
    /// Blocks in front of it are dropped whole, up to and including the
    /// blank line that closes each one.
    pub fn seek_to(&mut self, name: &str) -> Result<()> {
        loop {
            self.skip_blank();
            let Some(line) = self.lines.get(self.pos) else {
                return Err(GenError::NotFound {
                    stream: self.stream,
                    name: name.to_string(),
                });
            };
            if first_token(line) == Some(name) {
                return Ok(());
            }
            while let Some(line) = self.lines.get(self.pos) {
                self.pos += 1;
                if is_blank(line) {
                    break;
                }
            }
        }
    }

    pub fn has_more(&self) -> bool {
        self.lines[self.pos.min(self.lines.len())..]
            .iter()
            .any(|l| !is_blank(l))
    }

    pub fn peek_line(&self) -> Option<&'a str> {
        self.lines[self.pos.min(self.lines.len())..]
            .iter()
            .find(|l| !is_blank(l))
            .copied()
    }

    /// Next non-blank line.
    pub fn take_line(&mut self) -> Result<&'a str> {
        self.skip_blank();
        match self.lines.get(self.pos).copied() {
            Some(line) => {
                self.pos += 1;
                Ok(line)
            }
            None => Err(GenError::EndOfStream {
                stream: self.stream,
                line_no: self.pos,
            }),
        }
    }

    /// Next line of the current block, or `None` once the block is over.
    ///
    /// The blank line that ends the block is consumed.
    pub fn take_block_line(&mut self) -> Option<&'a str> {
        let line = self.lines.get(self.pos).copied()?;
        self.pos += 1;
        if is_blank(line) {
            None
        } else {
            Some(line)
        }
    }
}
