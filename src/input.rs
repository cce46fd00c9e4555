/**************************************************************************/
/*  This file is part of POPCON.                                          */
/*                                                                        */
/*  Copyright (C) 2025                                                    */
/*    CEA (Commissariat à l'énergie atomique et aux énergies              */
/*         alternatives)                                                  */
/*                                                                        */
/*  you can redistribute it and/or modify it under the terms of the GNU   */
/*  Lesser General Public License as published by the Free Software       */
/*  Foundation, version 2.1.                                              */
/*                                                                        */
/*  It is distributed in the hope that it will be useful,                 */
/*  but WITHOUT ANY WARRANTY; without even the implied warranty of        */
/*  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the         */
/*  GNU Lesser General Public License for more details.                   */
/*                                                                        */
/*  See the GNU Lesser General Public License version 2.1                 */
/*  for more details (enclosed in the file licenses/LGPLv2.1).            */
/*                                                                        */
/**************************************************************************/

//! Byte sources with one byte of lookahead, for the streaming DIMACS reader

use anyhow::Context;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::trace;

/// Size of the lookahead buffer of `StreamBuffer`
pub const BUFFER_SIZE: usize = 1 << 20;

/// First bytes of a gzip stream
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A cursor over a stream of bytes.
pub trait ByteSource {
    /// Returns the current byte without consuming it, or `None` once the input is exhausted.
    fn peek(&self) -> Option<u8>;

    /// Consumes the current byte. Does nothing at end of input.
    fn advance(&mut self) -> std::io::Result<()>;

    /// 1-based line of the current byte, for error messages.
    fn line(&self) -> usize;
}

/// A byte source that can look further than the current byte without consuming anything.
pub trait RandomAccess: ByteSource {
    /// Returns the byte `offset` bytes after the current one, `None` past the end.
    fn peek_at(&self, offset: usize) -> Option<u8>;

    /// Consumes `n` bytes.
    fn advance_by(&mut self, n: usize) -> std::io::Result<()> {
        for _ in 0..n {
            self.advance()?;
        }
        Ok(())
    }
}

/// Buffered cursor over a `Read`. The buffer is only refilled when all its bytes were consumed.
pub struct StreamBuffer<R: Read> {
    /// data is in the range index..end
    buffer: Vec<u8>,
    /// data is in the range index..end
    index: usize,
    /// data is in the range index..end
    end: usize,
    /// underlying byte source
    read: R,
    /// set once `read` returned 0
    done: bool,
    /// number of \n consumed so far
    lines: usize,
}

impl<R: Read> StreamBuffer<R> {
    /// Creates a `StreamBuffer` with a buffer of `BUFFER_SIZE` bytes, and fills it.
    pub fn new(read: R) -> std::io::Result<Self> {
        Self::with_capacity(read, BUFFER_SIZE)
    }

    /// Creates a `StreamBuffer` with a buffer of `capacity` bytes, and fills it.
    pub fn with_capacity(read: R, capacity: usize) -> std::io::Result<Self> {
        let mut res = Self {
            buffer: vec![0; capacity.max(1)],
            index: 0,
            end: 0,
            read,
            done: false,
            lines: 0,
        };
        res.refill()?;
        Ok(res)
    }

    /// Reads a new chunk from the underlying reader if the buffer is exhausted.
    fn refill(&mut self) -> std::io::Result<()> {
        if self.index < self.end || self.done {
            return Ok(());
        }
        self.index = 0;
        self.end = 0;
        loop {
            match self.read.read(&mut self.buffer[..]) {
                Ok(0) => {
                    self.done = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.end = n;
                    return Ok(());
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> ByteSource for StreamBuffer<R> {
    fn peek(&self) -> Option<u8> {
        if self.index < self.end {
            Some(self.buffer[self.index])
        } else {
            None
        }
    }

    fn advance(&mut self) -> std::io::Result<()> {
        if self.index >= self.end {
            return Ok(());
        }
        if self.buffer[self.index] == b'\n' {
            self.lines += 1;
        }
        self.index += 1;
        self.refill()
    }

    fn line(&self) -> usize {
        self.lines + 1
    }
}

/// Cursor over bytes already in memory.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    index: usize,
    lines: usize,
}

impl<'a> SliceSource<'a> {
    /// Creates a cursor at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            index: 0,
            lines: 0,
        }
    }

    /// Bytes not consumed yet
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.index..]
    }
}

impl<'a> ByteSource for SliceSource<'a> {
    fn peek(&self) -> Option<u8> {
        self.data.get(self.index).copied()
    }

    fn advance(&mut self) -> std::io::Result<()> {
        if let Some(&c) = self.data.get(self.index) {
            if c == b'\n' {
                self.lines += 1;
            }
            self.index += 1;
        }
        Ok(())
    }

    fn line(&self) -> usize {
        self.lines + 1
    }
}

impl<'a> RandomAccess for SliceSource<'a> {
    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.index + offset).copied()
    }
}

/// Wraps `read` in a gzip decoder if it starts with the gzip magic bytes.
pub fn maybe_gzip<R: BufRead + 'static>(mut read: R) -> std::io::Result<Box<dyn Read>> {
    let compressed = read.fill_buf()?.starts_with(&GZIP_MAGIC);
    if compressed {
        trace!("input is gzip compressed");
        Ok(Box::new(MultiGzDecoder::new(read)))
    } else {
        Ok(Box::new(read))
    }
}

/// Opens a possibly gzip-compressed file as a `ByteSource`.
pub fn open_input(path: &Path) -> anyhow::Result<StreamBuffer<Box<dyn Read>>> {
    let file = File::open(path)
        .with_context(|| format!("opening input file {} for reading", path.display()))?;
    let read = maybe_gzip(BufReader::new(file))
        .with_context(|| format!("reading input file {}", path.display()))?;
    StreamBuffer::new(read).with_context(|| format!("reading input file {}", path.display()))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    /// implements Read, returns at most one byte per call
    struct Trickle {
        data: &'static [u8],
        index: usize,
    }
    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.index == self.data.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[self.index];
            self.index += 1;
            Ok(1)
        }
    }

    fn drain(source: &mut impl ByteSource) -> Vec<u8> {
        let mut res = Vec::new();
        while let Some(c) = source.peek() {
            res.push(c);
            source.advance().unwrap();
        }
        res
    }

    #[test]
    fn refills_small_buffer() {
        let data = b"p cnf 2 1\n1 -2 0\n";
        let mut source = StreamBuffer::with_capacity(&data[..], 3).unwrap();
        assert_eq!(drain(&mut source), data.to_vec());
        let mut source = StreamBuffer::new(Trickle { data, index: 0 }).unwrap();
        assert_eq!(drain(&mut source), data.to_vec());
    }

    #[test]
    fn advance_past_end_is_noop() {
        let mut source = StreamBuffer::with_capacity(b"ab" as &[u8], 1).unwrap();
        source.advance().unwrap();
        source.advance().unwrap();
        assert_eq!(source.peek(), None);
        source.advance().unwrap();
        source.advance().unwrap();
        assert_eq!(source.peek(), None);

        let mut slice = SliceSource::new(b"a");
        slice.advance().unwrap();
        slice.advance().unwrap();
        assert_eq!(slice.peek(), None);
        assert_eq!(slice.remaining(), b"");
    }

    #[test]
    fn empty_input() {
        let source = StreamBuffer::new(b"" as &[u8]).unwrap();
        assert_eq!(source.peek(), None);
        assert_eq!(source.line(), 1);
    }

    #[test]
    fn counts_lines() {
        let mut source = StreamBuffer::with_capacity(b"a\nb\n\nc" as &[u8], 2).unwrap();
        let mut lines = Vec::new();
        while let Some(c) = source.peek() {
            if c != b'\n' {
                lines.push((c, source.line()));
            }
            source.advance().unwrap();
        }
        assert_eq!(lines, vec![(b'a', 1), (b'b', 2), (b'c', 4)]);
    }

    #[test]
    fn slice_lookahead() {
        let mut slice = SliceSource::new(b"p cnf");
        assert_eq!(slice.peek_at(2), Some(b'c'));
        assert_eq!(slice.peek_at(5), None);
        slice.advance_by(2).unwrap();
        assert_eq!(slice.peek(), Some(b'c'));
        assert_eq!(slice.remaining(), b"cnf");
    }

    #[test]
    fn transparent_gzip() -> anyhow::Result<()> {
        let data = b"p cnf 1 1\n1 0\n";
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data)?;
        let compressed = encoder.finish()?;
        let mut source = StreamBuffer::new(maybe_gzip(std::io::Cursor::new(compressed))?)?;
        assert_eq!(drain(&mut source), data.to_vec());
        let mut source = StreamBuffer::new(maybe_gzip(std::io::Cursor::new(data.to_vec()))?)?;
        assert_eq!(drain(&mut source), data.to_vec());
        Ok(())
    }

    #[test]
    fn open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_input(&dir.path().join("missing.cnf")).is_err());
    }
}
