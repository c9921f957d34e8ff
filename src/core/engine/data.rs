//! Data handles passed to and from an engine.
//!
//! A handle is either an in-memory buffer or a named file. Reads are
//! chunked and end with an explicit [`Chunk::End`].

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::trace;

/// Result of one chunked read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk {
    /// This many bytes were copied into the buffer.
    Bytes(usize),
    /// No more data.
    End,
}

/// An engine input or output.
#[derive(Debug)]
pub enum Data {
    Memory { buf: Vec<u8>, pos: usize },
    File { path: PathBuf, file: Option<File> },
}

impl Data {
    /// Empty in-memory handle, typically an output.
    pub fn new() -> Self {
        Data::Memory {
            buf: Vec::new(),
            pos: 0,
        }
    }

    /// In-memory handle holding a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Data::Memory {
            buf: bytes.to_vec(),
            pos: 0,
        }
    }

    /// Handle naming a file. Nothing is opened until the handle is read or
    /// written.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Data::File {
            path: path.into(),
            file: None,
        }
    }

    /// Path of a file-backed handle.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Data::File { path, .. } => Some(path),
            Data::Memory { .. } => None,
        }
    }

    /// Whole contents of an in-memory handle.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Data::Memory { buf, .. } => Some(buf),
            Data::File { .. } => None,
        }
    }

    /// Read everything from the current position to the end.
    pub fn read_remaining(&mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Data::Memory { buf, pos } => {
                out.extend_from_slice(&buf[*pos..]);
                *pos = buf.len();
            }
            Data::File { .. } => {
                self.reader()?.read_to_end(&mut out)?;
            }
        }
        Ok(out)
    }

    /// Append bytes. A file handle is created (truncating) on first write.
    pub fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self {
            Data::Memory { buf, .. } => {
                buf.extend_from_slice(bytes);
                Ok(())
            }
            Data::File { path, file } => {
                if file.is_none() {
                    *file = Some(File::create(&*path)?);
                }
                match file {
                    Some(f) => f.write_all(bytes),
                    None => Err(io::Error::other("file handle not open")),
                }
            }
        }
    }

    /// Read the next chunk into `buf`.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<Chunk> {
        let n = match self {
            Data::Memory { buf: data, pos } => {
                let n = buf.len().min(data.len() - *pos);
                buf[..n].copy_from_slice(&data[*pos..*pos + n]);
                *pos += n;
                n
            }
            Data::File { .. } => self.reader()?.read(buf)?,
        };
        trace!(bytes = n, "read chunk");
        if n == 0 && !buf.is_empty() {
            Ok(Chunk::End)
        } else {
            Ok(Chunk::Bytes(n))
        }
    }

    /// Move the read position back to the start.
    pub fn rewind(&mut self) -> io::Result<()> {
        match self {
            Data::Memory { pos, .. } => {
                *pos = 0;
                Ok(())
            }
            Data::File { file, .. } => {
                if let Some(f) = file {
                    f.seek(SeekFrom::Start(0))?;
                }
                Ok(())
            }
        }
    }

    /// Flush and release an open file. Idempotent.
    pub fn close(&mut self) -> io::Result<()> {
        if let Data::File { file, .. } = self {
            if let Some(mut f) = file.take() {
                f.flush()?;
                f.sync_all()?;
            }
        }
        Ok(())
    }

    fn reader(&mut self) -> io::Result<&mut File> {
        match self {
            Data::File { path, file } => {
                if file.is_none() {
                    *file = Some(File::open(&*path)?);
                }
                file.as_mut()
                    .ok_or_else(|| io::Error::other("file handle not open"))
            }
            Data::Memory { .. } => Err(io::Error::other("not a file handle")),
        }
    }
}

impl Default for Data {
    fn default() -> Self {
        Self::new()
    }
}
