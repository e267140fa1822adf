//! Input/output plumbing around the codec: plain or zstd-compressed XML files,
//! with optional byte progress reporting.

use crate::util::{create_with_backoff, open_with_backoff};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use zstd::stream::read::Decoder;
use zstd::stream::write::Encoder as ZstdEncoder;

/// True when `path` names a zstd-compressed archive (`.zst`).
pub fn is_zst(path: &Path) -> bool {
    path.extension().map(|e| e == "zst").unwrap_or(false)
}

/// A `Read` wrapper that reports bytes read from the underlying file.
struct CountingReader<R: Read> {
    inner: R,
    pb: Option<ProgressBar>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if let Some(pb) = &self.pb {
            pb.inc(n as u64);
        }
        Ok(n)
    }
}

/// Open an export for reading. `.zst` files are decoded on the fly; progress counts
/// on-disk (compressed) bytes either way.
///
/// `window_log_max(31)` avoids "Frame requires too much memory" on large frames.
pub fn open_input(path: &Path, read_buf_bytes: usize, pb: Option<ProgressBar>) -> Result<Box<dyn BufRead>> {
    let file = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    let counted = CountingReader { inner: file, pb };
    let cap = read_buf_bytes.max(8 * 1024);
    if is_zst(path) {
        let mut decoder = Decoder::new(counted).with_context(|| format!("zstd decoder for {}", path.display()))?;
        decoder.window_log_max(31)?;
        Ok(Box::new(BufReader::with_capacity(cap, decoder)))
    } else {
        Ok(Box::new(BufReader::with_capacity(cap, counted)))
    }
}

/// Output sink that transparently zstd-compresses when asked to.
pub enum OutputFile {
    Plain(BufWriter<File>),
    Zst(ZstdEncoder<'static, BufWriter<File>>),
}

impl OutputFile {
    pub fn create(path: &Path, write_buf_bytes: usize, compress: bool) -> Result<Self> {
        let f = create_with_backoff(path, 16, 50).with_context(|| format!("create {}", path.display()))?;
        let w = BufWriter::with_capacity(write_buf_bytes.max(8 * 1024), f);
        if compress {
            Ok(OutputFile::Zst(ZstdEncoder::new(w, 3)?))
        } else {
            Ok(OutputFile::Plain(w))
        }
    }

    /// Flush everything, finishing the zstd frame if there is one.
    pub fn finish(self) -> Result<()> {
        match self {
            OutputFile::Plain(mut w) => w.flush()?,
            OutputFile::Zst(enc) => enc.finish()?.flush()?,
        }
        Ok(())
    }
}

/// Create `path` for writing, zstd-compressed when it ends in `.zst`.
pub fn create_output(path: &Path, write_buf_bytes: usize) -> Result<OutputFile> {
    OutputFile::create(path, write_buf_bytes, is_zst(path))
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputFile::Plain(w) => w.write(buf),
            OutputFile::Zst(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputFile::Plain(w) => w.flush(),
            OutputFile::Zst(w) => w.flush(),
        }
    }
}
