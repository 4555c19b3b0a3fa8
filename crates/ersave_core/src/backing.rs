use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::error::Result;

/// Where a container's bytes live and where mutations are persisted.
#[derive(Debug, Clone)]
pub enum Backing {
    File(PathBuf),
    /// Full container image held in memory; writes patch it in place.
    Memory(Vec<u8>),
}

impl Backing {
    /// Opens the backing store for positioned rewrites. The file handle is
    /// released when the writer is dropped, including on early returns.
    pub(crate) fn writer(&mut self) -> Result<RegionWriter<'_>> {
        let sink = match self {
            Self::File(path) => {
                let file = OpenOptions::new().read(true).write(true).open(path)?;
                let len = file.metadata()?.len();
                Sink::File { file, len }
            }
            Self::Memory(image) => Sink::Memory(image),
        };
        Ok(RegionWriter { sink })
    }
}

enum Sink<'a> {
    File { file: File, len: u64 },
    Memory(&'a mut Vec<u8>),
}

/// Positioned writer over the backing store. Never truncates and never
/// grows the target: writes past the current end are rejected.
pub(crate) struct RegionWriter<'a> {
    sink: Sink<'a>,
}

impl RegionWriter<'_> {
    pub(crate) fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(bytes.len() as u64)
            .ok_or_else(|| past_end(offset, bytes.len()))?;
        match &mut self.sink {
            Sink::File { file, len } => {
                if end > *len {
                    return Err(past_end(offset, bytes.len()).into());
                }
                file.seek(SeekFrom::Start(offset))?;
                file.write_all(bytes)?;
            }
            Sink::Memory(image) => {
                let target = usize::try_from(offset)
                    .ok()
                    .zip(usize::try_from(end).ok())
                    .and_then(|(start, end)| image.get_mut(start..end))
                    .ok_or_else(|| past_end(offset, bytes.len()))?;
                target.copy_from_slice(bytes);
            }
        }
        Ok(())
    }

    pub(crate) fn finish(mut self) -> Result<()> {
        if let Sink::File { file, .. } = &mut self.sink {
            file.flush()?;
        }
        Ok(())
    }
}

fn past_end(offset: u64, len: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("write of {len} bytes at {offset:#x} runs past the end of the save"),
    )
}
