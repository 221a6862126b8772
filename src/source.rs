use std::{
    fs::File,
    io::{self, Read},
    path::Path,
};

use crate::error::HostError;

/// Capacity of the shared source buffer.
pub const SOURCE_BUFFER_CAPACITY: usize = 1 << 20;

/// The single buffer every load goes through: script files, snapshot blobs,
/// stdin, and REPL lines. Each load overwrites the previous contents, so any
/// diagnostic that reads the buffer must finish before the next load; the
/// borrow handed out by the accessors enforces that ordering.
pub struct SourceBuffer {
    data: Vec<u8>,
}

impl SourceBuffer {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(SOURCE_BUFFER_CAPACITY),
        }
    }

    /// Load raw bytes from a file, or from stdin for `-`.
    pub fn load_blob(&mut self, path: &Path) -> Result<&[u8], HostError> {
        let name = path.display().to_string();
        self.fill(path, &name)?;
        Ok(&self.data)
    }

    /// Load script text from a file, or from stdin for `-`; the bytes must
    /// be valid UTF-8.
    pub fn load_script(&mut self, name: &str) -> Result<&str, HostError> {
        self.fill(Path::new(name), name)?;
        std::str::from_utf8(&self.data).map_err(|_| HostError::Encoding {
            path: name.to_string(),
        })
    }

    /// Load one line of REPL input.
    pub fn load_line(&mut self, line: &str) -> Result<&str, HostError> {
        if line.len() > SOURCE_BUFFER_CAPACITY {
            return Err(HostError::TooLarge {
                path: "<repl>".to_string(),
            });
        }
        self.data.clear();
        self.data.extend_from_slice(line.as_bytes());
        // the line came in as &str, so the round trip cannot fail
        std::str::from_utf8(&self.data).map_err(|_| HostError::Encoding {
            path: "<repl>".to_string(),
        })
    }

    /// Most recently loaded contents.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn fill(&mut self, path: &Path, name: &str) -> Result<(), HostError> {
        self.data.clear();
        let read = if path == Path::new("-") {
            self.read_bounded(&mut io::stdin().lock(), name)?
        } else {
            let mut file = File::open(path).map_err(|source| HostError::Open {
                path: name.to_string(),
                source,
            })?;
            self.read_bounded(&mut file, name)?
        };
        if read == 0 {
            return Err(HostError::Read {
                path: name.to_string(),
            });
        }
        if read > SOURCE_BUFFER_CAPACITY {
            return Err(HostError::TooLarge {
                path: name.to_string(),
            });
        }
        Ok(())
    }

    fn read_bounded(&mut self, reader: &mut impl Read, name: &str) -> Result<usize, HostError> {
        let mut bounded = reader.take(SOURCE_BUFFER_CAPACITY as u64 + 1);
        bounded
            .read_to_end(&mut self.data)
            .map_err(|_| HostError::Read {
                path: name.to_string(),
            })
    }
}

impl Default for SourceBuffer {
    fn default() -> Self {
        Self::new()
    }
}
