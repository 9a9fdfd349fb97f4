//! Text encodings for reading templates and writing rendered output.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{FormworkError, Result};

/// A supported text encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Utf8,
    /// ISO-8859-1: every byte maps to the code point of the same value.
    Latin1,
    Ascii,
}

impl Encoding {
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "latin-1",
            Encoding::Ascii => "ascii",
        }
    }

    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            Encoding::Utf8 => {
                String::from_utf8(bytes.to_vec()).map_err(|e| self.error(e.to_string()))
            }
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            Encoding::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(pos) => Err(self.error(format!(
                    "byte 0x{:02x} at offset {pos} is not ASCII",
                    bytes[pos]
                ))),
                None => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            },
        }
    }

    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        let limit = match self {
            Encoding::Utf8 => return Ok(text.as_bytes().to_vec()),
            Encoding::Latin1 => 0xff,
            Encoding::Ascii => 0x7f,
        };
        text.chars()
            .map(|ch| {
                u8::try_from(u32::from(ch))
                    .ok()
                    .filter(|&b| u32::from(b) <= limit)
                    .ok_or_else(|| self.error(format!("character {ch:?} cannot be encoded")))
            })
            .collect()
    }

    /// Reads a whole file and decodes it.
    pub fn read_file(self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FormworkError::TemplateNotFound(path.to_path_buf())
            } else {
                FormworkError::io(path, e)
            }
        })?;
        self.decode(&bytes)
    }

    /// Encodes `text` and writes it to `path`, replacing any existing file.
    pub fn write_file(self, path: &Path, text: &str) -> Result<()> {
        let bytes = self.encode(text)?;
        std::fs::write(path, bytes).map_err(|e| FormworkError::io(path, e))
    }

    fn error(self, message: String) -> FormworkError {
        FormworkError::Encoding {
            encoding: self.name(),
            message,
        }
    }
}

impl FromStr for Encoding {
    type Err = FormworkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Ok(Encoding::Latin1),
            "ascii" | "us-ascii" => Ok(Encoding::Ascii),
            _ => Err(FormworkError::InvalidInput(format!("unsupported encoding `{s}`"))),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
