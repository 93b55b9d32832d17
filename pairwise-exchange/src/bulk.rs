//! Bulk task files: plain text, one label per line (`.txt`, `.csv`, stdin).
//!
//! Reading is kept apart from ingestion so an unreadable file never touches
//! the session; the returned text goes straight to `Session::add_tasks_bulk`.

use anyhow::{Context, Result};
use std::fs;
use std::io::Read;
use std::path::Path;

pub fn read_bulk_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    decode(bytes).with_context(|| format!("decode {}", path.display()))
}

pub fn read_bulk_reader(mut reader: impl Read) -> Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).context("read task list")?;
    decode(bytes)
}

fn decode(bytes: Vec<u8>) -> Result<String> {
    let text = String::from_utf8(bytes).context("task list is not valid UTF-8")?;
    // Editors on Windows like to prepend a BOM.
    Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairwise_core::Session;
    use std::io::Write;

    #[test]
    fn reads_file_and_feeds_session() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "\u{feff}Task 1\r\n\r\nTask 2\n   \nTask 3").unwrap();

        let text = read_bulk_file(f.path()).unwrap();
        let mut s = Session::new();
        let ids = s.add_tasks_bulk(&text);
        assert_eq!(ids.len(), 3);
        let texts: Vec<&str> = s.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Task 1", "Task 2", "Task 3"]);
    }

    #[test]
    fn missing_file_is_an_error_naming_the_path() {
        let err = read_bulk_file("/definitely/not/here.txt").unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.txt"));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let err = read_bulk_reader(b"\xff\xfe\x00".as_slice()).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }
}
