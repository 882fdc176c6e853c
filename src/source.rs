use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::{Error, Result};

/// Reads `path_or_text` as a file when it names one, otherwise returns it
/// unchanged as literal content.
pub fn read_text_or_path(path_or_text: &str) -> Result<String> {
    let path = Path::new(path_or_text);
    if looks_like_path(path_or_text) && path.is_file() {
        return read_lossy(path);
    }
    Ok(path_or_text.to_string())
}

pub fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn load_json(path_or_text: &str) -> Result<Value> {
    let text = read_text_or_path(path_or_text)?;
    Ok(serde_json::from_str(&text)?)
}

// Markup and JSON documents are never file names.
fn looks_like_path(candidate: &str) -> bool {
    !candidate.is_empty()
        && !candidate.contains('\n')
        && !candidate.trim_start().starts_with(['<', '{', '['])
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn literal_text_passes_through() -> Result<()> {
        assert_eq!(read_text_or_path("<a href='/'>Home</a>")?, "<a href='/'>Home</a>");
        assert_eq!(read_text_or_path("no/such/file.html")?, "no/such/file.html");
        Ok(())
    }

    #[test]
    fn existing_files_are_read_lossily() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new().map_err(|source| Error::Io {
            path: "tempfile".into(),
            source,
        })?;
        file.write_all(b"[{\"k\": \"caf\xc3\xa9\"}, \"\xff\"]")
            .map_err(|source| Error::Io {
                path: file.path().to_path_buf(),
                source,
            })?;
        let path = file.path().to_string_lossy().into_owned();

        let text = read_text_or_path(&path)?;
        assert!(text.contains("café"));
        assert!(text.contains('\u{FFFD}'));
        let value = load_json(&path)?;
        assert_eq!(value[0]["k"], "café");
        Ok(())
    }

    #[test]
    fn json_literals_load_directly() -> Result<()> {
        let value = load_json(r#"{"nodes": []}"#)?;
        assert!(value["nodes"].is_array());
        Ok(())
    }
}
