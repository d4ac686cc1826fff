use std::fs;
use std::path::Path;

use crate::error::Error;

/// Reads an input file, mapping any failure to `FileNotFound` for that path.
pub fn read_text_file(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|_| Error::FileNotFound(path.to_path_buf()))
}

/// Joins optional prepend text to the prompt with a single separating space.
pub fn compose_prompt(prepend: Option<&str>, prompt: &str) -> String {
    match prepend {
        Some(prefix) => format!("{} {}", prefix, prompt),
        None => prompt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn prepend_is_joined_with_a_single_space() {
        assert_eq!(
            compose_prompt(Some("Context:"), "Explain X"),
            "Context: Explain X"
        );
    }

    #[test]
    fn prompt_is_unchanged_without_prepend() {
        assert_eq!(compose_prompt(None, "Explain X"), "Explain X");
    }

    #[test]
    fn reads_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Hello").unwrap();

        assert_eq!(read_text_file(file.path()).unwrap(), "Hello");
    }

    #[test]
    fn missing_file_reports_its_path() {
        let result = read_text_file(Path::new("/no/such/prompt.txt"));

        match result {
            Err(Error::FileNotFound(path)) => {
                assert_eq!(path, Path::new("/no/such/prompt.txt"))
            }
            other => panic!("expected FileNotFound, got {:?}", other.err()),
        }
    }
}
