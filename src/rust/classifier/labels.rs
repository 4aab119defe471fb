use std::fs;
use std::path::Path;

use log::info;

use super::error::ClassifierError;

/// Loads class labels from a text file, one label per line.
///
/// Line `i` (counting only non-empty lines) names the class of output logit `i`.
/// Surrounding whitespace is trimmed. The number of labels is not checked
/// against any model here.
pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<Vec<String>, ClassifierError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        ClassifierError::Load(format!("Failed to load labels from {}: {}", path.display(), e))
    })?;

    let labels = parse_labels(&contents);
    info!("Loaded {} labels from {:?}", labels.len(), path);
    Ok(labels)
}

pub(crate) fn parse_labels(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_parse_trims_and_skips_blank_lines() {
        let labels = parse_labels("tench\n  goldfish \r\n\n\ngreat white shark\n");
        assert_eq!(labels, vec!["tench", "goldfish", "great white shark"]);
    }

    #[test]
    fn test_load_from_file() {
        let path = env::temp_dir().join("occipital-labels-test.txt");
        fs::write(&path, "cat\ndog\n").unwrap();

        let labels = load_labels(&path).unwrap();
        assert_eq!(labels, vec!["cat", "dog"]);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let result = load_labels("/nonexistent/occipital/labels.txt");
        assert!(matches!(result, Err(ClassifierError::Load(_))));
    }
}
