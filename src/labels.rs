use std::collections::HashSet;
use std::path::Path;

use crate::error::ClassifierError;
use crate::models::ClassLabel;

// Output order of the skin lesion model's final layer.
const BUILTIN: [(&str, &str); 4] = [
    ("bcc", "Basal Cell Carcinoma (BCC)"),
    ("bkl", "Benign Keratosis (BKL)"),
    ("mel", "Melanoma (MEL)"),
    ("nv", "Melanocytic Nevus (NV)"),
];

/// Ordered class labels, index `i` naming output `i` of the model.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet {
    labels: Vec<ClassLabel>,
}

impl LabelSet {
    pub fn new(labels: Vec<ClassLabel>) -> Result<Self, ClassifierError> {
        if labels.is_empty() {
            return Err(ClassifierError::Labels("no labels configured".to_string()));
        }
        let mut seen = HashSet::new();
        for label in &labels {
            if !seen.insert(label.code.as_str()) {
                return Err(ClassifierError::Labels(format!(
                    "duplicate label code '{}'",
                    label.code
                )));
            }
        }
        Ok(Self { labels })
    }

    pub fn builtin() -> Self {
        Self {
            labels: BUILTIN
                .iter()
                .map(|(code, name)| ClassLabel {
                    code: code.to_string(),
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ClassifierError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::Labels(format!("failed to read {}: {}", path.display(), e))
        })?;
        let labels: Vec<ClassLabel> = serde_json::from_str(&content).map_err(|e| {
            ClassifierError::Labels(format!("failed to parse {}: {}", path.display(), e))
        })?;
        Self::new(labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn get(&self, index: usize) -> Option<&ClassLabel> {
        self.labels.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn label(code: &str) -> ClassLabel {
        ClassLabel {
            code: code.to_string(),
            name: code.to_uppercase(),
        }
    }

    #[test]
    fn builtin_order_matches_model_output() {
        let labels = LabelSet::builtin();
        let codes: Vec<&str> = (0..labels.len())
            .filter_map(|i| labels.get(i))
            .map(|l| l.code.as_str())
            .collect();
        assert_eq!(codes, ["bcc", "bkl", "mel", "nv"]);
        assert_eq!(labels.get(2).unwrap().name, "Melanoma (MEL)");
    }

    #[test]
    fn rejects_empty_and_duplicate_sets() {
        assert!(LabelSet::new(Vec::new()).is_err());
        let err = LabelSet::new(vec![label("mel"), label("mel")]).unwrap_err();
        assert!(err.to_string().contains("duplicate label code 'mel'"));
    }

    #[test]
    fn loads_labels_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"code": "akiec", "name": "Actinic Keratosis"}}, {{"code": "df", "name": "Dermatofibroma"}}]"#
        )
        .unwrap();

        let labels = LabelSet::from_file(file.path()).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.get(1).unwrap().code, "df");
    }

    #[test]
    fn malformed_label_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "bcc,bkl,mel,nv").unwrap();
        assert!(matches!(
            LabelSet::from_file(file.path()),
            Err(ClassifierError::Labels(_))
        ));
    }
}
