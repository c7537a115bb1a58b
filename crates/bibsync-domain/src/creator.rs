//! Creator representation

use serde::{Deserialize, Serialize};

/// A creator of an entry (author, editor, translator, ...).
///
/// Institutional creators carry only a display name; personal creators keep
/// their first and last name separately.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Creator {
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: String,
}

impl Creator {
    /// Create a personal creator from first and last name
    pub fn person(
        role: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        let first = first_name.into().trim().to_string();
        let last = last_name.into().trim().to_string();
        let display_name = match (first.is_empty(), last.is_empty()) {
            (false, false) => format!("{} {}", first, last),
            (true, false) => last.clone(),
            (false, true) => first.clone(),
            (true, true) => String::new(),
        };
        Self {
            role: role.into(),
            first_name: (!first.is_empty()).then_some(first),
            last_name: (!last.is_empty()).then_some(last),
            display_name,
        }
    }

    /// Create an institutional creator (single-field name)
    pub fn institution(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            first_name: None,
            last_name: None,
            display_name: name.into().trim().to_string(),
        }
    }

    pub fn is_institution(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none()
    }

    /// Format as "Last, First" (falls back to the display name)
    pub fn to_sort_format(&self) -> String {
        match (&self.last_name, &self.first_name) {
            (Some(last), Some(first)) => format!("{}, {}", last, first),
            (Some(last), None) => last.clone(),
            _ => self.display_name.clone(),
        }
    }
}

/// Flatten creators into a single display string ("A B, C D, Institute").
pub fn flatten_creators(creators: &[Creator]) -> String {
    creators
        .iter()
        .map(|c| c.display_name.as_str())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Short author label used in note titles and citations.
///
/// "Smith", "Smith & Doe" or "Smith et al.", only counting the given role.
pub fn short_author_label(creators: &[Creator], role: &str) -> Option<String> {
    let names: Vec<&str> = creators
        .iter()
        .filter(|c| c.role == role)
        .map(|c| c.last_name.as_deref().unwrap_or(c.display_name.as_str()))
        .filter(|name| !name.is_empty())
        .collect();

    match names.as_slice() {
        [] => None,
        [one] => Some(one.to_string()),
        [first, second] => Some(format!("{} & {}", first, second)),
        [first, ..] => Some(format!("{} et al.", first)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_display_name() {
        let creator = Creator::person("author", "Albert", "Einstein");
        assert_eq!(creator.display_name, "Albert Einstein");
        assert_eq!(creator.to_sort_format(), "Einstein, Albert");
        assert!(!creator.is_institution());
    }

    #[test]
    fn test_person_missing_first_name() {
        let creator = Creator::person("author", "  ", "Plato");
        assert_eq!(creator.display_name, "Plato");
        assert!(creator.first_name.is_none());
    }

    #[test]
    fn test_institution() {
        let creator = Creator::institution("author", "World Health Organization");
        assert!(creator.is_institution());
        assert_eq!(creator.to_sort_format(), "World Health Organization");
    }

    #[test]
    fn test_flatten_creators() {
        let creators = vec![
            Creator::person("author", "Jane", "Smith"),
            Creator::institution("author", "CERN"),
            Creator::person("editor", "", ""),
        ];
        assert_eq!(flatten_creators(&creators), "Jane Smith, CERN");
    }

    #[test]
    fn test_short_author_label() {
        let one = vec![Creator::person("author", "Jane", "Smith")];
        assert_eq!(short_author_label(&one, "author"), Some("Smith".to_string()));

        let two = vec![
            Creator::person("author", "Jane", "Smith"),
            Creator::person("author", "John", "Doe"),
        ];
        assert_eq!(
            short_author_label(&two, "author"),
            Some("Smith & Doe".to_string())
        );

        let mut three = two.clone();
        three.push(Creator::institution("author", "NASA"));
        assert_eq!(
            short_author_label(&three, "author"),
            Some("Smith et al.".to_string())
        );

        assert_eq!(short_author_label(&one, "editor"), None);
    }
}
