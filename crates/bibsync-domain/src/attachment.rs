//! Auxiliary records folded into an entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file attached to an entry (PDF, snapshot, linked file)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub key: String,
    pub title: Option<String>,
    pub content_type: Option<String>,
    /// Raw source path; `storage:` prefixed paths are relative to the storage dir
    pub path: Option<String>,
}

impl Attachment {
    pub fn is_pdf(&self) -> bool {
        self.content_type.as_deref() == Some("application/pdf")
    }

    /// File name component of a `storage:`-prefixed path
    pub fn storage_file_name(&self) -> Option<&str> {
        self.path.as_deref()?.strip_prefix("storage:")
    }
}

/// Kind of annotation made on an attachment
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Highlight,
    Note,
    Image,
    Ink,
    Underline,
    Text,
    Unknown,
}

impl AnnotationKind {
    /// Map the source's integer annotation type
    pub fn from_source(value: i64) -> Self {
        match value {
            1 => AnnotationKind::Highlight,
            2 => AnnotationKind::Note,
            3 => AnnotationKind::Image,
            4 => AnnotationKind::Ink,
            5 => AnnotationKind::Underline,
            6 => AnnotationKind::Text,
            _ => AnnotationKind::Unknown,
        }
    }
}

/// An annotation made on one of the entry's attachments
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Annotation {
    pub key: String,
    pub attachment_key: String,
    pub kind: AnnotationKind,
    pub text: Option<String>,
    pub comment: Option<String>,
    pub color: Option<String>,
    pub page_label: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_file_name() {
        let attachment = Attachment {
            key: "ABCD1234".to_string(),
            title: Some("Full Text PDF".to_string()),
            content_type: Some("application/pdf".to_string()),
            path: Some("storage:paper.pdf".to_string()),
        };
        assert!(attachment.is_pdf());
        assert_eq!(attachment.storage_file_name(), Some("paper.pdf"));

        let linked = Attachment {
            path: Some("/home/me/paper.pdf".to_string()),
            ..attachment
        };
        assert_eq!(linked.storage_file_name(), None);
    }

    #[test]
    fn test_annotation_kind_from_source() {
        assert_eq!(AnnotationKind::from_source(1), AnnotationKind::Highlight);
        assert_eq!(AnnotationKind::from_source(5), AnnotationKind::Underline);
        assert_eq!(AnnotationKind::from_source(42), AnnotationKind::Unknown);
    }

    #[test]
    fn test_annotation_kind_serde() {
        let json = serde_json::to_string(&AnnotationKind::Highlight).unwrap();
        assert_eq!(json, "\"highlight\"");
    }
}
