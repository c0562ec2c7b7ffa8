//! Content units handed over by an extractor.
//!
//! A single uploaded file may decompose into several units (a spreadsheet's
//! cell ranges, a document plus embedded images). Units are immutable once
//! built; the estimation pipeline only reads them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    PlainText,
    DocumentText,
    Tabular,
    Image,
    SourceCode,
}

impl ContentKind {
    pub const ALL: [ContentKind; 5] = [
        ContentKind::PlainText,
        ContentKind::DocumentText,
        ContentKind::Tabular,
        ContentKind::Image,
        ContentKind::SourceCode,
    ];

    /// Whether units of this kind carry a text payload.
    pub fn is_textual(self) -> bool {
        !matches!(self, ContentKind::Image)
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::PlainText => write!(f, "plain_text"),
            ContentKind::DocumentText => write!(f, "document_text"),
            ContentKind::Tabular => write!(f, "tabular"),
            ContentKind::Image => write!(f, "image"),
            ContentKind::SourceCode => write!(f, "source_code"),
        }
    }
}

impl std::str::FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain_text" | "text" => Ok(ContentKind::PlainText),
            "document_text" | "document" => Ok(ContentKind::DocumentText),
            "tabular" | "table" => Ok(ContentKind::Tabular),
            "image" => Ok(ContentKind::Image),
            "source_code" | "code" => Ok(ContentKind::SourceCode),
            _ => Err(format!(
                "Unknown content kind: {s}. Valid: plain_text, document_text, tabular, image, source_code"
            )),
        }
    }
}

/// Vision detail level requested for an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    Low,
    #[default]
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: String,
    #[serde(default)]
    pub detail: ImageDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Text { text: String },
    Image(ImageDescriptor),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub id: String,
    pub kind: ContentKind,
    /// `None` when the extractor produced no usable payload.
    pub payload: Option<Payload>,
    pub origin_file_id: String,
    pub byte_size: u64,
}

impl ContentUnit {
    /// Build a text-bearing unit. `byte_size` is taken from the text.
    pub fn text(
        id: impl Into<String>,
        kind: ContentKind,
        origin_file_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let text = text.into();
        Self {
            id: id.into(),
            kind,
            byte_size: text.len() as u64,
            payload: Some(Payload::Text { text }),
            origin_file_id: origin_file_id.into(),
        }
    }

    pub fn image(
        id: impl Into<String>,
        origin_file_id: impl Into<String>,
        width: u32,
        height: u32,
        format: impl Into<String>,
        byte_size: u64,
    ) -> Self {
        Self {
            id: id.into(),
            kind: ContentKind::Image,
            payload: Some(Payload::Image(ImageDescriptor {
                width,
                height,
                format: format.into(),
                detail: ImageDetail::High,
            })),
            origin_file_id: origin_file_id.into(),
            byte_size,
        }
    }

    /// A unit whose content could not be extracted.
    pub fn empty(
        id: impl Into<String>,
        kind: ContentKind,
        origin_file_id: impl Into<String>,
        byte_size: u64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            payload: None,
            origin_file_id: origin_file_id.into(),
            byte_size,
        }
    }

    pub fn text_payload(&self) -> Option<&str> {
        match &self.payload {
            Some(Payload::Text { text }) => Some(text),
            _ => None,
        }
    }

    pub fn image_payload(&self) -> Option<&ImageDescriptor> {
        match &self.payload {
            Some(Payload::Image(img)) => Some(img),
            _ => None,
        }
    }
}
