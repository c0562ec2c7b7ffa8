use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::content::{ContentKind, ContentUnit};
use crate::error::CostError;

/// How a file's bytes become a unit payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readable {
    /// UTF-8 text read as-is.
    Text,
    /// Image whose dimensions may be read from its header.
    Image,
    /// Needs an external extractor; produces a payload-less unit.
    Opaque,
}

const PLAIN_TEXT: &[&str] = &[
    "txt", "md", "markdown", "rst", "log", "json", "jsonl", "yaml", "yml", "toml", "ini",
];
const DOCUMENT_TEXT: &[&str] = &["html", "htm", "xml", "rtf", "tex"];
const DOCUMENT_OPAQUE: &[&str] = &["pdf", "docx", "docm", "doc", "odt"];
const TABULAR_TEXT: &[&str] = &["csv", "tsv"];
const TABULAR_OPAQUE: &[&str] = &["xlsx", "xlsm", "xls", "ods"];
const IMAGE: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "webp"];
const SOURCE_CODE: &[&str] = &[
    "rs", "py", "js", "ts", "jsx", "tsx", "java", "c", "h", "cpp", "hpp", "cc", "cs", "go",
    "rb", "php", "swift", "kt", "scala", "sh", "sql", "css", "lua",
];

/// Map a path's extension to a content kind and how to read it.
pub fn classify(path: &Path) -> Option<(ContentKind, Readable)> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let ext = ext.as_str();
    let hit = |table: &[&str]| table.iter().any(|e| *e == ext);

    if hit(PLAIN_TEXT) {
        Some((ContentKind::PlainText, Readable::Text))
    } else if hit(SOURCE_CODE) {
        Some((ContentKind::SourceCode, Readable::Text))
    } else if hit(TABULAR_TEXT) {
        Some((ContentKind::Tabular, Readable::Text))
    } else if hit(DOCUMENT_TEXT) {
        Some((ContentKind::DocumentText, Readable::Text))
    } else if hit(IMAGE) {
        Some((ContentKind::Image, Readable::Image))
    } else if hit(DOCUMENT_OPAQUE) {
        Some((ContentKind::DocumentText, Readable::Opaque))
    } else if hit(TABULAR_OPAQUE) {
        Some((ContentKind::Tabular, Readable::Opaque))
    } else {
        None
    }
}

/// Turn one file into a content unit.
///
/// Returns `Ok(None)` for extensions with no known kind. Known files that
/// cannot be read into a payload still produce a unit, without a payload,
/// so the estimator reports them instead of dropping them.
pub fn extract_file(path: &Path) -> Result<Option<ContentUnit>, CostError> {
    let Some((kind, readable)) = classify(path) else {
        tracing::warn!(path = %path.display(), "skipping file with unknown extension");
        return Ok(None);
    };

    let file_id = path.display().to_string();
    let unit_id = format!("{file_id}#0");
    let bytes = std::fs::read(path)?;
    let byte_size = bytes.len() as u64;

    let unit = match readable {
        Readable::Text => match String::from_utf8(bytes) {
            Ok(text) => ContentUnit::text(unit_id, kind, file_id, text),
            Err(_) => {
                tracing::warn!(path = %path.display(), "file is not valid UTF-8");
                ContentUnit::empty(unit_id, kind, file_id, byte_size)
            }
        },
        Readable::Image => match image_dimensions(&bytes) {
            Some((format, width, height)) => {
                ContentUnit::image(unit_id, file_id, width, height, format, byte_size)
            }
            None => ContentUnit::empty(unit_id, kind, file_id, byte_size),
        },
        Readable::Opaque => ContentUnit::empty(unit_id, kind, file_id, byte_size),
    };
    Ok(Some(unit))
}

/// Extract every file under `paths`, in argument order, walking directories
/// in file-name order for stable reports.
pub fn collect(paths: &[PathBuf]) -> Result<Vec<ContentUnit>, CostError> {
    let mut units = Vec::new();
    for root in paths {
        if !root.exists() {
            return Err(CostError::Other(format!(
                "Input path does not exist: {}",
                root.display()
            )));
        }
        for entry in WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(
                        path = %e.path().unwrap_or(root.as_path()).display(),
                        error = %e,
                        "skipping unreadable entry"
                    );
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(unit) = extract_file(entry.path())? {
                units.push(unit);
            }
        }
    }
    Ok(units)
}

/// Load units produced by an external extractor: a JSON array of units.
pub fn load_manifest(path: &Path) -> Result<Vec<ContentUnit>, CostError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| CostError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read width and height from a PNG or GIF header.
fn image_dimensions(bytes: &[u8]) -> Option<(&'static str, u32, u32)> {
    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    if bytes.starts_with(PNG_MAGIC) && bytes.get(12..16) == Some(b"IHDR") {
        let width = u32::from_be_bytes(bytes.get(16..20)?.try_into().ok()?);
        let height = u32::from_be_bytes(bytes.get(20..24)?.try_into().ok()?);
        return Some(("png", width, height));
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        let width = u16::from_le_bytes(bytes.get(6..8)?.try_into().ok()?);
        let height = u16::from_le_bytes(bytes.get(8..10)?.try_into().ok()?);
        return Some(("gif", u32::from(width), u32::from(height)));
    }
    None
}
