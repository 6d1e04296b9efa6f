//! Classification of stored files by MIME type, and display helpers.

use mime::Mime;
use std::fmt;

/// Broad kind of a stored file, derived from its MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileKind {
    Text,
    /// Any `image/*` type; holds the upper-cased format (`"PNG"`, `"SVG+XML"`).
    Image(String),
    Pdf,
    Epub,
    Html,
    Zip,
    Other,
}

impl FileKind {
    /// Classifies a MIME string. Empty or unparseable strings are [`FileKind::Other`].
    pub fn from_mime(mime_type: &str) -> Self {
        match mime_type.parse::<Mime>() {
            Ok(mime) => Self::from(&mime),
            Err(_) => FileKind::Other,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            FileKind::Text => "Text".to_string(),
            FileKind::Image(format) => format!("Image ({})", format),
            FileKind::Pdf => "PDF".to_string(),
            FileKind::Epub => "E-Book".to_string(),
            FileKind::Html => "HTML".to_string(),
            FileKind::Zip => "ZIP Archive".to_string(),
            FileKind::Other => "File".to_string(),
        }
    }

    /// Whether a viewer exists for this kind.
    pub fn can_preview(&self) -> bool {
        !matches!(self, FileKind::Other)
    }
}

impl From<&Mime> for FileKind {
    fn from(mime: &Mime) -> Self {
        let suffix = mime.suffix().map(|name| name.as_str());
        match (mime.type_().as_str(), mime.subtype().as_str(), suffix) {
            ("text", "plain", None) => FileKind::Text,
            ("text", "html", None) => FileKind::Html,
            ("image", subtype, suffix) => {
                let format = match suffix {
                    Some(suffix) => format!("{}+{}", subtype, suffix),
                    None => subtype.to_string(),
                };
                FileKind::Image(format.to_uppercase())
            }
            ("application", "pdf", None) => FileKind::Pdf,
            ("application", "zip", None) => FileKind::Zip,
            ("application", "epub", Some("zip")) => FileKind::Epub,
            _ => FileKind::Other,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Best-effort MIME type for a file extension (case-insensitive).
pub fn mime_from_extension(ext: &str) -> Mime {
    match ext.to_ascii_lowercase().as_str() {
        "txt" | "md" | "log" | "csv" => mime::TEXT_PLAIN,
        "html" | "htm" => mime::TEXT_HTML,
        "json" => mime::APPLICATION_JSON,
        "pdf" => mime::APPLICATION_PDF,
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "bmp" => mime::IMAGE_BMP,
        "svg" => mime::IMAGE_SVG,
        "webp" => "image/webp".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        "epub" => "application/epub+zip".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        "zip" => "application/zip".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

/// Formats a byte count with one decimal in 1024-based units: `512 B`, `1.5 KB`, `2.0 MB`.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let value = bytes as f64;
    if value < KB {
        format!("{} B", bytes)
    } else if value < MB {
        format!("{:.1} KB", value / KB)
    } else if value < GB {
        format!("{:.1} MB", value / MB)
    } else {
        format!("{:.1} GB", value / GB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_known_types() {
        assert_eq!(FileKind::from_mime("text/plain"), FileKind::Text);
        assert_eq!(FileKind::from_mime("text/html"), FileKind::Html);
        assert_eq!(FileKind::from_mime("application/pdf"), FileKind::Pdf);
        assert_eq!(FileKind::from_mime("application/epub+zip"), FileKind::Epub);
        assert_eq!(FileKind::from_mime("application/zip"), FileKind::Zip);
        assert_eq!(FileKind::from_mime("image/jpeg"), FileKind::Image("JPEG".to_string()));
        assert_eq!(FileKind::from_mime("image/svg+xml"), FileKind::Image("SVG+XML".to_string()));
    }

    #[test]
    fn test_unknown_and_invalid_types_are_other() {
        assert_eq!(FileKind::from_mime(""), FileKind::Other);
        assert_eq!(FileKind::from_mime("not a mime"), FileKind::Other);
        assert_eq!(FileKind::from_mime("application/octet-stream"), FileKind::Other);
        assert!(!FileKind::Other.can_preview());
        assert!(FileKind::Pdf.can_preview());
    }

    #[test]
    fn test_parameters_do_not_affect_kind() {
        assert_eq!(FileKind::from_mime("text/plain; charset=utf-8"), FileKind::Text);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(FileKind::Image("PNG".to_string()).to_string(), "Image (PNG)");
        assert_eq!(FileKind::Epub.display_name(), "E-Book");
        assert_eq!(FileKind::Other.display_name(), "File");
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_from_extension("PDF"), mime::APPLICATION_PDF);
        assert_eq!(mime_from_extension("jpg"), mime::IMAGE_JPEG);
        assert_eq!(mime_from_extension("epub").essence_str(), "application/epub+zip");
        assert_eq!(mime_from_extension("xyz"), mime::APPLICATION_OCTET_STREAM);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(2 * 1024 * 1024), "2.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }
}
