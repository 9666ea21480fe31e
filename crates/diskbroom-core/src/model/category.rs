/// File categorisation based on extension and entry kind.
///
/// A single pure function shared by the tree and flat scanners so the two
/// views can never disagree on classification.
use serde::{Deserialize, Serialize};

use super::entry::EntryKind;

/// Broad file categories for grouping scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Documents,
    Images,
    Video,
    Audio,
    Archives,
    Code,
    Executables,
    Other,
}

impl Category {
    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Documents => "Documents",
            Self::Images => "Images",
            Self::Video => "Video",
            Self::Audio => "Audio",
            Self::Archives => "Archives",
            Self::Code => "Code",
            Self::Executables => "Executables",
            Self::Other => "Other",
        }
    }

    /// Categorise an entry by name and kind. Non-file entries are always
    /// `Other`; files are classified by extension, case-insensitively.
    pub fn of(name: &str, kind: EntryKind) -> Self {
        if kind != EntryKind::File {
            return Self::Other;
        }
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => categorise_extension(ext),
            _ => Self::Other,
        }
    }
}

/// Categorise a file extension into a broad category.
///
/// Zero-heap-allocation hot path: extensions are lowercased into a fixed-size
/// stack buffer rather than allocating a `String`. Extensions longer than
/// 16 bytes are treated as `Other`.
pub fn categorise_extension(ext: &str) -> Category {
    let bytes = ext.as_bytes();
    if bytes.len() > 16 {
        return Category::Other;
    }

    let mut lower = [0u8; 16];
    for (dest, &src) in lower.iter_mut().zip(bytes.iter()) {
        *dest = src.to_ascii_lowercase();
    }
    let lower_str = match std::str::from_utf8(&lower[..bytes.len()]) {
        Ok(s) => s,
        Err(_) => return Category::Other,
    };

    match lower_str {
        // Documents
        "doc" | "docx" | "pdf" | "txt" | "rtf" | "odt" | "xls" | "xlsx" | "ppt" | "pptx"
        | "csv" | "md" | "epub" => Category::Documents,
        // Images
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp" | "ico" | "tiff" | "tif"
        | "psd" | "raw" | "cr2" | "nef" | "heic" | "heif" => Category::Images,
        // Video
        "mp4" | "mkv" | "avi" | "mov" | "wmv" | "flv" | "webm" | "m4v" | "mpg" | "mpeg" | "3gp" => {
            Category::Video
        }
        // Audio
        "mp3" | "wav" | "flac" | "aac" | "ogg" | "wma" | "m4a" | "opus" => Category::Audio,
        // Archives
        "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" | "xz" | "zst" | "cab" | "iso" | "dmg" => {
            Category::Archives
        }
        // Code
        "rs" | "py" | "js" | "ts" | "jsx" | "tsx" | "c" | "cpp" | "h" | "hpp" | "cs" | "java"
        | "go" | "rb" | "php" | "swift" | "kt" | "scala" | "html" | "css" | "scss" | "json"
        | "xml" | "yaml" | "yml" | "toml" | "sql" | "sh" | "bat" | "ps1" => Category::Code,
        // Executables
        "exe" | "msi" | "dll" | "so" | "dylib" | "app" | "com" | "scr" => Category::Executables,
        _ => Category::Other,
    }
}
