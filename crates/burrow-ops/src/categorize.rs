//! Extension-based file categories.

use strum::{Display, EnumIter, IntoStaticStr};

use crate::conflict::split_name;

/// Folder a file lands in when categorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum Category {
    Pictures,
    Videos,
    Music,
    Documents,
    Archives,
    Other,
}

impl Category {
    /// Category for a lowercase extension.
    pub fn from_extension(extension: &str) -> Self {
        match extension {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "svg" | "tif" | "tiff" | "heic"
            | "ico" | "raw" => Self::Pictures,
            "mp4" | "mkv" | "mov" | "avi" | "wmv" | "flv" | "webm" | "m4v" | "mpg" | "mpeg" => {
                Self::Videos
            }
            "mp3" | "wav" | "flac" | "aac" | "ogg" | "m4a" | "wma" | "opus" | "aiff" => {
                Self::Music
            }
            "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "odt" | "ods" | "odp"
            | "txt" | "md" | "rtf" | "csv" | "epub" => Self::Documents,
            "zip" | "tar" | "gz" | "tgz" | "xz" | "txz" | "bz2" | "tbz2" | "7z" | "rar" => {
                Self::Archives
            }
            _ => Self::Other,
        }
    }

    /// Name of the folder holding this category.
    pub fn folder_name(&self) -> &'static str {
        self.into()
    }
}

/// Category of a file name, or `None` for names without an extension.
pub fn category_for(name: &str) -> Option<Category> {
    let (_, extension) = split_name(name);
    extension.map(|ext| Category::from_extension(&ext.to_ascii_lowercase()))
}
