//! Download formats

use std::fmt;

use serde::{Deserialize, Serialize};

/// A format templates can be downloaded in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    /// Lossless PNG, transparency kept
    Png,

    /// JPEG flattened onto white
    Jpg,

    /// Single page PDF
    Pdf,
}

impl TargetFormat {
    /// Every format, in menu order
    pub const ALL: [Self; 3] = [Self::Png, Self::Jpg, Self::Pdf];

    /// File extension, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Pdf => "pdf",
        }
    }

    /// MIME type of the encoded bytes
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg => "image/jpeg",
            Self::Pdf => "application/pdf",
        }
    }

    /// Upper-case label shown to shoppers and kept in the audit log
    pub fn label(self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpg => "JPG",
            Self::Pdf => "PDF",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Content type for a file extension, for assets delivered as-is.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
