//! Size estimates for stored files.
//!
//! No bytes are re-encoded. Each extension maps to a fixed saving rate and the
//! stored `compressed_size` is `round(size * (1 - rate))`.
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Rate applied to extensions missing from the table.
pub const DEFAULT_RATE: f64 = 0.10;

const RATES: &[(&str, f64)] = &[
    // text and markup
    ("txt", 0.60),
    ("csv", 0.65),
    ("json", 0.70),
    ("xml", 0.70),
    ("html", 0.65),
    ("md", 0.60),
    ("log", 0.75),
    // office documents
    ("pdf", 0.15),
    ("doc", 0.40),
    ("docx", 0.20),
    ("rtf", 0.50),
    ("xls", 0.45),
    ("xlsx", 0.20),
    ("ppt", 0.35),
    ("pptx", 0.15),
    // images
    ("bmp", 0.70),
    ("tif", 0.40),
    ("tiff", 0.40),
    ("svg", 0.60),
    ("png", 0.05),
    ("jpg", 0.03),
    ("jpeg", 0.03),
    ("gif", 0.02),
    ("webp", 0.02),
    // audio and video
    ("wav", 0.45),
    ("mp3", 0.02),
    ("aac", 0.02),
    ("mp4", 0.02),
    ("mov", 0.03),
    ("avi", 0.10),
    ("mkv", 0.02),
    // archives are already compressed
    ("zip", 0.0),
    ("rar", 0.0),
    ("7z", 0.0),
    ("gz", 0.0),
    ("tar", 0.30),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CompressionEstimate {
    pub original_size: i64,
    pub estimated_size: i64,
    pub rate: f64,
    pub saved_bytes: i64,
}

/// Lowercased text after the last dot, if any. Dotfiles like `.env` have no extension.
pub fn extension_of(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_ascii_lowercase()),
        _ => None,
    }
}

pub fn compression_rate(file_name: &str) -> f64 {
    extension_of(file_name)
        .and_then(|ext| RATES.iter().find(|(e, _)| *e == ext).map(|(_, r)| *r))
        .unwrap_or(DEFAULT_RATE)
}

/// Negative sizes are treated as zero.
pub fn estimate(file_name: &str, size: i64) -> CompressionEstimate {
    let size = size.max(0);
    let rate = compression_rate(file_name);
    let estimated_size = (size as f64 * (1.0 - rate)).round() as i64;
    CompressionEstimate {
        original_size: size,
        estimated_size,
        rate,
        saved_bytes: size - estimated_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased_last_segment() {
        assert_eq!(extension_of("Report.Final.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension_of("dir.v2/readme").as_deref(), None);
        assert_eq!(extension_of(".env"), None);
        assert_eq!(extension_of("trailing."), None);
    }

    #[test]
    fn known_and_unknown_rates() {
        assert_eq!(compression_rate("notes.txt"), 0.60);
        assert_eq!(compression_rate("bundle.zip"), 0.0);
        assert_eq!(compression_rate("model.step"), DEFAULT_RATE);
        assert_eq!(compression_rate("no_extension"), DEFAULT_RATE);
    }

    #[test]
    fn estimate_rounds_to_nearest_byte() {
        let e = estimate("data.csv", 1001);
        // 1001 * 0.35 = 350.35
        assert_eq!(e.estimated_size, 350);
        assert_eq!(e.saved_bytes, 651);
        assert_eq!(e.original_size, 1001);

        let e = estimate("photo.jpg", 0);
        assert_eq!((e.estimated_size, e.saved_bytes), (0, 0));

        assert_eq!(estimate("x.bin", -5).original_size, 0);
    }
}
