// src/media.rs - Pre-upload media validation and formatting helpers
use std::path::Path;

use crate::models::MediaKind;

/// Hard cap enforced before any upload request is made.
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

const VIDEO_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("avi", "video/avi"),
    ("mov", "video/mov"),
    ("mkv", "video/mkv"),
    ("webm", "video/webm"),
];

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("bmp", "image/bmp"),
];

/// Outcome of validating a candidate file. Pure check, no side effects.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Valid { kind: MediaKind, mime_type: String },
    Invalid { reason: String },
}

/// Check a candidate file's type and size against the backend's limits.
pub fn validate_file(path: &Path, size: u64) -> Validation {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mapped = VIDEO_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| (MediaKind::Video, *mime))
        .or_else(|| {
            IMAGE_TYPES
                .iter()
                .find(|(ext, _)| *ext == extension)
                .map(|(_, mime)| (MediaKind::Image, *mime))
        });

    let (kind, mime_type) = match mapped {
        Some(found) => found,
        None => {
            return Validation::Invalid {
                reason: "Please select a valid video or image file (MP4, AVI, MOV, MKV, WebM, JPG, PNG, BMP)".to_string(),
            }
        }
    };

    if size > MAX_FILE_SIZE {
        return Validation::Invalid {
            reason: "File size must be less than 100MB".to_string(),
        };
    }

    Validation::Valid {
        kind,
        mime_type: mime_type.to_string(),
    }
}

/// Format a byte count the way the upload view displays it.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];
    let exponent = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    // Trim trailing zeros like "2.00" -> "2"
    let rounded = (value * 100.0).round() / 100.0;
    if (rounded - rounded.trunc()).abs() < f64::EPSILON {
        format!("{} {}", rounded.trunc() as u64, UNITS[exponent])
    } else {
        format!("{} {}", rounded, UNITS[exponent])
    }
}

/// Format a confidence score as a percentage, e.g. `0.876` -> `87.6%`.
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}

/// Format a duration in seconds, e.g. `2.345` -> `2.35s`.
pub fn format_seconds(seconds: f64) -> String {
    format!("{:.2}s", seconds)
}
