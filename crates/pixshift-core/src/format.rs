//! Target formats and their per-format traits.
//!
//! Everything that varies by format lives in [`FormatSpec`], looked up through
//! [`TargetFormat::spec`]. Adding a format means adding a variant and one row
//! to the table.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Compression effort passed to the WebP encoder (0 = fast, 6 = slowest/best).
pub const WEBP_COMPRESSION_METHOD: u8 = 6;

/// An output encoding pixshift can be asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Webp,
    Tiff,
    Ico,
    Ppm,
    Heic,
}

/// Static description of a target format.
#[derive(Debug, Clone, Copy)]
pub struct FormatSpec {
    /// Canonical name, also used for parsing
    pub name: &'static str,
    /// Extension written on output files
    pub extension: &'static str,
    /// Other extensions that identify this format on input
    pub aliases: &'static [&'static str],
    /// Whether the encoder honours a quality parameter
    pub supports_quality: bool,
    /// Whether alpha must be flattened before encoding
    pub requires_opaque: bool,
    /// Fixed compression-method parameter, if the format takes one
    pub compression_method: Option<u8>,
    /// Codec-library format used for encoding; `None` if no encoder exists
    pub codec_format: Option<ImageFormat>,
}

const FORMAT_TABLE: [(TargetFormat, FormatSpec); 9] = [
    (
        TargetFormat::Png,
        FormatSpec {
            name: "png",
            extension: "png",
            aliases: &[],
            supports_quality: false,
            requires_opaque: false,
            compression_method: None,
            codec_format: Some(ImageFormat::Png),
        },
    ),
    (
        TargetFormat::Jpeg,
        FormatSpec {
            name: "jpeg",
            extension: "jpeg",
            aliases: &["jpg"],
            supports_quality: true,
            requires_opaque: true,
            compression_method: None,
            codec_format: Some(ImageFormat::Jpeg),
        },
    ),
    (
        TargetFormat::Gif,
        FormatSpec {
            name: "gif",
            extension: "gif",
            aliases: &[],
            supports_quality: false,
            requires_opaque: false,
            compression_method: None,
            codec_format: Some(ImageFormat::Gif),
        },
    ),
    (
        TargetFormat::Bmp,
        FormatSpec {
            name: "bmp",
            extension: "bmp",
            aliases: &[],
            supports_quality: false,
            requires_opaque: false,
            compression_method: None,
            codec_format: Some(ImageFormat::Bmp),
        },
    ),
    (
        TargetFormat::Webp,
        FormatSpec {
            name: "webp",
            extension: "webp",
            aliases: &[],
            supports_quality: true,
            requires_opaque: true,
            compression_method: Some(WEBP_COMPRESSION_METHOD),
            codec_format: Some(ImageFormat::WebP),
        },
    ),
    (
        TargetFormat::Tiff,
        FormatSpec {
            name: "tiff",
            extension: "tiff",
            aliases: &["tif"],
            supports_quality: false,
            requires_opaque: false,
            compression_method: None,
            codec_format: Some(ImageFormat::Tiff),
        },
    ),
    (
        TargetFormat::Ico,
        FormatSpec {
            name: "ico",
            extension: "ico",
            aliases: &[],
            supports_quality: false,
            requires_opaque: false,
            compression_method: None,
            codec_format: Some(ImageFormat::Ico),
        },
    ),
    (
        TargetFormat::Ppm,
        FormatSpec {
            name: "ppm",
            extension: "ppm",
            aliases: &[],
            supports_quality: false,
            requires_opaque: true,
            compression_method: None,
            codec_format: Some(ImageFormat::Pnm),
        },
    ),
    (
        TargetFormat::Heic,
        FormatSpec {
            name: "heic",
            extension: "heic",
            aliases: &["heif"],
            supports_quality: true,
            requires_opaque: false,
            compression_method: None,
            codec_format: None,
        },
    ),
];

impl TargetFormat {
    /// All known formats, in table order.
    pub const ALL: [TargetFormat; 9] = [
        TargetFormat::Png,
        TargetFormat::Jpeg,
        TargetFormat::Gif,
        TargetFormat::Bmp,
        TargetFormat::Webp,
        TargetFormat::Tiff,
        TargetFormat::Ico,
        TargetFormat::Ppm,
        TargetFormat::Heic,
    ];

    /// Look up the static traits of this format.
    pub fn spec(self) -> &'static FormatSpec {
        // Table rows are in the same order as `ALL`.
        &FORMAT_TABLE[self as usize].1
    }

    /// Canonical output extension (without the dot).
    pub fn extension(self) -> &'static str {
        self.spec().extension
    }

    pub fn supports_quality(self) -> bool {
        self.spec().supports_quality
    }

    pub fn requires_opaque(self) -> bool {
        self.spec().requires_opaque
    }

    /// Every lowercase extension recognised as an image on input,
    /// derived from all known formats and their aliases.
    pub fn recognized_extensions() -> Vec<&'static str> {
        FORMAT_TABLE
            .iter()
            .flat_map(|(_, spec)| std::iter::once(spec.extension).chain(spec.aliases.iter().copied()))
            .collect()
    }

    /// Comma-separated list of canonical names, for error messages and help text.
    pub fn names() -> String {
        FORMAT_TABLE
            .iter()
            .map(|(_, spec)| spec.name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for TargetFormat {
    type Err = ConfigError;

    /// Parse a format name case-insensitively; `jpg` resolves to JPEG.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.').to_lowercase();
        FORMAT_TABLE
            .iter()
            .find(|(_, spec)| spec.name == wanted || spec.aliases.contains(&wanted.as_str()))
            .map(|(format, _)| *format)
            .ok_or_else(|| ConfigError::UnknownFormat(s.to_string(), Self::names()))
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spec().name.to_uppercase())
    }
}
