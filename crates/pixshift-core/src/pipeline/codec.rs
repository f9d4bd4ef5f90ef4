//! Codec adapter: the boundary between the pipeline and pixel-level codecs.
//!
//! The pipeline only talks to [`ImageCodec`]. [`ImageRsCodec`] is the default
//! implementation over the `image` crate; tests substitute their own.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ColorType, DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, ImageFormat};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{CodecError, CodecResult};
use crate::format::{TargetFormat, WEBP_COMPRESSION_METHOD};
use crate::types::{ConversionRequest, DEFAULT_QUALITY};

/// Result of opening an image.
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Colour mode of the decoded pixels
    pub color: ColorType,
    /// Detected source format, when the codec recognised one
    pub source_format: Option<ImageFormat>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl DecodedImage {
    pub fn new(image: DynamicImage, source_format: Option<ImageFormat>) -> Self {
        let (width, height) = image.dimensions();
        Self {
            color: image.color(),
            image,
            source_format,
            width,
            height,
        }
    }

    pub fn has_alpha(&self) -> bool {
        self.color.has_alpha()
    }
}

/// Format-specific encoder parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeParams {
    /// Quality (1-100), only for formats that support it
    pub quality: Option<u8>,
    /// Compression effort, only for formats that take one
    pub compression_method: Option<u8>,
}

impl EncodeParams {
    /// Derive parameters from the request and the format table.
    pub fn for_request(request: &ConversionRequest) -> Self {
        let spec = request.format().spec();
        Self {
            quality: spec.supports_quality.then_some(request.quality()),
            compression_method: spec.compression_method,
        }
    }
}

/// Opaque image capability consumed by the conversion task.
///
/// Implementations are called from blocking worker threads.
pub trait ImageCodec: Send + Sync {
    /// Open and decode the image at `path`.
    fn open(&self, path: &Path) -> CodecResult<DecodedImage>;

    /// Drop the alpha channel, producing an opaque image.
    fn to_opaque(&self, image: DynamicImage) -> DynamicImage;

    /// Encode `image` as `format` and write it to `path`.
    fn save(
        &self,
        image: &DynamicImage,
        path: &Path,
        format: TargetFormat,
        params: &EncodeParams,
    ) -> CodecResult<()>;
}

/// [`ImageCodec`] backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageRsCodec;

impl ImageCodec for ImageRsCodec {
    fn open(&self, path: &Path) -> CodecResult<DecodedImage> {
        let reader = image::ImageReader::open(path)
            .map_err(|e| CodecError::Open {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
            .with_guessed_format()
            .map_err(|e| CodecError::Open {
                path: path.to_path_buf(),
                message: format!("Cannot detect image format: {}", e),
            })?;
        let source_format = reader.format();
        let image = reader.decode().map_err(|e| CodecError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(DecodedImage::new(image, source_format))
    }

    fn to_opaque(&self, image: DynamicImage) -> DynamicImage {
        match image.color() {
            ColorType::La8 => DynamicImage::ImageLuma8(image.to_luma8()),
            ColorType::La16 => DynamicImage::ImageLuma16(image.to_luma16()),
            ColorType::Rgba16 => DynamicImage::ImageRgb16(image.to_rgb16()),
            c if c.has_alpha() => DynamicImage::ImageRgb8(image.to_rgb8()),
            _ => image,
        }
    }

    fn save(
        &self,
        image: &DynamicImage,
        path: &Path,
        format: TargetFormat,
        params: &EncodeParams,
    ) -> CodecResult<()> {
        let codec_format = format
            .spec()
            .codec_format
            .ok_or_else(|| CodecError::Unsupported {
                path: path.to_path_buf(),
                format: format.to_string(),
            })?;

        let file = File::create(path).map_err(|e| CodecError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut writer = BufWriter::new(file);
        let image = encodable(image, format);
        let encode_err = |e: image::ImageError| CodecError::Encode {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        match format {
            TargetFormat::Jpeg => {
                let quality = params.quality.unwrap_or(DEFAULT_QUALITY);
                JpegEncoder::new_with_quality(&mut writer, quality)
                    .write_image(
                        image.as_bytes(),
                        image.width(),
                        image.height(),
                        image.color().into(),
                    )
                    .map_err(encode_err)?;
            }
            TargetFormat::Ppm => {
                let rgb = image.to_rgb8();
                PnmEncoder::new(&mut writer)
                    .with_subtype(PnmSubtype::Pixmap(SampleEncoding::Binary))
                    .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
                    .map_err(encode_err)?;
            }
            TargetFormat::Webp => {
                let encoded = encode_webp(&image, params).map_err(|message| CodecError::Encode {
                    path: path.to_path_buf(),
                    message,
                })?;
                writer.write_all(&encoded).map_err(|e| CodecError::Write {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            }
            _ => {
                image.write_to(&mut writer, codec_format).map_err(encode_err)?;
            }
        }

        writer.flush().map_err(|e| CodecError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Lossy WebP through libwebp, honouring quality and compression method.
fn encode_webp(image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, String> {
    let mut config = webp::WebPConfig::new()
        .map_err(|_| "Cannot initialise WebP encoder configuration".to_string())?;
    config.lossless = 0;
    config.quality = f32::from(params.quality.unwrap_or(DEFAULT_QUALITY));
    config.method = i32::from(params.compression_method.unwrap_or(WEBP_COMPRESSION_METHOD));

    let encoded = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
            .encode_advanced(&config)
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height()).encode_advanced(&config)
    }
    .map_err(|e| format!("WebP encoding failed: {:?}", e))?;

    Ok(encoded.to_vec())
}

/// Narrow the pixel layout to what the target encoder accepts.
///
/// PNG and TIFF take 16-bit integer data, GIF wants RGB(A)8, and every other
/// encoder here wants 8-bit samples.
fn encodable(image: &DynamicImage, format: TargetFormat) -> Cow<'_, DynamicImage> {
    let color = image.color();
    match format {
        TargetFormat::Png | TargetFormat::Tiff => match color {
            ColorType::Rgb32F => Cow::Owned(DynamicImage::ImageRgb16(image.to_rgb16())),
            ColorType::Rgba32F => Cow::Owned(DynamicImage::ImageRgba16(image.to_rgba16())),
            _ => Cow::Borrowed(image),
        },
        TargetFormat::Gif => match color {
            ColorType::Rgb8 | ColorType::Rgba8 => Cow::Borrowed(image),
            c if c.has_alpha() => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
            _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        },
        _ => match color {
            ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => {
                Cow::Borrowed(image)
            }
            ColorType::L16 => Cow::Owned(DynamicImage::ImageLuma8(image.to_luma8())),
            c if c.has_alpha() => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
            _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        },
    }
}
