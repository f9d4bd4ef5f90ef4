//! The unit of work: convert one input file into one output file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::error::CodecError;
use crate::types::{ConversionRequest, ConversionResult};

use super::codec::{EncodeParams, ImageCodec};
use super::paths::PathResolver;

/// Set by the pool when it gives up waiting on a task.
///
/// An abandoned task discards its temporary output instead of publishing it.
#[derive(Debug, Clone, Default)]
pub struct AbandonFlag(Arc<AtomicBool>);

impl AbandonFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abandon(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_abandoned(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a conversion needs besides the input path, shared by all tasks.
pub struct ConversionTask {
    codec: Arc<dyn ImageCodec>,
    request: ConversionRequest,
    resolver: PathResolver,
    input_root: PathBuf,
    params: EncodeParams,
}

impl ConversionTask {
    pub fn new(
        codec: Arc<dyn ImageCodec>,
        request: ConversionRequest,
        resolver: PathResolver,
        input_root: impl Into<PathBuf>,
    ) -> Self {
        let params = EncodeParams::for_request(&request);
        Self {
            codec,
            request,
            resolver,
            input_root: input_root.into(),
            params,
        }
    }

    /// Convert one file. Never fails: every error becomes a failed result.
    pub fn convert(&self, input: &Path, abandon: &AbandonFlag) -> ConversionResult {
        let start = Instant::now();
        tracing::debug!("Converting: {:?}", input);

        match self.try_convert(input, abandon) {
            Ok(output) => {
                tracing::debug!("Converted {:?} -> {:?} in {:?}", input, output, start.elapsed());
                ConversionResult::success(input, output)
            }
            Err(message) => {
                tracing::debug!("Conversion of {:?} failed: {}", input, message);
                ConversionResult::failure(input, message)
            }
        }
    }

    fn try_convert(&self, input: &Path, abandon: &AbandonFlag) -> Result<PathBuf, String> {
        let format = self.request.format();

        // Open
        let open_start = Instant::now();
        let decoded = self.codec.open(input).map_err(|e| e.to_string())?;
        tracing::trace!(
            "  Open: {:?} ({}x{} {:?})",
            open_start.elapsed(),
            decoded.width,
            decoded.height,
            decoded.color
        );

        // Flatten alpha for formats that cannot carry it
        let image = if format.requires_opaque() && decoded.has_alpha() {
            tracing::trace!("  Flattening alpha for {}", format);
            self.codec.to_opaque(decoded.image)
        } else {
            decoded.image
        };

        // Resolve
        let output = self
            .resolver
            .resolve(&self.input_root, input)
            .map_err(|e| e.to_string())?;

        // Encode into a temporary sibling, then publish with a rename
        let encode_start = Instant::now();
        let dir = output.parent().unwrap_or_else(|| self.resolver.output_root());
        let temp = tempfile::Builder::new()
            .prefix(".pixshift-")
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(|e| {
                CodecError::Write {
                    path: output.clone(),
                    message: format!("Cannot create temporary file: {}", e),
                }
                .to_string()
            })?
            .into_temp_path();

        self.codec
            .save(&image, &temp, format, &self.params)
            .map_err(|e| e.to_string())?;
        tracing::trace!("  Encode: {:?}", encode_start.elapsed());

        if abandon.is_abandoned() {
            // Dropping the temp path deletes it.
            return Err(format!("Conversion of {:?} was abandoned", input));
        }

        temp.persist(&output).map_err(|e| {
            CodecError::Write {
                path: output.clone(),
                message: e.error.to_string(),
            }
            .to_string()
        })?;

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::TargetFormat;
    use crate::pipeline::codec::ImageRsCodec;
    use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

    fn task(format: TargetFormat, input_root: &Path, output_root: &Path, mirror: bool) -> ConversionTask {
        let request = ConversionRequest::new(format, 80, true, mirror).unwrap();
        let resolver = PathResolver::new(output_root, format, mirror);
        ConversionTask::new(Arc::new(ImageRsCodec), request, resolver, input_root)
    }

    fn leftover_temp_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .count()
    }

    #[test]
    fn test_convert_png_to_webp() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.png");
        DynamicImage::new_rgb8(20, 10).save(&input).unwrap();
        let out = dir.path().join("out");

        let result = task(TargetFormat::Webp, dir.path(), &out, false)
            .convert(&input, &AbandonFlag::new());

        assert!(result.success, "{}", result.error);
        assert!(result.error.is_empty());
        assert_eq!(result.output_path, Some(out.join("a.webp")));
        assert_eq!(image::open(out.join("a.webp")).unwrap().dimensions(), (20, 10));
        assert_eq!(leftover_temp_files(&out), 0);
    }

    #[test]
    fn test_alpha_source_to_jpeg_is_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("logo.png");
        RgbaImage::from_pixel(8, 8, Rgba([200, 100, 50, 60]))
            .save(&input)
            .unwrap();
        let out = dir.path().join("out");

        let result = task(TargetFormat::Jpeg, dir.path(), &out, false)
            .convert(&input, &AbandonFlag::new());

        assert!(result.success, "{}", result.error);
        let reopened = image::open(out.join("logo.jpeg")).unwrap();
        assert!(!reopened.color().has_alpha());
    }

    #[test]
    fn test_corrupt_input_yields_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("c.png");
        std::fs::write(&input, b"\x89PNG garbage").unwrap();
        let out = dir.path().join("out");

        let result = task(TargetFormat::Webp, dir.path(), &out, false)
            .convert(&input, &AbandonFlag::new());

        assert!(!result.success);
        assert!(result.output_path.is_none());
        assert!(!result.error.is_empty());
        assert!(!out.join("c.webp").exists());
    }

    #[test]
    fn test_unsupported_encoder_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.png");
        DynamicImage::new_rgb8(4, 4).save(&input).unwrap();
        let out = dir.path().join("out");

        let result = task(TargetFormat::Heic, dir.path(), &out, false)
            .convert(&input, &AbandonFlag::new());

        assert!(!result.success);
        assert!(result.error.contains("HEIC"));
        assert!(!out.join("a.heic").exists());
        assert_eq!(leftover_temp_files(&out), 0);
    }

    #[test]
    fn test_mirror_outside_root_is_a_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("elsewhere/a.png");
        std::fs::create_dir_all(input.parent().unwrap()).unwrap();
        DynamicImage::new_rgb8(4, 4).save(&input).unwrap();

        let result = task(TargetFormat::Png, &dir.path().join("root"), &dir.path().join("out"), true)
            .convert(&input, &AbandonFlag::new());

        assert!(!result.success);
        assert!(result.error.contains("not inside input root"));
    }

    #[test]
    fn test_abandoned_task_does_not_publish() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.png");
        DynamicImage::new_rgb8(4, 4).save(&input).unwrap();
        let out = dir.path().join("out");
        let abandon = AbandonFlag::new();
        abandon.abandon();

        let result = task(TargetFormat::Bmp, dir.path(), &out, false).convert(&input, &abandon);

        assert!(!result.success);
        assert!(!out.join("a.bmp").exists());
        assert_eq!(leftover_temp_files(&out), 0);
    }

    #[test]
    fn test_lossless_round_trip_keeps_dimensions_and_color() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("src.png");
        RgbaImage::from_pixel(9, 5, Rgba([1, 2, 3, 255]))
            .save(&input)
            .unwrap();

        let tiff_dir = dir.path().join("tiff");
        let first = task(TargetFormat::Tiff, dir.path(), &tiff_dir, false)
            .convert(&input, &AbandonFlag::new());
        assert!(first.success, "{}", first.error);

        let back_dir = dir.path().join("back");
        let second = task(TargetFormat::Png, &tiff_dir, &back_dir, false)
            .convert(first.output_path.as_ref().unwrap(), &AbandonFlag::new());
        assert!(second.success, "{}", second.error);

        let original = image::open(&input).unwrap();
        let round_tripped = image::open(back_dir.join("src.png")).unwrap();
        assert_eq!(original.dimensions(), round_tripped.dimensions());
        assert_eq!(original.color(), round_tripped.color());
    }

    #[test]
    fn test_input_file_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.png");
        DynamicImage::new_rgb8(6, 6).save(&input).unwrap();
        let before = std::fs::read(&input).unwrap();

        let result = task(TargetFormat::Gif, dir.path(), &dir.path().join("out"), false)
            .convert(&input, &AbandonFlag::new());

        assert!(result.success, "{}", result.error);
        assert_eq!(std::fs::read(&input).unwrap(), before);
    }
}
