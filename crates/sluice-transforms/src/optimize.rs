//! Lossless image optimization.

use std::io::Cursor;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use rayon::prelude::*;

use crate::fileset::{extension, FileEntry, FileSet};
use crate::traits::{Transform, TransformContext, TransformError};

/// Re-encodes PNG images with maximum compression.
///
/// The re-encoded bytes are kept only when they are smaller than the
/// original. Other formats pass through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct OptimizeImageTransform;

impl Transform for OptimizeImageTransform {
    fn name(&self) -> &str {
        "optimize-image"
    }

    fn apply(&self, files: FileSet, _ctx: &TransformContext) -> Result<FileSet, TransformError> {
        let entries: Vec<(String, FileEntry)> = files.into_iter().collect();

        let optimized: Vec<Result<(String, FileEntry), TransformError>> = entries
            .into_par_iter()
            .map(|(path, entry)| {
                if extension(&path).as_deref() != Some("png") {
                    return Ok((path, entry));
                }

                let recompressed = recompress_png(&entry.contents)
                    .map_err(|e| TransformError::syntax(self.name(), &path, e))?;

                match recompressed {
                    bytes if bytes.len() < entry.contents.len() => {
                        tracing::debug!(
                            "optimized {} ({} -> {} bytes)",
                            path,
                            entry.contents.len(),
                            bytes.len()
                        );
                        Ok((
                            path,
                            FileEntry {
                                contents: bytes,
                                origin: entry.origin,
                            },
                        ))
                    }
                    _ => Ok((path, entry)),
                }
            })
            .collect();

        optimized.into_iter().collect()
    }
}

fn recompress_png(bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)?;

    let mut out = Cursor::new(Vec::with_capacity(bytes.len()));
    let encoder =
        PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    decoded.write_with_encoder(encoder)?;

    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn sample_png() -> Vec<u8> {
        let img = ImageBuffer::from_fn(64, 64, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                Rgba([255u8, 255, 255, 255])
            } else {
                Rgba([0u8, 0, 0, 255])
            }
        });

        let mut out = Cursor::new(Vec::new());
        let encoder =
            PngEncoder::new_with_quality(&mut out, CompressionType::Fast, FilterType::NoFilter);
        image::DynamicImage::ImageRgba8(img)
            .write_with_encoder(encoder)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn never_grows_images() {
        let original = sample_png();
        let mut files = FileSet::new();
        files.insert("img/checker.png", FileEntry::new(original.clone()));

        let out = OptimizeImageTransform
            .apply(files, &TransformContext::default())
            .unwrap();
        let optimized = &out.get("img/checker.png").unwrap().contents;

        assert!(optimized.len() <= original.len());
        let decoded = image::load_from_memory(optimized).unwrap();
        assert_eq!(decoded.width(), 64);
    }

    #[test]
    fn passes_through_other_formats() {
        let mut files = FileSet::new();
        files.insert("img/logo.svg", FileEntry::new("<svg/>"));

        let out = OptimizeImageTransform
            .apply(files, &TransformContext::default())
            .unwrap();

        assert_eq!(out.get("img/logo.svg").unwrap().text(), Some("<svg/>"));
    }

    #[test]
    fn reports_corrupt_png() {
        let mut files = FileSet::new();
        files.insert("img/bad.png", FileEntry::new("not a png"));

        let err = OptimizeImageTransform
            .apply(files, &TransformContext::default())
            .unwrap_err();

        assert_eq!(err.path(), Some("img/bad.png"));
    }
}
