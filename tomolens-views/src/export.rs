//! PNG export of slice frames with embedded metadata (tEXt chunks).

use std::io::BufWriter;
use std::path::Path;

use tracing::debug;

use tomolens_core::Axis;

use crate::slice::SliceFrame;

/// Metadata to embed in an exported PNG as tEXt chunks.
pub struct ExportMetadata {
    pub tomogram: String,
    pub instance_id: u32,
    pub axis: Axis,
    pub frame_index: usize,
    pub canonical_shape: [usize; 3],
    pub view_mode: String,
}

/// Write a slice frame as an 8-bit grayscale PNG with embedded metadata.
///
/// Uses the `png` crate directly (rather than an image abstraction) to
/// inject custom tEXt chunks readable by exiftool, IrfanView, XnView, etc.
/// Intensity is min/max normalized over the frame.
pub fn export_slice_png(
    frame: &SliceFrame,
    path: &Path,
    metadata: &ExportMetadata,
) -> Result<(), String> {
    let file = std::fs::File::create(path).map_err(|e| format!("Failed to create file: {e}"))?;
    let writer = BufWriter::new(file);

    let mut encoder = png::Encoder::new(writer, frame.cols as u32, frame.rows as u32);
    encoder.set_color(png::ColorType::Grayscale);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Default);

    encoder
        .add_text_chunk("Software".to_string(), "TomoLens".to_string())
        .map_err(|e| format!("Failed to add text chunk: {e}"))?;

    for (key, value) in build_metadata_pairs(metadata) {
        encoder
            .add_text_chunk(key.clone(), value)
            .map_err(|e| format!("Failed to add text chunk '{key}': {e}"))?;
    }

    let mut png_writer = encoder
        .write_header()
        .map_err(|e| format!("Failed to write PNG header: {e}"))?;

    png_writer
        .write_image_data(&normalize_to_u8(&frame.data))
        .map_err(|e| format!("Failed to write PNG image data: {e}"))?;

    debug!(
        "Exported slice {}x{} to {}",
        frame.cols,
        frame.rows,
        path.display()
    );
    Ok(())
}

/// Map frame intensities onto `0..=255` by min/max normalization.
/// A constant frame maps to all zeros.
fn normalize_to_u8(data: &[f32]) -> Vec<u8> {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in data {
        min = min.min(v);
        max = max.max(v);
    }
    let span = max - min;
    if !(span > 0.0) {
        return vec![0; data.len()];
    }
    data.iter()
        .map(|&v| (((v - min) / span) * 255.0).round() as u8)
        .collect()
}

fn build_metadata_pairs(meta: &ExportMetadata) -> Vec<(String, String)> {
    let [nz, ny, nx] = meta.canonical_shape;
    vec![
        ("TomoLens.Tomogram".into(), meta.tomogram.clone()),
        ("TomoLens.InstanceId".into(), meta.instance_id.to_string()),
        ("TomoLens.Axis".into(), meta.axis.label().to_string()),
        ("TomoLens.FrameIndex".into(), meta.frame_index.to_string()),
        ("TomoLens.CanonicalShape".into(), format!("{nz}x{ny}x{nx}")),
        ("TomoLens.ViewMode".into(), meta.view_mode.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn frame() -> SliceFrame {
        SliceFrame {
            rows: 4,
            cols: 4,
            data: (0..16).map(|i| i as f32).collect(),
        }
    }

    fn meta() -> ExportMetadata {
        ExportMetadata {
            tomogram: "TS_01".into(),
            instance_id: 42,
            axis: Axis::Z,
            frame_index: 7,
            canonical_shape: [64, 64, 64],
            view_mode: "image".into(),
        }
    }

    #[test]
    fn export_creates_valid_png() {
        let dir = std::env::temp_dir().join("tomolens_test_export");
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("test_export.png");
        export_slice_png(&frame(), &path, &meta()).expect("export should succeed");

        let mut file = std::fs::File::open(&path).expect("file should exist");
        let mut header = [0u8; 8];
        file.read_exact(&mut header).expect("should read header");
        assert_eq!(&header, b"\x89PNG\r\n\x1a\n", "valid PNG signature");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn export_embeds_text_chunks() {
        let dir = std::env::temp_dir().join("tomolens_test_export_meta");
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("test_meta.png");
        export_slice_png(&frame(), &path, &meta()).expect("export should succeed");

        let decoder = png::Decoder::new(std::fs::File::open(&path).expect("file should exist"));
        let reader = decoder.read_info().expect("should read info");
        let info = reader.info();
        let texts: Vec<_> = info.uncompressed_latin1_text.iter().collect();
        assert!(
            texts
                .iter()
                .any(|t| t.keyword == "Software" && t.text == "TomoLens"),
            "Should contain Software text chunk"
        );
        assert!(
            texts
                .iter()
                .any(|t| t.keyword == "TomoLens.InstanceId" && t.text == "42"),
            "Should contain instance id chunk"
        );
        assert!(
            texts
                .iter()
                .any(|t| t.keyword == "TomoLens.Axis" && t.text == "z"),
            "Should contain axis chunk"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn normalization_spans_full_range() {
        let bytes = normalize_to_u8(&[1.0, 2.0, 3.0]);
        assert_eq!(bytes, vec![0, 128, 255]);
    }

    #[test]
    fn constant_frame_normalizes_to_zero() {
        assert_eq!(normalize_to_u8(&[5.0; 4]), vec![0; 4]);
    }
}
