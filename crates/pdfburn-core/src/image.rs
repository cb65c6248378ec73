//! Overlay image decoding and embedding
//!
//! Overlays are PNGs. They are normalized to 8 bits per sample, the alpha
//! channel (if any) is split into a soft mask, and both planes are stored as
//! Flate-compressed Image XObjects.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

/// Colour model of decoded samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    Gray,
    Rgb,
}

impl ColorModel {
    fn channels(self) -> usize {
        match self {
            ColorModel::Gray => 1,
            ColorModel::Rgb => 3,
        }
    }

    fn pdf_name(self) -> &'static str {
        match self {
            ColorModel::Gray => "DeviceGray",
            ColorModel::Rgb => "DeviceRGB",
        }
    }
}

/// A decoded overlay ready for embedding
#[derive(Debug, Clone)]
pub struct OverlayImage {
    pub width: u32,
    pub height: u32,
    pub color: ColorModel,
    /// Colour samples, row-major, 8 bits each
    pub samples: Vec<u8>,
    /// One byte per pixel; `None` when the image is fully opaque
    pub alpha: Option<Vec<u8>>,
}

impl OverlayImage {
    /// Decode PNG bytes
    pub fn decode_png(bytes: &[u8]) -> Result<Self, String> {
        let mut decoder = png::Decoder::new(bytes);
        decoder.set_transformations(png::Transformations::normalize_to_color8());
        let mut reader = decoder
            .read_info()
            .map_err(|e| format!("only PNG overlays are supported: {}", e))?;

        let mut buffer = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buffer).map_err(|e| e.to_string())?;
        buffer.truncate(info.buffer_size());

        if info.width == 0 || info.height == 0 {
            return Err("image has zero area".into());
        }

        let (color, has_alpha) = match info.color_type {
            png::ColorType::Grayscale => (ColorModel::Gray, false),
            png::ColorType::Rgb => (ColorModel::Rgb, false),
            png::ColorType::GrayscaleAlpha => (ColorModel::Gray, true),
            png::ColorType::Rgba => (ColorModel::Rgb, true),
            png::ColorType::Indexed => {
                return Err("indexed colour was not expanded".into());
            }
        };

        let (samples, alpha) = if has_alpha {
            let (samples, alpha) = split_alpha(&buffer, color.channels());
            // Fully opaque masks add nothing
            let opaque = alpha.iter().all(|&a| a == u8::MAX);
            (samples, (!opaque).then_some(alpha))
        } else {
            (buffer, None)
        };

        Ok(Self {
            width: info.width,
            height: info.height,
            color,
            samples,
            alpha,
        })
    }

    /// Add the image (and its soft mask) to `doc`, returning the image object id
    pub fn embed(self, doc: &mut Document) -> std::io::Result<ObjectId> {
        let smask_id = match self.alpha {
            Some(alpha) => {
                let mask = image_stream(self.width, self.height, ColorModel::Gray, &alpha)?;
                Some(doc.add_object(mask))
            }
            None => None,
        };

        let mut image = image_stream(self.width, self.height, self.color, &self.samples)?;
        if let Some(id) = smask_id {
            image.dict.set("SMask", Object::Reference(id));
        }
        Ok(doc.add_object(image))
    }
}

/// Separate interleaved colour+alpha samples into two planes
fn split_alpha(interleaved: &[u8], color_channels: usize) -> (Vec<u8>, Vec<u8>) {
    let stride = color_channels + 1;
    let pixels = interleaved.len() / stride;
    let mut samples = Vec::with_capacity(pixels * color_channels);
    let mut alpha = Vec::with_capacity(pixels);

    for pixel in interleaved.chunks_exact(stride) {
        samples.extend_from_slice(&pixel[..color_channels]);
        alpha.push(pixel[color_channels]);
    }
    (samples, alpha)
}

fn image_stream(
    width: u32,
    height: u32,
    color: ColorModel,
    samples: &[u8],
) -> std::io::Result<Stream> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(samples)?;
    let compressed = encoder.finish()?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color.pdf_name(),
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    Ok(Stream::new(dict, compressed).with_compression(false))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use pretty_assertions::assert_eq;
    use std::io::Read;

    /// Encode a solid-colour PNG for tests
    pub(crate) fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            let data: Vec<u8> = (0..width * height).flat_map(|_| rgba).collect();
            writer.write_image_data(&data).unwrap();
        }
        out
    }

    fn gray_png(width: u32, height: u32, level: u8) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(png::ColorType::Grayscale);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer
                .write_image_data(&vec![level; (width * height) as usize])
                .unwrap();
        }
        out
    }

    fn inflate(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        ZlibDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_decode_rgba_with_transparency_keeps_alpha() {
        let image = OverlayImage::decode_png(&solid_png(4, 3, [255, 0, 0, 128])).unwrap();
        assert_eq!(image.width, 4);
        assert_eq!(image.height, 3);
        assert_eq!(image.color, ColorModel::Rgb);
        assert_eq!(image.samples.len(), 4 * 3 * 3);
        assert_eq!(image.alpha, Some(vec![128; 12]));
    }

    #[test]
    fn test_decode_opaque_rgba_drops_alpha() {
        let image = OverlayImage::decode_png(&solid_png(2, 2, [0, 0, 255, 255])).unwrap();
        assert!(image.alpha.is_none());
        assert_eq!(image.samples, vec![0u8, 0, 255].repeat(4));
    }

    #[test]
    fn test_decode_grayscale() {
        let image = OverlayImage::decode_png(&gray_png(3, 1, 77)).unwrap();
        assert_eq!(image.color, ColorModel::Gray);
        assert_eq!(image.samples, vec![77u8; 3]);
        assert!(image.alpha.is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(OverlayImage::decode_png(b"not a png").is_err());
        assert!(OverlayImage::decode_png(&[]).is_err());
    }

    #[test]
    fn test_non_png_raster_names_supported_format() {
        // JPEG start-of-image marker
        let err = OverlayImage::decode_png(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 16]).unwrap_err();
        assert!(err.contains("only PNG overlays are supported"));
    }

    #[test]
    fn test_split_alpha() {
        let (samples, alpha) = split_alpha(&[1, 2, 3, 4, 5, 6, 7, 8], 3);
        assert_eq!(samples, vec![1u8, 2, 3, 5, 6, 7]);
        assert_eq!(alpha, vec![4u8, 8]);
    }

    #[test]
    fn test_embed_adds_image_and_soft_mask() {
        let mut doc = Document::with_version("1.7");
        let image = OverlayImage::decode_png(&solid_png(2, 2, [10, 20, 30, 0])).unwrap();
        let id = image.embed(&mut doc).unwrap();

        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        assert_eq!(stream.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Image");
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 2);
        assert_eq!(
            stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceRGB"
        );
        assert_eq!(inflate(&stream.content), vec![10u8, 20, 30].repeat(4));

        let smask_id = stream.dict.get(b"SMask").unwrap().as_reference().unwrap();
        let smask = doc.get_object(smask_id).unwrap().as_stream().unwrap();
        assert_eq!(
            smask.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceGray"
        );
        assert_eq!(inflate(&smask.content), vec![0u8; 4]);
    }

    #[test]
    fn test_embed_opaque_has_no_soft_mask() {
        let mut doc = Document::with_version("1.7");
        let image = OverlayImage::decode_png(&solid_png(2, 2, [1, 1, 1, 255])).unwrap();
        let id = image.embed(&mut doc).unwrap();
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        assert!(stream.dict.get(b"SMask").is_err());
        assert_eq!(doc.objects.len(), 1);
    }
}
