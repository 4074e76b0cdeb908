// ============================================================================
// IMAGE I/O: PPM text codec, delegated raster codecs, .lfe project files
// ============================================================================
//
// Everything here works on byte streams; opening files is the caller's job.
// ============================================================================

use std::io::{BufWriter, Read, Write};

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::canvas::Image;
use crate::error::{EditError, Result};
use crate::layers::LayerStack;

/// The only max-channel value the PPM reader accepts.
const PPM_MAX_VALUE: u32 = 255;

/// Maximum supported image dimension in pixels (per axis).
/// Prevents memory exhaustion from crafted headers.
const MAX_DIMENSION: usize = 32_768;
/// Maximum number of layers in a project file.
const MAX_LAYERS: usize = 256;

/// Default JPEG quality when the caller has no preference.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Output formats understood by [`read_image`] / [`write_image`], plus the
/// layered project format handled by [`save_project`] / [`load_project`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    Ppm,
    #[default]
    Png,
    Jpeg,
    Bmp,
    Lfe,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Ppm => "ppm",
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Lfe => "lfe",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "ppm" => Some(SaveFormat::Ppm),
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "bmp" => Some(SaveFormat::Bmp),
            "lfe" => Some(SaveFormat::Lfe),
            _ => None,
        }
    }

    /// False only for JPEG, whose round trip is approximate.
    pub fn is_lossless(&self) -> bool {
        !matches!(self, SaveFormat::Jpeg)
    }

    fn image_format(&self) -> Option<ImageFormat> {
        match self {
            SaveFormat::Png => Some(ImageFormat::Png),
            SaveFormat::Jpeg => Some(ImageFormat::Jpeg),
            SaveFormat::Bmp => Some(ImageFormat::Bmp),
            SaveFormat::Ppm | SaveFormat::Lfe => None,
        }
    }
}

// ============================================================================
// PPM (P3) TEXT CODEC
// ============================================================================

/// Parse a plain-text `P3` PPM stream.
///
/// Lines whose first non-blank character is `#` are comments. The max value
/// must be 255. Tokens after the last pixel are ignored.
pub fn read_ppm<R: Read>(mut reader: R) -> Result<Image> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    let text = String::from_utf8(raw).map_err(|_| EditError::Format("PPM data is not text".into()))?;

    let mut tokens = text
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .flat_map(str::split_whitespace);

    match tokens.next() {
        Some("P3") => {}
        Some(other) => {
            return Err(EditError::Format(format!("expected P3 header, found '{}'", other)));
        }
        None => return Err(EditError::Format("empty PPM stream".into())),
    }

    let width: usize = next_number(&mut tokens, "width")?;
    let height: usize = next_number(&mut tokens, "height")?;
    let max_value: u32 = next_number(&mut tokens, "max value")?;
    if max_value != PPM_MAX_VALUE {
        return Err(EditError::Unsupported(format!(
            "PPM max value {} (only {} is supported)",
            max_value, PPM_MAX_VALUE
        )));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(EditError::Format(format!(
            "PPM dimensions {}x{} exceed {}",
            width, height, MAX_DIMENSION
        )));
    }

    let count = width * height;
    // the header may claim more pixels than the stream holds
    let mut values = Vec::with_capacity(count.min(1 << 20));
    for i in 0..count {
        let what = |c: &str| format!("{} channel of pixel {}", c, i);
        let r = next_number(&mut tokens, &what("red"))?;
        let g = next_number(&mut tokens, &what("green"))?;
        let b = next_number(&mut tokens, &what("blue"))?;
        values.push([r, g, b]);
    }

    let image = Image::from_values(width, height, values, false)?;
    log::debug!("decoded {}x{} PPM", width, height);
    Ok(image)
}

fn next_number<'a, T, I>(tokens: &mut I, what: &str) -> Result<T>
where
    T: std::str::FromStr,
    I: Iterator<Item = &'a str>,
{
    let token = tokens
        .next()
        .ok_or_else(|| EditError::Format(format!("missing {}", what)))?;
    token
        .parse()
        .map_err(|_| EditError::Format(format!("invalid {} '{}'", what, token)))
}

/// Write `image` as `P3` text: header, then one `R G B` line per pixel.
pub fn write_ppm<W: Write>(image: &Image, writer: W) -> Result<()> {
    let mut out = BufWriter::new(writer);
    write!(out, "P3\n{} {}\n{}\n", image.width(), image.height(), PPM_MAX_VALUE)?;
    for px in image.pixels() {
        let [r, g, b] = px.channels();
        writeln!(out, "{} {} {}", r, g, b)?;
    }
    out.flush()?;
    Ok(())
}

// ============================================================================
// RASTER FORMATS
// ============================================================================

/// Decode one image in `format` from `reader`.
pub fn read_image<R: Read>(mut reader: R, format: SaveFormat) -> Result<Image> {
    if format == SaveFormat::Ppm {
        return read_ppm(reader);
    }
    let fmt = format.image_format().ok_or_else(|| {
        EditError::Unsupported(format!("{:?} is not a single-image format", format))
    })?;
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    let decoded = image::load_from_memory_with_format(&raw, fmt)?.to_rgb8();
    let image = Image::from_rgb_image(&decoded)?;
    log::debug!("decoded {}x{} {:?}", image.width(), image.height(), format);
    Ok(image)
}

/// Encode `image` in `format`. `quality` (1-100) only affects JPEG.
pub fn write_image<W: Write>(image: &Image, writer: W, format: SaveFormat, quality: u8) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    let (w, h) = (image.width() as u32, image.height() as u32);

    match format {
        SaveFormat::Ppm => return write_ppm(image, writer),
        SaveFormat::Png => {
            let encoder = PngEncoder::new(&mut writer);
            encoder.write_image(&image.to_raw_rgb(), w, h, ColorType::Rgb8)?;
        }
        SaveFormat::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder.encode(&image.to_raw_rgb(), w, h, ColorType::Rgb8)?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder.encode(&image.to_raw_rgb(), w, h, ColorType::Rgb8)?;
        }
        SaveFormat::Lfe => {
            return Err(EditError::Unsupported(
                "layered projects are written with save_project".into(),
            ));
        }
    }

    writer.flush()?;
    log::debug!("encoded {}x{} {:?}", w, h, format);
    Ok(())
}

// ============================================================================
// LFE PROJECT FILE FORMAT
// ============================================================================

/// Magic header for the layered project format.
const LFE_MAGIC_V1: &str = "LFE1";

#[derive(Serialize, Deserialize)]
struct ProjectFile {
    magic: String,
    name_counter: u64,
    current_layer_index: Option<usize>,
    layers: Vec<LayerData>,
}

#[derive(Serialize, Deserialize)]
struct LayerData {
    name: String,
    visible: bool,
    image: Option<ImageData>,
}

/// Tightly packed RGB pixels.
#[derive(Serialize, Deserialize)]
struct ImageData {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

/// Serialize the whole stack: order, names, visibility, images, the current
/// layer and the auto-name counter. Layer ids are not persisted.
pub fn save_project<W: Write>(stack: &LayerStack, writer: W) -> Result<()> {
    let layers = stack
        .layers()
        .map(|layer| LayerData {
            name: layer.name().to_string(),
            visible: layer.is_visible(),
            image: layer.image().map(|img| ImageData {
                width: img.width() as u32,
                height: img.height() as u32,
                pixels: img.to_raw_rgb(),
            }),
        })
        .collect();

    let project = ProjectFile {
        magic: LFE_MAGIC_V1.to_string(),
        name_counter: stack.name_counter(),
        current_layer_index: stack.current_position(),
        layers,
    };

    let mut writer = BufWriter::new(writer);
    bincode::serialize_into(&mut writer, &project)?;
    writer.flush()?;
    log::info!("saved project with {} layers", stack.count());
    Ok(())
}

/// Load a project written by [`save_project`]. The stack is rebuilt through
/// its public API, so a file that violates any stack invariant is rejected.
pub fn load_project<R: Read>(mut reader: R) -> Result<LayerStack> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    let project: ProjectFile = bincode::deserialize(&raw)?;
    if project.magic != LFE_MAGIC_V1 {
        return Err(EditError::Project(format!("unknown magic '{}'", project.magic)));
    }
    if project.layers.len() > MAX_LAYERS {
        return Err(EditError::Project(format!(
            "{} layers exceed the limit of {}",
            project.layers.len(),
            MAX_LAYERS
        )));
    }

    let mut stack = LayerStack::new();
    for layer in &project.layers {
        if layer.name.is_empty() {
            return Err(EditError::Project("layer with empty name".into()));
        }
        stack.add_layer(&layer.name)?;
        if let Some(data) = &layer.image {
            let (w, h) = (data.width as usize, data.height as usize);
            if w > MAX_DIMENSION || h > MAX_DIMENSION {
                return Err(EditError::Project(format!(
                    "layer '{}' is {}x{}, larger than {}",
                    layer.name, w, h, MAX_DIMENSION
                )));
            }
            stack.set_layer_image(&layer.name, Image::from_raw_rgb(w, h, &data.pixels)?)?;
        }
        stack.show_layer(&layer.name, layer.visible)?;
    }

    match project.current_layer_index {
        Some(i) => {
            let name = stack.layer_name_at(i)?.to_string();
            stack.set_current_layer(&name)?;
        }
        None => stack.clear_current(),
    }
    stack.set_name_counter(project.name_counter);

    log::info!("loaded project with {} layers", stack.count());
    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Pixel;
    use crate::error::ErrorKind;

    #[test]
    fn ppm_writer_layout() {
        let grid = vec![vec![[1, 2, 3], [4, 5, 6]]];
        let img = Image::from_grid(&grid, false).unwrap();
        let mut out = Vec::new();
        write_ppm(&img, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "P3\n2 1\n255\n1 2 3\n4 5 6\n");
    }

    #[test]
    fn ppm_comments_and_free_whitespace() {
        let src = "# made by hand\nP3\n# size\n2 2\n255\n255 0 0   0 255 0\n  # mid-data comment\n0 0 255\n9 9 9 trailing\n";
        let img = read_ppm(src.as_bytes()).unwrap();
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.pixel_at(0, 1).unwrap(), Pixel::from_rgb(0, 255, 0));
        assert_eq!(img.pixel_at(1, 1).unwrap(), Pixel::from_rgb(9, 9, 9));
    }

    #[test]
    fn ppm_rejects_bad_headers() {
        assert!(matches!(read_ppm("P6\n1 1\n255\n0 0 0".as_bytes()), Err(EditError::Format(_))));
        assert!(matches!(read_ppm("".as_bytes()), Err(EditError::Format(_))));
        assert!(matches!(read_ppm("P3\n1 1\n65535\n0 0 0".as_bytes()), Err(EditError::Unsupported(_))));
        assert!(matches!(read_ppm("P3\nx 1\n255\n0 0 0".as_bytes()), Err(EditError::Format(_))));
    }

    #[test]
    fn ppm_rejects_missing_or_bad_pixels() {
        let err = read_ppm("P3\n2 1\n255\n0 0 0 1 1".as_bytes()).unwrap_err();
        assert!(matches!(err, EditError::Format(_)));
        assert!(read_ppm("P3\n1 1\n255\n0 zz 0".as_bytes()).is_err());
        let err = read_ppm("P3\n1 1\n255\n0 300 0".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(read_ppm("P3\n0 1\n255\n".as_bytes()).is_err());
    }

    #[test]
    fn extension_mapping() {
        assert_eq!(SaveFormat::from_extension("JPEG"), Some(SaveFormat::Jpeg));
        assert_eq!(SaveFormat::from_extension("ppm"), Some(SaveFormat::Ppm));
        assert_eq!(SaveFormat::from_extension("gif"), None);
        assert_eq!(SaveFormat::Jpeg.extension(), "jpg");
        assert!(!SaveFormat::Jpeg.is_lossless());
    }

    #[test]
    fn project_format_not_a_single_image() {
        let img = Image::filled(1, 1, Pixel::BLACK).unwrap();
        let mut out = Vec::new();
        assert!(write_image(&img, &mut out, SaveFormat::Lfe, 90).is_err());
        assert!(read_image(&b""[..], SaveFormat::Lfe).is_err());
    }

    #[test]
    fn project_with_bad_magic_rejected() {
        let bogus = ProjectFile {
            magic: "NOPE".into(),
            name_counter: 0,
            current_layer_index: None,
            layers: Vec::new(),
        };
        let bytes = bincode::serialize(&bogus).unwrap();
        assert!(matches!(load_project(&bytes[..]), Err(EditError::Project(_))));
        assert!(load_project(&b"garbage"[..]).is_err());
    }

    #[test]
    fn project_with_oversized_length_prefix_rejected() {
        // magic string claiming a 1 TiB length
        let raw = [0, 0, 0, 0, 0, 1, 0, 0, b'L', b'F', b'E', b'1'];
        assert!(matches!(load_project(&raw[..]), Err(EditError::Project(_))));

        let mut stack = LayerStack::new();
        stack.add_layer("a").unwrap();
        stack.set_layer_image("a", Image::filled(2, 2, Pixel::WHITE).unwrap()).unwrap();
        let mut bytes = Vec::new();
        save_project(&stack, &mut bytes).unwrap();
        // pixel buffer length
        let len_at = bytes.len() - 12 - 8;
        bytes[len_at..len_at + 8].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(load_project(&bytes[..]), Err(EditError::Project(_))));
    }

    #[test]
    fn png_encoding_round_trips() {
        let img = Image::from_grid(&[vec![[1, 2, 3], [250, 128, 0]]], false).unwrap();
        let mut out = Vec::new();
        write_image(&img, &mut out, SaveFormat::Png, DEFAULT_JPEG_QUALITY).unwrap();
        assert!(out.starts_with(b"\x89PNG"));
        assert_eq!(read_image(&out[..], SaveFormat::Png).unwrap(), img);
    }
}
