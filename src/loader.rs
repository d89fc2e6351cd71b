use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::imageops::FilterType;
use image::{ImageResult, RgbaImage};
use tracing::debug;

use crate::catalog::ImageEntry;
use crate::error::Error;
use crate::events::{ExcludableItem, Frame, PreparedImage};

/// Target sizes for decoded images, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSizes {
    /// The displayed image is resized to exactly this size.
    pub display: (u32, u32),
    /// Thumbnails keep their aspect ratio and fit inside this box.
    pub thumbnail: (u32, u32),
}

impl Default for FrameSizes {
    fn default() -> Self {
        Self {
            display: (200, 300),
            thumbnail: (40, 50),
        }
    }
}

// Decodes an image to RGBA8 and applies EXIF orientation if available.
// Missing or unreadable metadata leaves the orientation untouched.
fn decode_rgba8_apply_exif(path: &Path) -> ImageResult<RgbaImage> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()? // sniff based on content/extension
        .decode()?;
    let mut img = img.to_rgba8();

    let orientation: u16 = read_orientation(path).unwrap_or(1);
    match orientation {
        2 => img = image::imageops::flip_horizontal(&img),
        3 => img = image::imageops::rotate180(&img),
        4 => img = image::imageops::flip_vertical(&img),
        5 => {
            img = image::imageops::rotate90(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        6 => img = image::imageops::rotate90(&img),
        7 => {
            img = image::imageops::rotate270(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        8 => img = image::imageops::rotate270(&img),
        _ => {}
    }

    Ok(img)
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let o = u16::try_from(field.value.get_uint(0)?).ok()?;
    debug!("exif orientation {} for {}", o, path.display());
    Some(o)
}

fn into_frame(img: RgbaImage) -> Frame {
    let (width, height) = img.dimensions();
    Frame {
        width,
        height,
        pixels: img.into_raw(),
    }
}

fn load_error(entry: &ImageEntry) -> impl FnOnce(image::ImageError) -> Error + '_ {
    move |source| Error::ImageLoad {
        path: entry.path.clone(),
        source,
    }
}

/// Decode `entry` and resize it to the display size. Blocking.
///
/// # Errors
/// Returns [`Error::ImageLoad`] if the file cannot be read or decoded.
pub fn load_for_display(entry: &ImageEntry, sizes: FrameSizes) -> Result<PreparedImage, Error> {
    let img = decode_rgba8_apply_exif(&entry.path).map_err(load_error(entry))?;
    let (w, h) = sizes.display;
    let resized = image::imageops::resize(&img, w, h, FilterType::Triangle);
    Ok(PreparedImage {
        name: entry.name.clone(),
        path: entry.path.clone(),
        frame: into_frame(resized),
    })
}

/// Decode `entry` into a thumbnail for the excludable list. Blocking.
///
/// # Errors
/// Returns [`Error::ImageLoad`] if the file cannot be read or decoded.
pub fn load_thumbnail(entry: &ImageEntry, sizes: FrameSizes) -> Result<ExcludableItem, Error> {
    let img = decode_rgba8_apply_exif(&entry.path).map_err(load_error(entry))?;
    let (w, h) = sizes.thumbnail;
    let thumb = image::DynamicImage::ImageRgba8(img).thumbnail(w, h).to_rgba8();
    let label = Path::new(&entry.name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&entry.name)
        .to_owned();
    Ok(ExcludableItem {
        name: entry.name.clone(),
        label,
        thumbnail: into_frame(thumb),
    })
}
