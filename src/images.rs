use image::GenericImageView as _;
use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use crate::error::{ContextError, ErrorKind};

static NEXT_IMAGE_IDENTITY: AtomicUsize = AtomicUsize::new(0);

/// The decoded samples of an image, in the form the PDF image XObject expects them.
#[derive(Debug)]
struct ImageXObject {
    /// Unique for every decoded image, never reused.
    identity: usize,
    /// Width of the image in pixels.
    width: u32,
    /// Height of the image in pixels.
    height: u32,
    /// `DeviceRGB` or `DeviceGray`.
    color_space: &'static str,
    /// `DCTDecode` when the original JPEG stream is kept as is.
    filter: Option<&'static str>,
    image_data: Vec<u8>,
    /// One 8-bit alpha sample per pixel, only when the image is not fully opaque.
    soft_mask: Option<Vec<u8>>,
}

/// A raster image ready to be placed on a page.
///
/// Clones share the decoded samples, and the document embeds an image only once
/// no matter how many pages it is drawn onto.
#[derive(Debug, Clone)]
pub struct Image {
    inner: Arc<ImageXObject>,
}

impl Image {
    /// Decodes a PNG or JPEG image from memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContextError> {
        let format = image::guess_format(bytes).map_err(|error| {
            ContextError::with_error(ErrorKind::Image, "Unsupported image type", &error)
        })?;
        let decoded = image::load_from_memory(bytes).map_err(|error| {
            ContextError::with_error(ErrorKind::Image, "Failed to decode the image", &error)
        })?;
        let (width, height) = decoded.dimensions();

        // JPEG data can be embedded untouched, PDF readers decode it natively
        if format == image::ImageFormat::Jpeg {
            let color_space = match decoded.color() {
                image::ColorType::L8 | image::ColorType::La8 => "DeviceGray",
                _ => "DeviceRGB",
            };
            return Ok(Image {
                inner: Arc::new(ImageXObject {
                    identity: NEXT_IMAGE_IDENTITY.fetch_add(1, Ordering::Relaxed),
                    width,
                    height,
                    color_space,
                    filter: Some("DCTDecode"),
                    image_data: bytes.to_vec(),
                    soft_mask: None,
                }),
            });
        }

        let rgba = decoded.to_rgba8();
        let mut image_data = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in rgba.pixels() {
            let [red, green, blue, opacity] = pixel.0;
            image_data.extend_from_slice(&[red, green, blue]);
            alpha.push(opacity);
        }
        let soft_mask = alpha.iter().any(|opacity| *opacity != 255).then_some(alpha);

        Ok(Image {
            inner: Arc::new(ImageXObject {
                identity: NEXT_IMAGE_IDENTITY.fetch_add(1, Ordering::Relaxed),
                width,
                height,
                color_space: "DeviceRGB",
                filter: None,
                image_data,
                soft_mask,
            }),
        })
    }

    /// Reads and decodes the image at the given path.
    pub fn from_path(image_path: &Path) -> Result<Self, ContextError> {
        let bytes = std::fs::read(image_path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Image,
                format!("Failed to read image {:?}", image_path),
                &error,
            )
        })?;

        Self::from_bytes(&bytes)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    pub fn has_transparency(&self) -> bool {
        self.inner.soft_mask.is_some()
    }

    /// The size the image takes on the page. A missing dimension is derived from the other one
    /// keeping the aspect ratio; with neither, one pixel maps to one point.
    pub fn fitted_size(&self, width: Option<f32>, height: Option<f32>) -> (f32, f32) {
        let (pixel_width, pixel_height) = (self.width() as f32, self.height() as f32);
        match (width, height) {
            (Some(width), Some(height)) => (width, height),
            (Some(width), None) => (width, width * pixel_height / pixel_width),
            (None, Some(height)) => (height * pixel_width / pixel_height, height),
            (None, None) => (pixel_width, pixel_height),
        }
    }

    /// Identifies the shared samples, so that the same image is embedded only once.
    pub(crate) fn identity(&self) -> usize {
        self.inner.identity
    }

    /// Inserts the image (and its soft mask, if any) into the document as an image XObject.
    pub(crate) fn insert_into_document(
        &self,
        inner_document: &mut lopdf::Document,
    ) -> lopdf::ObjectId {
        use lopdf::Object::*;
        let image = &self.inner;

        let mut dictionary = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("XObject".into())),
            ("Subtype", Name("Image".into())),
            ("Width", Integer(image.width as i64)),
            ("Height", Integer(image.height as i64)),
            ("ColorSpace", Name(image.color_space.into())),
            ("BitsPerComponent", Integer(8)),
        ]);
        if let Some(filter) = image.filter {
            dictionary.set("Filter", Name(filter.into()));
        }
        if let Some(alpha) = &image.soft_mask {
            let soft_mask = lopdf::Stream::new(
                lopdf::Dictionary::from_iter(vec![
                    ("Type", Name("XObject".into())),
                    ("Subtype", Name("Image".into())),
                    ("Width", Integer(image.width as i64)),
                    ("Height", Integer(image.height as i64)),
                    ("ColorSpace", Name("DeviceGray".into())),
                    ("BitsPerComponent", Integer(8)),
                ]),
                alpha.clone(),
            );
            dictionary.set("SMask", Reference(inner_document.add_object(soft_mask)));
        }

        // Already-encoded JPEG data must not be compressed a second time
        let stream = lopdf::Stream::new(dictionary, image.image_data.clone())
            .with_compression(image.filter.is_none());
        inner_document.add_object(stream)
    }
}
