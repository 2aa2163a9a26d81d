use serde::{Deserialize, Serialize};
use std::{cell::OnceCell, io::Read as _, ops::Range, path::PathBuf};

use crate::{
    canvas::DEFAULT_FONT_FAMILY,
    error::{ContextError, ErrorKind},
    images::Image,
    surface::{
        DrawingSurface, FontStyle, HorizontalAlignment, ImagePlacement, Overflow, TextBoxOptions,
        VerticalAlignment, WHITE,
    },
};

/// The height of the band above the margin box that holds the header.
pub const HEADER_HEIGHT: f32 = 50.0;

const DEFAULT_LOGO_SIZE: f32 = 50.0;
const HEADING_OPACITY: f32 = 0.25;
const HEADING_LEFT: f32 = 25.0;
const HEADING_MARGIN: f32 = 5.0;
const HEADING_SIZE: f32 = 17.0;
const TITLE_MARGIN: f32 = 7.0;

fn default_logo_size() -> f32 {
    DEFAULT_LOGO_SIZE
}

/// What goes in the header besides the watermark and the rule.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct HeaderSpec {
    /// The heading written on the right side.
    pub text: Option<String>,
    /// The framed image drawn in the top-right corner.
    pub logo: Option<LogoSpec>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogoSpec {
    /// An `http(s)` URL or a local path.
    pub url: String,
    #[serde(default = "default_logo_size")]
    pub width: f32,
    #[serde(default = "default_logo_size")]
    pub height: f32,
}

/// The outcome of loading a logo. A logo that cannot be loaded leaves its frame empty
/// instead of failing the document.
#[derive(Debug, Clone)]
pub enum FetchLogoResult {
    Fetched(Image),
    Failed(String),
}

/// Loads the logo from an `http(s)` URL, or from the file system for anything else.
pub fn fetch_logo(location: &str) -> FetchLogoResult {
    let bytes = if location.starts_with("http://") || location.starts_with("https://") {
        download(location)
    } else {
        std::fs::read(location).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                format!("Failed to read the logo {:?}", location),
                &error,
            )
        })
    };

    match bytes.and_then(|bytes| Image::from_bytes(&bytes)) {
        Ok(image) => FetchLogoResult::Fetched(image),
        Err(error) => {
            log::warn!("Leaving the logo frame empty: {}", error);
            FetchLogoResult::Failed(error.to_string())
        }
    }
}

fn download(url: &str) -> Result<Vec<u8>, ContextError> {
    let response = ureq::get(url).call().map_err(|error| {
        ContextError::with_error(ErrorKind::Fetch, format!("Failed to fetch {url}"), &error)
    })?;

    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|error| {
            ContextError::with_error(
                ErrorKind::Fetch,
                format!("Failed to read the response of {url}"),
                &error,
            )
        })?;

    Ok(bytes)
}

/// The images of the header, loaded on the first page drawn and reused for every later page.
#[derive(Debug, Clone)]
struct HeaderImages {
    watermark: Image,
    logo: Option<FetchLogoResult>,
}

/// The band at the top of every page: a watermark on the left, an optional heading
/// and an optional framed logo on the right, and a rule separating it from the content.
///
/// The header is drawn above the margin box, in the room left by the top margin.
#[derive(Debug, Clone)]
pub struct Header {
    text: Option<String>,
    logo_url: Option<String>,
    logo_width: Option<f32>,
    logo_height: Option<f32>,
    watermark: PathBuf,
    images: OnceCell<HeaderImages>,
}

impl Header {
    pub fn new(spec: HeaderSpec, watermark: PathBuf) -> Self {
        let (logo_url, logo_width, logo_height) = match spec.logo {
            Some(logo) => (Some(logo.url), Some(logo.width), Some(logo.height)),
            None => (None, None, None),
        };

        Header {
            text: spec.text,
            logo_url,
            logo_width,
            logo_height,
            watermark,
            images: OnceCell::new(),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn images(&self) -> Result<&HeaderImages, ContextError> {
        if let Some(images) = self.images.get() {
            return Ok(images);
        }
        let watermark = Image::from_path(&self.watermark)?;
        let logo = self
            .logo_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(fetch_logo);

        Ok(self.images.get_or_init(|| HeaderImages { watermark, logo }))
    }

    pub fn logo_width(&self) -> Option<f32> {
        self.logo_width
    }

    pub fn logo_height(&self) -> Option<f32> {
        self.logo_height
    }

    /// The room titles leave on their right so that they do not run under the logo.
    pub fn title_padding(&self) -> f32 {
        self.logo_width
            .map(|logo_width| logo_width + TITLE_MARGIN)
            .unwrap_or(0.0)
    }

    /// Draws the header on each of the given pages. The watermark and the logo are loaded
    /// once for the lifetime of the header.
    pub fn render<S: DrawingSurface>(
        &self,
        surface: &mut S,
        pages: Range<usize>,
    ) -> Result<(), ContextError> {
        if pages.is_empty() {
            return Ok(());
        }
        let images = self.images()?;

        for page_index in pages {
            log::debug!("Drawing the header of page {}", page_index + 1);
            surface.go_to_page(page_index)?;
            self.render_watermark(surface, &images.watermark)?;
            let bounds = surface.bounds();
            surface.stroke_horizontal_line(bounds.left(), bounds.right(), bounds.top())?;
            self.render_logo(surface, images.logo.as_ref())?;
            self.render_heading(surface)?;
        }

        Ok(())
    }

    fn render_watermark<S: DrawingSurface>(
        &self,
        surface: &mut S,
        watermark: &Image,
    ) -> Result<(), ContextError> {
        let top = surface.bounds().top() + (HEADER_HEIGHT * 0.375).floor();
        surface.image(
            watermark,
            ImagePlacement {
                at: [0.0, top],
                width: None,
                height: Some((HEADER_HEIGHT * 0.25).ceil()),
            },
        )
    }

    fn render_logo<S: DrawingSurface>(
        &self,
        surface: &mut S,
        logo: Option<&FetchLogoResult>,
    ) -> Result<(), ContextError> {
        let (Some(logo_width), Some(logo_height)) = (self.logo_width, self.logo_height) else {
            return Ok(());
        };
        let bounds = surface.bounds();
        let line_width = surface.line_width();

        let frame_width = logo_width + line_width;
        let frame_height = logo_height + line_width;
        let frame_left = bounds.right() - frame_width - 0.5 * line_width;
        let frame_top = bounds.top() + 0.5 * frame_height;
        surface.bounding_box([frame_left, frame_top], frame_width, frame_height, |surface| {
            surface.fill_rectangle([0.0, frame_height], frame_width, frame_height, WHITE)?;
            surface.stroke_bounds()
        })?;

        if let Some(FetchLogoResult::Fetched(image)) = logo {
            surface.image(
                image,
                ImagePlacement {
                    at: [
                        bounds.right() - logo_width - line_width,
                        bounds.top() + logo_height / 2.0,
                    ],
                    width: Some(logo_width),
                    height: Some(logo_height),
                },
            )?;
        }

        Ok(())
    }

    fn render_heading<S: DrawingSurface>(&self, surface: &mut S) -> Result<(), ContextError> {
        let Some(text) = &self.text else {
            return Ok(());
        };
        let bounds = surface.bounds();
        let reserved = self.logo_width.unwrap_or(0.0) + 2.0 * surface.line_width() + HEADING_MARGIN;
        let height = HEADER_HEIGHT / 2.0;
        let options = TextBoxOptions {
            at: [HEADING_LEFT, bounds.top() + height],
            width: Some(bounds.width - reserved - HEADING_LEFT),
            height: Some(height),
            size: HEADING_SIZE,
            font: Some(DEFAULT_FONT_FAMILY.to_string()),
            style: FontStyle::Bold,
            align: HorizontalAlignment::Right,
            valign: VerticalAlignment::Center,
            overflow: Overflow::ShrinkToFit,
            ..Default::default()
        };

        surface.transparent(HEADING_OPACITY, |surface| surface.text_box(text, &options))
    }
}
