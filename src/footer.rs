use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::{
    error::ContextError,
    surface::{DrawingSurface, HorizontalAlignment, TextBoxOptions, VerticalAlignment},
};

const FOOTER_OPACITY: f32 = 0.25;
const FOOTER_TOP: f32 = -6.0;
const SIDE_WIDTH: f32 = 50.0;
const FOOTER_TEXT_HEIGHT: f32 = 10.0;
const FOOTER_TEXT_SIZE: f32 = 7.0;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct FooterSpec {
    /// The text written in the middle of the footer.
    pub text: Option<String>,
    /// Turns the text into a link to this URL.
    pub url: Option<String>,
}

/// The band below the margin box of every page: a faint rule, the author on the left,
/// an optional text in the middle and the page number on the right.
#[derive(Debug, Clone)]
pub struct Footer {
    text: Option<String>,
    url: Option<String>,
    author: String,
}

impl Footer {
    pub fn new(spec: FooterSpec, author: String) -> Self {
        Footer {
            text: spec.text,
            url: spec.url,
            author,
        }
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// The label written on the page with the given 1-based number.
    pub fn page_label(page_number: usize) -> String {
        format!("Page {page_number}")
    }

    pub fn render<S: DrawingSurface>(
        &self,
        surface: &mut S,
        pages: Range<usize>,
    ) -> Result<(), ContextError> {
        for page_index in pages {
            log::debug!("Drawing the footer of page {}", page_index + 1);
            surface.go_to_page(page_index)?;
            let width = surface.bounds().width;

            surface.transparent(FOOTER_OPACITY, |surface| {
                surface.stroke_horizontal_line(0.0, width, 0.0)
            })?;

            let side_options = TextBoxOptions {
                at: [0.0, FOOTER_TOP],
                width: Some(SIDE_WIDTH),
                height: Some(FOOTER_TEXT_HEIGHT),
                size: FOOTER_TEXT_SIZE,
                valign: VerticalAlignment::Top,
                ..Default::default()
            };
            surface.text_box(&self.author, &side_options)?;

            if let Some(text) = &self.text {
                let options = TextBoxOptions {
                    at: [SIDE_WIDTH, FOOTER_TOP],
                    width: Some(width - 2.0 * SIDE_WIDTH),
                    align: HorizontalAlignment::Center,
                    link: self.url.clone(),
                    ..side_options.clone()
                };
                surface.text_box(text, &options)?;
            }

            let options = TextBoxOptions {
                at: [width - SIDE_WIDTH, FOOTER_TOP],
                align: HorizontalAlignment::Right,
                ..side_options
            };
            surface.text_box(&Self::page_label(page_index + 1), &options)?;
        }

        Ok(())
    }
}
