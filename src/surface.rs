use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{error::ContextError, images::Image};

/// A position `[x, y]` in points, relative to the bottom-left corner of the current bounds.
pub type Point = [f32; 2];

/// An RGB color with components between 0 and 1.
pub type Color = [f32; 3];

pub const BLACK: Color = [0.0, 0.0, 0.0];
pub const WHITE: Color = [1.0, 1.0, 1.0];

/// Parses a color written as six hexadecimal digits, with or without a leading `#`.
/// Anything else is black.
pub fn hex_color(hex: &str) -> Color {
    let hex = hex.trim_start_matches('#');
    let component = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|digits| u8::from_str_radix(digits, 16).ok())
            .map(|value| value as f32 / 255.0)
    };
    match (hex.len(), component(0..2), component(2..4), component(4..6)) {
        (6, Some(red), Some(green), Some(blue)) => [red, green, blue],
        _ => BLACK,
    }
}

/// The box drawing happens in. Coordinates handed to a surface are relative to it:
/// `left` and `bottom` are zero, `right` is the width and `top` is the height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// The absolute abscissa of the left edge on the page.
    pub absolute_left: f32,
    /// The absolute ordinate of the bottom edge on the page.
    pub absolute_bottom: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn left(&self) -> f32 {
        0.0
    }

    pub fn right(&self) -> f32 {
        self.width
    }

    pub fn top(&self) -> f32 {
        self.height
    }

    pub fn bottom(&self) -> f32 {
        0.0
    }

    /// Converts a point relative to these bounds into absolute page coordinates.
    pub fn absolute(&self, [x, y]: Point) -> Point {
        [self.absolute_left + x, self.absolute_bottom + y]
    }
}

/// The files of the two styles of a font family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontFamily {
    pub normal: PathBuf,
    pub bold: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FontStyle {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlignment {
    #[default]
    Top,
    Center,
    Bottom,
}

/// What a text box does with text taller than the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    /// Lines that do not fit are dropped.
    #[default]
    Truncate,
    /// The font size is reduced until the text fits.
    ShrinkToFit,
}

/// How a text box is placed and how its text is set.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBoxOptions {
    /// The top-left corner of the box.
    pub at: Point,
    /// Defaults to the space left between `at` and the right edge of the bounds.
    pub width: Option<f32>,
    /// Defaults to the space left between `at` and the bottom of the bounds.
    pub height: Option<f32>,
    pub size: f32,
    /// Defaults to the current font family of the surface.
    pub font: Option<String>,
    pub style: FontStyle,
    pub color: Color,
    pub align: HorizontalAlignment,
    pub valign: VerticalAlignment,
    pub overflow: Overflow,
    /// Turns the drawn text into a link to this URI.
    pub link: Option<String>,
}

impl Default for TextBoxOptions {
    fn default() -> Self {
        TextBoxOptions {
            at: [0.0, 0.0],
            width: None,
            height: None,
            size: 12.0,
            font: None,
            style: FontStyle::Normal,
            color: BLACK,
            align: HorizontalAlignment::Left,
            valign: VerticalAlignment::Top,
            overflow: Overflow::Truncate,
            link: None,
        }
    }
}

/// How flowing text is set.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOptions {
    pub size: f32,
    pub font: Option<String>,
    pub style: FontStyle,
    pub color: Color,
    pub align: HorizontalAlignment,
}

impl Default for TextOptions {
    fn default() -> Self {
        TextOptions {
            size: 12.0,
            font: None,
            style: FontStyle::Normal,
            color: BLACK,
            align: HorizontalAlignment::Left,
        }
    }
}

/// Where an image goes: its top-left corner and its size. A missing dimension keeps the aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImagePlacement {
    pub at: Point,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

/// The drawing primitives the header, the footer and the document are composed from.
///
/// All coordinates are in points and relative to the current [`Bounds`]; every `at`
/// names the top-left corner of what is drawn.
pub trait DrawingSurface {
    fn bounds(&self) -> Bounds;

    /// The vertical position where flowing content continues, relative to the bounds.
    fn cursor(&self) -> f32;

    fn move_down(&mut self, amount: f32);

    fn line_width(&self) -> f32;

    fn page_count(&self) -> usize;

    /// The index of the page drawing currently happens on.
    fn current_page(&self) -> usize;

    /// Continues drawing on an existing page, with the cursor back at the top of the bounds.
    fn go_to_page(&mut self, page_index: usize) -> Result<(), ContextError>;

    fn start_new_page(&mut self);

    fn image(&mut self, image: &Image, placement: ImagePlacement) -> Result<(), ContextError>;

    /// Strokes a horizontal line with the current line width.
    fn stroke_horizontal_line(
        &mut self,
        left: f32,
        right: f32,
        at: f32,
    ) -> Result<(), ContextError>;

    /// Strokes the outline of the current bounds.
    fn stroke_bounds(&mut self) -> Result<(), ContextError>;

    fn fill_rectangle(
        &mut self,
        top_left: Point,
        width: f32,
        height: f32,
        color: Color,
    ) -> Result<(), ContextError>;

    /// Sets the text inside a box without moving the cursor.
    fn text_box(&mut self, text: &str, options: &TextBoxOptions) -> Result<(), ContextError>;

    /// Sets the text at the cursor across the width of the bounds, moving the cursor below it
    /// and continuing on new pages when the bounds are full.
    fn text(&mut self, text: &str, options: &TextOptions) -> Result<(), ContextError>;

    /// Runs the drawing with the given stroke and fill opacity.
    fn transparent<F>(&mut self, opacity: f32, draw: F) -> Result<(), ContextError>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<(), ContextError>;

    /// Runs the drawing inside new bounds with the given top-left corner and size,
    /// restoring the previous bounds and cursor afterwards.
    fn bounding_box<F>(
        &mut self,
        top_left: Point,
        width: f32,
        height: f32,
        draw: F,
    ) -> Result<(), ContextError>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<(), ContextError>;

    /// Makes a font family available under the given name. The files are only read when used.
    fn register_font_family(&mut self, name: &str, family: FontFamily);

    /// The families looked up, in order, for characters the requested font cannot draw.
    fn set_fallback_fonts(&mut self, names: Vec<String>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_are_parsed_with_or_without_hash() {
        let slate = hex_color("556270");

        assert_eq!(slate, hex_color("#556270"));
        assert!((slate[0] - 85.0 / 255.0).abs() < f32::EPSILON);
        assert!((slate[2] - 112.0 / 255.0).abs() < f32::EPSILON);
        assert_eq!(hex_color("FFFFFF"), WHITE);
        assert_eq!(hex_color("not a color"), BLACK);
    }

    #[test]
    fn bounds_are_relative_to_their_own_corner() {
        let bounds = Bounds {
            absolute_left: 36.0,
            absolute_bottom: 36.0,
            width: 540.0,
            height: 695.0,
        };

        assert_eq!(bounds.right(), 540.0);
        assert_eq!(bounds.top(), 695.0);
        assert_eq!(bounds.absolute([0.0, bounds.top()]), [36.0, 731.0]);
    }
}
