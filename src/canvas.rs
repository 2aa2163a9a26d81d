#![warn(clippy::unwrap_used)]

use lopdf::{content::Operation, Object, StringFormat};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
};
use time::OffsetDateTime;
use unicode_normalization::UnicodeNormalization as _;

use crate::{
    error::{ContextError, ErrorKind},
    images::Image,
    layouting::{wrap_lines, FontSet},
    pdf::PdfDocument,
    surface::{
        Bounds, Color, DrawingSurface, FontFamily, FontStyle, HorizontalAlignment, ImagePlacement,
        Overflow, Point, TextBoxOptions, TextOptions, VerticalAlignment,
    },
};

/// The font family text is set with unless another one is asked for.
pub const DEFAULT_FONT_FAMILY: &str = "Sans Serif";

/// Shrink-to-fit text never gets smaller than this size.
pub const MINIMUM_FONT_SIZE: f32 = 5.0;

const SHRINK_STEP: f32 = 0.5;

/// The paper sizes a canvas knows about, in points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageSize {
    #[default]
    Letter,
    Legal,
    A4,
    Custom { width: f32, height: f32 },
}

impl PageSize {
    /// The portrait `(width, height)` of the paper.
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::A4 => (595.28, 841.89),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageLayout {
    #[default]
    Portrait,
    Landscape,
}

/// Whether viewers may scale the pages to the printer's paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrintScaling {
    #[default]
    AppDefault,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Margins {
            top: 36.0,
            right: 36.0,
            bottom: 36.0,
            left: 36.0,
        }
    }
}

/// How the pages of a canvas are laid out, and what goes in the Info dictionary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageOptions {
    pub page_size: PageSize,
    pub layout: PageLayout,
    pub margins: Margins,
    pub print_scaling: PrintScaling,
    /// Entries of the Info dictionary, e.g. `Author` or `Title`.
    pub info: BTreeMap<String, String>,
    /// Compresses the content streams when rendering.
    pub compress: bool,
}

impl PageOptions {
    /// The `(width, height)` of every page, after applying the layout.
    pub fn page_dimensions(&self) -> (f32, f32) {
        let (width, height) = self.page_size.dimensions();
        match self.layout {
            PageLayout::Portrait => (width, height),
            PageLayout::Landscape => (height, width),
        }
    }

    /// The box inside the margins, where drawing happens by default.
    pub fn margin_box(&self) -> Bounds {
        let (width, height) = self.page_dimensions();
        Bounds {
            absolute_left: self.margins.left,
            absolute_bottom: self.margins.bottom,
            width: width - self.margins.left - self.margins.right,
            height: height - self.margins.top - self.margins.bottom,
        }
    }
}

/// The layers every page is made of, painted in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasLayer {
    Content = 0,
    Decorations = 1,
}

const LAYER_NAMES: [&str; 2] = ["Content", "Decorations"];

/// A drawing surface writing straight into a [`PdfDocument`].
pub struct Canvas {
    pdf_document: PdfDocument,
    options: PageOptions,
    current_page: usize,
    layer: CanvasLayer,
    bounds: Bounds,
    cursor: f32,
    line_width: f32,
    default_font: String,
    font_families: HashMap<String, FontFamily>,
    fallback_fonts: Vec<String>,
    /// Font indices in the PDF document by font file, so that each file is embedded once.
    loaded_fonts: HashMap<PathBuf, usize>,
}

impl Canvas {
    /// Creates a canvas with its first page started.
    pub fn new(options: PageOptions) -> Self {
        let identifier = format!("{:032x}", OffsetDateTime::now_utc().unix_timestamp_nanos());
        let bounds = options.margin_box();
        let mut canvas = Canvas {
            pdf_document: PdfDocument::new(identifier),
            options,
            current_page: 0,
            layer: CanvasLayer::Content,
            bounds,
            cursor: bounds.top(),
            line_width: 1.0,
            default_font: DEFAULT_FONT_FAMILY.to_string(),
            font_families: HashMap::new(),
            fallback_fonts: Vec::new(),
            loaded_fonts: HashMap::new(),
        };
        canvas.start_new_page();

        canvas
    }

    pub fn page_options(&self) -> &PageOptions {
        &self.options
    }

    pub fn pdf_document(&self) -> &PdfDocument {
        &self.pdf_document
    }

    pub fn layer(&self) -> CanvasLayer {
        self.layer
    }

    /// Directs the following drawing to the given layer of the pages.
    pub fn set_layer(&mut self, layer: CanvasLayer) {
        self.layer = layer;
    }

    /// Sets the family text is drawn with when no font is given.
    pub fn set_font(&mut self, family_name: &str) {
        self.default_font = family_name.to_string();
    }

    pub fn set_line_width(&mut self, line_width: f32) {
        self.line_width = line_width;
    }

    /// Puts the cursor at the given height of the current bounds.
    pub fn move_cursor_to(&mut self, cursor: f32) {
        self.cursor = cursor;
    }

    /// Writes the document out and returns the bytes of the PDF file.
    pub fn render(mut self) -> Result<Vec<u8>, ContextError> {
        let disable_print_scaling = self.options.print_scaling == PrintScaling::None;
        self.pdf_document
            .write_all(&self.options.info, disable_print_scaling)?;
        if self.options.compress {
            self.pdf_document.compress();
        }

        self.pdf_document.save_to_bytes()
    }

    fn push_operations(&mut self, operations: Vec<Operation>) -> Result<(), ContextError> {
        self.pdf_document.add_operations_to_layer_in_page(
            self.layer as usize,
            self.current_page,
            operations,
        )
    }

    /// The index in the PDF document of the font of the given family and style, loading it on first use.
    fn font_index(&mut self, family_name: &str, style: FontStyle) -> Result<usize, ContextError> {
        let family = self.font_families.get(family_name).ok_or_else(|| {
            ContextError::with_context(
                ErrorKind::Font,
                format!("Failed to find the font family {:?}", family_name),
            )
        })?;
        let font_path = match style {
            FontStyle::Normal => family.normal.clone(),
            FontStyle::Bold => family.bold.clone(),
        };

        if let Some(font_index) = self.loaded_fonts.get(&font_path) {
            return Ok(*font_index);
        }
        let font_index = self.pdf_document.add_font(&font_path)?;
        self.loaded_fonts.insert(font_path, font_index);

        Ok(font_index)
    }

    fn font_set(
        &mut self,
        family_name: Option<&str>,
        style: FontStyle,
    ) -> Result<FontSet, ContextError> {
        let family_name = family_name.unwrap_or(&self.default_font).to_string();
        let primary_index = self.font_index(&family_name, style)?;
        let primary = (primary_index, self.pdf_document.font(primary_index)?.clone());

        let mut fallbacks = Vec::new();
        for fallback_name in self.fallback_fonts.clone() {
            let fallback_index = self.font_index(&fallback_name, style)?;
            fallbacks.push((fallback_index, self.pdf_document.font(fallback_index)?.clone()));
        }

        Ok(FontSet::new(primary, fallbacks))
    }

    /// The operations drawing one line with its baseline starting at the given absolute point.
    fn line_operations(
        &self,
        font_set: &FontSet,
        line: &str,
        font_size: f32,
        [x, y]: Point,
    ) -> Vec<Operation> {
        let mut operations = vec![Operation::new(
            "Tm",
            vec![1.into(), 0.into(), 0.into(), 1.into(), x.into(), y.into()],
        )];
        for (font_index, run) in font_set.runs(line) {
            let Some(font) = font_set.font(font_index) else {
                continue;
            };
            operations.push(Operation::new(
                "Tf",
                vec![
                    Object::Name(font.face_identifier().as_bytes().to_vec()),
                    font_size.into(),
                ],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(font.encode_text(&run), StringFormat::Hexadecimal)],
            ));
        }

        operations
    }

    /// Sets the lines with their top at `top`, returning the absolute rectangle they cover.
    fn draw_lines(
        &mut self,
        font_set: &FontSet,
        lines: &[String],
        font_size: f32,
        color: Color,
        [left, top]: Point,
        width: f32,
        align: HorizontalAlignment,
    ) -> Result<Option<[f32; 4]>, ContextError> {
        let ascender = font_set.ascender(font_size);
        let descender = font_set.descender(font_size);
        let line_height = font_set.line_height(font_size);
        let [red, green, blue] = color;

        let mut covered: Option<[f32; 4]> = None;
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("rg", vec![red.into(), green.into(), blue.into()]),
        ];
        for (line_index, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let line_width = font_set.width(line, font_size);
            let x = match align {
                HorizontalAlignment::Left => left,
                HorizontalAlignment::Center => left + (width - line_width) / 2.0,
                HorizontalAlignment::Right => left + width - line_width,
            };
            let baseline = top - ascender - line_index as f32 * line_height;
            let [absolute_x, absolute_y] = self.bounds.absolute([x, baseline]);
            operations.extend(self.line_operations(
                font_set,
                line,
                font_size,
                [absolute_x, absolute_y],
            ));

            let line_rect = [
                absolute_x,
                absolute_y + descender,
                absolute_x + line_width,
                absolute_y + ascender,
            ];
            covered = Some(match covered {
                None => line_rect,
                Some([x1, y1, x2, y2]) => [
                    x1.min(line_rect[0]),
                    y1.min(line_rect[1]),
                    x2.max(line_rect[2]),
                    y2.max(line_rect[3]),
                ],
            });
        }
        operations.push(Operation::new("ET", vec![]));

        if covered.is_some() {
            self.push_operations(operations)?;
        }

        Ok(covered)
    }
}

impl DrawingSurface for Canvas {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn cursor(&self) -> f32 {
        self.cursor
    }

    fn move_down(&mut self, amount: f32) {
        self.cursor -= amount;
    }

    fn line_width(&self) -> f32 {
        self.line_width
    }

    fn page_count(&self) -> usize {
        self.pdf_document.page_count()
    }

    fn current_page(&self) -> usize {
        self.current_page
    }

    fn go_to_page(&mut self, page_index: usize) -> Result<(), ContextError> {
        if page_index >= self.page_count() {
            return Err(ContextError::with_context(
                ErrorKind::Geometry,
                format!(
                    "Failed to go to the page with index {}, the document has {} pages",
                    page_index,
                    self.page_count()
                ),
            ));
        }
        self.current_page = page_index;
        self.bounds = self.options.margin_box();
        self.cursor = self.bounds.top();

        Ok(())
    }

    fn start_new_page(&mut self) {
        let (width, height) = self.options.page_dimensions();
        self.current_page = self.pdf_document.add_page(width, height, &LAYER_NAMES);
        self.bounds = self.options.margin_box();
        self.cursor = self.bounds.top();
    }

    fn image(&mut self, image: &Image, placement: ImagePlacement) -> Result<(), ContextError> {
        let (width, height) = image.fitted_size(placement.width, placement.height);
        let [x, top] = placement.at;
        let [absolute_x, absolute_y] = self.bounds.absolute([x, top - height]);
        let image_name = self.pdf_document.use_image(self.current_page, image)?;

        self.push_operations(vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0.into(),
                    0.into(),
                    height.into(),
                    absolute_x.into(),
                    absolute_y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(image_name.into_bytes())]),
            Operation::new("Q", vec![]),
        ])
    }

    fn stroke_horizontal_line(
        &mut self,
        left: f32,
        right: f32,
        at: f32,
    ) -> Result<(), ContextError> {
        let [start_x, y] = self.bounds.absolute([left, at]);
        let [end_x, _] = self.bounds.absolute([right, at]);

        self.push_operations(vec![
            Operation::new("q", vec![]),
            Operation::new("w", vec![self.line_width.into()]),
            Operation::new("m", vec![start_x.into(), y.into()]),
            Operation::new("l", vec![end_x.into(), y.into()]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ])
    }

    fn stroke_bounds(&mut self) -> Result<(), ContextError> {
        let bounds = self.bounds;

        self.push_operations(vec![
            Operation::new("q", vec![]),
            Operation::new("w", vec![self.line_width.into()]),
            Operation::new(
                "re",
                vec![
                    bounds.absolute_left.into(),
                    bounds.absolute_bottom.into(),
                    bounds.width.into(),
                    bounds.height.into(),
                ],
            ),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ])
    }

    fn fill_rectangle(
        &mut self,
        [x, top]: Point,
        width: f32,
        height: f32,
        [red, green, blue]: Color,
    ) -> Result<(), ContextError> {
        let [absolute_x, absolute_y] = self.bounds.absolute([x, top - height]);

        self.push_operations(vec![
            Operation::new("q", vec![]),
            Operation::new("rg", vec![red.into(), green.into(), blue.into()]),
            Operation::new(
                "re",
                vec![absolute_x.into(), absolute_y.into(), width.into(), height.into()],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ])
    }

    fn text_box(&mut self, text: &str, options: &TextBoxOptions) -> Result<(), ContextError> {
        let text: String = text.nfc().collect();
        let font_set = self.font_set(options.font.as_deref(), options.style)?;
        let [left, top] = options.at;
        let width = options.width.unwrap_or(self.bounds.width - left);
        let height = options.height.unwrap_or(top);

        let mut font_size = options.size;
        let mut lines = wrap_lines(&text, width, |line| font_set.width(line, font_size));
        match options.overflow {
            Overflow::ShrinkToFit => {
                while font_size > MINIMUM_FONT_SIZE
                    && lines.len() > font_set.fitting_lines(height, font_size)
                {
                    font_size = (font_size - SHRINK_STEP).max(MINIMUM_FONT_SIZE);
                    lines = wrap_lines(&text, width, |line| font_set.width(line, font_size));
                }
                log::trace!("Text box {:?} set at size {}", text, font_size);
                lines.truncate(font_set.fitting_lines(height, font_size).max(1));
            }
            Overflow::Truncate => lines.truncate(font_set.fitting_lines(height, font_size)),
        }

        let line_height = font_set.line_height(font_size);
        let text_height = lines.len() as f32 * line_height;
        let vertical_offset = match options.valign {
            VerticalAlignment::Top => 0.0,
            VerticalAlignment::Center => (height - text_height) / 2.0,
            VerticalAlignment::Bottom => height - text_height,
        };

        let covered = self.draw_lines(
            &font_set,
            &lines,
            font_size,
            options.color,
            [left, top - vertical_offset],
            width,
            options.align,
        )?;
        if let (Some(rect), Some(uri)) = (covered, &options.link) {
            self.pdf_document.add_link(self.current_page, rect, uri.clone())?;
        }

        Ok(())
    }

    fn text(&mut self, text: &str, options: &TextOptions) -> Result<(), ContextError> {
        let text: String = text.nfc().collect();
        let font_set = self.font_set(options.font.as_deref(), options.style)?;
        let width = self.bounds.width;
        let line_height = font_set.line_height(options.size);

        for line in wrap_lines(&text, width, |line| font_set.width(line, options.size)) {
            if self.cursor - line_height < 0.0 {
                log::debug!("Text overflows page {}, starting a new one", self.current_page + 1);
                self.start_new_page();
            }
            let top = self.cursor;
            self.draw_lines(
                &font_set,
                &[line],
                options.size,
                options.color,
                [0.0, top],
                width,
                options.align,
            )?;
            self.cursor -= line_height;
        }

        Ok(())
    }

    fn transparent<F>(&mut self, opacity: f32, draw: F) -> Result<(), ContextError>
    where
        F: FnOnce(&mut Self) -> Result<(), ContextError>,
    {
        let page_index = self.current_page;
        let graphics_state_name = self.pdf_document.use_opacity(page_index, opacity)?;
        self.push_operations(vec![
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(graphics_state_name.into_bytes())]),
        ])?;

        let result = draw(self);
        self.pdf_document.add_operations_to_layer_in_page(
            self.layer as usize,
            page_index,
            vec![Operation::new("Q", vec![])],
        )?;

        result
    }

    fn bounding_box<F>(
        &mut self,
        [x, top]: Point,
        width: f32,
        height: f32,
        draw: F,
    ) -> Result<(), ContextError>
    where
        F: FnOnce(&mut Self) -> Result<(), ContextError>,
    {
        let (previous_bounds, previous_cursor) = (self.bounds, self.cursor);
        let [absolute_left, absolute_bottom] = self.bounds.absolute([x, top - height]);
        self.bounds = Bounds {
            absolute_left,
            absolute_bottom,
            width,
            height,
        };
        self.cursor = height;

        let result = draw(self);
        self.bounds = previous_bounds;
        self.cursor = previous_cursor;

        result
    }

    fn register_font_family(&mut self, name: &str, family: FontFamily) {
        log::debug!("Registered the font family {:?}", name);
        self.font_families.insert(name.to_string(), family);
    }

    fn set_fallback_fonts(&mut self, names: Vec<String>) {
        self.fallback_fonts = names;
    }
}
