use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{
    canvas::{
        Canvas, CanvasLayer, PageLayout, PageOptions, PageSize, PrintScaling, DEFAULT_FONT_FAMILY,
    },
    config::{configuration, Configuration},
    error::{ContextError, ErrorKind},
    footer::{Footer, FooterSpec},
    header::{Header, HeaderSpec, HEADER_HEIGHT},
    surface::{hex_color, Bounds, DrawingSurface, FontStyle, TextBoxOptions, TextOptions},
    typography::Typography,
};

/// The margin of every side of the page before making room for the header.
pub const DEFAULT_MARGIN: f32 = 36.0;

const TITLE_COLOR: &str = "556270";
const TITLE_SIZE: f32 = 14.0;
const TITLE_HEIGHT: f32 = 15.0;
const SPACE_ABOVE_TITLE: f32 = 10.0;
const SPACE_BELOW_TITLE: f32 = 30.0;

/// Everything a document can be created with.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentOptions {
    pub header: HeaderSpec,
    pub footer: FooterSpec,
    /// Page options passed on to the canvas. The page size, layout, print scaling
    /// and top margin are always replaced by the elegant ones.
    pub page: PageOptions,
}

impl DocumentOptions {
    pub fn from_path(document_options_path: &Path) -> Result<Self, ContextError> {
        let document_options_contents =
            std::fs::read_to_string(document_options_path).map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Configuration,
                    format!("Failed to read the document options {:?}", document_options_path),
                    &error,
                )
            })?;
        let document_options: DocumentOptions = serde_json::from_str(&document_options_contents)
            .map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Configuration,
                    format!("Failed to parse the document options {:?}", document_options_path),
                    &error,
                )
            })?;

        Ok(document_options)
    }
}

/// Applies the elegant layout to the page options: letter paper in portrait, no print
/// scaling, a top margin leaving room for the header, and the metadata of the configuration
/// unless the options already set it.
pub fn with_elegant(options: PageOptions, configuration: &Configuration) -> PageOptions {
    let mut info = configuration.metadata();
    info.extend(options.info);

    let mut margins = options.margins;
    margins.top = DEFAULT_MARGIN + HEADER_HEIGHT / 2.0;

    PageOptions {
        page_size: PageSize::Letter,
        layout: PageLayout::Portrait,
        print_scaling: PrintScaling::None,
        margins,
        info,
        ..options
    }
}

/// A PDF document with the same header and footer on every page.
///
/// Content is drawn through the document as on any canvas; the header and the footer
/// are added to every page exactly once, the last time right before rendering.
///
/// ```no_run
/// use elegant::document::{Document, DocumentOptions};
///
/// let mut document = Document::new(DocumentOptions::default())?;
/// document.title("Quarterly report")?;
/// document.text("Everything went fine.", &Default::default())?;
/// document.render_file(std::path::Path::new("report.pdf"))?;
/// # Ok::<(), elegant::error::ContextError>(())
/// ```
pub struct Document {
    canvas: Canvas,
    header: Header,
    footer: Footer,
    /// Pages before this index already carry the header and the footer.
    decorated_pages: usize,
}

impl Document {
    /// Creates a document with a snapshot of the process-wide configuration.
    pub fn new(options: DocumentOptions) -> Result<Self, ContextError> {
        Self::with_configuration(options, &configuration())
    }

    pub fn with_configuration(
        options: DocumentOptions,
        configuration: &Configuration,
    ) -> Result<Self, ContextError> {
        let header = Header::new(options.header, configuration.watermark.clone());
        let footer = Footer::new(options.footer, configuration.author.clone());

        let mut canvas = Canvas::new(with_elegant(options.page, configuration));
        Typography::new(configuration).install(&mut canvas);

        let mut document = Document {
            canvas,
            header,
            footer,
            decorated_pages: 0,
        };
        document.decorate()?;

        Ok(document)
    }

    /// Creates a document, draws the content into it and decorates every page the content produced.
    pub fn generate<F>(
        options: DocumentOptions,
        configuration: &Configuration,
        content: F,
    ) -> Result<Self, ContextError>
    where
        F: FnOnce(&mut Document) -> Result<(), ContextError>,
    {
        let mut document = Self::with_configuration(options, configuration)?;
        content(&mut document)?;
        document.decorate()?;

        Ok(document)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn footer(&self) -> &Footer {
        &self.footer
    }

    pub fn header_height(&self) -> f32 {
        HEADER_HEIGHT
    }

    /// Writes the text upper-cased in a bold title, with some room above and below it.
    pub fn title(&mut self, text: &str) -> Result<(), ContextError> {
        self.canvas.move_down(SPACE_ABOVE_TITLE);

        let options = TextBoxOptions {
            at: [0.0, self.canvas.cursor()],
            width: Some(self.canvas.bounds().width - self.header.title_padding()),
            height: Some(TITLE_HEIGHT),
            size: TITLE_SIZE,
            font: Some(DEFAULT_FONT_FAMILY.to_string()),
            style: FontStyle::Bold,
            color: hex_color(TITLE_COLOR),
            ..Default::default()
        };
        self.canvas.text_box(&text.to_uppercase(), &options)?;

        self.canvas.move_down(SPACE_BELOW_TITLE);

        Ok(())
    }

    pub fn text(&mut self, text: &str, options: &TextOptions) -> Result<(), ContextError> {
        self.canvas.text(text, options)
    }

    pub fn text_box(&mut self, text: &str, options: &TextBoxOptions) -> Result<(), ContextError> {
        self.canvas.text_box(text, options)
    }

    pub fn move_down(&mut self, amount: f32) {
        self.canvas.move_down(amount);
    }

    pub fn cursor(&self) -> f32 {
        self.canvas.cursor()
    }

    pub fn bounds(&self) -> Bounds {
        self.canvas.bounds()
    }

    pub fn start_new_page(&mut self) {
        self.canvas.start_new_page();
    }

    pub fn page_count(&self) -> usize {
        self.canvas.page_count()
    }

    pub fn line_width(&self) -> f32 {
        self.canvas.line_width()
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// The underlying canvas, for drawing primitives the document does not forward.
    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    /// Decorates the remaining pages and returns the bytes of the PDF file.
    pub fn render(mut self) -> Result<Vec<u8>, ContextError> {
        self.decorate()?;
        self.canvas.render()
    }

    pub fn render_file(self, pdf_file_path: &Path) -> Result<(), ContextError> {
        let pdf_document_bytes = self.render()?;
        std::fs::write(pdf_file_path, pdf_document_bytes).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                format!("Failed to write the PDF document to {:?}", pdf_file_path),
                &error,
            )
        })
    }

    /// Draws the header and the footer on the pages added since the last pass,
    /// then puts the cursor back where the content left it.
    fn decorate(&mut self) -> Result<(), ContextError> {
        let pages = self.decorated_pages..self.canvas.page_count();
        if pages.is_empty() {
            return Ok(());
        }
        log::debug!("Decorating pages {} to {}", pages.start + 1, pages.end);

        let (page_index, cursor, layer) = (
            self.canvas.current_page(),
            self.canvas.cursor(),
            self.canvas.layer(),
        );
        self.canvas.set_layer(CanvasLayer::Decorations);
        let decorated = self
            .header
            .render(&mut self.canvas, pages.clone())
            .and_then(|_| self.footer.render(&mut self.canvas, pages.clone()));
        self.canvas.set_layer(layer);
        decorated?;

        self.canvas.go_to_page(page_index)?;
        self.canvas.move_cursor_to(cursor);
        self.decorated_pages = pages.end;

        Ok(())
    }
}
