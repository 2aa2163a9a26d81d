use lopdf::content::Operation;
use std::{
    collections::{BTreeMap, HashMap},
    io::BufWriter,
    mem,
    path::Path,
};
use time::OffsetDateTime;

use crate::{
    error::{ContextError, ErrorKind},
    fonts::Font,
    images::Image,
};

/// One named stream of drawing operations. The layers of a page are painted in order,
/// each inside its own saved graphics state so that none can leak colors or opacity into the next.
#[derive(Debug, Clone)]
pub struct PdfLayer {
    pub(crate) name: String,
    pub(crate) operations: Vec<Operation>,
}

impl PdfLayer {
    fn new<S: Into<String>>(name: S) -> Self {
        PdfLayer {
            name: name.into(),
            operations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Encodes the layer operations wrapped in `q`/`Q`.
    fn encode(&self) -> Result<Vec<u8>, ContextError> {
        let mut operations = Vec::with_capacity(self.operations.len() + 2);
        operations.push(Operation::new("q", vec![]));
        operations.extend(self.operations.iter().cloned());
        operations.push(Operation::new("Q", vec![]));

        lopdf::content::Content { operations }.encode().map_err(|error| {
            ContextError::with_error(
                ErrorKind::Pdf,
                format!("Failed to encode the content of the layer {:?}", self.name),
                &error,
            )
        })
    }
}

/// A clickable rectangle opening an URI, in absolute page coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkAnnotation {
    /// `[x1, y1, x2, y2]`.
    pub rect: [f32; 4],
    pub uri: String,
}

/// The named resources a page draws with, besides fonts which are shared by every page.
#[derive(Default, Debug, Clone)]
pub(crate) struct PdfResources {
    /// Image XObjects by resource name.
    xobjects: BTreeMap<String, lopdf::ObjectId>,
    /// Graphics state parameter dictionaries by resource name.
    graphics_states: BTreeMap<String, lopdf::ObjectId>,
}

impl PdfResources {
    fn into_dictionary(self, fonts_dictionary_id: lopdf::ObjectId) -> lopdf::Dictionary {
        let mut dictionary = lopdf::Dictionary::new();
        dictionary.set("Font", lopdf::Object::Reference(fonts_dictionary_id));

        let to_dictionary = |resources: BTreeMap<String, lopdf::ObjectId>| {
            resources
                .into_iter()
                .map(|(name, object_id)| (name, lopdf::Object::Reference(object_id)))
                .collect::<lopdf::Dictionary>()
        };
        if !self.xobjects.is_empty() {
            dictionary.set("XObject", to_dictionary(self.xobjects));
        }
        if !self.graphics_states.is_empty() {
            dictionary.set("ExtGState", to_dictionary(self.graphics_states));
        }

        dictionary
    }
}

/// A page of the PDF document. Sizes are in points.
#[derive(Debug, Clone)]
pub struct PdfPage {
    pub width: f32,
    pub height: f32,
    pub layers: Vec<PdfLayer>,
    pub(crate) resources: PdfResources,
    pub(crate) annotations: Vec<LinkAnnotation>,
}

impl PdfPage {
    pub fn annotations(&self) -> &[LinkAnnotation] {
        &self.annotations
    }
}

/// The PDF document on a high level: an interface to the underlying `lopdf::Document`
/// keeping track of pages, fonts, images and graphics states until everything is written out.
pub struct PdfDocument {
    /// Fonts by resource name, together with the object ID reserved for them.
    fonts: BTreeMap<String, (lopdf::ObjectId, Font)>,
    /// Embedded images by identity, with their resource name and object ID.
    images: HashMap<usize, (String, lopdf::ObjectId)>,
    /// Opacity graphics states by opacity in thousandths, with their resource name and object ID.
    opacities: BTreeMap<u16, (String, lopdf::ObjectId)>,
    /// The underlying PDF document, exposed as an escape hatch to `lopdf`.
    pub inner_document: lopdf::Document,
    /// The identifier of the document, used for the trailer `ID`.
    pub identifier: String,
    pub(crate) pages: Vec<PdfPage>,
}

impl PdfDocument {
    /// Creates an empty PDF 1.5 document with the given identifier.
    pub fn new(pdf_document_identifier: String) -> Self {
        PdfDocument {
            fonts: BTreeMap::default(),
            images: HashMap::new(),
            opacities: BTreeMap::new(),
            inner_document: lopdf::Document::with_version("1.5"),
            identifier: pdf_document_identifier,
            pages: Vec::new(),
        }
    }

    /// Appends a page of the given size in points with the given layers, returning its index.
    pub fn add_page(&mut self, page_width: f32, page_height: f32, layer_names: &[&str]) -> usize {
        let pdf_page = PdfPage {
            width: page_width,
            height: page_height,
            layers: layer_names.iter().map(|name| PdfLayer::new(*name)).collect(),
            resources: PdfResources::default(),
            annotations: Vec::new(),
        };
        self.pages.push(pdf_page);
        log::debug!(
            "Added page {} of {}x{} points",
            self.pages.len(),
            page_width,
            page_height
        );

        self.pages.len() - 1
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[PdfPage] {
        &self.pages
    }

    pub fn page(&self, page_index: usize) -> Result<&PdfPage, ContextError> {
        self.pages.get(page_index).ok_or_else(|| {
            ContextError::with_context(
                ErrorKind::Geometry,
                format!("Failed to find the page with index {}", page_index),
            )
        })
    }

    /// Loads the TTF/OTF font at the given path, returning the index to write text with.
    pub fn add_font(&mut self, font_path: &Path) -> Result<usize, ContextError> {
        let font = Font::from_path(font_path, format!("F{}", self.fonts.len()))?;
        let font_object_id = self.inner_document.new_object_id();
        self.fonts
            .insert(font.face_identifier().to_string(), (font_object_id, font));

        Ok(self.fonts.len() - 1)
    }

    /// Retrieves the font at the given font index.
    pub fn font(&self, font_index: usize) -> Result<&Font, ContextError> {
        self.fonts
            .get(&format!("F{font_index}"))
            .map(|(_, font)| font)
            .ok_or_else(|| {
                ContextError::with_context(
                    ErrorKind::Font,
                    format!("Failed to find font {} into the fonts map", font_index),
                )
            })
    }

    /// Makes the image available to the page, embedding it in the document the first time it is used.
    /// Returns the resource name to paint it with.
    pub fn use_image(&mut self, page_index: usize, image: &Image) -> Result<String, ContextError> {
        let next_name = format!("Im{}", self.images.len());
        let (name, object_id) = match self.images.get(&image.identity()) {
            Some(embedded) => embedded.clone(),
            None => {
                let object_id = image.insert_into_document(&mut self.inner_document);
                self.images
                    .insert(image.identity(), (next_name.clone(), object_id));
                (next_name, object_id)
            }
        };
        self.get_mut_page(page_index)?
            .resources
            .xobjects
            .insert(name.clone(), object_id);

        Ok(name)
    }

    /// Makes a graphics state with the given stroke and fill opacity available to the page.
    /// Returns the resource name to set it with.
    pub fn use_opacity(&mut self, page_index: usize, opacity: f32) -> Result<String, ContextError> {
        use lopdf::Object::*;
        let key = (opacity.clamp(0.0, 1.0) * 1000.0).round() as u16;
        let next_name = format!("GS{}", self.opacities.len());
        let (name, object_id) = match self.opacities.get(&key) {
            Some(graphics_state) => graphics_state.clone(),
            None => {
                let value = key as f32 / 1000.0;
                let graphics_state = lopdf::Dictionary::from_iter(vec![
                    ("Type", Name("ExtGState".into())),
                    ("CA", Real(value)),
                    ("ca", Real(value)),
                ]);
                let object_id = self.inner_document.add_object(graphics_state);
                self.opacities.insert(key, (next_name.clone(), object_id));
                (next_name, object_id)
            }
        };
        self.get_mut_page(page_index)?
            .resources
            .graphics_states
            .insert(name.clone(), object_id);

        Ok(name)
    }

    /// Adds a link to the given URI over a rectangle of the page, in absolute coordinates.
    pub fn add_link(
        &mut self,
        page_index: usize,
        rect: [f32; 4],
        uri: String,
    ) -> Result<(), ContextError> {
        self.get_mut_page(page_index)?
            .annotations
            .push(LinkAnnotation { rect, uri });

        Ok(())
    }

    /// Appends the operations to the given layer of the given page.
    pub fn add_operations_to_layer_in_page(
        &mut self,
        layer_index: usize,
        page_index: usize,
        operations: Vec<Operation>,
    ) -> Result<(), ContextError> {
        self.get_mut_layer_in_page(layer_index, page_index)?
            .operations
            .extend(operations);

        Ok(())
    }

    /// Writes the catalog, the pages, the fonts and the Info dictionary into the underlying document.
    ///
    /// # Arguments
    ///
    /// * `info` - The entries of the Info dictionary (`Author`, `Creator`, `Producer`, `Title`...).
    /// * `disable_print_scaling` - Asks viewers to print the pages at their actual size.
    pub fn write_all(
        &mut self,
        info: &BTreeMap<String, String>,
        disable_print_scaling: bool,
    ) -> Result<(), ContextError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::*;

        let now = to_pdf_timestamp_format(&OffsetDateTime::now_utc());
        let mut document_info = lopdf::Dictionary::from_iter(vec![
            ("CreationDate", String(now.clone().into_bytes(), Literal)),
            ("ModDate", String(now.into_bytes(), Literal)),
        ]);
        for (key, value) in info {
            document_info.set(key.as_str(), String(value.clone().into_bytes(), Literal));
        }
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        let pages_id = self.inner_document.new_object_id();
        let mut catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", "Catalog".into()),
            ("PageLayout", "OneColumn".into()),
            ("PageMode", "UseNone".into()),
            ("Pages", Reference(pages_id)),
        ]);
        if disable_print_scaling {
            catalog.set(
                "ViewerPreferences",
                Dictionary(lopdf::Dictionary::from_iter(vec![(
                    "PrintScaling",
                    Name("None".into()),
                )])),
            );
        }
        let catalog_id = self.inner_document.add_object(catalog);

        self.inner_document.trailer.set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), Literal),
                String(self.identifier.clone().into_bytes(), Literal),
            ]),
        );

        let fonts_dictionary = self.insert_fonts_into_document();
        let fonts_dictionary_id = self.inner_document.add_object(fonts_dictionary);

        let mut page_ids = Vec::<lopdf::Object>::new();
        for page in mem::take(&mut self.pages) {
            let media_box: lopdf::Object =
                vec![0.into(), 0.into(), page.width.into(), page.height.into()].into();

            let mut contents = Vec::<u8>::new();
            for layer in &page.layers {
                contents.extend(layer.encode()?);
            }
            let contents_id = self
                .inner_document
                .add_object(lopdf::Stream::new(lopdf::Dictionary::new(), contents));

            let annotation_ids: Vec<lopdf::Object> = page
                .annotations
                .iter()
                .map(|annotation| Reference(self.insert_link_annotation(annotation)))
                .collect();

            let resources_id = self
                .inner_document
                .add_object(Dictionary(page.resources.into_dictionary(fonts_dictionary_id)));

            let page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", "Page".into()),
                ("Rotate", Integer(0)),
                ("MediaBox", media_box.clone()),
                ("TrimBox", media_box.clone()),
                ("CropBox", media_box),
                ("Annots", Array(annotation_ids)),
                ("Parent", Reference(pages_id)),
                ("Resources", Reference(resources_id)),
                ("Contents", Reference(contents_id)),
            ]);
            page_ids.push(Reference(self.inner_document.add_object(page_dictionary)));
        }

        let pages = lopdf::Dictionary::from_iter(vec![
            ("Type", "Pages".into()),
            ("Count", Integer(page_ids.len() as i64)),
            ("Kids", Array(page_ids)),
        ]);
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));

        Ok(())
    }

    /// Compresses every stream that allows it.
    pub fn compress(&mut self) {
        self.inner_document.compress();
    }

    /// Saves the `PdfDocument` to bytes in order for it to be written to a file or further processed.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Pdf,
                "Error while saving the PDF document to bytes",
                &error,
            )
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    fn insert_link_annotation(&mut self, annotation: &LinkAnnotation) -> lopdf::ObjectId {
        use lopdf::Object::*;
        let [x1, y1, x2, y2] = annotation.rect;
        let link = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Annot".into())),
            ("Subtype", Name("Link".into())),
            ("Rect", Array(vec![x1.into(), y1.into(), x2.into(), y2.into()])),
            ("Border", Array(vec![0.into(), 0.into(), 0.into()])),
            (
                "A",
                Dictionary(lopdf::Dictionary::from_iter(vec![
                    ("S", Name("URI".into())),
                    (
                        "URI",
                        String(annotation.uri.clone().into_bytes(), lopdf::StringFormat::Literal),
                    ),
                ])),
            ),
        ]);

        self.inner_document.add_object(link)
    }

    /// Inserts every font into the document, returning the dictionary that maps resource names to them.
    fn insert_fonts_into_document(&mut self) -> lopdf::Dictionary {
        let mut font_dictionary = lopdf::Dictionary::new();

        for (font_id, (object_id, font)) in self.fonts.iter() {
            let collected_font_dictionary = font.insert_into_document(&mut self.inner_document);
            self.inner_document
                .objects
                .insert(*object_id, lopdf::Object::Dictionary(collected_font_dictionary));
            font_dictionary.set(font_id.clone(), lopdf::Object::Reference(*object_id));
        }

        font_dictionary
    }

    fn get_mut_page(&mut self, page_index: usize) -> Result<&mut PdfPage, ContextError> {
        self.pages.get_mut(page_index).ok_or_else(|| {
            ContextError::with_context(
                ErrorKind::Geometry,
                format!("Failed to find the page with index {}", page_index),
            )
        })
    }

    fn get_mut_layer_in_page(
        &mut self,
        layer_index: usize,
        page_index: usize,
    ) -> Result<&mut PdfLayer, ContextError> {
        self.get_mut_page(page_index)?
            .layers
            .get_mut(layer_index)
            .ok_or_else(|| {
                ContextError::with_context(
                    ErrorKind::Geometry,
                    format!("Failed to find the layer with index {}", layer_index),
                )
            })
    }
}

/// Formats the given time the way PDF dates are written, e.g. `D:20170505150224+02'00'`.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}
