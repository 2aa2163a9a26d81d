use elegant::{
    canvas::{Margins, PageLayout, PageOptions, PageSize},
    config::Configuration,
    document::{Document, DocumentOptions},
    error::{ContextError, ErrorKind},
    footer::FooterSpec,
    header::{HeaderSpec, LogoSpec},
    surface::TextOptions,
};
use owned_ttf_parser::{AsFaceRef as _, OwnedFace};
use similar_asserts::assert_eq;
use std::collections::BTreeMap;

fn initialize_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn render<F>(options: DocumentOptions, content: F) -> lopdf::Document
where
    F: FnOnce(&mut Document) -> Result<(), ContextError>,
{
    initialize_logger();
    let document = Document::generate(options, &Configuration::default(), content).unwrap();
    let pdf_document_bytes = document.render().unwrap();

    lopdf::Document::load_mem(&pdf_document_bytes).unwrap()
}

/// The glyph IDs of the text in the bundled font, as written by `Tj`.
fn encoded(text: &str, font_file: &str) -> Vec<u8> {
    let font_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("assets/fonts")
        .join(font_file);
    let face = OwnedFace::from_vec(std::fs::read(font_path).unwrap(), 0).unwrap();
    text.chars()
        .filter_map(|character| face.as_face_ref().glyph_index(character))
        .flat_map(|glyph_id| glyph_id.0.to_be_bytes())
        .collect()
}

fn shown_strings(pdf_document: &lopdf::Document, page_number: u32) -> Vec<Vec<u8>> {
    let page_id = pdf_document.get_pages()[&page_number];
    pdf_document
        .get_and_decode_page_content(page_id)
        .unwrap()
        .operations
        .into_iter()
        .filter(|operation| operation.operator == "Tj")
        .map(|operation| operation.operands[0].as_str().unwrap().to_vec())
        .collect()
}

fn info_entry(pdf_document: &lopdf::Document, key: &[u8]) -> Option<Vec<u8>> {
    let info_id = pdf_document.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let info = pdf_document.get_dictionary(info_id).ok()?;
    info.get(key).ok()?.as_str().ok().map(<[u8]>::to_vec)
}

fn paragraph() -> String {
    "The quick brown fox jumps over the lazy dog. ".repeat(20)
}

#[test]
fn every_page_is_decorated_exactly_once() {
    let pdf_document = render(DocumentOptions::default(), |document| {
        for _ in 0..8 {
            document.text(&paragraph(), &TextOptions::default())?;
        }
        Ok(())
    });

    let page_count = pdf_document.get_pages().len() as u32;
    assert!(page_count > 1);
    for page_number in 1..=page_count {
        let shown = shown_strings(&pdf_document, page_number);
        let label = encoded(&format!("Page {page_number}"), "DejaVuSans.ttf");
        assert_eq!(shown.iter().filter(|string| **string == label).count(), 1);
        assert_eq!(
            shown
                .iter()
                .filter(|string| **string == encoded("Elegant", "DejaVuSans.ttf"))
                .count(),
            1
        );
    }
}

/// The image XObjects carrying a soft mask, which only the watermark has.
fn masked_images(pdf_document: &lopdf::Document) -> usize {
    pdf_document
        .objects
        .values()
        .filter_map(|object| object.as_stream().ok())
        .filter(|stream| {
            stream
                .dict
                .get(b"Subtype")
                .and_then(lopdf::Object::as_name)
                .is_ok_and(|subtype| subtype == b"Image")
                && stream.dict.has(b"SMask")
        })
        .count()
}

#[test]
fn watermark_is_embedded_once_for_the_whole_document() {
    initialize_logger();
    let mut document = Document::generate(
        DocumentOptions::default(),
        &Configuration::default(),
        |document| {
            for _ in 0..8 {
                document.text(&paragraph(), &TextOptions::default())?;
            }
            Ok(())
        },
    )
    .unwrap();
    document.start_new_page();
    let pdf_document = lopdf::Document::load_mem(&document.render().unwrap()).unwrap();

    assert!(pdf_document.get_pages().len() > 2);
    assert_eq!(masked_images(&pdf_document), 1);
}

#[test]
fn pages_started_after_generation_are_decorated_on_render() {
    initialize_logger();
    let mut document = Document::new(DocumentOptions::default()).unwrap();
    document.start_new_page();
    document.start_new_page();
    let pdf_document = lopdf::Document::load_mem(&document.render().unwrap()).unwrap();

    assert_eq!(pdf_document.get_pages().len(), 3);
    assert!(shown_strings(&pdf_document, 3).contains(&encoded("Page 3", "DejaVuSans.ttf")));
}

#[test]
fn metadata_comes_from_the_configuration_unless_overridden() {
    let pdf_document = render(DocumentOptions::default(), |_| Ok(()));
    assert_eq!(info_entry(&pdf_document, b"Author"), Some(b"Elegant".to_vec()));
    assert_eq!(info_entry(&pdf_document, b"Creator"), Some(b"Elegant".to_vec()));
    assert_eq!(info_entry(&pdf_document, b"Producer"), Some(b"Elegant".to_vec()));

    let options = DocumentOptions {
        page: PageOptions {
            info: BTreeMap::from([
                ("Author".to_string(), "John Doe".to_string()),
                ("Title".to_string(), "Report".to_string()),
            ]),
            ..Default::default()
        },
        ..Default::default()
    };
    let pdf_document = render(options, |_| Ok(()));
    assert_eq!(info_entry(&pdf_document, b"Author"), Some(b"John Doe".to_vec()));
    assert_eq!(info_entry(&pdf_document, b"Title"), Some(b"Report".to_vec()));
    assert_eq!(info_entry(&pdf_document, b"Producer"), Some(b"Elegant".to_vec()));
}

#[test]
fn pages_are_always_letter_portrait_without_print_scaling() {
    let options = DocumentOptions {
        page: PageOptions {
            page_size: PageSize::A4,
            layout: PageLayout::Landscape,
            ..Default::default()
        },
        ..Default::default()
    };
    let pdf_document = render(options, |_| Ok(()));

    let page_id = pdf_document.get_pages()[&1];
    let media_box: Vec<f32> = pdf_document
        .get_dictionary(page_id)
        .unwrap()
        .get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|value| value.as_float().unwrap())
        .collect();
    assert_eq!(media_box, vec![0.0, 0.0, 612.0, 792.0]);

    let viewer_preferences = pdf_document
        .catalog()
        .unwrap()
        .get(b"ViewerPreferences")
        .unwrap()
        .as_dict()
        .unwrap();
    assert_eq!(
        viewer_preferences.get(b"PrintScaling").unwrap().as_name().unwrap(),
        b"None"
    );
}

#[test]
fn top_margin_leaves_room_for_the_header() {
    let options = DocumentOptions {
        page: PageOptions {
            margins: Margins {
                top: 100.0,
                right: 20.0,
                bottom: 50.0,
                left: 10.0,
            },
            ..Default::default()
        },
        ..Default::default()
    };
    let document = Document::with_configuration(options, &Configuration::default()).unwrap();

    let margins = document.canvas().page_options().margins;
    assert_eq!(margins.top, 61.0);
    assert_eq!(document.bounds().absolute_left, 10.0);
    assert_eq!(document.bounds().absolute_bottom, 50.0);
    assert_eq!(document.bounds().height, 792.0 - 61.0 - 50.0);
    assert_eq!(document.bounds().width, 612.0 - 30.0);
    assert_eq!(document.header_height(), 50.0);
}

#[test]
fn each_title_moves_the_cursor_down_by_forty() {
    let mut document = Document::new(DocumentOptions::default()).unwrap();
    let top = document.cursor();
    assert_eq!(top, document.bounds().top());

    document.title("Introduction").unwrap();
    assert_eq!(document.cursor(), top - 40.0);
    document.title("Results").unwrap();
    assert_eq!(document.cursor(), top - 80.0);

    let pdf_document = lopdf::Document::load_mem(&document.render().unwrap()).unwrap();
    let heading = encoded("INTRODUCTION", "DejaVuSansBold.ttf");
    assert!(shown_strings(&pdf_document, 1).contains(&heading));
}

#[test]
fn footer_text_links_to_the_url_on_every_page() {
    let options = DocumentOptions {
        footer: FooterSpec {
            text: Some("Example".into()),
            url: Some("http://example.com".into()),
        },
        ..Default::default()
    };
    let pdf_document = render(options, |document| {
        document.start_new_page();
        Ok(())
    });

    for page_id in pdf_document.get_pages().values() {
        let annotations = pdf_document.get_page_annotations(*page_id);
        assert_eq!(annotations.len(), 1);
        let action = annotations[0].get(b"A").unwrap().as_dict().unwrap();
        assert_eq!(action.get(b"URI").unwrap().as_str().unwrap(), b"http://example.com");
    }
}

#[test]
fn unreachable_logo_does_not_fail_the_document() {
    let options = DocumentOptions {
        header: HeaderSpec {
            text: Some("Quarterly report".into()),
            logo: Some(LogoSpec {
                url: "http://127.0.0.1:9/logo.png".into(),
                width: 50.0,
                height: 50.0,
            }),
        },
        ..Default::default()
    };
    let pdf_document = render(options, |_| Ok(()));

    assert_eq!(pdf_document.get_pages().len(), 1);
    let page_id = pdf_document.get_pages()[&1];
    let operators: Vec<String> = pdf_document
        .get_and_decode_page_content(page_id)
        .unwrap()
        .operations
        .into_iter()
        .map(|operation| operation.operator)
        .collect();
    // The watermark is the only image, the logo frame is still stroked
    assert_eq!(operators.iter().filter(|operator| *operator == "Do").count(), 1);
    assert!(operators.contains(&"re".to_string()));
}

#[test]
fn compressed_documents_keep_their_content() {
    let options = DocumentOptions {
        page: PageOptions {
            compress: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let pdf_document = render(options, |document| document.text("Hello", &TextOptions::default()));

    assert!(shown_strings(&pdf_document, 1).contains(&encoded("Hello", "DejaVuSans.ttf")));
}

#[test]
fn content_errors_are_returned_to_the_caller() {
    let result = Document::generate(
        DocumentOptions::default(),
        &Configuration::default(),
        |document| {
            document.text(
                "Hello",
                &TextOptions {
                    font: Some("Serif".into()),
                    ..Default::default()
                },
            )
        },
    );

    assert_eq!(result.err().map(|error| error.kind), Some(ErrorKind::Font));
}

#[test]
fn missing_watermark_is_an_image_error() {
    let configuration = Configuration {
        watermark: "missing/watermark.png".into(),
        ..Default::default()
    };

    let result = Document::with_configuration(DocumentOptions::default(), &configuration);

    assert_eq!(result.err().map(|error| error.kind), Some(ErrorKind::Image));
}

#[test]
fn document_options_are_read_from_json() {
    let options: DocumentOptions = serde_json::from_str(
        r#"{
            "header": { "text": "Report", "logo": { "url": "logo.png" } },
            "footer": { "text": "Example" },
            "page": { "compress": true, "margins": { "left": 20 } }
        }"#,
    )
    .unwrap();

    assert_eq!(options.header.logo.as_ref().map(|logo| logo.width), Some(50.0));
    assert_eq!(options.footer.url, None);
    assert!(options.page.compress);
    assert_eq!(options.page.margins.left, 20.0);
    assert_eq!(options.page.margins.right, 36.0);
}
