#[cfg(test)]
mod tests {
    use rand::Rng as _;
    use similar_asserts::assert_eq;
    use std::path::PathBuf;

    use crate::{
        canvas::DEFAULT_FONT_FAMILY,
        config::Configuration,
        error::{ContextError, ErrorKind},
        footer::{Footer, FooterSpec},
        header::{Header, HeaderSpec, LogoSpec},
        images::Image,
        surface::{
            Bounds, Color, DrawingSurface, FontFamily, FontStyle, HorizontalAlignment,
            ImagePlacement, Overflow, Point, TextBoxOptions, TextOptions, VerticalAlignment, WHITE,
        },
        typography::Typography,
    };

    /// A primitive call on the surface, with the opacity it was drawn at.
    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        GoToPage(usize),
        Image {
            placement: ImagePlacement,
            pixel_width: u32,
        },
        HorizontalLine {
            left: f32,
            right: f32,
            at: f32,
            opacity: f32,
        },
        StrokeBounds(Bounds),
        FillRectangle {
            top_left: Point,
            width: f32,
            height: f32,
            color: Color,
        },
        TextBox {
            text: String,
            options: TextBoxOptions,
            opacity: f32,
        },
        Text(String),
    }

    /// A drawing surface recording what is drawn on it, laid out like an elegant letter page.
    struct RecordingSurface {
        margin_box: Bounds,
        bounds: Bounds,
        cursor: f32,
        page_count: usize,
        current_page: usize,
        opacity: f32,
        calls: Vec<Call>,
        font_families: Vec<(String, FontFamily)>,
        fallback_fonts: Vec<String>,
    }

    impl RecordingSurface {
        fn with_pages(page_count: usize) -> Self {
            let margin_box = Bounds {
                absolute_left: 36.0,
                absolute_bottom: 36.0,
                width: 540.0,
                height: 695.0,
            };
            RecordingSurface {
                margin_box,
                bounds: margin_box,
                cursor: margin_box.height,
                page_count,
                current_page: 0,
                opacity: 1.0,
                calls: Vec::new(),
                font_families: Vec::new(),
                fallback_fonts: Vec::new(),
            }
        }

        /// The calls made after going to the given page, up to the next page change.
        fn calls_on_page(&self, page_index: usize) -> Vec<Call> {
            self.calls
                .iter()
                .skip_while(|call| **call != Call::GoToPage(page_index))
                .skip(1)
                .take_while(|call| !matches!(call, Call::GoToPage(_)))
                .cloned()
                .collect()
        }
    }

    impl DrawingSurface for RecordingSurface {
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
            1.0
        }

        fn page_count(&self) -> usize {
            self.page_count
        }

        fn current_page(&self) -> usize {
            self.current_page
        }

        fn go_to_page(&mut self, page_index: usize) -> Result<(), ContextError> {
            if page_index >= self.page_count {
                return Err(ContextError::with_context(
                    ErrorKind::Geometry,
                    format!("No page with index {page_index}"),
                ));
            }
            self.current_page = page_index;
            self.bounds = self.margin_box;
            self.cursor = self.bounds.top();
            self.calls.push(Call::GoToPage(page_index));

            Ok(())
        }

        fn start_new_page(&mut self) {
            self.page_count += 1;
            self.current_page = self.page_count - 1;
            self.bounds = self.margin_box;
            self.cursor = self.bounds.top();
        }

        fn image(&mut self, image: &Image, placement: ImagePlacement) -> Result<(), ContextError> {
            self.calls.push(Call::Image {
                placement,
                pixel_width: image.width(),
            });
            Ok(())
        }

        fn stroke_horizontal_line(
            &mut self,
            left: f32,
            right: f32,
            at: f32,
        ) -> Result<(), ContextError> {
            self.calls.push(Call::HorizontalLine {
                left,
                right,
                at,
                opacity: self.opacity,
            });
            Ok(())
        }

        fn stroke_bounds(&mut self) -> Result<(), ContextError> {
            self.calls.push(Call::StrokeBounds(self.bounds));
            Ok(())
        }

        fn fill_rectangle(
            &mut self,
            top_left: Point,
            width: f32,
            height: f32,
            color: Color,
        ) -> Result<(), ContextError> {
            self.calls.push(Call::FillRectangle {
                top_left,
                width,
                height,
                color,
            });
            Ok(())
        }

        fn text_box(&mut self, text: &str, options: &TextBoxOptions) -> Result<(), ContextError> {
            self.calls.push(Call::TextBox {
                text: text.to_string(),
                options: options.clone(),
                opacity: self.opacity,
            });
            Ok(())
        }

        fn text(&mut self, text: &str, _options: &TextOptions) -> Result<(), ContextError> {
            self.calls.push(Call::Text(text.to_string()));
            self.cursor -= 10.0;
            Ok(())
        }

        fn transparent<F>(&mut self, opacity: f32, draw: F) -> Result<(), ContextError>
        where
            F: FnOnce(&mut Self) -> Result<(), ContextError>,
        {
            let previous_opacity = self.opacity;
            self.opacity = opacity;
            let result = draw(self);
            self.opacity = previous_opacity;
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
            self.font_families.push((name.to_string(), family));
        }

        fn set_fallback_fonts(&mut self, names: Vec<String>) {
            self.fallback_fonts = names;
        }
    }

    fn watermark_path() -> PathBuf {
        Configuration::default().watermark
    }

    fn header_with_logo(text: Option<&str>, url: &str, width: f32, height: f32) -> Header {
        Header::new(
            HeaderSpec {
                text: text.map(str::to_string),
                logo: Some(LogoSpec {
                    url: url.to_string(),
                    width,
                    height,
                }),
            },
            watermark_path(),
        )
    }

    fn watermark_call() -> Call {
        Call::Image {
            placement: ImagePlacement {
                at: [0.0, 695.0 + 18.0],
                width: None,
                height: Some(13.0),
            },
            pixel_width: 160,
        }
    }

    fn heading_options(width: f32) -> TextBoxOptions {
        TextBoxOptions {
            at: [25.0, 695.0 + 25.0],
            width: Some(width),
            height: Some(25.0),
            size: 17.0,
            font: Some(DEFAULT_FONT_FAMILY.to_string()),
            style: FontStyle::Bold,
            align: HorizontalAlignment::Right,
            valign: VerticalAlignment::Center,
            overflow: Overflow::ShrinkToFit,
            ..Default::default()
        }
    }

    #[test]
    fn plain_header_draws_the_watermark_and_the_rule() {
        let mut surface = RecordingSurface::with_pages(1);
        let header = Header::new(HeaderSpec::default(), watermark_path());

        header.render(&mut surface, 0..1).unwrap();

        assert_eq!(
            surface.calls_on_page(0),
            vec![
                watermark_call(),
                Call::HorizontalLine {
                    left: 0.0,
                    right: 540.0,
                    at: 695.0,
                    opacity: 1.0,
                },
            ]
        );
    }

    #[test]
    fn logo_that_fails_to_load_keeps_its_frame() {
        let mut surface = RecordingSurface::with_pages(1);
        let header = header_with_logo(None, "missing/logo.png", 50.0, 50.0);

        header.render(&mut surface, 0..1).unwrap();

        let calls = surface.calls_on_page(0);
        assert_eq!(
            calls[2..].to_vec(),
            vec![
                Call::FillRectangle {
                    top_left: [0.0, 51.0],
                    width: 51.0,
                    height: 51.0,
                    color: WHITE,
                },
                Call::StrokeBounds(Bounds {
                    absolute_left: 36.0 + 488.5,
                    absolute_bottom: 36.0 + 720.5 - 51.0,
                    width: 51.0,
                    height: 51.0,
                }),
            ]
        );
    }

    #[test]
    fn loaded_logo_is_drawn_inside_its_frame() {
        let mut surface = RecordingSurface::with_pages(1);
        let logo_path = watermark_path();
        let header = header_with_logo(None, &logo_path.to_string_lossy(), 50.0, 50.0);

        header.render(&mut surface, 0..1).unwrap();

        assert_eq!(
            surface.calls_on_page(0).last(),
            Some(&Call::Image {
                placement: ImagePlacement {
                    at: [489.0, 720.0],
                    width: Some(50.0),
                    height: Some(50.0),
                },
                pixel_width: 160,
            })
        );
    }

    #[test]
    fn heading_is_faint_and_right_aligned() {
        let mut surface = RecordingSurface::with_pages(1);
        let header = Header::new(
            HeaderSpec {
                text: Some("Quarterly report".into()),
                logo: None,
            },
            watermark_path(),
        );

        header.render(&mut surface, 0..1).unwrap();

        assert_eq!(
            surface.calls_on_page(0).last(),
            Some(&Call::TextBox {
                text: "Quarterly report".into(),
                options: heading_options(540.0 - 7.0 - 25.0),
                opacity: 0.25,
            })
        );
    }

    #[test]
    fn header_is_drawn_on_every_requested_page() {
        let mut surface = RecordingSurface::with_pages(3);
        let header = Header::new(HeaderSpec::default(), watermark_path());

        header.render(&mut surface, 1..3).unwrap();

        assert!(surface.calls_on_page(0).is_empty());
        assert_eq!(surface.calls_on_page(1), surface.calls_on_page(2));
        assert_eq!(surface.calls_on_page(2).len(), 2);
    }

    #[test]
    fn header_images_are_loaded_once_for_every_pass() {
        let watermark = std::env::temp_dir().join(format!(
            "elegant-watermark-{}.png",
            rand::thread_rng().gen::<u64>()
        ));
        std::fs::copy(watermark_path(), &watermark).unwrap();
        let mut surface = RecordingSurface::with_pages(2);
        let header = Header::new(HeaderSpec::default(), watermark.clone());

        header.render(&mut surface, 0..1).unwrap();
        std::fs::remove_file(&watermark).unwrap();
        header.render(&mut surface, 1..2).unwrap();

        assert_eq!(surface.calls_on_page(1), surface.calls_on_page(0));
    }

    #[test]
    fn empty_page_range_draws_nothing() {
        let mut surface = RecordingSurface::with_pages(1);
        let header = Header::new(HeaderSpec::default(), PathBuf::from("missing/watermark.png"));

        header.render(&mut surface, 1..1).unwrap();

        assert!(surface.calls.is_empty());
    }

    #[test]
    fn heading_and_titles_make_room_for_logos_of_any_width() {
        let mut random_generator = rand::thread_rng();

        for _ in 0..50 {
            let logo_width = random_generator.gen_range(10..200) as f32;
            let logo_height = random_generator.gen_range(10..100) as f32;
            let mut surface = RecordingSurface::with_pages(1);
            let header =
                header_with_logo(Some("Heading"), "missing/logo.png", logo_width, logo_height);

            header.render(&mut surface, 0..1).unwrap();

            assert_eq!(header.title_padding(), logo_width + 7.0);
            let calls = surface.calls_on_page(0);
            let Some(Call::TextBox { options, .. }) = calls.last() else {
                panic!("the heading should be drawn last");
            };
            assert_eq!(options, &heading_options(540.0 - (logo_width + 2.0 + 5.0) - 25.0));
            let Some(Call::StrokeBounds(frame)) = calls
                .iter()
                .find(|call| matches!(call, Call::StrokeBounds(_)))
            else {
                panic!("the logo frame should be drawn");
            };
            assert_eq!(frame.width, logo_width + 1.0);
            assert_eq!(frame.height, logo_height + 1.0);
            assert_eq!(frame.absolute_left + frame.width + 0.5, 36.0 + 540.0);
        }
    }

    #[test]
    fn footer_has_the_author_the_text_and_the_page_number() {
        let mut surface = RecordingSurface::with_pages(2);
        let footer = Footer::new(
            FooterSpec {
                text: Some("Example".into()),
                url: Some("http://example.com".into()),
            },
            "Elegant".into(),
        );

        footer.render(&mut surface, 0..2).unwrap();

        let side_options = TextBoxOptions {
            at: [0.0, -6.0],
            width: Some(50.0),
            height: Some(10.0),
            size: 7.0,
            valign: VerticalAlignment::Top,
            ..Default::default()
        };
        assert_eq!(
            surface.calls_on_page(1),
            vec![
                Call::HorizontalLine {
                    left: 0.0,
                    right: 540.0,
                    at: 0.0,
                    opacity: 0.25,
                },
                Call::TextBox {
                    text: "Elegant".into(),
                    options: side_options.clone(),
                    opacity: 1.0,
                },
                Call::TextBox {
                    text: "Example".into(),
                    options: TextBoxOptions {
                        at: [50.0, -6.0],
                        width: Some(440.0),
                        align: HorizontalAlignment::Center,
                        link: Some("http://example.com".into()),
                        ..side_options.clone()
                    },
                    opacity: 1.0,
                },
                Call::TextBox {
                    text: "Page 2".into(),
                    options: TextBoxOptions {
                        at: [490.0, -6.0],
                        align: HorizontalAlignment::Right,
                        ..side_options
                    },
                    opacity: 1.0,
                },
            ]
        );
    }

    #[test]
    fn every_page_is_numbered_from_one() {
        let page_count = rand::thread_rng().gen_range(1..20);
        let mut surface = RecordingSurface::with_pages(page_count);
        let footer = Footer::new(FooterSpec::default(), "Elegant".into());

        footer.render(&mut surface, 0..page_count).unwrap();

        let labels: Vec<String> = surface
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::TextBox { text, .. } if text.starts_with("Page ") => Some(text.clone()),
                _ => None,
            })
            .collect();
        let expected: Vec<String> = (1..=page_count).map(Footer::page_label).collect();
        assert_eq!(labels, expected);
        assert_eq!(surface.calls_on_page(0).len(), 3);
    }

    #[test]
    fn footer_past_the_last_page_fails() {
        let mut surface = RecordingSurface::with_pages(2);
        let footer = Footer::new(FooterSpec::default(), "Elegant".into());

        let error = footer.render(&mut surface, 0..5).unwrap_err();

        assert_eq!(error.kind, ErrorKind::Geometry);
    }

    #[test]
    fn typography_registers_title_cased_families_and_the_fallback() {
        let mut surface = RecordingSurface::with_pages(1);
        let configuration = Configuration::default();

        Typography::new(&configuration).install(&mut surface);

        let names: Vec<&str> = surface
            .font_families
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(names, vec!["Fallback", "Sans Serif"]);
        assert_eq!(surface.font_families[1].1, configuration.fonts["sans_serif"]);
        assert_eq!(surface.fallback_fonts, vec!["Fallback".to_string()]);
    }

    #[test]
    fn recorded_text_moves_the_cursor() {
        let mut surface = RecordingSurface::with_pages(1);
        surface.text("Hello", &TextOptions::default()).unwrap();
        surface.start_new_page();

        assert_eq!(surface.calls, vec![Call::Text("Hello".into())]);
        assert_eq!(surface.page_count(), 2);
        assert_eq!(surface.current_page(), 1);
        assert_eq!(surface.cursor(), 695.0);
    }
}
