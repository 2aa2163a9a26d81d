//! Elegant generates PDF documents that share the same layout: letter paper in portrait,
//! a header on every page with a small watermark, an optional heading and an optional
//! framed logo, and a footer with the author, an optional text or link and the page number.
//!
//! The entry point is the `Document` struct. Content is drawn through it (titles, flowing
//! text, text boxes, or any primitive of the underlying `Canvas`) and the header and the
//! footer are added to every page on their own before the document is rendered.
//!
//! The defaults every document starts from (metadata, watermark and fonts) live in a
//! `Configuration`, which can either be passed explicitly or set once for the whole process.

/// The module were the `Document` interface is presented.
///
/// # Introduction
///
/// A `Document` is created from `DocumentOptions`, which hold what goes in the header and in the
/// footer together with the page options for the underlying canvas. Whatever page options are given,
/// the pages are letter-sized in portrait, print scaling is disabled and the top margin leaves room for
/// the header. The metadata of the configuration is written in the PDF unless the options set it.
///
/// Documents can also be created with `Document::generate`, which runs a closure drawing the content
/// and then decorates every page the content produced.
pub mod document;

/// This module contains the `ContextError` type which is the error type used throughout this library.
///
/// The `ContextError` type is always returned from a `Result` type, which means that the end user can expect to obtain an explanation
/// whenever a function returns an error. If an error happened in a function which was called inside a function of this library,
/// then the user can expect to also obtain information about this propagated error. Its `ErrorKind` tells
/// fonts, images, downloads, geometry and configuration failures apart.
pub mod error;

/// The process-wide and per-document configuration: PDF metadata, watermark and font families.
pub mod config;

/// The header drawn at the top of every page, and the loading of its logo.
pub mod header;

/// The footer drawn at the bottom of every page.
pub mod footer;

/// Registration of the configured font families into a drawing surface.
pub mod typography;

/// The drawing primitives the layout is composed from, expressed as the `DrawingSurface` trait,
/// together with the option types they take.
pub mod surface;

/// `Canvas`, the `DrawingSurface` writing into a PDF document.
///
/// Coordinates are in points, relative to the current bounds, which are the box inside the margins
/// unless a bounding box is being drawn. Text is wrapped on whitespace and measured with the advances
/// of the glyphs; characters missing from the requested font are drawn with the fallback fonts.
pub mod canvas;

/// Font sets with fallbacks and the wrapping of text into lines.
pub mod layouting;

/// TTF fonts, measured with `owned_ttf_parser` and embedded as composite fonts.
pub mod fonts;

/// PNG and JPEG images, embedded as image XObjects.
pub mod images;

/// The module were the `PdfDocument` interface for working with PDF documents is presented.
///
/// # Introduction
///
/// The main component of this module is the struct `PdfDocument`. For it, I have implemented different convenience functions
/// such as `add_page`, `add_font`, `use_image`, `use_opacity`, `add_link`, `add_operations_to_layer_in_page`, `write_all`
/// and `save_to_bytes` which allow the end user to interact with a PDF document in a meaningful way,
/// while keeping all the complexity hidden below a curtain of private methods.
///
/// The low-level handling of the PDF objects is delegated to `lopdf`, which is exposed through the
/// `inner_document` field if ever needed.
pub mod pdf;

mod test;
