use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{OnceLock, PoisonError, RwLock},
};

use crate::{
    error::{ContextError, ErrorKind},
    surface::FontFamily,
};

/// The defaults every document is created with: the metadata written into the PDF,
/// the watermark drawn in the header and the font families, keyed by role
/// (`sans_serif`, `fallback`).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Configuration {
    /// The `Author` of the PDF metadata.
    pub author: String,
    /// The `Creator` of the PDF metadata.
    pub creator: String,
    /// The `Producer` of the PDF metadata.
    pub producer: String,
    /// The image drawn on the top-left corner of every page.
    pub watermark: PathBuf,
    pub fonts: BTreeMap<String, FontFamily>,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            author: "Elegant".into(),
            creator: "Elegant".into(),
            producer: "Elegant".into(),
            watermark: asset("images/default_watermark.png"),
            fonts: BTreeMap::from([
                ("sans_serif".to_string(), bundled_font_family("DejaVuSans")),
                ("fallback".to_string(), bundled_font_family("DejaVuSans")),
            ]),
        }
    }
}

impl Configuration {
    /// Reads a configuration from a JSON file. Omitted fields keep their default value.
    pub fn from_path(configuration_file_path: &Path) -> Result<Self, ContextError> {
        let configuration_file_contents = std::fs::read_to_string(configuration_file_path)
            .map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Configuration,
                    "Failed to read the configuration file",
                    &error,
                )
            })?;
        let configuration: Configuration = serde_json::from_str(&configuration_file_contents)
            .map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Configuration,
                    "Failed to parse the configuration file",
                    &error,
                )
            })?;

        Ok(configuration)
    }

    /// The metadata entries written into the Info dictionary of every document.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Author".to_string(), self.author.clone()),
            ("Creator".to_string(), self.creator.clone()),
            ("Producer".to_string(), self.producer.clone()),
        ])
    }
}

fn asset(file: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets").join(file)
}

fn bundled_font_family(name: &str) -> FontFamily {
    FontFamily {
        normal: asset(&format!("fonts/{name}.ttf")),
        bold: asset(&format!("fonts/{name}Bold.ttf")),
    }
}

static CONFIGURATION: OnceLock<RwLock<Configuration>> = OnceLock::new();

fn global_configuration() -> &'static RwLock<Configuration> {
    CONFIGURATION.get_or_init(|| RwLock::new(Configuration::default()))
}

/// A snapshot of the process-wide configuration, which documents built with
/// [`Document::new`](crate::document::Document::new) start from.
pub fn configuration() -> Configuration {
    global_configuration()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Updates the process-wide configuration. Documents created afterwards see the change.
///
/// ```
/// elegant::config::configure(|configuration| configuration.author = "John Doe".into());
/// assert_eq!(elegant::config::configuration().author, "John Doe");
/// # elegant::config::reset_configuration();
/// ```
pub fn configure<F>(update: F)
where
    F: FnOnce(&mut Configuration),
{
    let mut configuration = global_configuration()
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    update(&mut configuration);
}

/// Restores the process-wide configuration to its defaults.
pub fn reset_configuration() {
    configure(|configuration| *configuration = Configuration::default());
}
