use std::collections::BTreeMap;

use crate::{
    config::Configuration,
    surface::{DrawingSurface, FontFamily},
};

/// The family glyphs missing from the requested font are looked up in.
pub const FALLBACK_FONT_FAMILY: &str = "Fallback";

/// Makes the configured font families available to a drawing surface.
///
/// Families are registered under the title-cased name of their role, so the
/// `sans_serif` role becomes the `"Sans Serif"` family used for titles and
/// headings, and `fallback` becomes `"Fallback"`.
#[derive(Debug, Clone)]
pub struct Typography {
    fonts: BTreeMap<String, FontFamily>,
}

impl Typography {
    pub fn new(configuration: &Configuration) -> Self {
        Typography {
            fonts: configuration.fonts.clone(),
        }
    }

    pub fn install<S: DrawingSurface>(&self, surface: &mut S) {
        for (role, family) in &self.fonts {
            surface.register_font_family(&titleize(role), family.clone());
        }
        surface.set_fallback_fonts(vec![FALLBACK_FONT_FAMILY.to_string()]);
    }
}

/// Turns a snake-case role into a family name: `sans_serif` becomes `Sans Serif`.
pub fn titleize(role: &str) -> String {
    role.split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut characters = word.chars();
            match characters.next() {
                Some(first) => first.to_uppercase().chain(characters).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
