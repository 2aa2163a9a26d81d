#![warn(clippy::unwrap_used)]

use std::mem;

use crate::fonts::Font;

/// The fonts a piece of text is set with: the requested font first, then the fallbacks in order.
/// Each font is paired with its index in the PDF document.
#[derive(Debug, Clone)]
pub struct FontSet {
    fonts: Vec<(usize, Font)>,
}

impl FontSet {
    pub fn new(primary: (usize, Font), fallbacks: Vec<(usize, Font)>) -> Self {
        let mut fonts = vec![primary];
        for fallback in fallbacks {
            if fonts.iter().all(|(font_index, _)| *font_index != fallback.0) {
                fonts.push(fallback);
            }
        }

        FontSet { fonts }
    }

    fn primary(&self) -> &Font {
        &self.fonts[0].1
    }

    /// The first font able to draw the character, or the primary font when none can.
    pub fn font_for(&self, character: char) -> (usize, &Font) {
        self.fonts
            .iter()
            .find(|(_, font)| font.has_glyph(character))
            .map(|(font_index, font)| (*font_index, font))
            .unwrap_or_else(|| {
                if !character.is_whitespace() {
                    log::warn!("No font can draw the character {:?}, skipping it", character);
                }
                (self.fonts[0].0, self.primary())
            })
    }

    /// Splits the text into consecutive runs drawn with the same font.
    pub fn runs(&self, text: &str) -> Vec<(usize, String)> {
        let mut runs: Vec<(usize, String)> = Vec::new();
        for character in text.chars() {
            let (font_index, _) = self.font_for(character);
            match runs.last_mut() {
                Some((last_index, run)) if *last_index == font_index => run.push(character),
                _ => runs.push((font_index, character.to_string())),
            }
        }

        runs
    }

    pub fn font(&self, font_index: usize) -> Option<&Font> {
        self.fonts
            .iter()
            .find(|(index, _)| *index == font_index)
            .map(|(_, font)| font)
    }

    /// The advance width of the text in points, every run measured with its own font.
    pub fn width(&self, text: &str, font_size: f32) -> f32 {
        self.runs(text)
            .iter()
            .filter_map(|(font_index, run)| {
                self.font(*font_index)
                    .map(|font| font.text_width(run, font_size))
            })
            .sum()
    }

    pub fn ascender(&self, font_size: f32) -> f32 {
        self.primary().ascender(font_size)
    }

    pub fn descender(&self, font_size: f32) -> f32 {
        self.primary().descender(font_size)
    }

    pub fn line_height(&self, font_size: f32) -> f32 {
        self.primary().line_height(font_size)
    }

    /// How many lines fit in a box of the given height: a line fits when its baseline is inside the box.
    pub fn fitting_lines(&self, height: f32, font_size: f32) -> usize {
        let ascender = self.ascender(font_size);
        if height + 0.0001 < ascender {
            return 0;
        }

        ((height + 0.0001 - ascender) / self.line_height(font_size)).floor() as usize + 1
    }
}

/// Breaks the text into lines no wider than `maximum_width`, filling each line greedily.
///
/// Lines break on whitespace and on explicit newlines; a word wider than a whole line
/// is broken between its characters.
pub fn wrap_lines<F>(text: &str, maximum_width: f32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut has_words = false;

        for word in paragraph.split_whitespace() {
            has_words = true;
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if measure(&candidate) <= maximum_width {
                line = candidate;
                continue;
            }

            if !line.is_empty() {
                log::trace!("Wrapping before {:?}", word);
                lines.push(mem::take(&mut line));
            }
            if measure(word) <= maximum_width {
                line = word.to_string();
                continue;
            }

            log::trace!("Breaking the word {:?} across lines", word);
            for character in word.chars() {
                let mut candidate = line.clone();
                candidate.push(character);
                if !line.is_empty() && measure(&candidate) > maximum_width {
                    lines.push(mem::replace(&mut line, character.to_string()));
                } else {
                    line = candidate;
                }
            }
        }

        if has_words {
            lines.push(line);
        } else {
            lines.push(String::new());
        }
    }

    lines
}
