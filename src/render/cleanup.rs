//! Text cleanup applied to extracted paragraphs before rendering.
//!
//! Cleanup runs on the content of text elements only, never on the
//! rendered Markdown, so table grids and image links are left untouched.

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Cleanup preset levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupPreset {
    /// Unicode NFC normalization only
    Minimal,
    /// NFC, ligatures, replacement characters, hyphenation, whitespace
    #[default]
    Standard,
    /// Standard plus bullet standardization and private-use character removal
    Aggressive,
}

/// Options for text cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupOptions {
    /// Normalize Unicode to NFC form
    pub normalize_unicode: bool,

    /// Expand typographic ligatures (ﬁ, ﬂ, ...)
    pub fix_ligatures: bool,

    /// Standardize bullet characters (●, ○, ■ → •)
    pub standardize_bullets: bool,

    /// Remove Private Use Area characters left by symbol fonts
    pub remove_pua: bool,

    /// Remove Unicode replacement character (U+FFFD)
    pub remove_replacement_char: bool,

    /// Join words hyphenated across line breaks
    pub fix_hyphenation: bool,

    /// Collapse runs of spaces and tabs
    pub normalize_whitespace: bool,
}

impl CleanupOptions {
    /// Create options from a preset.
    pub fn from_preset(preset: CleanupPreset) -> Self {
        match preset {
            CleanupPreset::Minimal => Self::minimal(),
            CleanupPreset::Standard => Self::standard(),
            CleanupPreset::Aggressive => Self::aggressive(),
        }
    }

    /// Minimal cleanup options.
    pub fn minimal() -> Self {
        Self {
            normalize_unicode: true,
            fix_ligatures: false,
            standardize_bullets: false,
            remove_pua: false,
            remove_replacement_char: false,
            fix_hyphenation: false,
            normalize_whitespace: false,
        }
    }

    /// Standard cleanup options.
    pub fn standard() -> Self {
        Self {
            normalize_unicode: true,
            fix_ligatures: true,
            standardize_bullets: false,
            remove_pua: false,
            remove_replacement_char: true,
            fix_hyphenation: true,
            normalize_whitespace: true,
        }
    }

    /// Aggressive cleanup options.
    pub fn aggressive() -> Self {
        Self {
            standardize_bullets: true,
            remove_pua: true,
            ..Self::standard()
        }
    }
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self::standard()
    }
}

const LIGATURES: [(char, &str); 7] = [
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

const BULLETS: [char; 10] = ['●', '○', '■', '□', '◆', '◇', '▪', '▫', '►', '▻'];

/// Text cleanup pipeline.
pub struct CleanupPipeline {
    options: CleanupOptions,
    hyphenation: Option<Regex>,
    whitespace: Option<Regex>,
}

impl CleanupPipeline {
    /// Create a new cleanup pipeline with the given options.
    pub fn new(options: CleanupOptions) -> Self {
        Self {
            options,
            hyphenation: Regex::new(r"([A-Za-z])-\s*\n\s*([a-z])").ok(),
            whitespace: Regex::new(r"[ \t]{2,}").ok(),
        }
    }

    /// Create a pipeline from a preset.
    pub fn from_preset(preset: CleanupPreset) -> Self {
        Self::new(CleanupOptions::from_preset(preset))
    }

    /// Clean one paragraph of extracted text.
    pub fn process(&self, text: &str) -> String {
        let mut result: String = if self.options.normalize_unicode {
            text.nfc().collect()
        } else {
            text.to_string()
        };

        if self.options.fix_ligatures {
            for (ligature, replacement) in LIGATURES {
                if result.contains(ligature) {
                    result = result.replace(ligature, replacement);
                }
            }
        }

        if self.options.standardize_bullets {
            result = result
                .chars()
                .map(|c| if BULLETS.contains(&c) { '•' } else { c })
                .collect();
        }

        if self.options.remove_pua {
            result.retain(|c| !is_private_use(c));
        }

        if self.options.remove_replacement_char {
            result.retain(|c| c != '\u{FFFD}');
        }

        if self.options.fix_hyphenation {
            if let Some(re) = &self.hyphenation {
                result = re.replace_all(&result, "$1$2").into_owned();
            }
        }

        if self.options.normalize_whitespace {
            if let Some(re) = &self.whitespace {
                result = re.replace_all(&result, " ").into_owned();
            }
            result = result
                .lines()
                .map(str::trim_end)
                .collect::<Vec<_>>()
                .join("\n");
        }

        result.trim().to_string()
    }
}

fn is_private_use(c: char) -> bool {
    let code = c as u32;
    (0xE000..=0xF8FF).contains(&code)
        || (0xF0000..=0xFFFFD).contains(&code)
        || (0x100000..=0x10FFFD).contains(&code)
}
