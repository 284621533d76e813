//! Layout analysis: spans to lines to blocks, with heading detection.
//!
//! Coordinates here are PDF user space (y grows upwards). The adapter flips
//! them to top-down offsets only when blocks are handed to the merge.

use std::collections::BTreeMap;

use crate::model::HeadingLevel;

/// Fallback body size when a document has no text at all.
const DEFAULT_BODY_SIZE: f32 = 12.0;

/// How far above the body size a line must be to count as a heading.
const HEADING_MARGIN: f32 = 1.5;

/// A run of text drawn by one show-text operator.
#[derive(Debug, Clone)]
pub struct TextSpan {
    pub text: String,
    /// Left edge
    pub x: f32,
    /// Baseline
    pub y: f32,
    /// Estimated advance width
    pub width: f32,
    pub font_size: f32,
}

impl TextSpan {
    pub fn new(text: String, x: f32, y: f32, font_size: f32) -> Self {
        // No glyph metrics here; half an em per character is close enough for gap checks.
        let width = text.chars().count() as f32 * font_size * 0.5;
        Self {
            text,
            x,
            y,
            width,
            font_size,
        }
    }

    /// Approximate glyph top, 0.8 em above the baseline.
    pub fn top(&self) -> f32 {
        self.y + self.font_size * 0.8
    }

    fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// Spans sharing a baseline, left to right.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    /// Baseline of the first span
    pub y: f32,
    /// Left edge of the first span
    pub x: f32,
    /// Font size weighted by text length
    pub font_size: f32,
    pub heading: Option<HeadingLevel>,
}

impl TextLine {
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.total_cmp(&b.x));

        let (chars, weighted) = spans.iter().fold((0usize, 0f32), |(n, w), s| {
            let len = s.text.chars().count();
            (n + len, w + s.font_size * len as f32)
        });
        let first = spans.first();
        let font_size = if chars > 0 {
            weighted / chars as f32
        } else {
            first.map_or(0.0, |s| s.font_size)
        };

        Self {
            y: first.map_or(0.0, |s| s.y),
            x: first.map_or(0.0, |s| s.x),
            font_size,
            heading: None,
            spans,
        }
    }

    /// Top edge of the tallest span.
    pub fn top(&self) -> f32 {
        self.spans.iter().map(TextSpan::top).fold(self.y, f32::max)
    }

    /// The spans joined, with a space wherever the gap between two spans
    /// looks like a word break.
    pub fn text(&self) -> String {
        let mut text = String::new();
        let mut prev: Option<&TextSpan> = None;
        for span in &self.spans {
            if let Some(prev) = prev {
                if needs_space(prev, span) {
                    text.push(' ');
                }
            }
            text.push_str(&span.text);
            prev = Some(span);
        }
        text
    }
}

fn needs_space(prev: &TextSpan, next: &TextSpan) -> bool {
    if prev.text.ends_with([' ', '\u{00A0}']) || next.text.starts_with([' ', '\u{00A0}']) {
        return false;
    }
    let joined_script = matches!(
        (prev.text.chars().last(), next.text.chars().next()),
        (Some(a), Some(b)) if is_spaceless_script_char(a) && is_spaceless_script_char(b)
    );
    if joined_script {
        return false;
    }
    let char_width = next.width / next.text.chars().count().max(1) as f32;
    next.x - prev.right() > char_width * 0.2
}

/// Consecutive lines forming a paragraph or a heading.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
    pub heading: Option<HeadingLevel>,
}

impl TextBlock {
    fn from_lines(lines: Vec<TextLine>) -> Self {
        let heading = lines.iter().filter_map(|l| l.heading).min();
        Self { lines, heading }
    }

    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(TextLine::text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Top edge of the block in PDF user space.
    pub fn top(&self) -> f32 {
        self.lines.iter().map(TextLine::top).fold(f32::MIN, f32::max)
    }
}

/// Document-wide ranking of font sizes.
///
/// The most frequent size is body text. Every observed size at least
/// [`HEADING_MARGIN`] above it is a heading tier, largest first.
#[derive(Debug, Clone)]
pub struct SizeRanking {
    pub body_size: f32,
    pub tiers: Vec<f32>,
}

impl SizeRanking {
    /// Rank sizes given one observation per line.
    pub fn from_sizes(sizes: impl IntoIterator<Item = f32>) -> Self {
        // Tenths of a point, so nearly equal sizes share a bucket.
        let mut histogram: BTreeMap<i32, usize> = BTreeMap::new();
        for size in sizes {
            *histogram.entry((size * 10.0).round() as i32).or_default() += 1;
        }

        // Iteration is ascending, so on equal counts the smaller size wins.
        let Some(body_key) = histogram
            .iter()
            .fold(None, |best: Option<(i32, usize)>, (&key, &count)| match best {
                Some((_, top)) if top >= count => best,
                _ => Some((key, count)),
            })
            .map(|(key, _)| key)
        else {
            return Self {
                body_size: DEFAULT_BODY_SIZE,
                tiers: Vec::new(),
            };
        };

        let body_size = body_key as f32 / 10.0;
        let tiers = histogram
            .keys()
            .rev()
            .map(|&key| key as f32 / 10.0)
            .filter(|&size| size >= body_size + HEADING_MARGIN)
            .collect();
        Self { body_size, tiers }
    }

    /// Heading level for a line of the given size, `None` for body text.
    pub fn heading_level(&self, font_size: f32) -> Option<HeadingLevel> {
        if font_size < self.body_size + HEADING_MARGIN {
            return None;
        }
        let rank = self
            .tiers
            .iter()
            .position(|&tier| font_size >= tier - 0.5)
            .unwrap_or(self.tiers.len());
        Some(HeadingLevel::clamped(rank as u8 + 1))
    }
}

/// Group spans into lines by baseline, top of the page first.
pub fn group_spans_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut groups: Vec<(f32, Vec<TextSpan>)> = Vec::new();
    for span in spans {
        match groups.last_mut() {
            Some((baseline, members)) if (span.y - *baseline).abs() <= span.font_size * 0.3 => {
                members.push(span)
            }
            _ => groups.push((span.y, vec![span])),
        }
    }
    groups
        .into_iter()
        .map(|(_, members)| TextLine::from_spans(members))
        .collect()
}

/// Mark lines whose size ranks them as headings.
pub fn detect_headings(mut lines: Vec<TextLine>, ranking: &SizeRanking) -> Vec<TextLine> {
    for line in &mut lines {
        line.heading = ranking.heading_level(line.font_size);
    }
    lines
}

/// Split lines into blocks at headings, wide gaps, size changes and indents.
pub fn group_lines_into_blocks(lines: Vec<TextLine>) -> Vec<TextBlock> {
    let spacing = typical_spacing(&lines);
    let mut blocks = Vec::new();
    let mut current: Vec<TextLine> = Vec::new();

    for line in lines {
        let breaks = current.last().is_some_and(|prev| {
            prev.heading.is_some()
                || line.heading.is_some()
                || (prev.y - line.y).abs() > spacing * 1.5
                || (prev.font_size - line.font_size).abs() > 1.0
                || (prev.x - line.x).abs() > 20.0
        });
        if breaks {
            blocks.push(TextBlock::from_lines(std::mem::take(&mut current)));
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push(TextBlock::from_lines(current));
    }
    blocks
}

/// Mean baseline distance between neighbouring lines.
fn typical_spacing(lines: &[TextLine]) -> f32 {
    let gaps: Vec<f32> = lines
        .windows(2)
        .map(|pair| (pair[0].y - pair[1].y).abs())
        .filter(|gap| *gap > 0.1)
        .collect();
    if gaps.is_empty() {
        DEFAULT_BODY_SIZE
    } else {
        gaps.iter().sum::<f32>() / gaps.len() as f32
    }
}

/// Han ideographs and kana are written without spaces between words.
/// Hangul is not: Korean separates words with spaces.
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{303F}'   // CJK symbols and punctuation
        | '\u{3040}'..='\u{30FF}' // hiragana, katakana
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{20000}'..='\u{2EBEF}')
}
