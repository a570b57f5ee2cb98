//! PDF mood report.
//!
//! The report is laid out first (pages of positioned text lines, in
//! millimetres on A4) and only then rendered with `lopdf`, so pagination can
//! be checked without parsing PDF output.

use crate::models::{newest_first, MoodLog};
use lopdf::{
    content::{Content, Operation},
    dictionary, Document, Object, ObjectId, Stream,
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{error, info};

pub const REPORT_FILE_NAME: &str = "moodmate_report.pdf";
pub const MAX_REPORT_ENTRIES: usize = 100;
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate report.";

pub const TITLE: &str = "MoodMate Report";
pub const ENTRIES_HEADING: &str = "Mood Entries (latest 100):";
pub const SUMMARY_HEADING: &str = "AI Mood Summary:";
pub const NO_ENTRIES_NOTICE: &str = "No mood entries found.";
pub const NO_SUMMARY_NOTICE: &str = "No AI analysis found.";
const CONTINUED_SUFFIX: &str = " (continued)";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN: f32 = 15.0;
pub const TOP: f32 = 20.0;
/// A line may not start below this offset; it moves to a new page instead.
pub const PAGE_BREAK_Y: f32 = 280.0;
const ENTRY_INDENT: f32 = 5.0;
const TITLE_ADVANCE: f32 = 12.0;
const LINE_ADVANCE: f32 = 8.0;
const SUMMARY_LEADING: f32 = 7.0;
const SECTION_GAP: f32 = 10.0;
/// Roughly 180 mm of 12 pt Helvetica.
const SUMMARY_WRAP_CHARS: usize = 90;

const TITLE_SIZE: i64 = 20;
const HEADING_SIZE: i64 = 14;
const ENTRY_SIZE: i64 = 12;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to render pdf: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("failed to save report: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Title,
    Entries,
    Summary,
}

impl Section {
    fn heading(self) -> &'static str {
        match self {
            Self::Title => TITLE,
            Self::Entries => ENTRIES_HEADING,
            Self::Summary => SUMMARY_HEADING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

const TITLE_COLOR: Rgb = Rgb(0.427, 0.157, 0.851);
const ENTRIES_HEADING_COLOR: Rgb = Rgb(0.067, 0.094, 0.153);
const SUMMARY_HEADING_COLOR: Rgb = Rgb(0.420, 0.129, 0.659);
const BODY_COLOR: Rgb = Rgb(0.122, 0.161, 0.216);

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub section: Section,
    pub is_heading: bool,
    pub x: f32,
    pub y: f32,
    pub size: i64,
    pub color: Rgb,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub lines: Vec<TextLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub pages: Vec<Page>,
}

/// Decomposes a glyph into code points and recomposes it, dropping control
/// characters. Joiners and variation selectors are kept, so multi-codepoint
/// emoji come back unchanged.
pub fn normalize_glyph(glyph: &str) -> String {
    glyph
        .chars()
        .map(u32::from)
        .filter_map(char::from_u32)
        .filter(|ch| !ch.is_control())
        .collect()
}

struct Cursor {
    pages: Vec<Page>,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: TOP,
        }
    }

    fn emit(&mut self, line: TextLine) {
        if let Some(page) = self.pages.last_mut() {
            page.lines.push(line);
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = TOP;
    }

    fn heading(&mut self, section: Section, text: String) {
        let color = match section {
            Section::Summary => SUMMARY_HEADING_COLOR,
            _ => ENTRIES_HEADING_COLOR,
        };
        self.emit(TextLine {
            section,
            is_heading: true,
            x: MARGIN,
            y: self.y,
            size: HEADING_SIZE,
            color,
            text,
        });
        self.y += LINE_ADVANCE;
    }

    /// Starts a section, moving it to a fresh page when the heading and its
    /// first line would not fit.
    fn open_section(&mut self, section: Section) {
        if self.y + LINE_ADVANCE > PAGE_BREAK_Y {
            self.new_page();
        }
        self.heading(section, section.heading().to_string());
    }

    fn body(&mut self, section: Section, x: f32, size: i64, advance: f32, text: String) {
        if self.y > PAGE_BREAK_Y {
            self.new_page();
            self.heading(section, format!("{}{CONTINUED_SUFFIX}", section.heading()));
        }
        self.emit(TextLine {
            section,
            is_heading: false,
            x,
            y: self.y,
            size,
            color: BODY_COLOR,
            text,
        });
        self.y += advance;
    }
}

pub fn build_layout(log: &MoodLog, summary: &str) -> ReportLayout {
    let mut cursor = Cursor::new();

    cursor.emit(TextLine {
        section: Section::Title,
        is_heading: true,
        x: MARGIN,
        y: cursor.y,
        size: TITLE_SIZE,
        color: TITLE_COLOR,
        text: TITLE.to_string(),
    });
    cursor.y += TITLE_ADVANCE;

    cursor.open_section(Section::Entries);
    let entries = newest_first(log, Some(MAX_REPORT_ENTRIES));
    if entries.is_empty() {
        cursor.body(
            Section::Entries,
            MARGIN + ENTRY_INDENT,
            ENTRY_SIZE,
            LINE_ADVANCE,
            NO_ENTRIES_NOTICE.to_string(),
        );
    }
    for (date, entry) in entries {
        let line = format!("{date}: {} - {}", normalize_glyph(&entry.emoji), entry.note);
        cursor.body(Section::Entries, MARGIN + ENTRY_INDENT, ENTRY_SIZE, LINE_ADVANCE, line);
    }

    cursor.y += SECTION_GAP;
    cursor.open_section(Section::Summary);
    let summary = if summary.trim().is_empty() {
        NO_SUMMARY_NOTICE
    } else {
        summary
    };
    for line in wrap_text(summary, SUMMARY_WRAP_CHARS) {
        cursor.body(Section::Summary, MARGIN, ENTRY_SIZE, SUMMARY_LEADING, line);
    }

    ReportLayout {
        pages: cursor.pages,
    }
}

/// Greedy word wrap on character count; words longer than `width` are split.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_len = 0;
        for word in paragraph.split_whitespace() {
            let mut chars: Vec<char> = word.chars().collect();
            while chars.len() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = chars.split_off(width);
                lines.push(chars.into_iter().collect());
                chars = rest;
            }
            let word_len = chars.len();
            let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
            if needed > width {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if !current.is_empty() {
                current.push(' ');
                current_len += 1;
            }
            current.extend(chars);
            current_len += word_len;
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Encodes text for the standard Helvetica font. Characters outside
/// WinAnsiEncoding, emoji included, become `?`; a joined emoji sequence
/// becomes a single `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        let byte = match ch {
            ' '..='~' => ch as u8,
            '\u{A0}'..='\u{FF}' => ch as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            // Variation selectors and skin tone modifiers belong to the
            // previous glyph.
            '\u{FE00}'..='\u{FE0F}' | '\u{1F3FB}'..='\u{1F3FF}' => continue,
            '\u{200D}' => {
                chars.next();
                continue;
            }
            _ => b'?',
        };
        bytes.push(byte);
    }
    bytes
}

fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

fn page_operations(page: &Page) -> Vec<Operation> {
    let mut operations = Vec::with_capacity(page.lines.len() * 5);
    for line in &page.lines {
        let Rgb(r, g, b) = line.color;
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![Object::Name(b"F1".to_vec()), Object::Integer(line.size)],
        ));
        operations.push(Operation::new(
            "rg",
            vec![Object::Real(r), Object::Real(g), Object::Real(b)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![
                Object::Real(mm_to_pt(line.x)),
                Object::Real(mm_to_pt(PAGE_HEIGHT_MM - line.y)),
            ],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(win_ansi(&line.text))],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    operations
}

pub fn render_pdf(layout: &ReportLayout) -> Result<Vec<u8>, ReportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => Object::Reference(font_id),
        },
    });

    let mut kids: Vec<ObjectId> = Vec::with_capacity(layout.pages.len());
    for page in &layout.pages {
        let content = Content {
            operations: page_operations(page),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
        });
        kids.push(page_id);
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids.iter().map(|id| Object::Reference(*id)).collect::<Vec<Object>>(),
        "Count" => Object::Integer(kids.len() as i64),
        "Resources" => Object::Reference(resources_id),
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(mm_to_pt(PAGE_WIDTH_MM)),
            Object::Real(mm_to_pt(PAGE_HEIGHT_MM)),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

pub fn generate_report(log: &MoodLog, summary: &str) -> Result<Vec<u8>, ReportError> {
    render_pdf(&build_layout(log, summary))
}

/// Writes the report to `dir/moodmate_report.pdf`.
///
/// The bytes go to a sibling `.part` file that is renamed into place; on
/// failure the partial file is removed and nothing is left behind.
pub async fn save_report(dir: &Path, bytes: &[u8]) -> Result<PathBuf, ReportError> {
    fs::create_dir_all(dir).await?;
    let target = dir.join(REPORT_FILE_NAME);
    let partial = dir.join(format!("{REPORT_FILE_NAME}.part"));

    let written = async {
        fs::write(&partial, bytes).await?;
        fs::rename(&partial, &target).await
    }
    .await;

    match written {
        Ok(()) => {
            info!(path = %target.display(), "saved report");
            Ok(target)
        }
        Err(err) => {
            error!(path = %target.display(), "failed to save report: {err}");
            let _ = fs::remove_file(&partial).await;
            Err(err.into())
        }
    }
}
