//! Transcript export: plain text and a paginated PDF
//!
//! The PDF uses the built-in Helvetica font, so anything outside Latin-1
//! is dropped before layout.

use anyhow::Result;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::state::ChatMessage;

pub const TEXT_FILE_NAME: &str = "chat_history.txt";
pub const DOCUMENT_FILE_NAME: &str = "chat_history.pdf";

const MM: f32 = 72.0 / 25.4;
const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 10.0 * MM;
const BOTTOM_MARGIN: f32 = 15.0 * MM;
const CELL_PADDING: f32 = 1.0 * MM;
const LINE_HEIGHT: f32 = 10.0 * MM;
const FONT_SIZE: f32 = 12.0;

/// Helvetica advance widths (1/1000 em) for ASCII 32..=126
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// One `"Role: content"` line per message, joined with newlines, as UTF-8.
pub fn to_text(messages: &[ChatMessage]) -> Vec<u8> {
    messages
        .iter()
        .map(ChatMessage::labelled)
        .collect::<Vec<_>>()
        .join("\n")
        .into_bytes()
}

/// Render the transcript as an A4 PDF, one wrapped paragraph per message.
pub fn to_document(messages: &[ChatMessage]) -> Result<Vec<u8>> {
    let paragraphs: Vec<String> = messages
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), to_latin1(&m.content)))
        .collect();
    let pages = layout(&paragraphs);

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
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in &pages {
        let mut operations = Vec::new();
        for line in page {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]));
            operations.push(Operation::new("Td", vec![line.x.into(), line.y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(latin1_bytes(&line.text))]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    tracing::debug!(pages = pages.len(), bytes = buffer.len(), "rendered transcript PDF");
    Ok(buffer)
}

/// Drop every character that Latin-1 cannot represent.
pub fn to_latin1(text: &str) -> String {
    text.chars().filter(|c| (*c as u32) <= 0xff).collect()
}

fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars().filter_map(|c| u8::try_from(c as u32).ok()).collect()
}

#[derive(Debug, Clone, PartialEq)]
struct PlacedLine {
    x: f32,
    y: f32,
    text: String,
}

/// Wrap every paragraph and distribute the lines over pages, breaking
/// whenever the next line would cross the bottom margin.
fn layout(paragraphs: &[String]) -> Vec<Vec<PlacedLine>> {
    let max_width = PAGE_WIDTH - 2.0 * MARGIN - 2.0 * CELL_PADDING;
    let break_at = PAGE_HEIGHT - BOTTOM_MARGIN;

    let mut pages = vec![Vec::new()];
    let mut y = MARGIN;

    for paragraph in paragraphs {
        for text in wrap(paragraph, max_width) {
            if y + LINE_HEIGHT > break_at {
                pages.push(Vec::new());
                y = MARGIN;
            }
            let baseline = y + 0.5 * LINE_HEIGHT + 0.3 * FONT_SIZE;
            if let Some(page) = pages.last_mut() {
                page.push(PlacedLine {
                    x: MARGIN + CELL_PADDING,
                    y: PAGE_HEIGHT - baseline,
                    text,
                });
            }
            y += LINE_HEIGHT;
        }
    }

    pages
}

fn char_width(c: char) -> f32 {
    let units = match c as u32 {
        code @ 32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
        _ => 556,
    };
    f32::from(units) * FONT_SIZE / 1000.0
}

fn text_width(text: &str) -> f32 {
    text.chars().map(char_width).sum()
}

/// Greedy word wrap; words wider than a whole line are split by character.
fn wrap(text: &str, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let mut line = String::new();
        let mut width = 0.0;

        for word in paragraph.split(' ') {
            let word_width = text_width(word);
            let space_width = if line.is_empty() { 0.0 } else { char_width(' ') };

            if !line.is_empty() && width + space_width + word_width > max_width {
                lines.push(std::mem::take(&mut line));
                width = 0.0;
            }

            if word_width > max_width {
                for c in word.chars() {
                    let w = char_width(c);
                    if !line.is_empty() && width + w > max_width {
                        lines.push(std::mem::take(&mut line));
                        width = 0.0;
                    }
                    line.push(c);
                    width += w;
                }
                continue;
            }

            if !line.is_empty() {
                line.push(' ');
                width += space_width;
            }
            line.push_str(word);
            width += word_width;
        }

        lines.push(line);
    }

    lines
}
