//! DOCX text extraction using docx-rs.
//!
//! Walks the document body in order, including tracked insertions, moved-to
//! text, content controls and tables nested in cells. Deleted and moved-from
//! text is left out. Paragraph runs are concatenated as-is; each paragraph
//! and each table row becomes its own line.

use std::path::Path;

use docx_rs::{
    DocumentChild, InsertChild, MoveToChild, Paragraph, ParagraphChild, Run, RunChild,
    StructuredDataTag, StructuredDataTagChild, Table, TableCellContent, TableChild, TableRowChild,
};

use crate::error::ExtractError;

/// Read a DOCX and return its body text. Called within `spawn_blocking`.
pub(super) fn read_docx_sync(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path)?;
    let docx = docx_rs::read_docx(&bytes)
        .map_err(|e| ExtractError::Docx(format!("Failed to parse DOCX: {e}")))?;

    let mut lines: Vec<String> = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => lines.push(paragraph_text(p)),
            DocumentChild::Table(t) => lines.extend(table_lines(t)),
            DocumentChild::StructuredDataTag(sdt) => block_sdt_lines(sdt, &mut lines),
            _ => {}
        }
    }

    Ok(lines.join("\n"))
}

fn paragraph_text(p: &Paragraph) -> String {
    let mut text = String::new();
    push_children(&p.children, &mut text);
    text
}

fn push_children(children: &[ParagraphChild], text: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(r) => push_run(r, text),
            ParagraphChild::Insert(ins) => {
                for c in &ins.children {
                    if let InsertChild::Run(r) = c {
                        push_run(r, text);
                    }
                }
            }
            ParagraphChild::MoveTo(mv) => {
                for c in &mv.children {
                    if let MoveToChild::Run(r) = c {
                        push_run(r, text);
                    }
                }
            }
            ParagraphChild::Hyperlink(h) => push_children(&h.children, text),
            ParagraphChild::StructuredDataTag(sdt) => push_inline_sdt(sdt, text),
            _ => {}
        }
    }
}

fn push_run(r: &Run, text: &mut String) {
    for child in &r.children {
        match child {
            RunChild::Text(t) => text.push_str(&t.text),
            RunChild::Tab(_) | RunChild::PTab(_) => text.push('\t'),
            RunChild::Break(_) | RunChild::CarriageReturn(_) => text.push('\n'),
            _ => {}
        }
    }
}

/// Content control inside a paragraph: its text joins the paragraph's line.
fn push_inline_sdt(sdt: &StructuredDataTag, text: &mut String) {
    for child in &sdt.children {
        match child {
            StructuredDataTagChild::Run(r) => push_run(r, text),
            StructuredDataTagChild::Paragraph(p) => push_children(&p.children, text),
            StructuredDataTagChild::StructuredDataTag(inner) => push_inline_sdt(inner, text),
            StructuredDataTagChild::Table(t) => text.push_str(&table_lines(t).join("\n")),
            _ => {}
        }
    }
}

/// Content control at block level: paragraphs and table rows become lines,
/// loose runs are gathered into one line.
fn block_sdt_lines(sdt: &StructuredDataTag, lines: &mut Vec<String>) {
    let mut loose = String::new();
    for child in &sdt.children {
        match child {
            StructuredDataTagChild::Run(r) => push_run(r, &mut loose),
            StructuredDataTagChild::Paragraph(p) => lines.push(paragraph_text(p)),
            StructuredDataTagChild::Table(t) => lines.extend(table_lines(t)),
            StructuredDataTagChild::StructuredDataTag(inner) => block_sdt_lines(inner, lines),
            _ => {}
        }
    }
    if !loose.is_empty() {
        lines.push(loose);
    }
}

/// One line per row, cells separated by tabs.
fn table_lines(t: &Table) -> Vec<String> {
    let mut rows = Vec::with_capacity(t.rows.len());
    for row in &t.rows {
        let TableChild::TableRow(r) = row;
        let cells: Vec<String> = r
            .cells
            .iter()
            .map(|cell| {
                let TableRowChild::TableCell(c) = cell;
                let mut parts: Vec<String> = Vec::new();
                for content in &c.children {
                    match content {
                        TableCellContent::Paragraph(p) => parts.push(paragraph_text(p)),
                        TableCellContent::Table(nested) => parts.extend(table_lines(nested)),
                        TableCellContent::StructuredDataTag(sdt) => block_sdt_lines(sdt, &mut parts),
                        _ => {}
                    }
                }
                parts.join(" ")
            })
            .collect();
        rows.push(cells.join("\t"));
    }
    rows
}
