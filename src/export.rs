//! Tabular export: the `.xlsx` workbook and a plain-text table for terminals.
//!
//! An `.xlsx` file is a zip of SpreadsheetML parts. The workbook written here
//! is the smallest one Excel, LibreOffice and `calamine` all accept: one
//! worksheet, a bold header row with the nine column titles, then one row per
//! report. Every value is written as an inline string, exactly as the model
//! returned it; no index column.

use crate::error::ExtractError;
use crate::output::ReportFields;
use crate::prompts::{COLUMNS, FIELD_COUNT};
use quick_xml::escape::escape;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

// Cell format 1 is the bold header style.
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

const HEADER_STYLE: u8 = 1;

/// Build the workbook in memory.
pub fn xlsx_bytes(sheet_name: &str, rows: &[&ReportFields]) -> Result<Vec<u8>, ExtractError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts: [(&str, String); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", workbook_xml(sheet_name)),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/styles.xml", STYLES.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(rows)),
    ];

    for (name, body) in parts {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())
            .map_err(|e| ExtractError::SpreadsheetFailed(format!("{name}: {e}")))?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Write the workbook to `path`, replacing any existing file.
pub fn write_xlsx(path: &Path, sheet_name: &str, rows: &[&ReportFields]) -> Result<(), ExtractError> {
    let bytes = xlsx_bytes(sheet_name, rows)?;
    write_atomic(path, &bytes)
}

/// Write `bytes` via a temp file in the destination directory, then rename,
/// so readers never see a half-written workbook.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ExtractError> {
    let write_failed = |source: std::io::Error| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(write_failed)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_failed)?;
    tmp.write_all(bytes).map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;
    Ok(())
}

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        escape(sheet_name)
    )
}

fn sheet_xml(rows: &[&ReportFields]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    );

    xml.push_str("<cols>");
    for (i, width) in column_widths(rows).into_iter().enumerate() {
        let _ = write!(
            xml,
            r#"<col min="{n}" max="{n}" width="{width}" customWidth="1"/>"#,
            n = i + 1
        );
    }
    xml.push_str("</cols><sheetData>");

    push_row(&mut xml, 1, COLUMNS, Some(HEADER_STYLE));
    for (i, fields) in rows.iter().enumerate() {
        push_row(&mut xml, i + 2, fields.as_row(), None);
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn push_row<'a>(
    xml: &mut String,
    row_num: usize,
    values: impl IntoIterator<Item = &'a str>,
    style: Option<u8>,
) {
    let _ = write!(xml, r#"<row r="{row_num}">"#);
    for (col, value) in values.into_iter().enumerate() {
        if value.is_empty() {
            continue;
        }
        let cell_ref = format!("{}{}", column_letter(col), row_num);
        let style_attr = style.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();
        let _ = write!(
            xml,
            r#"<c r="{cell_ref}" t="inlineStr"{style_attr}><is><t xml:space="preserve">{}</t></is></c>"#,
            escape(&xml_safe(value))
        );
    }
    xml.push_str("</row>");
}

/// Spreadsheet column name for a 0-based index: 0 → A, 25 → Z, 26 → AA.
fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Keep only characters matching the XML 1.0 `Char` production; the rest
/// cannot appear in a part even when escaped.
fn xml_safe(value: &str) -> String {
    value
        .chars()
        .filter(|&c| {
            matches!(c,
                '\t' | '\n' | '\r'
                | '\u{20}'..='\u{D7FF}'
                | '\u{E000}'..='\u{FFFD}'
                | '\u{10000}'..='\u{10FFFF}')
        })
        .collect()
}

/// Longest value per column in characters, header included.
fn content_widths(rows: &[&ReportFields]) -> Vec<usize> {
    let mut widths: Vec<usize> = COLUMNS.iter().map(|c| c.chars().count()).collect();
    for fields in rows {
        for (w, v) in widths.iter_mut().zip(fields.as_row()) {
            *w = (*w).max(v.chars().count());
        }
    }
    widths
}

/// Excel column widths: content plus padding, within sensible bounds.
fn column_widths(rows: &[&ReportFields]) -> Vec<usize> {
    content_widths(rows)
        .into_iter()
        .map(|w| (w + 2).clamp(8, 60))
        .collect()
}

/// Render rows as an aligned text table with a leading row index.
pub fn render_table(rows: &[&ReportFields]) -> String {
    let index_width = rows.len().saturating_sub(1).to_string().len();
    let widths = content_widths(rows);

    let mut out = String::new();
    let mut line = |index: &str, cells: [&str; FIELD_COUNT]| {
        let _ = write!(out, "{index:>index_width$}");
        for (cell, width) in cells.iter().zip(widths.iter().copied()) {
            let _ = write!(out, "  {cell:<width$}");
        }
        let trimmed = out.trim_end_matches(' ').len();
        out.truncate(trimmed);
        out.push('\n');
    };

    line("", COLUMNS);
    for (i, fields) in rows.iter().enumerate() {
        line(&i.to_string(), fields.as_row());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn fields(first: &str, overall: &str) -> ReportFields {
        ReportFields {
            first_name: first.into(),
            family_name: "Haddad".into(),
            overall: overall.into(),
            cefr_level: "C1".into(),
            ..Default::default()
        }
    }

    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut s = String::new();
        file.read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(8), "I");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn workbook_contains_every_part() {
        let bytes = xlsx_bytes("Sheet1", &[]).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(&bytes[..])).unwrap();
        let mut names: Vec<_> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            [
                "[Content_Types].xml",
                "_rels/.rels",
                "xl/_rels/workbook.xml.rels",
                "xl/styles.xml",
                "xl/workbook.xml",
                "xl/worksheets/sheet1.xml",
            ]
        );
    }

    #[test]
    fn header_row_is_bold_and_complete() {
        let bytes = xlsx_bytes("Sheet1", &[]).unwrap();
        let sheet = part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains(r#"<c r="A1" t="inlineStr" s="1"><is><t xml:space="preserve">First Name</t>"#));
        assert!(sheet.contains(r#"<c r="I1" t="inlineStr" s="1"><is><t xml:space="preserve">CEFR Level</t>"#));
        assert!(!sheet.contains(r#"r="A2""#));
    }

    #[test]
    fn values_are_escaped_and_blanks_omitted() {
        let f = fields("O'Brien & <Co>", "7.5");
        let bytes = xlsx_bytes("Sheet1", &[&f]).unwrap();
        let sheet = part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains("O&apos;Brien &amp; &lt;Co&gt;"));
        assert!(sheet.contains(r#"<c r="H2" t="inlineStr"><is><t xml:space="preserve">7.5</t>"#));
        assert!(!sheet.contains(r#"r="C2""#), "blank exam date must not produce a cell");
    }

    #[test]
    fn sheet_name_is_escaped() {
        let bytes = xlsx_bytes("R&D", &[]).unwrap();
        assert!(part(&bytes, "xl/workbook.xml").contains(r#"name="R&amp;D""#));
    }

    #[test]
    fn control_characters_are_dropped() {
        assert_eq!(xml_safe("7.5\u{0}\u{7}"), "7.5");
        assert_eq!(xml_safe("a\tb"), "a\tb");
    }

    #[test]
    fn xml_char_production_is_respected() {
        assert_eq!(xml_safe("C1\u{85}\u{9F}"), "C1\u{85}\u{9F}");
        assert_eq!(xml_safe("C1\u{FFFE}\u{FFFF}"), "C1");
        assert_eq!(xml_safe("Zoë 😀"), "Zoë 😀");
    }

    #[test]
    fn atomic_write_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/nested/IELTS Results.xlsx");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");

        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn table_is_aligned_with_index() {
        let a = fields("Amina", "7.5");
        let b = fields("Jo", "6");
        let table = render_table(&[&a, &b]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("   First Name  Family Name"));
        assert!(lines[1].starts_with("0  Amina       Haddad"));
        assert!(lines[2].starts_with("1  Jo          Haddad"));
        assert!(lines.iter().all(|l| !l.ends_with(' ')));

        let col = lines[0].find("Overall Band Score").unwrap();
        assert_eq!(&lines[1][col..col + 3], "7.5");
        assert_eq!(&lines[2][col..col + 1], "6");
    }
}
