use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rust_xlsxwriter::{Color, Format, Workbook};

use super::schema::FieldSchema;

/// Content type of the exported workbook.
pub const WORKBOOK_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const HEADER_FILL: u32 = 0x1F4E78;
const MIN_COLUMN_WIDTH: f64 = 10.0;
const MAX_COLUMN_WIDTH: f64 = 40.0;

/// Workbook generation failure, surfaced as a server-side error. The intake
/// path is unaffected: rows are durable before export is attempted.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("workbook serialization failed: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
}

/// Download filename for an export generated at `now`.
pub fn workbook_filename(now: NaiveDateTime) -> String {
    format!("KV_Applications_{}.xlsx", now.format("%Y%m%d_%H%M%S"))
}

/// Render all rows as a downloadable spreadsheet: bold white-on-dark header,
/// columns auto-sized from content up to a maximum width.
pub fn export_workbook(
    schema: &FieldSchema,
    rows: &[BTreeMap<String, String>],
) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Applications")?;

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL));

    for (column, field) in schema.fields().iter().enumerate() {
        let column = column as u16;
        worksheet.write_string_with_format(0, column, *field, &header_format)?;

        let mut width = field.len();
        for (line, row) in rows.iter().enumerate() {
            let value = row.get(*field).map(String::as_str).unwrap_or_default();
            width = width.max(value.chars().count());
            worksheet.write_string(line as u32 + 1, column, value)?;
        }

        worksheet.set_column_width(
            column,
            (width as f64 + 2.0).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH),
        )?;
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(name: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("RegistrationNo".to_string(), "KV-20250924101500".to_string()),
            ("Name".to_string(), name.to_string()),
        ])
    }

    #[test]
    fn filename_embeds_the_export_timestamp() {
        let now = NaiveDate::from_ymd_opt(2025, 9, 24)
            .expect("valid date")
            .and_hms_opt(10, 15, 0)
            .expect("valid time");
        assert_eq!(workbook_filename(now), "KV_Applications_20250924_101500.xlsx");
    }

    #[test]
    fn export_produces_an_xlsx_archive() {
        let bytes = export_workbook(&FieldSchema::standard(), &[row("Asha Rao")])
            .expect("workbook renders");
        // XLSX files are zip containers; check the magic bytes.
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn export_tolerates_rows_with_missing_cells() {
        let rows = vec![row("Asha Rao"), BTreeMap::new()];
        export_workbook(&FieldSchema::standard(), &rows).expect("missing cells render empty");
    }

    #[test]
    fn export_of_empty_store_still_renders_the_header() {
        let bytes = export_workbook(&FieldSchema::standard(), &[]).expect("header-only workbook");
        assert!(!bytes.is_empty());
    }
}
