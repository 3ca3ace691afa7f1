//! CSV upload parsing

use csv::{ReaderBuilder, StringRecord, Trim};

use super::HospitalPayload;
use crate::domain::error::DomainError;

const NAME_COLUMN: &str = "name";
const ADDRESS_COLUMN: &str = "address";
const PHONE_COLUMN: &str = "phone";

/// Check that the uploaded file name carries a `.csv` extension
pub fn validate_filename(filename: Option<&str>) -> Result<(), DomainError> {
    match filename {
        Some(name) if name.to_lowercase().ends_with(".csv") => Ok(()),
        _ => Err(DomainError::validation("Only CSV files are accepted")),
    }
}

/// Parse an uploaded CSV into hospital payloads.
///
/// The first line is the header. Column lookup is by header name, so column
/// order does not matter and unknown columns are ignored. A UTF-8 byte order
/// mark is stripped before parsing.
pub fn parse_upload(
    filename: Option<&str>,
    content: &[u8],
    max_rows: usize,
) -> Result<Vec<HospitalPayload>, DomainError> {
    validate_filename(filename)?;

    let text = std::str::from_utf8(content)
        .map_err(|_| DomainError::validation("Unable to decode CSV file as UTF-8"))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DomainError::validation(format!("Malformed CSV header: {}", e)))?
        .clone();

    let columns = Columns::locate(&headers);
    let mut rows = Vec::new();

    for record in reader.records() {
        let record =
            record.map_err(|e| DomainError::validation(format!("Malformed CSV row: {}", e)))?;

        if is_blank(&record) {
            continue;
        }

        if rows.len() == max_rows {
            return Err(DomainError::validation(format!(
                "Maximum {} hospitals allowed per upload",
                max_rows
            )));
        }

        rows.push(columns.payload(&record));
    }

    if rows.is_empty() {
        return Err(DomainError::validation(
            "CSV is empty or missing header row",
        ));
    }

    Ok(rows)
}

struct Columns {
    name: Option<usize>,
    address: Option<usize>,
    phone: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Self {
        let find = |column: &str| headers.iter().position(|h| h == column);

        Self {
            name: find(NAME_COLUMN),
            address: find(ADDRESS_COLUMN),
            phone: find(PHONE_COLUMN),
        }
    }

    fn payload(&self, record: &StringRecord) -> HospitalPayload {
        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i));

        HospitalPayload::from_columns(
            field(self.name),
            field(self.address),
            field(self.phone),
        )
    }
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(str::is_empty) && record.len() <= 1
}
