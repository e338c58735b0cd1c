//! Batch upload parsing
//!
//! Uploads are comma-delimited with `|` as the quote character and carry no
//! header row. Rows are kept as raw fields; field-count and required-field
//! checks happen in the upsert worker.

use thiserror::Error;

/// One raw upload row: `first_name, last_name, phone_number, client_member_id, account_id`
pub type CsvRow = Vec<String>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("upload is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    #[error("upload could not be parsed: {0}")]
    Csv(#[from] csv::Error),
}

/// Decode and split an uploaded file into rows
pub fn parse_upload(bytes: &[u8]) -> Result<Vec<CsvRow>, IngestError> {
    let text = std::str::from_utf8(bytes)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .quote(b'|')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(rows)
}
