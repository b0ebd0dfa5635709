//! CSV roster parsing for bulk student creation.
//!
//! Expected header: `Student Code,Full Name,Email,Career Code,User Id`.

use std::io::Read;

use serde::{Deserialize, Deserializer};

/// One parsed roster line. `line` is the 1-based line in the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub line: usize,
    pub student_code: String,
    pub full_name: String,
    pub email: String,
    pub career_code: String,
    pub user_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RosterImportError {
    #[error("invalid roster data on line {line}: {source}")]
    Csv { line: usize, source: csv::Error },
    #[error("line {line}: missing {field}")]
    MissingField { line: usize, field: &'static str },
    #[error("roster contains no students")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "Student Code", default, deserialize_with = "trimmed")]
    student_code: String,
    #[serde(rename = "Full Name", default, deserialize_with = "trimmed")]
    full_name: String,
    #[serde(rename = "Email", default, deserialize_with = "trimmed")]
    email: String,
    #[serde(rename = "Career Code", default, deserialize_with = "trimmed")]
    career_code: String,
    #[serde(rename = "User Id", default, deserialize_with = "trimmed")]
    user_id: String,
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.map(|value| value.trim().to_string()).unwrap_or_default())
}

pub fn parse_roster<R: Read>(reader: R) -> Result<Vec<RosterEntry>, RosterImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|source| RosterImportError::Csv { line: 1, source })?
        .clone();
    let mut entries = Vec::new();

    for record in csv_reader.records() {
        let record = record.map_err(|source| RosterImportError::Csv {
            line: error_line(&source),
            source,
        })?;
        let line = record
            .position()
            .map(|position| position.line() as usize)
            .unwrap_or_default();
        let row: RosterRow = record
            .deserialize(Some(&headers))
            .map_err(|source| RosterImportError::Csv { line, source })?;
        if row.student_code.is_empty()
            && row.full_name.is_empty()
            && row.email.is_empty()
            && row.career_code.is_empty()
            && row.user_id.is_empty()
        {
            continue;
        }

        let check = |value: &str, field: &'static str| {
            if value.is_empty() {
                Err(RosterImportError::MissingField { line, field })
            } else {
                Ok(())
            }
        };
        check(&row.student_code, "Student Code")?;
        check(&row.full_name, "Full Name")?;
        check(&row.email, "Email")?;
        check(&row.career_code, "Career Code")?;
        check(&row.user_id, "User Id")?;

        entries.push(RosterEntry {
            line,
            student_code: row.student_code,
            full_name: row.full_name,
            email: row.email,
            career_code: row.career_code.to_ascii_uppercase(),
            user_id: row.user_id,
        });
    }

    if entries.is_empty() {
        return Err(RosterImportError::Empty);
    }

    Ok(entries)
}

fn error_line(error: &csv::Error) -> usize {
    error
        .position()
        .map(|position| position.line() as usize)
        .unwrap_or_default()
}
