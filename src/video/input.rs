use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;

use super::error::QaVideoError;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// One question/answer row of the input table. `index` is the 1-based data
/// row number (the header is not counted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QaPair {
    pub index: usize,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableEncoding {
    Utf8,
    Utf8Bom,
    Latin1,
}

impl fmt::Display for TableEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableEncoding::Utf8 => write!(f, "utf-8"),
            TableEncoding::Utf8Bom => write!(f, "utf-8-sig"),
            TableEncoding::Latin1 => write!(f, "latin-1"),
        }
    }
}

#[derive(Debug)]
pub struct QaTable {
    pub pairs: Vec<QaPair>,
    pub encoding: TableEncoding,
}

pub fn read_qa_file(path: &Path) -> Result<QaTable, QaVideoError> {
    let bytes = fs::read(path)?;
    let (contents, encoding) = decode_table(&bytes);
    let pairs = parse_qa_table(&contents)?;
    Ok(QaTable { pairs, encoding })
}

/// Decode raw table bytes. UTF-8 is preferred (with or without BOM); anything
/// else is read as Latin-1, which never fails.
pub fn decode_table(bytes: &[u8]) -> (String, TableEncoding) {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        if let Ok(text) = std::str::from_utf8(rest) {
            return (text.to_string(), TableEncoding::Utf8Bom);
        }
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), TableEncoding::Utf8),
        Err(_) => (
            bytes.iter().map(|&b| b as char).collect(),
            TableEncoding::Latin1,
        ),
    }
}

/// Parse the table body. The first record is a header and is ignored; every
/// other record must have a non-empty question and answer in its first two
/// columns. All rows are validated before anything is returned.
pub fn parse_qa_table(contents: &str) -> Result<Vec<QaPair>, QaVideoError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(contents.as_bytes());

    let mut pairs = Vec::new();
    for (offset, record) in reader.records().enumerate() {
        let row = offset + 1;
        let record = record.map_err(|err| QaVideoError::Parse {
            row,
            message: format!("malformed record: {err}"),
        })?;

        if record.len() < 2 {
            return Err(QaVideoError::Parse {
                row,
                message: format!(
                    "expected at least 2 columns (question, answer), found {}",
                    record.len()
                ),
            });
        }

        let question = record.get(0).unwrap_or_default().trim();
        let answer = record.get(1).unwrap_or_default().trim();
        if question.is_empty() {
            return Err(QaVideoError::Parse {
                row,
                message: "question is empty".to_string(),
            });
        }
        if answer.is_empty() {
            return Err(QaVideoError::Parse {
                row,
                message: format!("answer is empty for question \"{question}\""),
            });
        }

        pairs.push(QaPair {
            index: row,
            question: question.to_string(),
            answer: answer.to_string(),
        });
    }

    if pairs.is_empty() {
        return Err(QaVideoError::EmptyInput);
    }

    Ok(pairs)
}
