use std::io::Read;
use std::path::Path;

use serde_json::{Map, Value};

use super::domain::Claim;

#[derive(Debug)]
pub enum ClaimImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Claim { row: usize, source: serde_json::Error },
}

impl std::fmt::Display for ClaimImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimImportError::Io(err) => write!(f, "failed to read claims file: {}", err),
            ClaimImportError::Csv(err) => write!(f, "invalid claims CSV data: {}", err),
            ClaimImportError::Claim { row, source } => {
                write!(f, "claims row {} is not a valid claim: {}", row, source)
            }
        }
    }
}

impl std::error::Error for ClaimImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClaimImportError::Io(err) => Some(err),
            ClaimImportError::Csv(err) => Some(err),
            ClaimImportError::Claim { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for ClaimImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ClaimImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Reads claim rows from a headered CSV export. Cells are trimmed and empty
/// cells are treated as absent; unknown columns are kept on the claim.
pub struct ClaimImporter;

impl ClaimImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Claim>, ClaimImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Claim>, ClaimImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let mut claims = Vec::new();

        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let row: Map<String, Value> = headers
                .iter()
                .zip(record.iter())
                .filter(|(header, cell)| !header.is_empty() && !cell.is_empty())
                .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
                .collect();

            let claim = serde_json::from_value::<Claim>(Value::Object(row)).map_err(|source| {
                ClaimImportError::Claim {
                    row: index + 1,
                    source,
                }
            })?;
            claims.push(claim);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const EXPORT: &str = "\
claim_id,encounter_type,service_code,paid_amount_aed,approval_number,payer_group
C-1, Outpatient ,SRV1001,120.50,,gold
C-2,Inpatient,SRV2001,,APR-9,
";

    #[test]
    fn imports_typed_and_extra_columns() {
        let claims = ClaimImporter::from_reader(Cursor::new(EXPORT)).expect("export parses");
        assert_eq!(claims.len(), 2);

        let first = &claims[0];
        assert_eq!(first.claim_id.0, "C-1");
        assert_eq!(first.encounter(), "Outpatient");
        assert_eq!(first.paid_amount_aed, Some(120.5));
        assert_eq!(first.approval_number, None);
        assert_eq!(first.field("payer_group"), Some(Value::String("gold".into())));

        let second = &claims[1];
        assert_eq!(second.paid_amount_aed, None);
        assert!(second.has_approval());
        assert_eq!(second.field("payer_group"), None);
    }

    #[test]
    fn rows_without_claim_id_are_rejected() {
        let err = ClaimImporter::from_reader(Cursor::new("claim_id,service_code\n,SRV1001\n"))
            .expect_err("claim id is required");
        match err {
            ClaimImportError::Claim { row, .. } => assert_eq!(row, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_surfaces_io_error() {
        let err = ClaimImporter::from_path("/definitely/not/here.csv").expect_err("no file");
        assert!(matches!(err, ClaimImportError::Io(_)));
    }
}
