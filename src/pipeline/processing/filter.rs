use csv::StringRecord;
use tracing::info;

use crate::constants::{FIELD_ACTIVITY_CODE, FIELD_EMAIL, FIELD_PHONE, FIELD_STATE};
use crate::error::{PipelineError, Result};

/// Optional narrowing of an exported lead list
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    /// Substring the state column must contain
    pub uf: Option<String>,
    /// Substring the activity-code column must contain
    pub cnae: Option<String>,
    /// Keep only rows with a phone or an email
    pub only_contact: bool,
}

struct Columns {
    uf: Option<usize>,
    cnae: Option<usize>,
    phone: Option<usize>,
    email: Option<usize>,
}

impl LeadFilter {
    pub fn is_empty(&self) -> bool {
        self.uf.is_none() && self.cnae.is_none() && !self.only_contact
    }

    fn columns(&self, headers: &StringRecord) -> Result<Columns> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let require = |wanted: bool, name: &str| -> Result<Option<usize>> {
            match (wanted, find(name)) {
                (false, _) => Ok(None),
                (true, Some(i)) => Ok(Some(i)),
                (true, None) => Err(PipelineError::Input(format!("column '{name}' not found"))),
            }
        };

        let columns = Columns {
            uf: require(self.uf.is_some(), FIELD_STATE)?,
            cnae: require(self.cnae.is_some(), FIELD_ACTIVITY_CODE)?,
            phone: find(FIELD_PHONE),
            email: find(FIELD_EMAIL),
        };
        if self.only_contact && columns.phone.is_none() && columns.email.is_none() {
            return Err(PipelineError::Input(format!(
                "neither '{FIELD_PHONE}' nor '{FIELD_EMAIL}' column found"
            )));
        }
        Ok(columns)
    }

    fn matches(&self, columns: &Columns, row: &StringRecord) -> bool {
        let cell = |index: Option<usize>| index.and_then(|i| row.get(i)).unwrap_or("");

        if let Some(uf) = &self.uf {
            if !cell(columns.uf).contains(uf.as_str()) {
                return false;
            }
        }
        if let Some(cnae) = &self.cnae {
            if !cell(columns.cnae).contains(cnae.as_str()) {
                return false;
            }
        }
        if self.only_contact {
            let has_phone = !cell(columns.phone).trim().is_empty();
            let has_email = !cell(columns.email).trim().is_empty();
            if !has_phone && !has_email {
                return false;
            }
        }
        true
    }

    /// Apply the filter to rows of a flat CSV export
    pub fn apply(&self, headers: &StringRecord, rows: Vec<StringRecord>) -> Result<Vec<StringRecord>> {
        let before = rows.len();
        if self.is_empty() {
            return Ok(rows);
        }
        let columns = self.columns(headers)?;
        let kept: Vec<StringRecord> = rows.into_iter().filter(|row| self.matches(&columns, row)).collect();
        info!(before, after = kept.len(), "Leads filtered");
        Ok(kept)
    }
}
