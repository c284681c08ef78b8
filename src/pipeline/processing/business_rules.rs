use crate::constants::ACTIVE_STATUSES;
use crate::types::{is_present, CanonicalRecord};

/// Active status (case-insensitive) and at least one non-blank contact channel
pub fn is_business_valid(record: &CanonicalRecord) -> bool {
    is_active(record.situacao.as_deref()) && has_contact(record)
}

pub fn is_active(status: Option<&str>) -> bool {
    status
        .map(|s| {
            let s = s.trim();
            ACTIVE_STATUSES.iter().any(|active| s.eq_ignore_ascii_case(active))
        })
        .unwrap_or(false)
}

pub fn has_contact(record: &CanonicalRecord) -> bool {
    is_present(record.telefone.as_deref()) || is_present(record.email.as_deref())
}
