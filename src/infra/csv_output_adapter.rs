use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::app::ports::{QualificationOutputPort, ResolutionOutputPort};
use crate::constants::*;
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::dedup::dedup_by_identifier;
use crate::pipeline::processing::lead::QualifiedLead;
use crate::types::{CanonicalRecord, RawLookupResult};

/// Column order of the full audited export; matches `CanonicalRecord` field order
pub const FULL_COLUMNS: [&str; 20] = [
    "query",
    "cnpj",
    "valid_format",
    "error",
    "razao_social",
    "nome_fantasia",
    "municipio",
    "uf",
    "bairro",
    "logradouro",
    "numero",
    "cep",
    "telefone",
    "email",
    "situacao",
    "cnae_fiscal",
    "porte_empresa",
    "data_inicio_atividade",
    "natureza_juridica",
    "raw_json",
];

const LEAN_COLUMNS: [&str; 9] = [
    "cnpj",
    "razao_social",
    "nome_fantasia",
    "municipio",
    "uf",
    "telefone",
    "email",
    "situacao",
    "cnae_fiscal",
];

const SCORED_COLUMNS: [&str; 25] = [
    "query",
    "cnpj",
    "valid_format",
    "error",
    "razao_social",
    "nome_fantasia",
    "municipio",
    "uf",
    "bairro",
    "logradouro",
    "numero",
    "cep",
    "telefone",
    "email",
    "situacao",
    "cnae_fiscal",
    "porte_empresa",
    "data_inicio_atividade",
    "natureza_juridica",
    "completeness_score",
    "validation_errors",
    "is_valid_structural",
    "structural_score",
    "classification",
    "is_valid_business",
];

const FINAL_COLUMNS: [&str; 12] = [
    "cnpj",
    "razao_social",
    "nome_fantasia",
    "municipio",
    "uf",
    "telefone",
    "email",
    "cnae_fiscal",
    "porte_empresa",
    "situacao",
    "structural_score",
    "classification",
];

#[derive(Serialize)]
struct LeanRow<'a> {
    cnpj: &'a str,
    razao_social: Option<&'a str>,
    nome_fantasia: Option<&'a str>,
    municipio: Option<&'a str>,
    uf: Option<&'a str>,
    telefone: Option<&'a str>,
    email: Option<&'a str>,
    situacao: Option<&'a str>,
    cnae_fiscal: Option<&'a str>,
}

impl<'a> From<&'a CanonicalRecord> for LeanRow<'a> {
    fn from(r: &'a CanonicalRecord) -> Self {
        Self {
            cnpj: &r.cnpj,
            razao_social: r.razao_social.as_deref(),
            nome_fantasia: r.nome_fantasia.as_deref(),
            municipio: r.municipio.as_deref(),
            uf: r.uf.as_deref(),
            telefone: r.telefone.as_deref(),
            email: r.email.as_deref(),
            situacao: r.situacao.as_deref(),
            cnae_fiscal: r.cnae_fiscal.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct ScoredRow<'a> {
    query: &'a str,
    cnpj: &'a str,
    valid_format: bool,
    error: Option<&'a str>,
    razao_social: Option<&'a str>,
    nome_fantasia: Option<&'a str>,
    municipio: Option<&'a str>,
    uf: Option<&'a str>,
    bairro: Option<&'a str>,
    logradouro: Option<&'a str>,
    numero: Option<&'a str>,
    cep: Option<&'a str>,
    telefone: Option<&'a str>,
    email: Option<&'a str>,
    situacao: Option<&'a str>,
    cnae_fiscal: Option<&'a str>,
    porte_empresa: Option<&'a str>,
    data_inicio_atividade: Option<&'a str>,
    natureza_juridica: Option<&'a str>,
    completeness_score: f64,
    validation_errors: String,
    is_valid_structural: bool,
    structural_score: u32,
    classification: &'static str,
    is_valid_business: bool,
}

impl<'a> From<&'a QualifiedLead> for ScoredRow<'a> {
    fn from(lead: &'a QualifiedLead) -> Self {
        let r = &lead.record;
        Self {
            query: &r.query,
            cnpj: &r.cnpj,
            valid_format: r.valid_format,
            error: r.error.as_deref(),
            razao_social: r.razao_social.as_deref(),
            nome_fantasia: r.nome_fantasia.as_deref(),
            municipio: r.municipio.as_deref(),
            uf: r.uf.as_deref(),
            bairro: r.bairro.as_deref(),
            logradouro: r.logradouro.as_deref(),
            numero: r.numero.as_deref(),
            cep: r.cep.as_deref(),
            telefone: r.telefone.as_deref(),
            email: r.email.as_deref(),
            situacao: r.situacao.as_deref(),
            cnae_fiscal: r.cnae_fiscal.as_deref(),
            porte_empresa: r.porte_empresa.as_deref(),
            data_inicio_atividade: r.data_inicio_atividade.as_deref(),
            natureza_juridica: r.natureza_juridica.as_deref(),
            completeness_score: lead.validation.completeness_score,
            validation_errors: lead.validation.validation_errors(),
            is_valid_structural: lead.validation.is_valid_structural,
            structural_score: lead.structural_score,
            classification: lead.classification.as_str(),
            is_valid_business: lead.is_valid_business,
        }
    }
}

#[derive(Serialize)]
struct FinalRow<'a> {
    cnpj: &'a str,
    razao_social: Option<&'a str>,
    nome_fantasia: Option<&'a str>,
    municipio: Option<&'a str>,
    uf: Option<&'a str>,
    telefone: Option<&'a str>,
    email: Option<&'a str>,
    cnae_fiscal: Option<&'a str>,
    porte_empresa: Option<&'a str>,
    situacao: Option<&'a str>,
    structural_score: u32,
    classification: &'static str,
}

impl<'a> From<&'a QualifiedLead> for FinalRow<'a> {
    fn from(lead: &'a QualifiedLead) -> Self {
        let r = &lead.record;
        Self {
            cnpj: &r.cnpj,
            razao_social: r.razao_social.as_deref(),
            nome_fantasia: r.nome_fantasia.as_deref(),
            municipio: r.municipio.as_deref(),
            uf: r.uf.as_deref(),
            telefone: r.telefone.as_deref(),
            email: r.email.as_deref(),
            cnae_fiscal: r.cnae_fiscal.as_deref(),
            porte_empresa: r.porte_empresa.as_deref(),
            situacao: r.situacao.as_deref(),
            structural_score: lead.structural_score,
            classification: lead.classification.as_str(),
        }
    }
}

/// One line of the raw JSONL export
#[derive(Serialize)]
struct RawLine<'a> {
    query: &'a str,
    cnpj: &'a str,
    resolved_at: String,
    payload: &'a serde_json::Value,
}

/// CSV and JSONL implementation of both output ports, rooted at one directory
#[derive(Debug, Clone)]
pub struct CsvOutputAdapter {
    dir: PathBuf,
}

impl CsvOutputAdapter {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "Output directory ready");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    fn write_raw_jsonl(&self, results: &[RawLookupResult]) -> Result<usize> {
        let path = self.path(RECORDS_RAW_FILE);
        let mut writer = BufWriter::new(File::create(&path)?);
        let mut written = 0;
        for result in results {
            let Some(payload) = &result.payload else {
                continue;
            };
            let line = RawLine {
                query: &result.query,
                cnpj: &result.identifier,
                resolved_at: result.resolved_at.to_rfc3339(),
                payload,
            };
            serde_json::to_writer(&mut writer, &line)?;
            writer.write_all(b"\n")?;
            written += 1;
        }
        writer.flush()?;
        info!(path = %path.display(), rows = written, "Wrote raw payloads");
        Ok(written)
    }
}

impl ResolutionOutputPort for CsvOutputAdapter {
    fn write_resolution(&self, results: &[RawLookupResult], records: &[CanonicalRecord]) -> anyhow::Result<()> {
        write_full(&self.path(RECORDS_FULL_FILE), records.iter())?;
        write_rows(&self.path(RECORDS_LEAN_FILE), &LEAN_COLUMNS, records.iter().map(LeanRow::from))?;

        let deduped = dedup_by_identifier(records.to_vec());
        write_full(&self.path(RECORDS_FULL_DEDUP_FILE), deduped.iter())?;
        write_rows(
            &self.path(RECORDS_LEAN_DEDUP_FILE),
            &LEAN_COLUMNS,
            deduped.iter().map(LeanRow::from),
        )?;

        self.write_raw_jsonl(results)?;
        Ok(())
    }
}

impl QualificationOutputPort for CsvOutputAdapter {
    fn write_scored(&self, leads: &[QualifiedLead]) -> anyhow::Result<()> {
        write_rows(&self.path(LEADS_SCORED_FILE), &SCORED_COLUMNS, leads.iter().map(ScoredRow::from))?;
        Ok(())
    }

    fn write_structural_split(&self, valid: &[&QualifiedLead], invalid: &[&QualifiedLead]) -> anyhow::Result<()> {
        write_rows(
            &self.path(STRUCTURAL_VALID_FILE),
            &SCORED_COLUMNS,
            valid.iter().map(|lead| ScoredRow::from(*lead)),
        )?;
        write_rows(
            &self.path(STRUCTURAL_INVALID_FILE),
            &SCORED_COLUMNS,
            invalid.iter().map(|lead| ScoredRow::from(*lead)),
        )?;
        Ok(())
    }

    fn write_business_valid(&self, leads: &[&QualifiedLead]) -> anyhow::Result<()> {
        write_rows(
            &self.path(BUSINESS_VALID_FILE),
            &SCORED_COLUMNS,
            leads.iter().map(|lead| ScoredRow::from(*lead)),
        )?;
        Ok(())
    }

    fn write_final(&self, leads: &[&QualifiedLead]) -> anyhow::Result<()> {
        write_rows(
            &self.path(LEADS_FINAL_FILE),
            &FINAL_COLUMNS,
            leads.iter().map(|lead| FinalRow::from(*lead)),
        )?;
        Ok(())
    }
}

fn write_full<'a>(path: &Path, records: impl Iterator<Item = &'a CanonicalRecord>) -> Result<()> {
    write_rows(path, &FULL_COLUMNS, records).map(|_| ())
}

/// Write a header row then every row. The header is written explicitly so
/// empty partitions still carry their column set.
fn write_rows<T: Serialize>(path: &Path, headers: &[&str], rows: impl Iterator<Item = T>) -> Result<usize> {
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(headers)?;
    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = count, "Wrote partition");
    Ok(count)
}

/// Read the full audited export back into canonical records
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<CanonicalRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(PipelineError::Input(format!("records file not found: {}", path.display())));
    }
    let mut reader = ReaderBuilder::new().from_path(path)?;
    let records = reader
        .deserialize::<CanonicalRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    info!(path = %path.display(), rows = records.len(), "Loaded records");
    Ok(records)
}

/// Read any flat CSV as a header plus untyped rows
pub fn read_table(path: impl AsRef<Path>) -> Result<(StringRecord, Vec<StringRecord>)> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(PipelineError::Input(format!("table not found: {}", path.display())));
    }
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let rows = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok((headers, rows))
}

pub fn write_table(path: impl AsRef<Path>, headers: &StringRecord, rows: &[StringRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = WriterBuilder::new().flexible(true).from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), "Wrote table");
    Ok(())
}
