use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use httpmock::Method::GET;
use httpmock::MockServer;
use tempfile::tempdir;

use cnpj_leads::app::qualify_use_case::QualifyUseCase;
use cnpj_leads::app::resolve_use_case::ResolveUseCase;
use cnpj_leads::constants::*;
use cnpj_leads::infra::csv_output_adapter::{read_records, read_table};
use cnpj_leads::infra::{CsvOutputAdapter, ReqwestHttp};
use cnpj_leads::pipeline::ingestion::reader::parse_queries;
use cnpj_leads::pipeline::ingestion::{BatchResolver, ResolutionClient, RetryPolicy};
use cnpj_leads::pipeline::processing::classify::LeadClassification;

const COMPLETE_PAYLOAD: &str = r#"{
    "razao_social": "ACME COMERCIO LTDA",
    "porte": {"id": "01", "descricao": "Micro Empresa"},
    "natureza_juridica": {"id": "2062", "descricao": "Sociedade Empresaria Limitada"},
    "estabelecimento": {
        "nome_fantasia": "ACME",
        "situacao_cadastral": "Ativa",
        "data_inicio_atividade": "2005-03-10",
        "telefone1": "(48) 3333-4444",
        "email": "contato@acme.com",
        "cidade": {"nome": "Florianopolis"},
        "estado": {"sigla": "SC"},
        "atividade_principal": {"id": "4781400", "descricao": "Comercio varejista"}
    }
}"#;

#[tokio::test]
async fn test_resolve_then_qualify_through_csv_checkpoint() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/cnpj/11444777000161");
        then.status(200).body(COMPLETE_PAYLOAD);
    });
    server.mock(|when, then| {
        when.method(GET).path("/cnpj/27865757000102");
        then.status(404);
    });

    let dir = tempdir()?;
    let output = CsvOutputAdapter::new(dir.path())?;

    let http = ReqwestHttp::new(Duration::from_secs(2))?;
    let client = ResolutionClient::new(
        Arc::new(http),
        server.url("/cnpj/{}"),
        Duration::from_secs(2),
        RetryPolicy::no_retry(),
    );
    let resolver = BatchResolver::new(Arc::new(client), 2, Duration::ZERO);
    let resolve = ResolveUseCase::new(resolver, Box::new(output.clone()));

    let queries = parse_queries("11.444.777/0001-61\n\n'27865757000102',\ngarbage\n11444777000161\n");
    assert_eq!(queries.len(), 4);
    let resolution = resolve.execute(queries).await?;

    assert_eq!(resolution.summary.total, 4);
    assert_eq!(resolution.summary.found, 2);
    assert_eq!(resolution.summary.errors.get("not_found"), Some(&1));
    assert_eq!(resolution.summary.errors.get("invalid_format"), Some(&1));

    for file in [
        RECORDS_FULL_FILE,
        RECORDS_LEAN_FILE,
        RECORDS_FULL_DEDUP_FILE,
        RECORDS_LEAN_DEDUP_FILE,
        RECORDS_RAW_FILE,
    ] {
        assert!(dir.path().join(file).exists(), "{file} missing");
    }

    // Qualification reads the audited export back, as the `qualify` command does
    let records = read_records(dir.path().join(RECORDS_FULL_FILE))?;
    assert_eq!(records, resolution.records);

    let deduped = read_records(dir.path().join(RECORDS_FULL_DEDUP_FILE))?;
    assert_eq!(deduped.len(), 3);

    let qualify = QualifyUseCase::with_default_gate(None, Box::new(output.clone()));
    let outcome = qualify.execute(records)?;

    assert_eq!(outcome.report.total, 4);
    assert_eq!(outcome.report.valid, 2);
    assert_eq!(outcome.summary.by_class.get(&LeadClassification::Priority), Some(&2));
    assert_eq!(outcome.summary.by_class.get(&LeadClassification::Discard), Some(&2));
    assert_eq!(outcome.summary.business_valid, 2);
    assert_eq!(outcome.summary.final_leads, 1);

    let (headers, rows) = read_table(dir.path().join(LEADS_FINAL_FILE))?;
    assert_eq!(rows.len(), 1);
    let column = |name: &str| headers.iter().position(|h| h == name).unwrap();
    assert_eq!(&rows[0][column("cnpj")], "11444777000161");
    assert_eq!(&rows[0][column("uf")], "SC");
    assert_eq!(&rows[0][column("telefone")], "4833334444");
    assert_eq!(&rows[0][column("classification")], "priority");

    let (_, invalid) = read_table(dir.path().join(STRUCTURAL_INVALID_FILE))?;
    assert_eq!(invalid.len(), 2);
    Ok(())
}
