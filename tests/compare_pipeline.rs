use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use embedding_compare::{
    best_performer, load_credentials, CompareConfig, ComparisonOrchestrator, ExportArtifact,
    JobError, JobState, ProviderKind, ProviderRegistry, SearchKind, StaticCredentials,
    StubClientFactory, TurbopufferClient, TURBOPUFFER_API_KEY,
};

fn config_yaml(index_url: &str) -> String {
    format!(
        r#"
version: "1.0"
top_k: 3
providers:
  - provider: vertex
    namespaces:
      titles: "titles-vertex"
  - provider: voyage
    namespaces:
      titles: "titles-vertex"
  - provider: openai-small
    namespaces:
      titles: "titles-openai"
  - provider: openai-large
    namespaces:
      skills: "skills-openai-large"
index:
  base_url: "{index_url}"
"#
    )
}

async fn mount_index(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v2/namespaces/titles-vertex/query"))
        .and(header("authorization", "Bearer tpuf_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rows": [
                {"id": 7, "$dist": 0.18, "text": "Registered Nurse"},
                {"id": "9", "$dist": 0.41, "attributes": {"text": "Nurse Practitioner"}},
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/namespaces/titles-openai/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rows": [{"id": "3", "$dist": 0.52, "text": "Staff Nurse"}]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/namespaces/titles-vertex/metadata"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"approx_row_count": 1200, "dimensions": 768})),
        )
        .mount(server)
        .await;
}

/// Index stand-in that rejects vectors whose length differs from the
/// namespace's dimension, the way the hosted index does.
async fn mount_dimension_check(server: &MockServer, namespace: &str, index_dim: usize, query_dim: usize) {
    Mock::given(method("POST"))
        .and(path(format!("/v2/namespaces/{namespace}/query")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": format!(
                "invalid request: Query has dimensions={query_dim} but index has dimensions={index_dim}"
            )
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn stub_providers_against_mock_index() {
    let server = MockServer::start().await;
    mount_index(&server).await;

    let config = CompareConfig::from_yaml(&config_yaml(&server.uri())).unwrap();
    let creds = StaticCredentials::new().with(TURBOPUFFER_API_KEY, "tpuf_test");
    let index = TurbopufferClient::new(config.index_config(&creds).unwrap()).unwrap();
    let embedders = StubClientFactory::new().without(ProviderKind::Voyage);
    let orchestrator = ComparisonOrchestrator::new(Arc::new(embedders), Arc::new(index));

    let request = config.to_run_request("registered nurse", SearchKind::Titles);
    assert_eq!(request.targets.len(), 3);
    let result = orchestrator.run(request).await.unwrap();
    assert_eq!(result.len(), 3);

    let vertex = result.get("vertex").unwrap();
    assert_eq!(vertex.state, JobState::Completed);
    assert_eq!(vertex.query_vector_dimension, 768);
    assert_eq!(vertex.results.len(), 2);
    assert_eq!(vertex.results[0].id, "7");
    assert_eq!(vertex.results[1].text, "Nurse Practitioner");
    assert_eq!(vertex.stats.approx_item_count, 1200);
    assert_eq!(vertex.stats.dimensions, 768);

    let voyage = result.get("voyage").unwrap();
    assert_eq!(voyage.state, JobState::Failed);
    assert!(matches!(voyage.error, Some(JobError::Configuration { .. })));

    let openai = result.get("openai-small").unwrap();
    assert_eq!(openai.results.len(), 1);
    assert_eq!(openai.stats.approx_item_count, 0, "metadata endpoint not mocked");

    let best = best_performer(&result).unwrap();
    assert_eq!(best.provider, "vertex");

    let artifact = ExportArtifact::from_result(&result);
    assert_eq!(artifact.providers.len(), 3);
    assert!(artifact.providers["voyage"].error.is_some());
    assert_eq!(artifact.providers["openai-small"].namespace, "titles-openai");
}

#[tokio::test]
async fn dimension_mismatch_is_diagnosed_per_provider() {
    let server = MockServer::start().await;
    mount_dimension_check(&server, "titles-vertex", 768, 1024).await;

    let yaml = format!(
        "version: \"1\"\nproviders:\n  - provider: voyage\n    namespaces:\n      titles: titles-vertex\nindex:\n  base_url: \"{}\"\n",
        server.uri()
    );
    let config = CompareConfig::from_yaml(&yaml).unwrap();
    let creds = StaticCredentials::new().with(TURBOPUFFER_API_KEY, "tpuf_test");
    let index = TurbopufferClient::new(config.index_config(&creds).unwrap()).unwrap();
    let orchestrator =
        ComparisonOrchestrator::new(Arc::new(StubClientFactory::new()), Arc::new(index));

    let result = orchestrator
        .run(config.to_run_request("nurse", SearchKind::Titles))
        .await
        .unwrap();

    let voyage = result.get("voyage").unwrap();
    assert_eq!(voyage.query_vector_dimension, 1024);
    match voyage.error.as_ref() {
        Some(JobError::DimensionMismatch(mismatch)) => {
            assert_eq!(mismatch.query_dimension, 1024);
            assert_eq!(mismatch.index_dimension, 768);
            assert!(mismatch.index_model.contains("Vertex"), "{}", mismatch.index_model);
        }
        other => panic!("expected dimension mismatch, got {other:?}"),
    }
    assert!(best_performer(&result).is_none());
}

#[tokio::test]
async fn real_clients_through_registry() {
    let providers = MockServer::start().await;
    let index_server = MockServer::start().await;
    mount_index(&index_server).await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"embedding": vec![0.01_f32; 1536]}]
        })))
        .expect(1)
        .mount(&providers)
        .await;
    Mock::given(method("POST"))
        .and(path("/voyage/embeddings"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limit exceeded"))
        .expect(1)
        .mount(&providers)
        .await;

    let creds = StaticCredentials::new()
        .with(TURBOPUFFER_API_KEY, "tpuf_test")
        .with("OPENAI_API_KEY", "sk-test")
        .with("OPENAI_ENDPOINT", format!("{}/v1/embeddings", providers.uri()))
        .with("VOYAGE_API_KEY", "pa-test")
        .with("VOYAGE_ENDPOINT", format!("{}/voyage/embeddings", providers.uri()));
    let creds = Arc::new(creds);

    let config = CompareConfig::from_yaml(&config_yaml(&index_server.uri())).unwrap();
    let index = TurbopufferClient::new(config.index_config(creds.as_ref()).unwrap()).unwrap();
    let orchestrator =
        ComparisonOrchestrator::new(Arc::new(ProviderRegistry::new(creds)), Arc::new(index));

    let result = orchestrator
        .run(config.to_run_request("registered nurse", SearchKind::Titles))
        .await
        .unwrap();

    let openai = result.get("openai-small").unwrap();
    assert_eq!(openai.state, JobState::Completed);
    assert_eq!(openai.query_vector_dimension, 1536);
    assert_eq!(openai.results[0].text, "Staff Nurse");

    let voyage = result.get("voyage").unwrap();
    assert_eq!(
        voyage.error.as_ref().map(JobError::kind),
        Some("rate_limit_exceeded")
    );

    let vertex = result.get("vertex").unwrap();
    match vertex.error.as_ref() {
        Some(JobError::Configuration { message }) => {
            assert!(message.contains("VERTEX_PROJECT_ID"), "{message}")
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[tokio::test]
async fn config_from_secrets_file() {
    let dir = tempfile::tempdir().unwrap();
    let secrets = dir.path().join("secrets.yaml");
    std::fs::write(
        &secrets,
        "TURBOPUFFER_API_KEY: tpuf_file\nGEMINI_SKILLS_NAMESPACE: skills-vertex\nTURBOPUFFER_REGION: gcp-us-east4\n",
    )
    .unwrap();

    let creds = load_credentials(Some(secrets.as_path()), &Default::default()).unwrap();
    let config = CompareConfig::from_credentials(&creds);
    let request = config.to_run_request("python developer", SearchKind::Skills);

    assert_eq!(request.targets.len(), 1);
    assert_eq!(request.targets[0].provider, ProviderKind::Vertex);
    assert_eq!(request.targets[0].region, "gcp-us-east4");
    assert_eq!(config.index_config(&creds).unwrap().api_key, "tpuf_file");
}
