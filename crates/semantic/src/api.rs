use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::{AuthMaterial, ProviderIdentity, ProviderKind};
use crate::EmbedError;

pub(crate) const VOYAGE_EMBEDDINGS_URL: &str = "https://api.voyageai.com/v1/embeddings";
pub(crate) const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

// Global HTTP client with connection pooling
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(8)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

/// Endpoint for a provider: the configured override, or the vendor default.
pub(crate) fn endpoint_for(identity: &ProviderIdentity) -> String {
    if let Some(endpoint) = &identity.endpoint {
        return endpoint.clone();
    }
    match (&identity.kind, &identity.auth) {
        (
            ProviderKind::Vertex,
            AuthMaterial::Google {
                project_id,
                location,
                ..
            },
        ) => format!(
            "https://{location}-aiplatform.googleapis.com/v1/projects/{project_id}/locations/{location}/publishers/google/models/{}:predict",
            identity.model
        ),
        (ProviderKind::Voyage, _) => VOYAGE_EMBEDDINGS_URL.to_string(),
        _ => OPENAI_EMBEDDINGS_URL.to_string(),
    }
}

/// Request body for a single query embedding.
pub(crate) fn build_api_payload(kind: ProviderKind, model: &str, text: &str) -> Value {
    match kind {
        ProviderKind::Vertex => json!({
            "instances": [{ "content": text, "task_type": "RETRIEVAL_QUERY" }]
        }),
        ProviderKind::Voyage => json!({
            "input": [text],
            "model": model,
            "input_type": "query"
        }),
        ProviderKind::OpenAiSmall | ProviderKind::OpenAiLarge => json!({
            "input": text,
            "model": model
        }),
    }
}

/// POST `payload` with bearer auth and return the decoded JSON body.
pub(crate) async fn send_api_request(
    url: &str,
    bearer: &str,
    payload: &Value,
) -> Result<Value, EmbedError> {
    let response = HTTP_CLIENT
        .post(url)
        .bearer_auth(bearer)
        .json(payload)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(EmbedError::Http {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| EmbedError::InvalidResponse(format!("response body is not JSON: {e}")))
}

/// Extract the single query vector from a response and check its length.
pub(crate) fn parse_single_embedding(
    value: Value,
    expected_dimension: usize,
) -> Result<Vec<f32>, EmbedError> {
    let vector = parse_embeddings_from_value(value)?
        .into_iter()
        .next()
        .ok_or_else(|| EmbedError::InvalidResponse("response contained no embeddings".into()))?;

    if vector.len() != expected_dimension {
        return Err(EmbedError::InvalidResponse(format!(
            "expected {expected_dimension} dimensions, got {}",
            vector.len()
        )));
    }
    Ok(vector)
}

/// Accepts `{"data":[{"embedding":[..]}]}` (OpenAI, Voyage),
/// `{"predictions":[{"embeddings":{"values":[..]}}]}` (Vertex),
/// `{"embeddings":[[..]]}` and bare arrays.
pub(crate) fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, EmbedError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embedding_collection(embeddings);
            }

            if let Some(Value::Array(items)) = map.remove("data") {
                let mut vectors = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(mut obj) => match obj.remove("embedding") {
                            Some(embedding) => vectors.push(parse_embedding_vector(embedding)?),
                            None => {
                                return Err(EmbedError::InvalidResponse(
                                    "missing `embedding` field in data item".into(),
                                ))
                            }
                        },
                        _ => {
                            return Err(EmbedError::InvalidResponse(
                                "unexpected entry inside `data` array".into(),
                            ))
                        }
                    }
                }
                return Ok(vectors);
            }

            if let Some(Value::Array(items)) = map.remove("predictions") {
                let mut vectors = Vec::with_capacity(items.len());
                for item in items {
                    let values = item
                        .get("embeddings")
                        .and_then(|embeddings| embeddings.get("values"))
                        .cloned()
                        .ok_or_else(|| {
                            EmbedError::InvalidResponse(
                                "missing `embeddings.values` in prediction".into(),
                            )
                        })?;
                    vectors.push(parse_embedding_vector(values)?);
                }
                return Ok(vectors);
            }

            Err(EmbedError::InvalidResponse(
                "unsupported API response shape".into(),
            ))
        }
        other => parse_embedding_collection(other),
    }
}

fn parse_embedding_collection(value: Value) -> Result<Vec<Vec<f32>>, EmbedError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Array(_))) {
                items.into_iter().map(parse_embedding_vector).collect()
            } else {
                parse_embedding_vector(Value::Array(items)).map(|vec| vec![vec])
            }
        }
        _ => Err(EmbedError::InvalidResponse(
            "embeddings must be an array".into(),
        )),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, EmbedError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|value| match value {
                Value::Number(num) => num.as_f64().map(|v| v as f32).ok_or_else(|| {
                    EmbedError::InvalidResponse("embedding value is not a finite number".into())
                }),
                _ => Err(EmbedError::InvalidResponse(
                    "embedding values must be numbers".into(),
                )),
            })
            .collect(),
        _ => Err(EmbedError::InvalidResponse(
            "embedding must be an array of numbers".into(),
        )),
    }
}
