use std::{env, error::Error, sync::Arc};

use semantic::{EmbeddingClientFactory, EnvCredentials, ProviderKind, ProviderRegistry};

/// Embeds one query with a single provider and prints the vector's shape.
///
/// Credentials come from the process environment:
///
/// ```bash
/// OPENAI_API_KEY=sk-xxx cargo run -p compare-semantic --example api_embed -- openai-small "registered nurse"
/// VOYAGE_API_KEY=pa-xxx cargo run -p compare-semantic --example api_embed -- voyage "registered nurse"
/// VERTEX_PROJECT_ID=my-project VERTEX_SERVICE_ACCOUNT_FILE=sa.json \
///   cargo run -p compare-semantic --example api_embed -- vertex "registered nurse"
/// ```
///
/// Set `OPENAI_ENDPOINT`, `VOYAGE_ENDPOINT` or `VERTEX_ENDPOINT` to point a
/// provider at a proxy.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let provider: ProviderKind = args.next().unwrap_or_else(|| "openai-small".into()).parse()?;
    let text = args
        .next()
        .unwrap_or_else(|| "Senior software engineer".into());

    let registry = ProviderRegistry::new(Arc::new(EnvCredentials));
    let client = registry.initialize(provider).await?;
    let vector = client.embed(&text).await?;

    let identity = client.identity();
    println!("provider: {}", identity.kind.label());
    println!("dimension: {}", vector.len());
    println!("head: {:?}", &vector[..vector.len().min(8)]);
    Ok(())
}
