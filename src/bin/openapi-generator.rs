use anyhow::Context;
use utoipa::OpenApi;
use zona_xtreme_back::services::documentation::ApiDoc;

fn main() -> anyhow::Result<()> {
    let doc = ApiDoc::openapi();
    let json = doc
        .to_pretty_json()
        .context("serializing OpenAPI document")?;
    println!("{json}");
    Ok(())
}
