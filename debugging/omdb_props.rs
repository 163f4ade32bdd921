//! Query OMDb through the app's client and print the mapped records as JSON.
//! Usage:
//!   cargo run --bin omdb_props -- search <query> [page]
//!   cargo run --bin omdb_props -- detail <imdb_id>
//! Requires OMDB_API_KEY in the environment (.env supported).

use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;
use popcorn::config::Config;
use popcorn::omdb::{OmdbApi, OmdbClient};
use popcorn::pagination::total_pages;
use serde_json::json;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let mut args = env::args().skip(1);
    let mode = args
        .next()
        .context("expected 'search <query> [page]' or 'detail <imdb_id>'")?;
    let config = Config::from_env()?;
    let client = OmdbClient::from_config(&config)?;

    let output = match mode.as_str() {
        "search" => {
            let query = args.next().context("missing search query")?;
            let page = match args.next() {
                Some(p) => p.parse::<u32>().context("page must be a positive number")?,
                None => 1,
            };
            let result = client.search(&query, page.max(1)).await?;
            json!({
                "query": query,
                "page": page.max(1),
                "total_results": result.total_results,
                "total_pages": total_pages(result.total_results),
                "items": result.items,
            })
        }
        "detail" => {
            let id = args.next().context("missing IMDb id")?;
            serde_json::to_value(client.fetch_detail(&id).await?)?
        }
        other => return Err(anyhow!("unknown mode '{}'", other)),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
