//! Compare one ASIN across marketplaces.
//!
//! Run with: cargo run --example compare_marketplaces -- B000123456 US,DE,UK,JP
//!
//! Every marketplace reports separately; a throttled marketplace does not
//! hide the others.

use marketfit_spapi::{Asin, Marketplace, SpApiClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> marketfit_spapi::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let asin = Asin::new(args.next().unwrap_or_else(|| "B000123456".to_string()))?;
    let marketplaces = args
        .next()
        .unwrap_or_else(|| "US,DE,UK,JP".to_string())
        .split(',')
        .map(|code| code.trim().parse::<Marketplace>())
        .collect::<marketfit_spapi::Result<Vec<_>>>()?;

    let client = SpApiClient::from_env().await?;
    let results = client.compare().compare_asin(&asin, &marketplaces).await;

    println!("{:<4} {:>12} {:>5} {:>8}", "MKT", "PRICE", "CCY", "OFFERS");
    for result in &results {
        match &result.outcome {
            Ok(Some(row)) => println!(
                "{:<4} {:>12} {:>5} {:>8}",
                result.marketplace.code(),
                row.price.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
                row.currency.as_deref().unwrap_or("-"),
                row.seller_count
            ),
            Ok(None) => println!("{:<4} not listed", result.marketplace.code()),
            Err(e) => println!("{:<4} failed: {}", result.marketplace.code(), e),
        }
    }

    Ok(())
}
