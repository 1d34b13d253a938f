//! Fetch catalog and pricing data for one ASIN.
//!
//! Credentials come from the environment (or `.env`): ROLE_ARN, REGION,
//! LWA_CLIENT_ID, LWA_CLIENT_SECRET and LWA_REFRESH_TOKEN.
//!
//! Run with: cargo run --example fetch_pricing -- B000123456 US

use marketfit_spapi::{Asin, Marketplace, SpApiClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> marketfit_spapi::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("marketfit_spapi=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let asin = Asin::new(args.next().unwrap_or_else(|| "B000123456".to_string()))?;
    let marketplace: Marketplace = args.next().as_deref().unwrap_or("US").parse()?;

    let client = SpApiClient::from_env().await?;

    println!("Looking up {} in {}...", asin, marketplace);
    match client.catalog().lookup_item(&asin, marketplace).await? {
        Some(item) => {
            println!("  Title: {}", item.title().unwrap_or("-"));
            println!("  Brand: {}", item.brand().unwrap_or("-"));
            if let Some(rank) = item.best_rank(&marketplace.id()) {
                println!("  Best sales rank: {}", rank);
            }
        }
        None => println!("  Not in the catalog"),
    }

    match client.pricing().get_pricing(&asin, marketplace).await? {
        Some(snapshot) => {
            println!("\nPricing ({}):", snapshot.status);
            println!(
                "  Headline price: {} {}",
                snapshot
                    .price
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                snapshot.currency.as_deref().unwrap_or("")
            );
            println!("  Offers: {}", snapshot.seller_count);
            println!("  FBA offer present: {}", snapshot.has_fba_offer());
        }
        None => println!("\nNo offers in {}", marketplace),
    }

    Ok(())
}
