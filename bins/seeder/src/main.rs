//! Database seeder for Schoolplan development and testing.
//!
//! Creates one WORKING budget version holding the demo school: its grade
//! catalogue, base enrollment and committed records for all six planning
//! modules. Skips seeding when a version of the same name already exists
//! for the fiscal year.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::Utc;

use schoolplan_core::version::{BudgetVersion, VersionFilter, VersionRepository};
use schoolplan_db::{PgStore, connect, demo_dataset};
use schoolplan_shared::types::PageRequest;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = connect(&database_url, 2, 1)
        .await
        .context("Failed to connect to database")?;
    let store = PgStore::new(db);

    let data = demo_dataset();
    let filter = VersionFilter {
        fiscal_year: Some(data.version.fiscal_year),
        status: None,
    };
    let page = PageRequest {
        page: 1,
        per_page: 100,
    };
    let (existing, _) = store.list(filter, page).await?;
    if existing.iter().any(|v| v.name == data.version.name) {
        println!("  Demo version already exists, skipping...");
        return Ok(());
    }

    println!("Seeding budget version...");
    let version = BudgetVersion::new(data.version, Utc::now());
    store.insert(&version).await?;

    println!("Seeding grade catalogue and base enrollment...");
    store
        .replace_catalog(version.id, &data.catalog, &data.base_enrollment)
        .await?;

    for (module, records) in &data.records {
        println!("Seeding {} records ({})...", module.label(), records.len());
        store.replace_records(version.id, *module, records).await?;
    }

    println!("Seeding complete! Version id: {}", version.id);
    Ok(())
}
