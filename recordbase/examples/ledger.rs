//! Ledger Example - guarded record access over a local libsql database
//!
//! This example demonstrates:
//! - Binding tables to entities with `TableBinding`
//! - Inserting single rows and batches
//! - Moving balances inside a transaction with atomic counters
//! - Paginated and aggregate reads
//! - Telling rejected input apart from "not found" with `checked()`
//! - Inspecting the per-session statement log
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example ledger
//!
//! # Plain-text logs with statement tracing
//! RECORDBASE_LOGGING__JSON=false RECORDBASE_LOGGING__LEVEL=recordbase=debug \
//!   cargo run --example ledger
//! ```

use recordbase::prelude::*;

struct Accounts;

impl TableBinding for Accounts {
    const TABLE: &'static str = "accounts";
}

struct Entries;

impl TableBinding for Entries {
    const TABLE: &'static str = "entries";
    const PRIMARY_KEY: &'static str = "entry_id";
}

const SCHEMA: &str = "
    CREATE TABLE accounts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner TEXT NOT NULL,
        balance INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE entries (
        entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL,
        amount INTEGER NOT NULL,
        memo TEXT
    );
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_tracing(&config)?;

    let dir = std::env::temp_dir().join(format!("recordbase-ledger-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let engine = TursoEngine::connect(&TursoConfig::local(dir.join("ledger.db"))).await?;
    engine.connection().execute_batch(SCHEMA).await?;

    let accounts = Accounts::model(&engine);
    let entries = Entries::model(&engine);

    let alice = accounts
        .add(Payload::new().set("owner", "alice").set("balance", 100))
        .await?;
    accounts
        .adds(vec![
            Payload::new().set("owner", "bob").set("balance", 20),
            Payload::new().set("owner", "carol").set("balance", 0),
        ])
        .await?;
    let bob = accounts
        .fetch(FilterCondition::eq("owner", "bob"), ["id"])
        .await?
        .get("id")
        .and_then(Value::as_i64)
        .unwrap_or_default();

    accounts.enable_query_log();

    // Move 35 from alice to bob; both legs or neither
    accounts.begin_transaction().await?;
    accounts
        .decrements(FilterCondition::eq("id", alice), "balance", 35)
        .await?;
    accounts
        .increments(FilterCondition::eq("id", bob), "balance", 35)
        .await?;
    entries
        .adds(vec![
            Payload::new()
                .set("account_id", alice)
                .set("amount", -35)
                .set("memo", "transfer to bob"),
            Payload::new()
                .set("account_id", bob)
                .set("amount", 35)
                .set("memo", "transfer from alice"),
        ])
        .await?;
    accounts.commit().await?;

    // A transfer that is abandoned leaves no trace
    accounts.begin_transaction().await?;
    accounts.updates("owner = 'carol'", Payload::new().set("balance", 1_000)).await?;
    accounts.roll_back().await?;

    for account in accounts.get_data("balance >= 0", Some("owner asc"), "*").await? {
        println!(
            "{:<6} {:>5}",
            account.get("owner").cloned().unwrap_or_default(),
            account.get("balance").cloned().unwrap_or_default()
        );
    }

    let total = accounts.get_sum("1 = 1", "balance").await?;
    let richest = accounts.get_max("1 = 1", "balance").await?;
    let owners = accounts.get_pluck("balance > 0", "owner").await?;
    println!("total={total} max={richest} funded={owners:?}");

    let page = entries.get_lists("amount > 0", "entry_id desc", ["memo"], 1, 10).await?;
    println!("credits on page 1: {}", page.len());

    // The sentinel contract hides why nothing came back; checked() does not
    let missing = accounts.checked().get_by_id(404, "*").await?;
    let rejected = accounts.checked().get_by_id(0, "*").await?;
    println!("id 404: {missing:?}, id 0: {rejected:?}");

    for entry in accounts.get_query_log() {
        println!("{}", serde_json::to_string(&entry)?);
    }

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
