//! Traffic generator: posts one random customer batch while concurrently
//! listing the store, to exercise the server under overlapping requests.
//!
//! Env: `LOADGEN_API_URL` (default `http://127.0.0.1:8080`), `ONLY_OVER_18`
//! (ages drawn from 18..=90 instead of 10..=90), `LOADGEN_ROUNDS` (default 1).

use anyhow::Context;
use dotenvy::dotenv;
use models::Customer;
use rand::{seq::SliceRandom, Rng};
use tracing::{info, warn};

const FIRST_NAMES: [&str; 6] = ["John", "Alice", "Bob", "Eve", "Charlie", "David"];
const LAST_NAMES: [&str; 6] = ["Smith", "Johnson", "Doe", "Williams", "Brown", "Jones"];

struct LoadgenConfig {
    api_url: String,
    only_over_18: bool,
    rounds: usize,
}

impl LoadgenConfig {
    fn from_env() -> Self {
        let api_url = std::env::var("LOADGEN_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string())
            .trim_end_matches('/')
            .to_string();
        let only_over_18 = std::env::var("ONLY_OVER_18")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let rounds = std::env::var("LOADGEN_ROUNDS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(1);
        Self { api_url, only_over_18, rounds }
    }
}

fn random_batch(only_over_18: bool) -> Vec<Customer> {
    let mut rng = rand::thread_rng();
    let len = rng.gen_range(2..20);
    (0..len)
        .map(|_| {
            let first = FIRST_NAMES.choose(&mut rng).copied().unwrap_or("John");
            let last = LAST_NAMES.choose(&mut rng).copied().unwrap_or("Doe");
            let age = if only_over_18 { rng.gen_range(18..91) } else { rng.gen_range(10..91) };
            Customer::new(first, last, age, rng.gen_range(1..999))
        })
        .collect()
}

async fn post_batch(client: &reqwest::Client, api_url: &str, batch: Vec<Customer>) -> anyhow::Result<()> {
    let size = batch.len();
    let res = client
        .post(format!("{api_url}/customers"))
        .json(&batch)
        .send()
        .await
        .context("POST /customers")?;
    let status = res.status();
    if status.is_success() {
        info!(%status, size, "POST request accepted");
    } else {
        let body = res.text().await.unwrap_or_default();
        warn!(%status, size, %body, "POST request rejected");
    }
    Ok(())
}

async fn get_customers(client: &reqwest::Client, api_url: &str) -> anyhow::Result<()> {
    let res = client
        .get(format!("{api_url}/customers"))
        .send()
        .await
        .context("GET /customers")?;
    let status = res.status();
    if !status.is_success() {
        warn!(%status, "GET request failed");
        return Ok(());
    }
    let customers = res.json::<Vec<Customer>>().await.context("decode customer list")?;
    info!(count = customers.len(), "GET request result");
    for c in customers {
        println!("{} {}, Age: {}, ID: {}", c.first_name, c.last_name, c.age, c.id);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    common::utils::logging::init_logging_default();

    let cfg = LoadgenConfig::from_env();
    info!(api_url = %cfg.api_url, only_over_18 = cfg.only_over_18, rounds = cfg.rounds, "testing customer api");

    let client = reqwest::Client::new();
    for round in 0..cfg.rounds {
        let batch = random_batch(cfg.only_over_18);
        let (posted, listed) = tokio::join!(
            post_batch(&client, &cfg.api_url, batch),
            get_customers(&client, &cfg.api_url),
        );
        if let Err(e) = posted.and(listed) {
            warn!(round, error = %e, "round failed");
        }
    }
    Ok(())
}
