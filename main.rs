//! Payment intent command-line client
//!
//! Drives the payments API from a terminal: create an intent, check or watch
//! its status, cancel it, and fetch its QR code.
//!
//! ## Storage Backends
//!
//! Idempotency tokens for cancels are kept in:
//! - **In-Memory**: Default storage (tokens live as long as the process)
//! - **Redis**: Session-scoped storage with TTL (enable with `redis` feature)

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rust_payintent::{
    client::PaymentIntentClient,
    poller::{PollOptions, StatusPoller},
    storage::{InMemorySessionStorage, SessionStorage},
    types::{CheckoutItem, CheckoutPayload, ClientConfig},
    PaymentError, Result,
};

#[cfg(feature = "redis")]
use rust_payintent::storage::redis_storage::RedisSessionStorage;

const USAGE: &str = "\
Usage: payintent <command> [args]

Commands:
   create <amount> <description> <items-json>   Create a payment intent
   status <payment-id>                           Fetch the current status once
   watch <payment-id>                            Poll until a terminal status
   cancel <payment-id>                           Cancel a payment (idempotent)
   qr <payment-intent-id>                        Print the QR code URL
   download-qr <payment-id> <path>               Save the QR image

Environment variables:
   PAYMENT_API_URL - Payments API base URL (required)
   PAYMENT_API_TOKEN - Bearer token
   PAYMENT_API_CSRF_TOKEN - CSRF token
   PAYMENT_API_TIMEOUT_SECS - Timeout for mutating calls (default: 60)
   POLL_INTERVAL_MS - Interval between status checks (default: 6000)
   POLL_TIMEOUT_MS - Give up watching after this long (default: 300000)
   STORAGE_BACKEND - Token storage: 'memory' or 'redis' (default: memory)";

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let client = Arc::new(PaymentIntentClient::new(
        ClientConfig::from_env()?,
        storage_from_env().await?,
    )?);

    match (command.as_str(), &args[1..]) {
        ("create", [amount, description, items]) => {
            create(&client, amount, description, items).await?
        }
        ("status", [payment_id]) => {
            let result = client.query_status(payment_id).await?;
            println!("{}: {}", payment_id, result.status);
        }
        ("watch", [payment_id]) => watch(client, payment_id).await?,
        ("cancel", [payment_id]) => {
            let outcome = client.cancel(payment_id).await?;
            if outcome.already_cancelled {
                println!("{}: already cancelled", payment_id);
            } else {
                println!("{}: cancelled", payment_id);
            }
        }
        ("qr", [payment_intent_id]) => match client.fetch_qr_url(payment_intent_id).await? {
            Some(url) => println!("{}", url),
            None => println!("No QR code for {}", payment_intent_id),
        },
        ("download-qr", [payment_id, path]) => match client.download_qr(payment_id).await? {
            Some(artifact) => {
                tokio::fs::write(path, &artifact.bytes).await?;
                println!("Saved {} bytes to {}", artifact.bytes.len(), path);
            }
            None => println!("No QR image for {}", payment_id),
        },
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}

/// Pick the token storage backend from `STORAGE_BACKEND`
async fn storage_from_env() -> Result<Arc<dyn SessionStorage>> {
    let storage_type = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "memory".to_string());

    if storage_type == "redis" {
        #[cfg(not(feature = "redis"))]
        {
            return Err(PaymentError::config(
                "Redis storage requested but the 'redis' feature is not enabled",
            ));
        }

        #[cfg(feature = "redis")]
        {
            let redis_url =
                env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
            let key_prefix = env::var("REDIS_KEY_PREFIX").ok();
            tracing::info!(%redis_url, "Using Redis token storage");
            let storage = RedisSessionStorage::new(&redis_url, key_prefix.as_deref()).await?;
            return Ok(Arc::new(storage));
        }
    }

    tracing::info!("Using in-memory token storage");
    Ok(Arc::new(InMemorySessionStorage::new()))
}

async fn create(
    client: &PaymentIntentClient,
    amount: &str,
    description: &str,
    items: &str,
) -> Result<()> {
    let amount = Decimal::from_str(amount)
        .map_err(|e| PaymentError::validation(format!("Invalid amount '{}': {}", amount, e)))?;
    let items: Vec<CheckoutItem> = serde_json::from_str(items)?;

    let created = client
        .create_intent(
            amount,
            description,
            HashMap::new(),
            &CheckoutPayload::new(items),
        )
        .await?;

    println!("Created payment {}", created.intent.id);
    println!("   status: {}", created.intent.status);
    if let Some(qr) = &created.intent.qr_code_url {
        println!("   qr: {}", qr);
    }
    if let Some(redirect) = &created.redirect_url {
        println!("   checkout: {}", redirect);
    }
    Ok(())
}

fn millis_from_env(name: &str, default: Duration) -> Result<Duration> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Duration::from_millis)
            .map_err(|_| PaymentError::config(format!("Invalid {}: {}", name, value))),
        Err(_) => Ok(default),
    }
}

async fn watch(client: Arc<PaymentIntentClient>, payment_id: &str) -> Result<()> {
    let defaults = PollOptions::default();
    let options = PollOptions::default()
        .with_interval(millis_from_env("POLL_INTERVAL_MS", defaults.interval)?)
        .with_timeout(millis_from_env("POLL_TIMEOUT_MS", defaults.timeout)?);

    let poller = StatusPoller::new(client).with_options(options);
    let handle = poller.start(payment_id, |update| {
        if update.timed_out {
            println!("{}: {} (gave up waiting)", update.payment_id, update.status);
        } else {
            println!("{}: {}", update.payment_id, update.status);
        }
    });

    tokio::select! {
        _ = handle.finished() => {}
        _ = tokio::signal::ctrl_c() => {
            println!("Interrupted");
            poller.dispose();
        }
    }
    Ok(())
}
