// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// StoreKit bridge demo.
//
// Entry point. Loads config, initialises logging, then runs one store command
// against the platform store:
//
//     storekit [request|purchase|restore] [config.json]

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use storekit_core::StoreConfig;

use services::app_services::{AppServices, Command, Outcome};
use services::data_dir;

const USAGE: &str = "usage: storekit [request|purchase|restore] [config.json]";

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match args.first().map(|a| a.parse::<Command>()).transpose() {
        Ok(command) => command.unwrap_or_default(),
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            return ExitCode::from(2);
        }
    };
    let config_path = args
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(data_dir::config_path);

    // Logging needs the configured filter, so the config is read first and
    // any load failure is reported once the subscriber is up.
    let loaded = StoreConfig::load(&config_path);
    let log_filter = loaded
        .as_ref()
        .map(|c| c.log_filter.clone())
        .unwrap_or_else(|_| StoreConfig::default().log_filter);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!(path = %config_path.display(), error = %e, "using default config");
        StoreConfig::default()
    });

    tracing::info!(?command, "StoreKit demo starting");

    let mut app = match AppServices::init(config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "cannot open store session");
            return ExitCode::FAILURE;
        }
    };

    match app.run(command).await {
        Ok(outcome) => {
            report(&outcome);
            tracing::info!(owned = app.entitlements().entries().count(), "entitlements on record");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "store command failed");
            ExitCode::FAILURE
        }
    }
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Catalog(catalog) if catalog.is_empty() => println!("no products available"),
        Outcome::Catalog(catalog) => {
            for entry in catalog {
                println!("{}  {}  {}", entry.id(), entry.title(), entry.price());
                println!("    {}", entry.description());
            }
        }
        Outcome::Purchased {
            product,
            newly_granted: true,
        } => println!("purchased {product}"),
        Outcome::Purchased { product, .. } => println!("{product} was already owned"),
        Outcome::PurchaseFailed(product) => println!("purchase of {product} failed"),
        Outcome::Restored(products) if products.is_empty() => println!("nothing to restore"),
        Outcome::Restored(products) => {
            for product in products {
                println!("restored {product}");
            }
        }
    }
}
