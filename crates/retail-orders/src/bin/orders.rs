//! # Orders CLI
//!
//! Operator commands over the configured database.
//!
//! ## Usage
//! ```bash
//! RETAIL_DB_PATH=./retail_dev.db cargo run -p retail-orders --bin orders -- low-stock
//! cargo run -p retail-orders --bin orders -- show <ORDER_ID>
//! cargo run -p retail-orders --bin orders -- pay <ORDER_ID> [METHOD]
//! cargo run -p retail-orders --bin orders -- cancel <ORDER_ID>
//! ```
//!
//! Results and errors are printed as JSON.

use std::env;
use std::process::ExitCode;

use retail_core::PaymentMethod;
use retail_orders::{init_tracing, ApiError, OrderService, PaymentRequest, ServiceConfig};
use serde::Serialize;

fn print_usage() {
    println!("Retail Orders");
    println!();
    println!("Usage: orders <COMMAND>");
    println!();
    println!("Commands:");
    println!("  low-stock                  Products under the low stock threshold");
    println!("  show <ORDER_ID>            Order with its items");
    println!("  pay <ORDER_ID> [METHOD]    Mark paid and record the amount due");
    println!("  cancel <ORDER_ID>          Cancel and release stock");
    println!();
    println!("Environment: RETAIL_DB_PATH, RETAIL_DB_MAX_CONNECTIONS,");
    println!("             RETAIL_LOW_STOCK_THRESHOLD, RETAIL_DEFAULT_PAYMENT_METHOD");
}

fn emit<T: Serialize>(result: Result<T, ApiError>) -> ExitCode {
    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to serialize result: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            match serde_json::to_string_pretty(&err) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", err),
            }
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().map(String::as_str);
    if matches!(command, None | Some("--help") | Some("-h")) {
        print_usage();
        return ExitCode::SUCCESS;
    }

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let service = match OrderService::connect(config).await {
        Ok(service) => service,
        Err(e) => return emit::<()>(Err(e)),
    };

    let order_id = args.get(1).map(String::as_str);
    match (command, order_id) {
        (Some("low-stock"), _) => emit(service.low_stock().await),
        (Some("show"), Some(id)) => emit(service.get_order(id).await),
        (Some("cancel"), Some(id)) => emit(service.cancel_order(id).await),
        (Some("pay"), Some(id)) => {
            let method = match args.get(2).map(|m| m.parse::<PaymentMethod>()) {
                None => None,
                Some(Ok(method)) => Some(method),
                Some(Err(e)) => {
                    eprintln!("{}", e);
                    return ExitCode::FAILURE;
                }
            };
            let payment = PaymentRequest {
                amount_cents: None,
                method,
            };
            emit(service.pay_order(id, Some(payment)).await)
        }
        _ => {
            print_usage();
            ExitCode::FAILURE
        }
    }
}
