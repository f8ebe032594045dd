//! Aggregator liveness check

use anyhow::Result;
use std::time::Instant;

use crate::client::{ApiClient, Liveness};
use crate::output::{print_error, print_json, print_success, OutputFormat};

/// Ping the aggregator's liveness endpoint. Returns false if it is unreachable
/// or reports anything other than ok.
pub async fn ping(client: &ApiClient, format: OutputFormat) -> Result<bool> {
    let start = Instant::now();
    let result: Result<Liveness> = client.get("health").await;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let ok = matches!(&result, Ok(liveness) if liveness.status == "ok");

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "reachable": result.is_ok(),
            "ok": ok,
            "elapsed_ms": elapsed_ms,
        }))?,
        OutputFormat::Table => match &result {
            Ok(_) if ok => {
                print_success(&format!("Aggregator is up ({:.1}ms)", elapsed_ms))
            }
            Ok(liveness) => print_error(&format!(
                "Aggregator answered with status {}",
                liveness.status
            )),
            Err(e) => print_error(&format!("Aggregator unreachable: {:#}", e)),
        },
    }

    Ok(ok)
}
