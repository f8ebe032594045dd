//! Platform status command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, PlatformReport};
use crate::output::{
    color_status, format_latency, format_timestamp, print_json, print_warning, OutputFormat,
};

/// Row for services table
#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Latency")]
    latency: String,
    #[tabled(rename = "Error")]
    error: String,
}

fn service_rows(report: &PlatformReport) -> Vec<ServiceRow> {
    report
        .services
        .iter()
        .map(|(name, result)| ServiceRow {
            service: name.clone(),
            status: color_status(&result.status),
            latency: format_latency(result.latency_ms),
            error: result.error.clone().unwrap_or_default(),
        })
        .collect()
}

/// Show the platform report. Returns false when the platform is unhealthy.
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<bool> {
    let report = client.platform_health().await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!("{}", "Platform Health".bold());
            println!("{}", "=".repeat(60));
            println!("Status:    {}", color_status(&report.status));
            println!("Checked:   {}", format_timestamp(&report.timestamp));
            println!();

            if report.services.is_empty() {
                print_warning("No services configured");
            } else {
                let table = tabled::Table::new(service_rows(&report))
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("{}", table);

                let down = report
                    .services
                    .values()
                    .filter(|s| s.status != "healthy")
                    .count();
                println!("\n{} of {} services down", down, report.services.len());
            }
        }
    }

    Ok(!report.is_unhealthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ServiceReport;
    use std::collections::BTreeMap;

    #[test]
    fn test_service_rows_sorted_and_formatted() {
        let mut services = BTreeMap::new();
        services.insert(
            "web".to_string(),
            ServiceReport {
                status: "healthy".to_string(),
                latency_ms: Some(3.5),
                error: None,
            },
        );
        services.insert(
            "api".to_string(),
            ServiceReport {
                status: "unhealthy".to_string(),
                latency_ms: None,
                error: Some("timeout".to_string()),
            },
        );
        let report = PlatformReport {
            status: "degraded".to_string(),
            timestamp: "2026-01-02T03:04:05Z".to_string(),
            services,
        };

        let rows = service_rows(&report);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].service, "api");
        assert_eq!(rows[0].latency, "-");
        assert_eq!(rows[0].error, "timeout");
        assert_eq!(rows[1].service, "web");
        assert_eq!(rows[1].latency, "3.50ms");
        assert!(rows[1].error.is_empty());
    }
}
