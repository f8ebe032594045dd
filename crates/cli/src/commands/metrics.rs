//! Prometheus gauge listing

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{print_json, print_warning, OutputFormat};

/// One sample line of the text exposition
#[derive(Debug, Serialize, Tabled, PartialEq)]
struct Sample {
    #[tabled(rename = "Series")]
    series: String,
    #[tabled(rename = "Value")]
    value: f64,
}

/// Parse sample lines, skipping comments and lines that do not match the filter
fn parse_samples(exposition: &str, filter: Option<&str>) -> Vec<Sample> {
    exposition
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| filter.map_or(true, |f| line.contains(f)))
        .filter_map(|line| {
            let (series, value) = line.rsplit_once(' ')?;
            let value = value.parse().ok()?;
            Some(Sample {
                series: series.to_string(),
                value,
            })
        })
        .collect()
}

/// Show the aggregator's gauges, refreshed by the scrape itself
pub async fn show_metrics(
    client: &ApiClient,
    filter: Option<&str>,
    format: OutputFormat,
) -> Result<bool> {
    let exposition = client.get_text("metrics").await?;
    let samples = parse_samples(&exposition, filter);

    match format {
        OutputFormat::Json => print_json(&samples)?,
        OutputFormat::Table => {
            if samples.is_empty() {
                print_warning("No matching series");
            } else {
                let table = tabled::Table::new(&samples)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("{}", table);
            }
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPOSITION: &str = "\
# HELP platform_health_status Platform health
# TYPE platform_health_status gauge
platform_health_status 0.5
# TYPE service_health_status gauge
service_health_status{service=\"a\"} 0
service_health_status{service=\"b\"} 1
";

    #[test]
    fn test_parse_samples_skips_comments() {
        let samples = parse_samples(EXPOSITION, None);
        assert_eq!(samples.len(), 3);
        assert_eq!(
            samples[0],
            Sample {
                series: "platform_health_status".to_string(),
                value: 0.5
            }
        );
    }

    #[test]
    fn test_parse_samples_with_filter() {
        let samples = parse_samples(EXPOSITION, Some("service=\"b\""));
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].series, "service_health_status{service=\"b\"}");
        assert_eq!(samples[0].value, 1.0);
    }
}
