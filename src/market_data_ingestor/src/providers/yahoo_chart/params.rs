use crate::models::{granularity::Granularity, request_params::FetchWindow};
use crate::providers::{ProviderError, ValidationSnafu};

/// Interval code the chart endpoint expects for each granularity.
pub fn interval_code(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Minute => "1m",
        Granularity::Daily => "1d",
    }
}

pub fn validate_window(window: &FetchWindow) -> Result<(), ProviderError> {
    if window.symbol.trim().is_empty() {
        return ValidationSnafu {
            message: "symbol must not be empty",
        }
        .fail();
    }
    if window.is_empty() {
        return ValidationSnafu {
            message: format!("empty window {} .. {}", window.start, window.end),
        }
        .fail();
    }
    Ok(())
}

/// Builds the query string for one chart request.
///
/// `period2` is exclusive upstream, so one second is added to keep the
/// window's end instant inside the request.
pub fn construct_params(window: &FetchWindow) -> Vec<(String, String)> {
    vec![
        ("period1".to_string(), window.start.timestamp().to_string()),
        ("period2".to_string(), (window.end.timestamp() + 1).to_string()),
        (
            "interval".to_string(),
            interval_code(window.granularity).to_string(),
        ),
        ("includePrePost".to_string(), "false".to_string()),
    ]
}
