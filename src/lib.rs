//! # Campaign Metrics
//!
//! A deterministic calculator for digital-ad campaign planning. It replays a
//! planning spreadsheet's formula chain: budget split between Display and Search,
//! the visitor and conversion funnel, revenue and ROI, and CAC/LTV unit economics,
//! ending in a profitability status.
//!
//! ## Core Concepts
//!
//! - **Campaign variables**: the named inputs an analyst collects from a briefing
//!   (`orcamento`, `budgetAlocado`, `percentualDisplay`, ...). Any may be missing.
//! - **Validation**: all missing inputs are reported at once; only the budget and the
//!   Display/Search split are range-checked.
//! - **Metrics result**: five blocks (Display Ads, Search Ads, Conversion, Revenue &
//!   ROI, Advanced Metrics) plus a [`ProfitabilityStatus`]. Every ratio with a zero
//!   denominator is exactly `0`.
//! - **Presentation**: locale-aware currency, percentage and number formatting, and
//!   markdown tables for chat replies.
//!
//! With the `llm` feature, [`llm::Coordinator`] routes chat messages between the
//! metrics analyst and the keyword strategist personas and calls the Anthropic
//! Messages API.
//!
//! ## Example
//!
//! ```rust
//! use campaign_metrics::*;
//!
//! let variables = CampaignVariables::new()
//!     .with(InputField::AllocatedShare, 1.0)
//!     .with(InputField::DisplayShare, 0.4)
//!     .with(InputField::SearchShare, 0.6)
//!     .with(InputField::DisplayImpressionsPerUnit, 500.0)
//!     .with(InputField::SearchImpressionsPerUnit, 50.0)
//!     .with(InputField::DisplayCtr, 0.02)
//!     .with(InputField::SearchCtr, 0.05)
//!     .with(InputField::SessionsPerUser, 1.2)
//!     .with(InputField::ConversionRate, 0.03)
//!     .with(InputField::AverageTicket, 150.0)
//!     .with(InputField::CogsShare, 0.4)
//!     .with(InputField::CustomerLifespan, 3.0);
//!
//! let result = calculate_metrics(10_000.0, &variables).unwrap();
//! assert_eq!(result.status(), ProfitabilityStatus::Excellent);
//! println!("{}", render_markdown(&result));
//! ```

pub mod calculator;
pub mod conversation;
pub mod error;
pub mod format;
pub mod report;
pub mod router;
pub mod schema;
pub mod validation;

#[cfg(feature = "llm")]
pub mod llm;

pub use calculator::{calculate_metrics, MetricsCalculator};
pub use conversation::{ChatMessage, Role};
pub use error::{CampaignMetricsError, Result, ValidationFailure};
pub use format::*;
pub use report::{render_markdown, MetricGroup, MetricKind, MetricRow, ReportRenderer};
pub use router::{AgentClassifier, AgentKind, KeywordClassifier};
pub use schema::*;
pub use validation::{validate_inputs, InputValidator, DEFAULT_ALLOCATION_TOLERANCE};

use log::debug;

/// Calculates from a JSON object of named inputs, as received from an API handler
/// or an LLM tool call.
pub fn calculate_from_json(value: &serde_json::Value) -> Result<MetricsResult> {
    let variables = CampaignVariables::from_json(value);
    debug!(
        "Loaded {} of {} inputs from JSON",
        variables.to_map().len(),
        InputField::ALL.len()
    );
    MetricsCalculator::default().calculate_variables(&variables)
}

/// Calculates and renders in one step. Validation failures are rendered as a note
/// listing what is still needed instead of being returned as errors.
pub fn calculate_report(variables: &CampaignVariables) -> String {
    let renderer = ReportRenderer::default();
    match MetricsCalculator::default().calculate_variables(variables) {
        Ok(result) => renderer.render(&result),
        Err(CampaignMetricsError::Validation(failure)) => renderer.render_failure(&failure),
        Err(other) => format!("**Cannot calculate:** {}\n", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_calculate_from_json() {
        let value = json!({
            "orcamento": 10000,
            "budgetAlocado": 1.0,
            "percentualDisplay": 0.4,
            "percentualSearch": 0.6,
            "impressoesPorRealDisplay": 500,
            "impressoesPorRealSearch": 50,
            "ctrDisplay": 0.02,
            "ctrSearch": 0.05,
            "sessoesPorUsuario": 1.2,
            "taxaConversao": 0.03,
            "ticketMedio": 150,
            "cogsPercentual": 0.4,
            "customerLifespan": 3,
            "periodo": null
        });

        let result = calculate_from_json(&value).unwrap();
        assert!((result.revenue.total_sales - 247_500.0).abs() < 1e-6);
        assert_eq!(result.status(), ProfitabilityStatus::Excellent);
    }

    #[test]
    fn test_calculate_from_json_reports_missing_and_bad_budget() {
        let err = calculate_from_json(&json!({ "orcamento": "dez mil" })).unwrap_err();
        match err {
            CampaignMetricsError::Validation(ValidationFailure::MissingFields(fields)) => {
                assert_eq!(fields.len(), InputField::REQUIRED.len() - 1);
                assert!(!fields.contains(&InputField::Budget));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_calculate_from_json_lists_missing_before_non_numeric() {
        let err = calculate_from_json(&json!({ "orcamento": 10000, "ticketMedio": "150" }))
            .unwrap_err();
        match err {
            CampaignMetricsError::Validation(ValidationFailure::MissingFields(fields)) => {
                assert_eq!(fields.len(), InputField::REQUIRED.len() - 2);
                assert!(!fields.contains(&InputField::AverageTicket));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_calculate_from_json_reports_non_numeric_once_complete() {
        let value = json!({
            "orcamento": 10000,
            "budgetAlocado": 1.0,
            "percentualDisplay": 0.4,
            "percentualSearch": 0.6,
            "impressoesPorRealDisplay": 500,
            "impressoesPorRealSearch": 50,
            "ctrDisplay": 0.02,
            "ctrSearch": 0.05,
            "sessoesPorUsuario": 1.2,
            "taxaConversao": 0.03,
            "ticketMedio": "150",
            "cogsPercentual": 0.4,
            "customerLifespan": 3
        });
        let err = calculate_from_json(&value).unwrap_err();
        assert!(matches!(
            err,
            CampaignMetricsError::Validation(ValidationFailure::NonNumeric {
                field: InputField::AverageTicket
            })
        ));
    }

    #[test]
    fn test_calculate_report_for_incomplete_inputs() {
        let variables = CampaignVariables::new().with(InputField::Budget, 5_000.0);
        let report = calculate_report(&variables);
        assert!(report.starts_with("**Missing inputs:**"));
        assert!(!report.contains("`orcamento`"));
        assert!(report.contains("`budgetAlocado`"));
    }
}
