use crate::schema::InputField;
use thiserror::Error;

/// Why a set of campaign variables cannot be fed to the calculator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    #[error("Missing required fields: {}", join_fields(.0))]
    MissingFields(Vec<InputField>),

    #[error("Invalid budget {0}: orcamento must be a positive number")]
    InvalidBudget(f64),

    #[error("Display share ({display}) + Search share ({search}) = {sum}, must be 100%")]
    AllocationMismatch { display: f64, search: f64, sum: f64 },

    #[error("Field '{field}' is not numeric")]
    NonNumeric { field: InputField },

    #[error("Unknown input field: {0}")]
    UnknownField(String),
}

impl ValidationFailure {
    /// The fields a collector still has to ask for, if that is the failure.
    pub fn missing_fields(&self) -> Option<&[InputField]> {
        match self {
            ValidationFailure::MissingFields(fields) => Some(fields),
            _ => None,
        }
    }
}

fn join_fields(fields: &[InputField]) -> String {
    fields
        .iter()
        .map(|f| f.key())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug)]
pub enum CampaignMetricsError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[cfg(feature = "llm")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[cfg(feature = "llm")]
    #[error("Anthropic API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[cfg(feature = "llm")]
    #[error("Stream error: {0}")]
    Stream(String),

    #[cfg(feature = "llm")]
    #[error("ANTHROPIC_API_KEY is not set")]
    MissingApiKey,
}

pub type Result<T> = std::result::Result<T, CampaignMetricsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_lists_wire_keys() {
        let failure =
            ValidationFailure::MissingFields(vec![InputField::Budget, InputField::SearchCtr]);
        assert_eq!(
            failure.to_string(),
            "Missing required fields: orcamento, ctrSearch"
        );
        assert_eq!(failure.missing_fields().map(|f| f.len()), Some(2));
    }

    #[test]
    fn test_validation_error_wraps_detail() {
        let err: CampaignMetricsError = ValidationFailure::InvalidBudget(-5.0).into();
        assert!(err.to_string().starts_with("Validation failed: Invalid budget -5"));
    }
}
