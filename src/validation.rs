use crate::error::ValidationFailure;
use crate::schema::{CampaignInputs, CampaignVariables, InputField, DEFAULT_PERIOD};
use log::{debug, warn};

/// Display + Search shares are accepted when they sum to 1 within this distance.
pub const DEFAULT_ALLOCATION_TOLERANCE: f64 = 1e-9;

/// Checks that collected variables are complete enough to calculate.
///
/// Only two values are range-checked: the budget must be positive and the
/// Display/Search split must add up to 100%. Every other input is checked for
/// presence only, mirroring the two validated cells of the planning sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputValidator {
    allocation_tolerance: f64,
}

impl Default for InputValidator {
    fn default() -> Self {
        Self {
            allocation_tolerance: DEFAULT_ALLOCATION_TOLERANCE,
        }
    }
}

impl InputValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the allowed distance from 1 for the Display + Search sum. NaN keeps the
    /// default tolerance.
    pub fn with_allocation_tolerance(mut self, tolerance: f64) -> Self {
        self.allocation_tolerance = if tolerance.is_nan() {
            warn!("Ignoring NaN allocation tolerance");
            DEFAULT_ALLOCATION_TOLERANCE
        } else {
            tolerance.abs()
        };
        self
    }

    pub fn allocation_tolerance(&self) -> f64 {
        self.allocation_tolerance
    }

    /// Validates and returns the complete input set.
    ///
    /// Checks run in a fixed order: all missing fields are collected first, then
    /// inputs that were not numbers, then the budget, then the allocation split.
    pub fn validate(
        &self,
        variables: &CampaignVariables,
    ) -> Result<CampaignInputs, ValidationFailure> {
        let missing = variables.missing_fields();
        if !missing.is_empty() {
            debug!("{} required inputs are missing", missing.len());
            return Err(ValidationFailure::MissingFields(missing));
        }

        if let Some(&field) = variables.non_numeric_fields().first() {
            return Err(ValidationFailure::NonNumeric { field });
        }

        let total_budget = required(variables, InputField::Budget)?;
        if total_budget.is_nan() || total_budget <= 0.0 {
            return Err(ValidationFailure::InvalidBudget(total_budget));
        }

        let display_share = required(variables, InputField::DisplayShare)?;
        let search_share = required(variables, InputField::SearchShare)?;
        let sum = display_share + search_share;
        if sum.is_nan() || (sum - 1.0).abs() > self.allocation_tolerance {
            return Err(ValidationFailure::AllocationMismatch {
                display: display_share,
                search: search_share,
                sum,
            });
        }

        Ok(CampaignInputs {
            total_budget,
            allocated_share: required(variables, InputField::AllocatedShare)?,
            display_share,
            search_share,
            display_impressions_per_unit: required(
                variables,
                InputField::DisplayImpressionsPerUnit,
            )?,
            search_impressions_per_unit: required(variables, InputField::SearchImpressionsPerUnit)?,
            display_ctr: required(variables, InputField::DisplayCtr)?,
            search_ctr: required(variables, InputField::SearchCtr)?,
            sessions_per_user: required(variables, InputField::SessionsPerUser)?,
            conversion_rate: required(variables, InputField::ConversionRate)?,
            average_ticket: required(variables, InputField::AverageTicket)?,
            cogs_share: required(variables, InputField::CogsShare)?,
            customer_lifespan: required(variables, InputField::CustomerLifespan)?,
            period: variables.period.unwrap_or(DEFAULT_PERIOD),
        })
    }

    pub fn is_valid(&self, variables: &CampaignVariables) -> bool {
        self.validate(variables).is_ok()
    }
}

fn required(variables: &CampaignVariables, field: InputField) -> Result<f64, ValidationFailure> {
    variables
        .get(field)
        .ok_or_else(|| ValidationFailure::MissingFields(vec![field]))
}

/// Validates with the default tolerance.
pub fn validate_inputs(variables: &CampaignVariables) -> Result<CampaignInputs, ValidationFailure> {
    InputValidator::default().validate(variables)
}
