use crate::error::Result;
use crate::schema::*;
use crate::validation::InputValidator;
use log::{debug, info, warn};

/// Replays the campaign planning sheet's formula chain.
///
/// Every call validates first and then runs one linear pass over the inputs.
/// Later steps read the exact floating-point values of earlier ones, so the
/// order of the steps below is part of the contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCalculator {
    validator: InputValidator,
}

impl MetricsCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validator(mut self, validator: InputValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Calculates with an explicit budget, which replaces any `orcamento` in `variables`.
    pub fn calculate(
        &self,
        total_budget: f64,
        variables: &CampaignVariables,
    ) -> Result<MetricsResult> {
        let mut merged = variables.clone();
        merged.total_budget = Some(total_budget);
        self.calculate_variables(&merged)
    }

    /// Calculates using the budget carried inside `variables`.
    pub fn calculate_variables(&self, variables: &CampaignVariables) -> Result<MetricsResult> {
        let inputs = self.validator.validate(variables).map_err(|failure| {
            warn!("Refusing to calculate metrics: {}", failure);
            failure
        })?;

        info!(
            "Calculating campaign metrics for a budget of {:.2}",
            inputs.total_budget
        );

        let result = compute(&inputs);

        info!(
            "LTV/CAC {:.2} -> {:?}",
            result.advanced.ltv_cac_ratio, result.advanced.status
        );

        Ok(result)
    }
}

/// `numerator / denominator`, or exactly 0 when the denominator is not positive.
/// An overflowed (infinite) denominator also gives 0.
fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 && denominator.is_finite() {
        numerator / denominator
    } else {
        0.0
    }
}

fn compute(inputs: &CampaignInputs) -> MetricsResult {
    // Spend split
    let ad_spend = inputs.total_budget * inputs.allocated_share;
    let display_budget = ad_spend * inputs.display_share;
    let search_budget = ad_spend * inputs.search_share;

    // Display
    let display_impressions = display_budget * inputs.display_impressions_per_unit;
    let display_clicks = display_impressions * inputs.display_ctr;
    let display_cpm = guarded_ratio(display_budget, display_impressions) * 1000.0;
    let display_ctr = guarded_ratio(display_clicks, display_impressions);

    // Search
    let search_impressions = search_budget * inputs.search_impressions_per_unit;
    let search_clicks = search_impressions * inputs.search_ctr;
    let search_cpc = guarded_ratio(search_budget, search_clicks);
    let search_ctr = guarded_ratio(search_clicks, search_impressions);

    debug!(
        "Display: {:.0} impressions, {:.0} clicks; Search: {:.0} impressions, {:.0} clicks",
        display_impressions, display_clicks, search_impressions, search_clicks
    );

    // Visitors and conversions
    let total_visitors = display_clicks + search_clicks;
    let total_sessions = total_visitors * inputs.sessions_per_user;
    let sessions_per_user = guarded_ratio(total_sessions, total_visitors);
    let new_orders = total_visitors * inputs.conversion_rate;
    let conversion_rate = guarded_ratio(new_orders, total_visitors);

    // Revenue and ROI
    let customers_acquired = new_orders;
    let total_sales = inputs.average_ticket * customers_acquired;
    let roas = guarded_ratio(total_sales, ad_spend);
    let net_revenue = total_sales - ad_spend;
    let roi = guarded_ratio(net_revenue, ad_spend);
    let difference = total_sales - ad_spend;
    let percent_change = guarded_ratio(difference, inputs.total_budget);

    debug!(
        "{:.2} orders, sales {:.2}, ROAS {:.4}",
        new_orders, total_sales, roas
    );

    // Advanced
    let cac = guarded_ratio(ad_spend, customers_acquired);
    let revenue_per_customer = guarded_ratio(total_sales * inputs.period, customers_acquired);
    let cogs = revenue_per_customer * inputs.cogs_share;
    let gross_profit_per_customer = revenue_per_customer - cogs;
    let gross_margin = guarded_ratio(gross_profit_per_customer, revenue_per_customer);
    let aov = guarded_ratio(total_sales, new_orders);
    let apf = guarded_ratio(customers_acquired, new_orders);
    let cltv = aov * apf * inputs.customer_lifespan;
    let lifetime_profit = cltv - cogs;
    let break_even_cac = cltv * gross_margin;
    let ltv_cac_ratio = guarded_ratio(cltv, cac);
    let break_even_roas = guarded_ratio(1.0, gross_margin);

    let status = ProfitabilityStatus::from_ltv_cac_ratio(ltv_cac_ratio);

    MetricsResult {
        display: DisplayAdsMetrics {
            budget: display_budget,
            impressions: display_impressions,
            clicks: display_clicks,
            cpm: display_cpm,
            ctr: display_ctr,
        },
        search: SearchAdsMetrics {
            budget: search_budget,
            impressions: search_impressions,
            clicks: search_clicks,
            cpc: search_cpc,
            ctr: search_ctr,
        },
        conversion: ConversionMetrics {
            total_visitors,
            total_sessions,
            sessions_per_user,
            new_orders,
            conversion_rate,
        },
        revenue: RevenueRoiMetrics {
            ad_spend,
            customers_acquired,
            total_sales,
            roas,
            net_revenue,
            roi,
            difference,
            percent_change,
        },
        advanced: AdvancedMetrics {
            cac,
            revenue_per_customer,
            cogs,
            gross_profit_per_customer,
            gross_margin,
            aov,
            apf,
            cltv,
            lifetime_profit,
            break_even_cac,
            ltv_cac_ratio,
            break_even_roas,
            status,
        },
    }
}

/// Calculates with the default validator. `total_budget` overrides any budget in `variables`.
pub fn calculate_metrics(
    total_budget: f64,
    variables: &CampaignVariables,
) -> Result<MetricsResult> {
    MetricsCalculator::default().calculate(total_budget, variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CampaignMetricsError, ValidationFailure};

    fn inputs() -> CampaignInputs {
        CampaignInputs {
            total_budget: 10_000.0,
            allocated_share: 1.0,
            display_share: 0.4,
            search_share: 0.6,
            display_impressions_per_unit: 500.0,
            search_impressions_per_unit: 50.0,
            display_ctr: 0.02,
            search_ctr: 0.05,
            sessions_per_user: 1.2,
            conversion_rate: 0.03,
            average_ticket: 150.0,
            cogs_share: 0.4,
            customer_lifespan: 3.0,
            period: 1.0,
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        let tolerance = 1e-9 * expected.abs().max(1.0);
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_guarded_ratio() {
        assert_eq!(guarded_ratio(10.0, 4.0), 2.5);
        assert_eq!(guarded_ratio(10.0, 0.0), 0.0);
        assert_eq!(guarded_ratio(0.0, 0.0), 0.0);
        assert_eq!(guarded_ratio(10.0, -2.0), 0.0);
        assert_eq!(guarded_ratio(f64::INFINITY, f64::INFINITY), 0.0);
        assert_eq!(guarded_ratio(10.0, f64::INFINITY), 0.0);
    }

    #[test]
    fn test_overflowed_impressions_do_not_produce_nan() {
        let mut huge = inputs();
        huge.total_budget = 1e10;
        huge.display_impressions_per_unit = 1e306;
        let result = compute(&huge);

        assert!(result.display.impressions.is_infinite());
        assert_eq!(result.display.ctr, 0.0);
        assert_eq!(result.conversion.conversion_rate, 0.0);
        for (key, value) in result.to_flat_map() {
            assert!(!value.is_nan(), "{} is NaN", key);
        }
    }

    #[test]
    fn test_compute_spend_split_and_channels() {
        let result = compute(&inputs());
        assert_close(result.revenue.ad_spend, 10_000.0);
        assert_close(result.display.budget, 4_000.0);
        assert_close(result.display.cpm, 2.0);
        assert_close(result.display.ctr, 0.02);
        assert_close(result.search.budget, 6_000.0);
        assert_close(result.search.cpc, 0.4);
        assert_close(result.search.ctr, 0.05);
    }

    #[test]
    fn test_period_scales_revenue_per_customer() {
        let mut quarterly = inputs();
        quarterly.period = 3.0;
        let base = compute(&inputs());
        let scaled = compute(&quarterly);
        assert_close(
            scaled.advanced.revenue_per_customer,
            base.advanced.revenue_per_customer * 3.0,
        );
        // CLTV is driven by AOV, not by revenue per customer.
        assert_close(scaled.advanced.cltv, base.advanced.cltv);
    }

    #[test]
    fn test_no_clicks_means_no_conversion_ratios() {
        let mut no_clicks = inputs();
        no_clicks.display_ctr = 0.0;
        no_clicks.search_ctr = 0.0;
        let result = compute(&no_clicks);

        assert_eq!(result.search.cpc, 0.0);
        assert_eq!(result.conversion.sessions_per_user, 0.0);
        assert_eq!(result.conversion.conversion_rate, 0.0);
        assert_eq!(result.advanced.cac, 0.0);
        assert_eq!(result.advanced.aov, 0.0);
        assert_eq!(result.advanced.ltv_cac_ratio, 0.0);
        assert_eq!(result.advanced.status, ProfitabilityStatus::Loss);
        // Impressions still exist, so CPM is defined.
        assert_close(result.display.cpm, 2.0);
    }

    #[test]
    fn test_explicit_budget_overrides_variables() {
        let variables = CampaignVariables::from(&inputs()).with(InputField::Budget, 1.0);
        let result = calculate_metrics(20_000.0, &variables).unwrap();
        assert_close(result.revenue.ad_spend, 20_000.0);
    }

    #[test]
    fn test_invalid_input_never_calculates() {
        let variables = CampaignVariables::from(&inputs()).with(InputField::DisplayShare, 0.5);
        let err = MetricsCalculator::new()
            .calculate_variables(&variables)
            .unwrap_err();
        assert!(matches!(
            err,
            CampaignMetricsError::Validation(ValidationFailure::AllocationMismatch { .. })
        ));

        let err = calculate_metrics(0.0, &CampaignVariables::from(&inputs())).unwrap_err();
        assert!(matches!(
            err,
            CampaignMetricsError::Validation(ValidationFailure::InvalidBudget(_))
        ));
    }
}
