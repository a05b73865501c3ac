use crate::error::ValidationFailure;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Every named input the calculator understands, keyed by its wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InputField {
    #[serde(rename = "orcamento")]
    Budget,
    #[serde(rename = "budgetAlocado")]
    AllocatedShare,
    #[serde(rename = "percentualDisplay")]
    DisplayShare,
    #[serde(rename = "percentualSearch")]
    SearchShare,
    #[serde(rename = "impressoesPorRealDisplay")]
    DisplayImpressionsPerUnit,
    #[serde(rename = "impressoesPorRealSearch")]
    SearchImpressionsPerUnit,
    #[serde(rename = "ctrDisplay")]
    DisplayCtr,
    #[serde(rename = "ctrSearch")]
    SearchCtr,
    #[serde(rename = "sessoesPorUsuario")]
    SessionsPerUser,
    #[serde(rename = "taxaConversao")]
    ConversionRate,
    #[serde(rename = "ticketMedio")]
    AverageTicket,
    #[serde(rename = "cogsPercentual")]
    CogsShare,
    #[serde(rename = "customerLifespan")]
    CustomerLifespan,
    #[serde(rename = "periodo")]
    Period,
}

impl InputField {
    /// Required inputs, in the order missing fields are reported.
    pub const REQUIRED: [InputField; 13] = [
        InputField::Budget,
        InputField::AllocatedShare,
        InputField::DisplayShare,
        InputField::SearchShare,
        InputField::DisplayImpressionsPerUnit,
        InputField::SearchImpressionsPerUnit,
        InputField::DisplayCtr,
        InputField::SearchCtr,
        InputField::SessionsPerUser,
        InputField::ConversionRate,
        InputField::AverageTicket,
        InputField::CogsShare,
        InputField::CustomerLifespan,
    ];

    pub const ALL: [InputField; 14] = [
        InputField::Budget,
        InputField::AllocatedShare,
        InputField::DisplayShare,
        InputField::SearchShare,
        InputField::DisplayImpressionsPerUnit,
        InputField::SearchImpressionsPerUnit,
        InputField::DisplayCtr,
        InputField::SearchCtr,
        InputField::SessionsPerUser,
        InputField::ConversionRate,
        InputField::AverageTicket,
        InputField::CogsShare,
        InputField::CustomerLifespan,
        InputField::Period,
    ];

    pub fn key(self) -> &'static str {
        match self {
            InputField::Budget => "orcamento",
            InputField::AllocatedShare => "budgetAlocado",
            InputField::DisplayShare => "percentualDisplay",
            InputField::SearchShare => "percentualSearch",
            InputField::DisplayImpressionsPerUnit => "impressoesPorRealDisplay",
            InputField::SearchImpressionsPerUnit => "impressoesPorRealSearch",
            InputField::DisplayCtr => "ctrDisplay",
            InputField::SearchCtr => "ctrSearch",
            InputField::SessionsPerUser => "sessoesPorUsuario",
            InputField::ConversionRate => "taxaConversao",
            InputField::AverageTicket => "ticketMedio",
            InputField::CogsShare => "cogsPercentual",
            InputField::CustomerLifespan => "customerLifespan",
            InputField::Period => "periodo",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// Short English description, used when asking a user for a missing value.
    pub fn description(self) -> &'static str {
        match self {
            InputField::Budget => "Total campaign budget",
            InputField::AllocatedShare => "Share of the budget spent on ads",
            InputField::DisplayShare => "Share of ad spend going to Display",
            InputField::SearchShare => "Share of ad spend going to Search",
            InputField::DisplayImpressionsPerUnit => "Display impressions per currency unit",
            InputField::SearchImpressionsPerUnit => "Search impressions per currency unit",
            InputField::DisplayCtr => "Display click-through rate",
            InputField::SearchCtr => "Search click-through rate",
            InputField::SessionsPerUser => "Sessions per visitor",
            InputField::ConversionRate => "Visitor to order conversion rate",
            InputField::AverageTicket => "Average ticket (order value)",
            InputField::CogsShare => "Cost of goods sold as a share of revenue",
            InputField::CustomerLifespan => "Customer lifespan in purchase periods",
            InputField::Period => "Period length (defaults to 1)",
        }
    }

    pub fn is_required(self) -> bool {
        self != InputField::Period
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Campaign variables as collected so far. Any of them may still be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CampaignVariables {
    #[serde(rename = "orcamento", skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Total campaign budget in currency units. Must be greater than zero.")]
    pub total_budget: Option<f64>,

    #[serde(rename = "budgetAlocado", skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Fraction of the total budget spent on ads (0.0 to 1.0).")]
    pub allocated_share: Option<f64>,

    #[serde(rename = "percentualDisplay", skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Fraction of ad spend allocated to Display (0.0 to 1.0). \
                              Display + Search must equal 1.0.")]
    pub display_share: Option<f64>,

    #[serde(rename = "percentualSearch", skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Fraction of ad spend allocated to Search (0.0 to 1.0). \
                              Display + Search must equal 1.0.")]
    pub search_share: Option<f64>,

    #[serde(rename = "impressoesPorRealDisplay", skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Display impressions obtained per currency unit spent.")]
    pub display_impressions_per_unit: Option<f64>,

    #[serde(rename = "impressoesPorRealSearch", skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Search impressions obtained per currency unit spent.")]
    pub search_impressions_per_unit: Option<f64>,

    #[serde(rename = "ctrDisplay", skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Display click-through rate as a fraction (e.g. 0.02 for 2%).")]
    pub display_ctr: Option<f64>,

    #[serde(rename = "ctrSearch", skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Search click-through rate as a fraction (e.g. 0.05 for 5%).")]
    pub search_ctr: Option<f64>,

    #[serde(rename = "sessoesPorUsuario", skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Average sessions per visitor.")]
    pub sessions_per_user: Option<f64>,

    #[serde(rename = "taxaConversao", skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Visitor to order conversion rate as a fraction.")]
    pub conversion_rate: Option<f64>,

    #[serde(rename = "ticketMedio", skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Average order value in currency units.")]
    pub average_ticket: Option<f64>,

    #[serde(rename = "cogsPercentual", skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Cost of goods sold as a fraction of revenue.")]
    pub cogs_share: Option<f64>,

    #[serde(rename = "customerLifespan", skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Number of repeat-purchase periods in a customer's lifetime.")]
    pub customer_lifespan: Option<f64>,

    #[serde(rename = "periodo", skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Optional period multiplier for revenue per customer. Defaults to 1.")]
    pub period: Option<f64>,

    /// Inputs that were supplied with a value that is not a number.
    #[serde(skip)]
    #[schemars(skip)]
    non_numeric: Vec<InputField>,
}

impl CampaignVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: InputField) -> Option<f64> {
        match field {
            InputField::Budget => self.total_budget,
            InputField::AllocatedShare => self.allocated_share,
            InputField::DisplayShare => self.display_share,
            InputField::SearchShare => self.search_share,
            InputField::DisplayImpressionsPerUnit => self.display_impressions_per_unit,
            InputField::SearchImpressionsPerUnit => self.search_impressions_per_unit,
            InputField::DisplayCtr => self.display_ctr,
            InputField::SearchCtr => self.search_ctr,
            InputField::SessionsPerUser => self.sessions_per_user,
            InputField::ConversionRate => self.conversion_rate,
            InputField::AverageTicket => self.average_ticket,
            InputField::CogsShare => self.cogs_share,
            InputField::CustomerLifespan => self.customer_lifespan,
            InputField::Period => self.period,
        }
    }

    pub fn set(&mut self, field: InputField, value: Option<f64>) {
        let slot = match field {
            InputField::Budget => &mut self.total_budget,
            InputField::AllocatedShare => &mut self.allocated_share,
            InputField::DisplayShare => &mut self.display_share,
            InputField::SearchShare => &mut self.search_share,
            InputField::DisplayImpressionsPerUnit => &mut self.display_impressions_per_unit,
            InputField::SearchImpressionsPerUnit => &mut self.search_impressions_per_unit,
            InputField::DisplayCtr => &mut self.display_ctr,
            InputField::SearchCtr => &mut self.search_ctr,
            InputField::SessionsPerUser => &mut self.sessions_per_user,
            InputField::ConversionRate => &mut self.conversion_rate,
            InputField::AverageTicket => &mut self.average_ticket,
            InputField::CogsShare => &mut self.cogs_share,
            InputField::CustomerLifespan => &mut self.customer_lifespan,
            InputField::Period => &mut self.period,
        };
        *slot = value;
        self.non_numeric.retain(|f| *f != field);
    }

    /// Builder form of [`CampaignVariables::set`].
    pub fn with(mut self, field: InputField, value: f64) -> Self {
        self.set(field, Some(value));
        self
    }

    /// Required fields that have no value yet. Fields supplied with a non-numeric
    /// value are not missing; see [`CampaignVariables::non_numeric_fields`].
    pub fn missing_fields(&self) -> Vec<InputField> {
        InputField::REQUIRED
            .into_iter()
            .filter(|f| self.get(*f).is_none() && !self.non_numeric.contains(f))
            .collect()
    }

    pub fn non_numeric_fields(&self) -> &[InputField] {
        &self.non_numeric
    }

    /// Loads variables from a strict name -> value map. Unknown names are rejected.
    pub fn from_map(map: &BTreeMap<String, f64>) -> Result<Self, ValidationFailure> {
        let mut variables = Self::default();
        for (key, value) in map {
            let field = InputField::from_key(key)
                .ok_or_else(|| ValidationFailure::UnknownField(key.clone()))?;
            variables.set(field, Some(*value));
        }
        Ok(variables)
    }

    /// Loads variables from a JSON object.
    ///
    /// `null` counts as absent and keys that are not inputs are ignored. A non-numeric
    /// budget is kept as NaN so the validator reports it as an invalid budget; any
    /// other non-numeric input is recorded and reported once nothing is missing.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let mut variables = Self::default();
        let Some(object) = value.as_object() else {
            return variables;
        };

        for (key, raw) in object {
            let Some(field) = InputField::from_key(key) else {
                continue;
            };

            let parsed = match raw {
                serde_json::Value::Null => None,
                serde_json::Value::Number(n) => n.as_f64(),
                _ if field == InputField::Budget => Some(f64::NAN),
                _ => {
                    variables.set(field, None);
                    variables.non_numeric.push(field);
                    continue;
                }
            };
            variables.set(field, parsed);
        }

        variables
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        InputField::ALL
            .into_iter()
            .filter_map(|f| self.get(f).map(|v| (f.key().to_string(), v)))
            .collect()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(CampaignVariables)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

/// A complete, validated set of inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CampaignInputs {
    #[serde(rename = "orcamento")]
    pub total_budget: f64,
    #[serde(rename = "budgetAlocado")]
    pub allocated_share: f64,
    #[serde(rename = "percentualDisplay")]
    pub display_share: f64,
    #[serde(rename = "percentualSearch")]
    pub search_share: f64,
    #[serde(rename = "impressoesPorRealDisplay")]
    pub display_impressions_per_unit: f64,
    #[serde(rename = "impressoesPorRealSearch")]
    pub search_impressions_per_unit: f64,
    #[serde(rename = "ctrDisplay")]
    pub display_ctr: f64,
    #[serde(rename = "ctrSearch")]
    pub search_ctr: f64,
    #[serde(rename = "sessoesPorUsuario")]
    pub sessions_per_user: f64,
    #[serde(rename = "taxaConversao")]
    pub conversion_rate: f64,
    #[serde(rename = "ticketMedio")]
    pub average_ticket: f64,
    #[serde(rename = "cogsPercentual")]
    pub cogs_share: f64,
    #[serde(rename = "customerLifespan")]
    pub customer_lifespan: f64,
    #[serde(rename = "periodo", default = "default_period")]
    pub period: f64,
}

pub const DEFAULT_PERIOD: f64 = 1.0;

fn default_period() -> f64 {
    DEFAULT_PERIOD
}

impl From<&CampaignInputs> for CampaignVariables {
    fn from(inputs: &CampaignInputs) -> Self {
        CampaignVariables {
            total_budget: Some(inputs.total_budget),
            allocated_share: Some(inputs.allocated_share),
            display_share: Some(inputs.display_share),
            search_share: Some(inputs.search_share),
            display_impressions_per_unit: Some(inputs.display_impressions_per_unit),
            search_impressions_per_unit: Some(inputs.search_impressions_per_unit),
            display_ctr: Some(inputs.display_ctr),
            search_ctr: Some(inputs.search_ctr),
            sessions_per_user: Some(inputs.sessions_per_user),
            conversion_rate: Some(inputs.conversion_rate),
            average_ticket: Some(inputs.average_ticket),
            cogs_share: Some(inputs.cogs_share),
            customer_lifespan: Some(inputs.customer_lifespan),
            period: Some(inputs.period),
            non_numeric: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfitabilityStatus {
    /// LTV/CAC of 4 or more.
    Excellent,
    /// LTV/CAC of 3 up to 4.
    Healthy,
    /// LTV/CAC of 2 up to 3.
    Modest,
    /// Anything below 2, including NaN.
    Loss,
}

impl ProfitabilityStatus {
    pub fn from_ltv_cac_ratio(ratio: f64) -> Self {
        if ratio >= 4.0 {
            ProfitabilityStatus::Excellent
        } else if ratio >= 3.0 {
            ProfitabilityStatus::Healthy
        } else if ratio >= 2.0 {
            ProfitabilityStatus::Modest
        } else {
            ProfitabilityStatus::Loss
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProfitabilityStatus::Excellent => "Excellent margin for reinvestment",
            ProfitabilityStatus::Healthy => "Healthy profitability",
            ProfitabilityStatus::Modest => "Modest profitability",
            ProfitabilityStatus::Loss => "Loss (CAC above gross margin)",
        }
    }
}

impl fmt::Display for ProfitabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayAdsMetrics {
    pub budget: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub cpm: f64,
    pub ctr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchAdsMetrics {
    pub budget: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub cpc: f64,
    pub ctr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionMetrics {
    pub total_visitors: f64,
    pub total_sessions: f64,
    pub sessions_per_user: f64,
    pub new_orders: f64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevenueRoiMetrics {
    /// Budget actually spent on ads (`orcamento × budgetAlocado`).
    pub ad_spend: f64,
    pub customers_acquired: f64,
    pub total_sales: f64,
    pub roas: f64,
    pub net_revenue: f64,
    pub roi: f64,
    pub difference: f64,
    /// Difference relative to the total budget, not to ad spend.
    pub percent_change: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdvancedMetrics {
    pub cac: f64,
    pub revenue_per_customer: f64,
    pub cogs: f64,
    pub gross_profit_per_customer: f64,
    pub gross_margin: f64,
    pub aov: f64,
    pub apf: f64,
    pub cltv: f64,
    pub lifetime_profit: f64,
    pub break_even_cac: f64,
    pub ltv_cac_ratio: f64,
    pub break_even_roas: f64,
    pub status: ProfitabilityStatus,
}

/// Full output of one calculation, grouped the way the planning sheet is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    pub display: DisplayAdsMetrics,
    pub search: SearchAdsMetrics,
    pub conversion: ConversionMetrics,
    pub revenue: RevenueRoiMetrics,
    pub advanced: AdvancedMetrics,
}

impl MetricsResult {
    pub fn status(&self) -> ProfitabilityStatus {
        self.advanced.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_field_keys_round_trip() {
        for field in InputField::ALL {
            assert_eq!(InputField::from_key(field.key()), Some(field));
        }
        assert_eq!(InputField::from_key("budget"), None);
        assert!(!InputField::Period.is_required());
        assert!(!InputField::REQUIRED.contains(&InputField::Period));
    }

    #[test]
    fn test_from_json_treats_null_as_missing() {
        let json = serde_json::json!({
            "orcamento": 5000,
            "ctrDisplay": null,
            "notAnInput": "ignored"
        });
        let variables = CampaignVariables::from_json(&json);
        assert_eq!(variables.total_budget, Some(5000.0));
        assert_eq!(variables.display_ctr, None);
        assert!(variables.missing_fields().contains(&InputField::DisplayCtr));
        assert!(!variables.missing_fields().contains(&InputField::Budget));
    }

    #[test]
    fn test_from_json_non_numeric_values() {
        let json = serde_json::json!({ "orcamento": "lots" });
        let variables = CampaignVariables::from_json(&json);
        assert!(variables.total_budget.unwrap().is_nan());

        let json = serde_json::json!({ "ticketMedio": "150" });
        let variables = CampaignVariables::from_json(&json);
        assert_eq!(variables.average_ticket, None);
        assert_eq!(variables.non_numeric_fields(), [InputField::AverageTicket]);
        assert!(!variables.missing_fields().contains(&InputField::AverageTicket));
        assert_eq!(variables.missing_fields().len(), InputField::REQUIRED.len() - 1);

        let variables = variables.with(InputField::AverageTicket, 150.0);
        assert!(variables.non_numeric_fields().is_empty());
    }

    #[test]
    fn test_from_map_rejects_unknown_names() {
        let mut map = BTreeMap::new();
        map.insert("orcamento".to_string(), 100.0);
        map.insert("orcamentoo".to_string(), 100.0);
        let err = CampaignVariables::from_map(&map).unwrap_err();
        assert_eq!(err, ValidationFailure::UnknownField("orcamentoo".to_string()));
    }

    #[test]
    fn test_serialization_uses_wire_keys() {
        let variables = CampaignVariables::new()
            .with(InputField::Budget, 10000.0)
            .with(InputField::DisplayShare, 0.4);
        let json = serde_json::to_string(&variables).unwrap();
        assert!(json.contains("\"orcamento\":10000.0"));
        assert!(json.contains("\"percentualDisplay\":0.4"));
        assert!(!json.contains("ctrSearch"));

        let back: CampaignVariables = serde_json::from_str(&json).unwrap();
        assert_eq!(back, variables);
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = CampaignVariables::schema_as_json().unwrap();
        assert!(schema_json.contains("orcamento"));
        assert!(schema_json.contains("percentualSearch"));
        assert!(schema_json.contains("customerLifespan"));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(
            ProfitabilityStatus::Loss.to_string(),
            "Loss (CAC above gross margin)"
        );
        assert_eq!(
            ProfitabilityStatus::from_ltv_cac_ratio(f64::NAN),
            ProfitabilityStatus::Loss
        );
    }
}
