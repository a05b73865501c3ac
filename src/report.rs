use crate::error::ValidationFailure;
use crate::format::{Formatter, DEFAULT_NUMBER_DECIMALS, DEFAULT_PERCENT_DECIMALS};
use crate::schema::MetricsResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

const RATIO_DECIMALS: usize = 2;

/// How a metric should be shown to a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricKind {
    Currency,
    Percent,
    Count,
    /// A multiplier such as ROAS or LTV/CAC, shown as `24,75x`.
    Ratio,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub key: &'static str,
    pub label: &'static str,
    pub value: f64,
    pub kind: MetricKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricGroup {
    pub key: &'static str,
    pub title: &'static str,
    pub rows: Vec<MetricRow>,
}

fn row(key: &'static str, label: &'static str, value: f64, kind: MetricKind) -> MetricRow {
    MetricRow {
        key,
        label,
        value,
        kind,
    }
}

impl MetricsResult {
    /// The five result blocks as name -> value rows, in sheet order.
    pub fn groups(&self) -> Vec<MetricGroup> {
        use MetricKind::*;

        let d = &self.display;
        let s = &self.search;
        let c = &self.conversion;
        let r = &self.revenue;
        let a = &self.advanced;

        vec![
            MetricGroup {
                key: "display",
                title: "Display Ads",
                rows: vec![
                    row("budget", "Allocated budget", d.budget, Currency),
                    row("impressions", "Estimated impressions", d.impressions, Count),
                    row("clicks", "Estimated clicks", d.clicks, Count),
                    row("cpm", "CPM", d.cpm, Currency),
                    row("ctr", "CTR", d.ctr, Percent),
                ],
            },
            MetricGroup {
                key: "search",
                title: "Search Ads",
                rows: vec![
                    row("budget", "Allocated budget", s.budget, Currency),
                    row("impressions", "Estimated impressions", s.impressions, Count),
                    row("clicks", "Estimated clicks", s.clicks, Count),
                    row("cpc", "CPC", s.cpc, Currency),
                    row("ctr", "CTR", s.ctr, Percent),
                ],
            },
            MetricGroup {
                key: "conversion",
                title: "Conversion",
                rows: vec![
                    row("total_visitors", "Total visitors", c.total_visitors, Count),
                    row("total_sessions", "Sessions", c.total_sessions, Count),
                    row("sessions_per_user", "Sessions per user", c.sessions_per_user, Ratio),
                    row("new_orders", "Estimated orders", c.new_orders, Count),
                    row("conversion_rate", "Conversion rate", c.conversion_rate, Percent),
                ],
            },
            MetricGroup {
                key: "revenue",
                title: "Revenue & ROI",
                rows: vec![
                    row("ad_spend", "Ad spend", r.ad_spend, Currency),
                    row("customers_acquired", "Customers acquired", r.customers_acquired, Count),
                    row("total_sales", "Projected revenue", r.total_sales, Currency),
                    row("roas", "ROAS", r.roas, Ratio),
                    row("net_revenue", "Net revenue", r.net_revenue, Currency),
                    row("roi", "ROI", r.roi, Percent),
                    row("difference", "Revenue minus spend", r.difference, Currency),
                    row("percent_change", "Change vs. budget", r.percent_change, Percent),
                ],
            },
            MetricGroup {
                key: "advanced",
                title: "Advanced Metrics",
                rows: vec![
                    row("cac", "CAC", a.cac, Currency),
                    row(
                        "revenue_per_customer",
                        "Revenue per customer",
                        a.revenue_per_customer,
                        Currency,
                    ),
                    row("cogs", "COGS per customer", a.cogs, Currency),
                    row(
                        "gross_profit_per_customer",
                        "Gross profit per customer",
                        a.gross_profit_per_customer,
                        Currency,
                    ),
                    row("gross_margin", "Gross margin", a.gross_margin, Percent),
                    row("aov", "AOV", a.aov, Currency),
                    row("apf", "Purchase frequency", a.apf, Ratio),
                    row("cltv", "LTV", a.cltv, Currency),
                    row("lifetime_profit", "Lifetime profit", a.lifetime_profit, Currency),
                    row("break_even_cac", "Break-even CAC", a.break_even_cac, Currency),
                    row("ltv_cac_ratio", "LTV/CAC", a.ltv_cac_ratio, Ratio),
                    row("break_even_roas", "Break-even ROAS", a.break_even_roas, Ratio),
                ],
            },
        ]
    }

    /// Every metric keyed as `group.metric`, e.g. `search.cpc`.
    pub fn to_flat_map(&self) -> BTreeMap<String, f64> {
        self.groups()
            .into_iter()
            .flat_map(|group| {
                let prefix = group.key;
                group
                    .rows
                    .into_iter()
                    .map(move |r| (format!("{}.{}", prefix, r.key), r.value))
            })
            .collect()
    }
}

/// Turns results and validation failures into markdown for a chat reply.
#[derive(Debug, Clone, Default)]
pub struct ReportRenderer {
    formatter: Formatter,
}

impl ReportRenderer {
    pub fn new(formatter: Formatter) -> Self {
        Self { formatter }
    }

    pub fn format_value(&self, value: f64, kind: MetricKind) -> String {
        match kind {
            MetricKind::Currency => self.formatter.currency(value),
            MetricKind::Percent => self.formatter.percentage(value, DEFAULT_PERCENT_DECIMALS),
            MetricKind::Count => self.formatter.number(value, DEFAULT_NUMBER_DECIMALS),
            MetricKind::Ratio => format!("{}x", self.formatter.number(value, RATIO_DECIMALS)),
        }
    }

    pub fn render(&self, result: &MetricsResult) -> String {
        let mut out = String::new();

        for group in result.groups() {
            let _ = writeln!(out, "### {}\n", group.title);
            out.push_str("| Metric | Value |\n|---|---|\n");
            for r in &group.rows {
                let _ = writeln!(out, "| {} | {} |", r.label, self.format_value(r.value, r.kind));
            }
            out.push('\n');
        }

        let _ = writeln!(
            out,
            "**Status:** {} (LTV/CAC {})",
            result.advanced.status,
            self.format_value(result.advanced.ltv_cac_ratio, MetricKind::Ratio)
        );

        out
    }

    /// A short note telling the collector what to fix before calculating.
    pub fn render_failure(&self, failure: &ValidationFailure) -> String {
        match failure {
            ValidationFailure::MissingFields(fields) => {
                let mut out = String::from("**Missing inputs:**\n\n");
                for field in fields {
                    let _ = writeln!(out, "- `{}`: {}", field.key(), field.description());
                }
                out
            }
            other => format!("**Cannot calculate:** {}\n", other),
        }
    }
}

pub fn render_markdown(result: &MetricsResult) -> String {
    ReportRenderer::default().render(result)
}
