use campaign_metrics::*;
use serde_json::json;
use std::error::Error;

fn main() -> std::result::Result<(), Box<dyn Error>> {
    // Inputs as an API handler or a chat agent would hand them over.
    let briefing = json!({
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
        "customerLifespan": 3
    });

    println!("📊 Campaign metrics for a R$ 10.000 budget\n");
    let result = calculate_from_json(&briefing)?;
    println!("{}", render_markdown(&result));

    println!("\n📈 Same campaign with a 50/50 split, in US formatting\n");
    let variables = CampaignVariables::from_json(&briefing)
        .with(InputField::DisplayShare, 0.5)
        .with(InputField::SearchShare, 0.5);
    let result = MetricsCalculator::new().calculate_variables(&variables)?;
    let renderer = ReportRenderer::new(Formatter::new(NumberLocale::en_us()));
    println!("{}", renderer.render(&result));

    println!("\n⚠️  A briefing that only mentions the budget\n");
    let partial = CampaignVariables::new().with(InputField::Budget, 10_000.0);
    println!("{}", calculate_report(&partial));

    println!("\n🧾 Input schema for collectors\n");
    println!("{}", CampaignVariables::schema_as_json()?);

    Ok(())
}
