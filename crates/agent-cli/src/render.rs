//! Table and JSON rendering for CLI output

use agent_core::{AgentStatus, TokenUsage};
use agent_llm::{ModelCatalog, ModelEntry, ProviderAvailability};
use agent_runtime::BudgetStatus;
use agent_workflow::{AssetReports, ComparisonReport, ConsensusReport};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use serde_json::{Value, json};

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

fn usd(amount: f64) -> String {
    format!("${amount:.6}")
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Catalog entries, in the order given
pub fn models_table(
    entries: &[&ModelEntry],
    availability: &ProviderAvailability,
    usage: TokenUsage,
) -> Table {
    let mut table = table(&[
        "Provider",
        "Model",
        "Tier",
        "$/1K in",
        "$/1K out",
        "Context",
        "Est. cost",
        "Available",
    ]);
    for entry in entries {
        table.add_row(vec![
            Cell::new(entry.provider),
            Cell::new(&entry.model),
            Cell::new(entry.tier),
            Cell::new(format!("{:.5}", entry.cost_per_1k_input)),
            Cell::new(format!("{:.5}", entry.cost_per_1k_output)),
            Cell::new(entry.max_context_tokens),
            Cell::new(usd(entry.estimate_cost(usage.input_tokens, usage.output_tokens))),
            Cell::new(yes_no(availability.is_available(entry.provider))),
        ]);
    }
    table
}

pub fn catalog_json(catalog: &ModelCatalog, availability: &ProviderAvailability) -> Value {
    let models: Vec<Value> = catalog
        .entries()
        .iter()
        .map(|entry| {
            json!({
                "provider": entry.provider,
                "model": entry.model,
                "tier": entry.tier,
                "cost_per_1k_input": entry.cost_per_1k_input,
                "cost_per_1k_output": entry.cost_per_1k_output,
                "max_context_tokens": entry.max_context_tokens,
                "available": availability.is_available(entry.provider),
            })
        })
        .collect();
    json!({ "models": models, "rules": catalog.rules() })
}

/// Per-agent outcomes plus the consensus line
pub fn report_text(report: &ConsensusReport) -> String {
    let mut table = table(&[
        "Agent",
        "Status",
        "Verdict",
        "Confidence",
        "Model",
        "Attempts",
        "Cost",
    ]);
    for result in &report.results {
        table.add_row(vec![
            Cell::new(&result.agent),
            Cell::new(result.status),
            Cell::new(result.recommendation.map(|r| r.to_string()).unwrap_or_default()),
            Cell::new(
                result
                    .confidence
                    .map(|c| format!("{c:.1}"))
                    .unwrap_or_default(),
            ),
            Cell::new(result.model.as_ref().map(ToString::to_string).unwrap_or_default()),
            Cell::new(result.attempts),
            Cell::new(usd(result.cost)),
        ]);
    }

    let tie = if report.tie_broken { " (tie, held)" } else { "" };
    format!(
        "{asset}: {rec}{tie}  confidence {conf:.1}/10  agreement {agree:.0}%  cost {cost}\n{table}\n\n{summary}",
        asset = report.asset,
        rec = report.recommendation,
        conf = report.confidence,
        agree = report.agreement * 100.0,
        cost = usd(report.total_cost),
        summary = report.summary(),
    )
}

/// Ranking followed by assets that produced no consensus
pub fn comparison_text(comparison: &ComparisonReport) -> String {
    let mut table = table(&["#", "Symbol", "Verdict", "Confidence", "Agreement", "Score"]);
    for (rank, row) in comparison.ranking.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&row.symbol),
            Cell::new(row.recommendation),
            Cell::new(format!("{:.1}", row.confidence)),
            Cell::new(format!("{:.0}%", row.agreement * 100.0)),
            Cell::new(format!("{:+.2}", row.score)),
        ]);
    }

    let mut out = table.to_string();
    for line in failures(&comparison.reports) {
        out.push('\n');
        out.push_str(&line);
    }
    out
}

pub fn batch_text(reports: &AssetReports) -> String {
    let mut table = table(&["Symbol", "Verdict", "Confidence", "Agreement", "Agents ok", "Cost"]);
    for (symbol, outcome) in reports {
        match outcome {
            Ok(report) => table.add_row(vec![
                Cell::new(symbol),
                Cell::new(report.recommendation),
                Cell::new(format!("{:.1}", report.confidence)),
                Cell::new(format!("{:.0}%", report.agreement * 100.0)),
                Cell::new(format!(
                    "{}/{}",
                    report.count(AgentStatus::Ok),
                    report.results.len()
                )),
                Cell::new(usd(report.total_cost)),
            ]),
            Err(e) => table.add_row(vec![
                Cell::new(symbol),
                Cell::new("error"),
                Cell::new(e),
            ]),
        };
    }
    table.to_string()
}

fn failures(reports: &AssetReports) -> Vec<String> {
    reports
        .iter()
        .filter_map(|(symbol, outcome)| outcome.as_ref().err().map(|e| format!("{symbol}: {e}")))
        .collect()
}

pub fn reports_json(reports: &AssetReports) -> Value {
    let map: serde_json::Map<String, Value> = reports
        .iter()
        .map(|(symbol, outcome)| {
            let value = match outcome {
                Ok(report) => json!(report),
                Err(e) => json!({ "error": e.to_string() }),
            };
            (symbol.clone(), value)
        })
        .collect();
    Value::Object(map)
}

pub fn comparison_json(comparison: &ComparisonReport) -> Value {
    json!({
        "ranking": comparison.ranking,
        "reports": reports_json(&comparison.reports),
    })
}

pub fn budget_line(status: &BudgetStatus) -> String {
    match (status.cap_usd, status.percentage_used) {
        (Some(cap), Some(pct)) => format!(
            "Session spend {} of {} ({pct:.1}%)",
            usd(status.spent_usd),
            usd(cap)
        ),
        _ => format!("Session spend {} (no cap)", usd(status.spent_usd)),
    }
}
