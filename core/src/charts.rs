//! Chart rendering: Plotly figures embedded in standalone HTML pages.
//!
//! Each builder checks its input and returns AnalysisError::Render on bad data.

use crate::{
    error::{AnalysisError, AnalysisResult},
    household::HouseholdTemplate,
    metrics::{DecileTable, OutcomeCategory, OutcomeShares},
    runner::IncomeSweep,
    style::ChartStyle,
    types::DECILE_COUNT,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

pub const WINNERS_FILE: &str = "winners-by-decile.html";
pub const AVG_BENEFIT_FILE: &str = "avg-benefit-by-decile.html";
pub const NET_INCOME_FILE: &str = "net-income-change.html";

/// Share tolerance when checking a row sums to at most 100%.
const SHARE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data:   Vec<Value>,
    pub layout: Value,
}

fn render_error(chart: &str, message: impl Into<String>) -> AnalysisError {
    AnalysisError::Render {
        chart:   chart.to_string(),
        message: message.into(),
    }
}

fn percent(share: Option<f64>) -> Option<f64> {
    share.map(|s| s * 100.0)
}

fn check_shares(row: &str, shares: &OutcomeShares) -> AnalysisResult<()> {
    let mut total = 0.0;
    for category in OutcomeCategory::ALL {
        if let Some(s) = shares.get(category) {
            if !s.is_finite() || !(0.0..=1.0 + SHARE_EPSILON).contains(&s) {
                return Err(render_error(
                    WINNERS_FILE,
                    format!("row {row}: {} share {s} outside [0, 1]", category.key()),
                ));
            }
            total += s;
        }
    }
    if total > 1.0 + 1e-6 {
        return Err(render_error(WINNERS_FILE, format!("row {row}: shares sum to {total}")));
    }
    Ok(())
}

fn stacked_bar_traces(
    rows: &[(String, &OutcomeShares)],
    style: &ChartStyle,
    axes: (&str, &str),
    show_legend: bool,
) -> Vec<Value> {
    let labels: Vec<&str> = rows.iter().map(|(label, _)| label.as_str()).collect();
    OutcomeCategory::ALL
        .iter()
        .map(|category| {
            let values: Vec<Option<f64>> =
                rows.iter().map(|(_, shares)| percent(shares.get(*category))).collect();
            let text: Vec<String> = values
                .iter()
                .map(|v| match v {
                    Some(p) if *p > 0.0 => format!("{p:.0}%"),
                    Some(_) => String::new(),
                    None => "n/a".to_string(),
                })
                .collect();
            let mut trace = json!({
                "type":          "bar",
                "orientation":   "h",
                "y":             labels,
                "x":             values,
                "name":          category.short_label(),
                "marker":        { "color": style.palette.category(*category) },
                "text":          text,
                "textposition":  "inside",
                "textangle":     0,
                "legendgroup":   category.key(),
                "showlegend":    show_legend,
                "hovertemplate": "%{x:.1f}%<extra></extra>",
                "xaxis":         axes.0,
                "yaxis":         axes.1,
            });
            // Dark text only where the bar colour is light.
            if matches!(category, OutcomeCategory::GainLessThan5Pct | OutcomeCategory::NoChange) {
                trace["textfont"] = json!({ "color": style.font_color });
            }
            trace
        })
        .collect()
}

/// Horizontal stacked bars: "All" in a thin top panel, deciles below.
pub fn winners_by_decile(
    table: &DecileTable,
    style: &ChartStyle,
    policy_name: &str,
) -> AnalysisResult<Figure> {
    if table.deciles.len() != DECILE_COUNT {
        return Err(render_error(
            WINNERS_FILE,
            format!("expected {DECILE_COUNT} deciles, got {}", table.deciles.len()),
        ));
    }
    check_shares("All", &table.all)?;
    for (i, shares) in table.deciles.iter().enumerate() {
        check_shares(&(i + 1).to_string(), shares)?;
    }

    let all_rows = vec![("All".to_string(), &table.all)];
    let decile_rows: Vec<(String, &OutcomeShares)> = table
        .deciles
        .iter()
        .enumerate()
        .map(|(i, shares)| ((i + 1).to_string(), shares))
        .collect();

    let mut data = stacked_bar_traces(&all_rows, style, ("x", "y"), true);
    data.extend(stacked_bar_traces(&decile_rows, style, ("x2", "y2"), false));

    let layout = json!({
        "barmode": "stack",
        "title": { "text": format!("Winners of {policy_name} by income decile"), "x": 0 },
        "font": { "family": style.font_family, "color": style.font_color },
        "xaxis": {
            "anchor": "y", "matches": "x2",
            "ticksuffix": "%", "range": [0, 100],
            "showgrid": false, "showticklabels": false, "fixedrange": true,
        },
        "yaxis": { "anchor": "x", "domain": [0.902, 1.0], "tickvals": ["All"] },
        "xaxis2": {
            "anchor": "y2",
            "title": { "text": "Population share" },
            "ticksuffix": "%", "range": [0, 100], "fixedrange": true,
        },
        "yaxis2": {
            "anchor": "x2", "domain": [0.0, 0.882],
            "title": { "text": "Income decile" }, "automargin": true,
        },
        "legend": {
            "orientation": "h", "yanchor": "bottom", "y": 1.08,
            "xanchor": "center", "x": 0.5, "traceorder": "normal",
            "font": { "size": 10 },
        },
        "margin": { "l": 60, "r": 60, "b": 100, "t": 120, "pad": 4 },
        "height": 580,
        "width": 800,
        "uniformtext": { "mode": "hide", "minsize": 8 },
        "images": [style.watermark_image(0.09, -0.20)],
    });

    Ok(Figure { data, layout })
}

/// Vertical bars of household-weighted average dollar change per decile.
pub fn avg_benefit_by_decile(
    avg_benefit: &[Option<f64>],
    style: &ChartStyle,
    policy_name: &str,
) -> AnalysisResult<Figure> {
    if avg_benefit.len() != DECILE_COUNT {
        return Err(render_error(
            AVG_BENEFIT_FILE,
            format!("expected {DECILE_COUNT} deciles, got {}", avg_benefit.len()),
        ));
    }
    if let Some(v) = avg_benefit.iter().flatten().find(|v| !v.is_finite()) {
        return Err(render_error(AVG_BENEFIT_FILE, format!("non-finite average {v}")));
    }

    let deciles: Vec<usize> = (1..=DECILE_COUNT).collect();
    let text: Vec<String> = avg_benefit
        .iter()
        .map(|v| v.map_or_else(|| "n/a".to_string(), |a| format!("${a:.0}")))
        .collect();

    let data = vec![json!({
        "type": "bar",
        "x": deciles,
        "y": avg_benefit,
        "text": text,
        "marker": { "color": style.palette.reform },
        "hovertemplate": "Income decile: %{x}<br>Average impact: $%{y:,.0f}<extra></extra>",
    })];

    let layout = json!({
        "title": { "text": format!("Average benefit of {policy_name} by income decile") },
        "font": { "family": style.font_family, "color": style.font_color },
        "xaxis": {
            "title": { "text": "Income decile" },
            "tickvals": deciles, "fixedrange": true,
        },
        "yaxis": {
            "title": { "text": "Absolute change in household income" },
            "tickformat": ",", "tickprefix": "$", "fixedrange": true,
        },
        "showlegend": false,
        "margin": { "l": 60, "r": 60, "b": 80, "t": 80, "pad": 4 },
        "images": [style.watermark_image(style.watermark.size, style.watermark.y)],
    });

    Ok(Figure { data, layout })
}

/// Baseline and reform net income across the sweep, with the change
/// as a filled area on a secondary axis.
pub fn net_income_change(
    sweep: &IncomeSweep,
    household: &HouseholdTemplate,
    style: &ChartStyle,
    policy_name: &str,
) -> AnalysisResult<Figure> {
    let n = sweep.employment_income.len();
    if n == 0 {
        return Err(render_error(NET_INCOME_FILE, "income sweep is empty"));
    }
    if sweep.baseline_net_income.len() != n || sweep.reform_net_income.len() != n {
        return Err(render_error(
            NET_INCOME_FILE,
            format!(
                "sweep lengths differ: {n} incomes, {} baseline, {} reform",
                sweep.baseline_net_income.len(),
                sweep.reform_net_income.len()
            ),
        ));
    }
    let mut all_values = sweep
        .employment_income
        .iter()
        .chain(&sweep.baseline_net_income)
        .chain(&sweep.reform_net_income);
    if all_values.any(|v| !v.is_finite()) {
        return Err(render_error(NET_INCOME_FILE, "sweep contains non-finite values"));
    }

    let line = |name: &str, y: &[f64], color: &str| {
        json!({
            "type": "scatter",
            "mode": "lines",
            "name": name,
            "x": sweep.employment_income,
            "y": y,
            "line": { "color": color, "width": 3 },
            "hovertemplate": format!(
                "Employment income: $%{{x:,}}<br>{name}: $%{{y:,.2f}}<extra></extra>"
            ),
        })
    };

    let data = vec![
        line("Baseline net income", &sweep.baseline_net_income, style.palette.baseline),
        line("Reform net income", &sweep.reform_net_income, style.palette.reform),
        json!({
            "type": "scatter",
            "mode": "lines",
            "name": "Change in net income",
            "x": sweep.employment_income,
            "y": sweep.net_income_change(),
            "yaxis": "y2",
            "line": { "color": style.palette.reform, "width": 1 },
            "fill": "tozeroy",
            "fillcolor": style.palette.gain_less_than_5pct,
            "hovertemplate": "Employment income: $%{x:,}<br>Change in net income: $%{y:,.2f}<extra></extra>",
        }),
    ];

    let layout = json!({
        "title": { "text": format!("Net income under {policy_name} ({})", household.describe()) },
        "font": { "family": style.font_family, "color": style.font_color },
        "xaxis": {
            "title": { "text": "Employment income" },
            "tickformat": ",", "tickprefix": "$", "fixedrange": true,
        },
        "yaxis": {
            "title": { "text": "Net income" },
            "tickformat": ",", "tickprefix": "$", "fixedrange": true,
        },
        "yaxis2": {
            "title": { "text": "Change in net income" },
            "overlaying": "y", "side": "right",
            "tickformat": ",", "tickprefix": "$", "fixedrange": true,
        },
        "legend": { "orientation": "h", "yanchor": "bottom", "y": 1.02, "x": 0 },
        "margin": { "l": 60, "r": 60, "b": 80, "t": 80, "pad": 4 },
        "images": [style.watermark_image(style.watermark.size, style.watermark.y)],
    });

    Ok(Figure { data, layout })
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// A standalone page: Plotly from CDN, the web font, one full-height chart.
pub fn render_html(figure: &Figure, title: &str, style: &ChartStyle) -> AnalysisResult<String> {
    // "</" inside a script block would end it early.
    let figure_json = serde_json::to_string(figure)?.replace("</", "<\\/");
    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link href="{font_css}" rel="stylesheet">
    <script src="{plotly_src}"></script>
    <style>
        body {{
            margin: 0;
            padding: 0;
            font-family: '{font_family}', serif;
        }}
        #chart {{
            width: 100%;
            height: 100vh;
        }}
    </style>
</head>
<body>
    <div id="chart"></div>
    <script>
        var figure = {figure_json};
        Plotly.newPlot('chart', figure.data, figure.layout, {{responsive: true}});
    </script>
</body>
</html>
"#,
        title = escape_html(title),
        font_css = style.font_css,
        plotly_src = style.plotly_src,
        font_family = style.font_family,
    ))
}

/// Render and write one chart page. Returns the written path.
pub fn write_chart(
    dir: &Path,
    file_name: &str,
    title: &str,
    figure: &Figure,
    style: &ChartStyle,
) -> AnalysisResult<PathBuf> {
    let html = render_html(figure, title, style)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    std::fs::write(&path, html)?;
    log::info!("Generated: {}", path.display());
    Ok(path)
}
