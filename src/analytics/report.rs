//! HTML Report Generation with Chart.js

use crate::analytics::grouping::GroupKey;
use crate::analytics::metrics::{MetricsCalculator, ScatterPoint};
use crate::simulation::SimulationResults;
use anyhow::{Context, Result};
use minijinja::{context, Environment};
use serde::Serialize;
use serde_json::json;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::info;

const PALETTE: [&str; 10] = [
    "#8b5cf6", "#22d3ee", "#10b981", "#ef4444", "#f59e0b",
    "#ec4899", "#3b82f6", "#84cc16", "#f97316", "#a3a3a3",
];

fn color(idx: usize) -> &'static str {
    PALETTE[idx % PALETTE.len()]
}

/// Generate an HTML report with interactive charts
pub fn generate_report(results: &SimulationResults, output_path: &str) -> Result<String> {
    // Ensure output directory exists
    if let Some(parent) = Path::new(output_path).parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory {}", parent.display()))?;
    }

    let html = render_html(results)?;

    let mut file = File::create(output_path)
        .context("Failed to create report file")?;
    file.write_all(html.as_bytes())
        .context("Failed to write report file")?;

    info!("Report generated: {}", output_path);
    Ok(output_path.to_string())
}

/// Row of the per-mountain table, preformatted for display
#[derive(Debug, Serialize)]
struct OverviewRow {
    mountain: u32,
    count: u32,
    mean_weight: String,
    sd_weight: String,
    unique_species: u32,
    unique_genera: u32,
    fitted_intercept: String,
    fitted_slope: String,
    true_intercept: String,
    true_slope: String,
}

/// Render the report to a string
pub fn render_html(results: &SimulationResults) -> Result<String> {
    let table = &results.table;
    let s = &results.summary;

    let scatter = MetricsCalculator::scatter_by(table, GroupKey::Mountain);
    let boxes = MetricsCalculator::box_stats_by(table, GroupKey::Mountain);
    let fits = MetricsCalculator::fits_by(table, GroupKey::Mountain);
    let histogram = MetricsCalculator::weight_distribution(table);
    let overview = MetricsCalculator::mountain_overview(results);

    // Scatter: one dataset per mountain
    let scatter_datasets: Vec<_> = scatter
        .iter()
        .enumerate()
        .map(|(idx, (mountain, points))| {
            json!({
                "label": format!("Mountain {}", mountain),
                "data": points,
                "backgroundColor": color(idx),
                "pointRadius": 2,
            })
        })
        .collect();

    // Box plot as floating bars: whiskers, IQR and median markers
    let box_labels: Vec<String> = boxes.iter().map(|b| format!("Mountain {}", b.group)).collect();
    let whiskers: Vec<[f64; 2]> = boxes.iter().map(|b| [b.min, b.max]).collect();
    let iqr: Vec<[f64; 2]> = boxes.iter().map(|b| [b.q1, b.q3]).collect();
    let medians: Vec<f64> = boxes.iter().map(|b| b.median).collect();

    // Facets: per-mountain points plus fitted line across the elevation range
    let facets: Vec<_> = scatter
        .iter()
        .enumerate()
        .map(|(idx, (mountain, points))| {
            let line: Vec<ScatterPoint> = fits
                .get(mountain)
                .map(|fit| {
                    let lo = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
                    let hi = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
                    vec![
                        ScatterPoint { x: lo, y: fit.predict(lo) },
                        ScatterPoint { x: hi, y: fit.predict(hi) },
                    ]
                })
                .unwrap_or_default();
            json!({
                "id": format!("facet-{}", mountain),
                "title": format!("Mountain {}", mountain),
                "color": color(idx),
                "points": points,
                "line": line,
            })
        })
        .collect();

    let hist_labels: Vec<&str> = histogram.iter().map(|b| b.label.as_str()).collect();
    let hist_values: Vec<u32> = histogram.iter().map(|b| b.count).collect();

    let fmt = |v: f64| format!("{:.3}", v);
    let rows: Vec<OverviewRow> = overview
        .iter()
        .map(|o| {
            let mountain = &results.effects.mountain;
            OverviewRow {
                mountain: o.mountain,
                count: o.count,
                mean_weight: fmt(o.mean_weight),
                sd_weight: o.sd_weight.map(fmt).unwrap_or_else(|| "-".into()),
                unique_species: o.unique_species,
                unique_genera: o.unique_genera,
                fitted_intercept: o.fit.map(|f| fmt(f.intercept)).unwrap_or_else(|| "-".into()),
                fitted_slope: o.fit.map(|f| fmt(f.slope)).unwrap_or_else(|| "-".into()),
                true_intercept: mountain
                    .get_intercept(o.mountain)
                    .map(|v| fmt(results.fixed.intercept + v))
                    .unwrap_or_else(|| "-".into()),
                true_slope: mountain
                    .get_slope(o.mountain)
                    .map(|v| fmt(results.fixed.slope + v))
                    .unwrap_or_else(|| "-".into()),
            }
        })
        .collect();

    let facet_ids: Vec<serde_json::Value> = facets.iter().map(|f| f["id"].clone()).collect();
    let scatter_json = to_json(&scatter_datasets)?;
    let box_labels_json = to_json(&box_labels)?;
    let whiskers_json = to_json(&whiskers)?;
    let iqr_json = to_json(&iqr)?;
    let medians_json = to_json(&medians)?;
    let facets_json = to_json(&facets)?;
    let hist_labels_json = to_json(&hist_labels)?;
    let hist_values_json = to_json(&hist_values)?;

    let mut env = Environment::new();
    env.add_template("report.html", REPORT_TEMPLATE)
        .context("Failed to load report template")?;
    let template = env.get_template("report.html")?;

    let html = template
        .render(context! {
            timestamp => results.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            total_observations => s.total_observations,
            total_species => s.total_species,
            num_mountains => s.num_mountains,
            num_genera => s.num_genera,
            mean_weight => fmt(s.mean_weight),
            sd_weight => fmt(s.sd_weight),
            nesting => format!("{:?}", results.config.nesting).to_lowercase(),
            nesting_violations => s.nesting_violations,
            fixed_intercept => fmt(results.fixed.intercept),
            fixed_slope => fmt(results.fixed.slope),
            seed => results.config.seed.map(|v| v.to_string()).unwrap_or_else(|| "-".into()),
            digest => s.digest.clone(),
            rows => rows,
            facet_ids,
            scatter_json,
            box_labels_json,
            whiskers_json,
            iqr_json,
            medians_json,
            facets_json,
            hist_labels_json,
            hist_values_json,
        })
        .context("Failed to render report")?;

    Ok(html)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("Failed to encode chart data")
}

const REPORT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Hierarchical Sample Report</title>
    <script src="https://cdn.jsdelivr.net/npm/chart.js"></script>
    <style>
        :root {
            --bg-primary: #0a0a0a;
            --bg-card: #1c1c1c;
            --text-primary: #ffffff;
            --text-secondary: #888888;
            --accent-green: #10b981;
        }
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
        }
        .container { max-width: 1200px; margin: 0 auto; padding: 2rem; }
        header {
            text-align: center;
            padding: 3rem 2rem;
            background: linear-gradient(180deg, rgba(139, 92, 246, 0.15) 0%, transparent 100%);
            border-bottom: 1px solid rgba(255, 255, 255, 0.08);
            margin-bottom: 2rem;
        }
        header h1 { font-size: 2.5rem; font-weight: 800; }
        header .subtitle { color: var(--text-secondary); }
        .stats-grid {
            display: grid;
            grid-template-columns: repeat(3, 1fr);
            gap: 1.25rem;
            margin-bottom: 2rem;
        }
        @media (max-width: 900px) { .stats-grid { grid-template-columns: repeat(2, 1fr); } }
        .stat-card, .chart-card {
            background: var(--bg-card);
            border-radius: 1rem;
            padding: 1.5rem;
            border: 1px solid rgba(255, 255, 255, 0.06);
        }
        .chart-card { margin-bottom: 2rem; }
        .stat-card h3 {
            font-size: 0.75rem;
            text-transform: uppercase;
            letter-spacing: 0.1em;
            color: var(--text-secondary);
        }
        .stat-card .value { font-size: 2rem; font-weight: 700; }
        .stat-card .label { font-size: 0.875rem; color: var(--text-secondary); }
        .chart-container { position: relative; height: 400px; width: 100%; }
        .facet-grid {
            display: grid;
            grid-template-columns: repeat(auto-fill, minmax(320px, 1fr));
            gap: 1rem;
        }
        .facet-grid .chart-container { height: 260px; }
        table { width: 100%; border-collapse: collapse; font-size: 0.9rem; }
        th, td { padding: 0.5rem; text-align: right; border-bottom: 1px solid rgba(255,255,255,0.06); }
        th { color: var(--text-secondary); font-weight: 600; }
        footer { text-align: center; padding: 2rem; color: var(--text-secondary); }
        code { color: var(--accent-green); }
    </style>
</head>
<body>
    <header>
        <h1>Hierarchical Sample Report</h1>
        <p class="subtitle">Weight ~ elevation with species, genus and mountain random effects</p>
        <p class="subtitle">Generated: {{ timestamp }}</p>
    </header>

    <div class="container">
        <div class="stats-grid">
            <div class="stat-card">
                <h3>Observations</h3>
                <div class="value">{{ total_observations }}</div>
                <div class="label">across {{ num_mountains }} mountains</div>
            </div>
            <div class="stat-card">
                <h3>Species</h3>
                <div class="value">{{ total_species }}</div>
                <div class="label">in {{ num_genera }} genera ({{ nesting }} labels, {{ nesting_violations }} violations)</div>
            </div>
            <div class="stat-card">
                <h3>Weight</h3>
                <div class="value">{{ mean_weight }}</div>
                <div class="label">mean, sd {{ sd_weight }}</div>
            </div>
            <div class="stat-card">
                <h3>Fixed Intercept</h3>
                <div class="value">{{ fixed_intercept }}</div>
                <div class="label">population level</div>
            </div>
            <div class="stat-card">
                <h3>Fixed Slope</h3>
                <div class="value">{{ fixed_slope }}</div>
                <div class="label">per unit elevation</div>
            </div>
            <div class="stat-card">
                <h3>Seed</h3>
                <div class="value">{{ seed }}</div>
                <div class="label">digest <code>{{ digest[:12] }}</code></div>
            </div>
        </div>

        <div class="chart-card">
            <h3>Weight vs Elevation</h3>
            <div class="chart-container"><canvas id="scatterChart"></canvas></div>
        </div>

        <div class="chart-card">
            <h3>Weight by Mountain</h3>
            <div class="chart-container"><canvas id="boxChart"></canvas></div>
        </div>

        <div class="chart-card">
            <h3>Weight vs Elevation per Mountain</h3>
            <div class="facet-grid">
                {% for id in facet_ids %}
                <div class="chart-container"><canvas id="{{ id }}"></canvas></div>
                {% endfor %}
            </div>
        </div>

        <div class="chart-card">
            <h3>Weight Distribution</h3>
            <div class="chart-container"><canvas id="histChart"></canvas></div>
        </div>

        <div class="chart-card">
            <h3>Mountains</h3>
            <table>
                <thead>
                    <tr>
                        <th>Mountain</th><th>n</th><th>Mean weight</th><th>Sd weight</th>
                        <th>Species</th><th>Genera</th>
                        <th>Fitted intercept</th><th>Fitted slope</th>
                        <th>Mountain intercept</th><th>Mountain slope</th>
                    </tr>
                </thead>
                <tbody>
                    {% for row in rows %}
                    <tr>
                        <td>{{ row.mountain }}</td><td>{{ row.count }}</td>
                        <td>{{ row.mean_weight }}</td><td>{{ row.sd_weight }}</td>
                        <td>{{ row.unique_species }}</td><td>{{ row.unique_genera }}</td>
                        <td>{{ row.fitted_intercept }}</td><td>{{ row.fitted_slope }}</td>
                        <td>{{ row.true_intercept }}</td><td>{{ row.true_slope }}</td>
                    </tr>
                    {% endfor %}
                </tbody>
            </table>
        </div>
    </div>

    <footer>
        <p>Built with Rust + Chart.js</p>
    </footer>

    <script>
        Chart.defaults.color = '#888888';
        Chart.defaults.borderColor = 'rgba(255, 255, 255, 0.08)';

        const axes = (x, y) => ({
            x: { title: { display: true, text: x } },
            y: { title: { display: true, text: y } }
        });

        new Chart(document.getElementById('scatterChart'), {
            type: 'scatter',
            data: { datasets: {{ scatter_json|safe }} },
            options: { responsive: true, maintainAspectRatio: false, scales: axes('Elevation', 'Weight') }
        });

        new Chart(document.getElementById('boxChart'), {
            type: 'bar',
            data: {
                labels: {{ box_labels_json|safe }},
                datasets: [
                    { label: 'Min - Max', data: {{ whiskers_json|safe }}, backgroundColor: 'rgba(255,255,255,0.25)', barPercentage: 0.08, grouped: false },
                    { label: 'Q1 - Q3', data: {{ iqr_json|safe }}, backgroundColor: 'rgba(139, 92, 246, 0.7)', barPercentage: 0.6, grouped: false },
                    { label: 'Median', type: 'line', data: {{ medians_json|safe }}, showLine: false, pointStyle: 'line', pointRadius: 18, borderColor: '#f59e0b', borderWidth: 3 }
                ]
            },
            options: { responsive: true, maintainAspectRatio: false, scales: axes('Mountain', 'Weight') }
        });

        for (const facet of {{ facets_json|safe }}) {
            new Chart(document.getElementById(facet.id), {
                type: 'scatter',
                data: {
                    datasets: [
                        { label: facet.title, data: facet.points, backgroundColor: facet.color, pointRadius: 2 },
                        { label: 'Fit', type: 'line', data: facet.line, borderColor: '#ffffff', borderWidth: 2, pointRadius: 0 }
                    ]
                },
                options: {
                    responsive: true,
                    maintainAspectRatio: false,
                    plugins: { title: { display: true, text: facet.title }, legend: { display: false } },
                    scales: axes('Elevation', 'Weight')
                }
            });
        }

        new Chart(document.getElementById('histChart'), {
            type: 'bar',
            data: {
                labels: {{ hist_labels_json|safe }},
                datasets: [{ label: 'Observations', data: {{ hist_values_json|safe }}, backgroundColor: 'rgba(34, 211, 238, 0.7)', borderRadius: 6 }]
            },
            options: { responsive: true, maintainAspectRatio: false, plugins: { legend: { display: false } }, scales: axes('Weight', 'Count') }
        });
    </script>
</body>
</html>
"#;
