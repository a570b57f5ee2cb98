use crate::catalog::{rows, PICKER_ROW_WIDTH};
use crate::models::{HistoryRow, MoodBand, WeeklySummary};
use std::fmt::Write;

pub struct DashboardView<'a> {
    pub user: Option<&'a str>,
    pub today: &'a str,
    pub summary: &'a WeeklySummary,
    pub history: &'a [HistoryRow],
    pub error: Option<&'a str>,
}

pub fn render_index(view: &DashboardView<'_>) -> String {
    let Some(user) = view.user else {
        return fill_template(
            INDEX_HTML,
            &[("CONTENT", SIGNED_OUT_HTML), ("TITLE", "MoodMate")],
        );
    };

    let user = escape_html(user);
    let average = view
        .summary
        .average
        .map_or_else(|| "--".to_string(), |average| format!("{average:.2} / 5"));
    let error = view
        .error
        .map(|message| format!(r#"<p class="status" data-type="error">{}</p>"#, escape_html(message)))
        .unwrap_or_default();
    let today = escape_html(view.today);

    let content = fill_template(
        DASHBOARD_HTML,
        &[
            ("AVERAGE", average.as_str()),
            ("LABEL", escape_html(&view.summary.label).as_str()),
            ("CHART", render_chart(view.summary).as_str()),
            ("ERROR", error.as_str()),
            ("PICKER", render_picker().as_str()),
            ("HISTORY", render_history(view.history).as_str()),
            ("TODAY", today.as_str()),
            ("USER", user.as_str()),
        ],
    );

    fill_template(
        INDEX_HTML,
        &[("CONTENT", content.as_str()), ("TITLE", "MoodMate Dashboard")],
    )
}

/// Replaces each `{{NAME}}` in one pass over the template. Substituted text
/// is never scanned again, so values may contain braces.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut html = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        html.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            html.push_str(&rest[start..]);
            return html;
        };
        let name = &after[..end];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => html.push_str(value),
            None => html.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    html.push_str(rest);
    html
}

fn render_picker() -> String {
    let mut html = String::new();
    for row in rows(PICKER_ROW_WIDTH) {
        html.push_str(r#"<div class="emoji-row">"#);
        for entry in row {
            let _ = write!(
                html,
                r#"<button class="emoji" type="submit" name="emoji" value="{glyph}" title="Emotion: {id}">{glyph}</button>"#,
                glyph = entry.glyph,
                id = entry.identifier,
            );
        }
        html.push_str("</div>");
    }
    html
}

fn render_history(history: &[HistoryRow]) -> String {
    if history.is_empty() {
        return r#"<p class="hint">No mood entries yet.</p>"#.to_string();
    }
    let mut html = String::from(
        "<table><thead><tr><th>Date</th><th>Mood</th><th>Note</th></tr></thead><tbody>",
    );
    for row in history {
        let _ = write!(
            html,
            r#"<tr><td>{}</td><td class="mood">{}</td><td class="note">{}</td></tr>"#,
            escape_html(&row.date),
            escape_html(&row.emoji),
            escape_html(&row.note),
        );
    }
    html.push_str("</tbody></table>");
    html
}

/// Score trend as inline SVG on a fixed 1-5 axis.
fn render_chart(summary: &WeeklySummary) -> String {
    const WIDTH: f64 = 600.0;
    const HEIGHT: f64 = 260.0;
    const PADDING_X: f64 = 96.0;
    const PADDING_Y: f64 = 34.0;
    const TOP: f64 = 24.0;
    const MIN: f64 = 1.0;
    const MAX: f64 = 5.0;

    if summary.scores.is_empty() {
        return r#"<text class="chart-label" x="50%" y="50%" text-anchor="middle">No data yet</text>"#
            .to_string();
    }

    let x_step = if summary.scores.len() > 1 {
        (WIDTH - PADDING_X * 2.0) / (summary.scores.len() - 1) as f64
    } else {
        0.0
    };
    let scale_y = (HEIGHT - TOP - PADDING_Y) / (MAX - MIN);
    let x = |index: usize| PADDING_X + index as f64 * x_step;
    let y = |value: f64| HEIGHT - PADDING_Y - (value - MIN) * scale_y;

    let mut svg = String::new();
    for tick in 1..=5 {
        let value = f64::from(tick);
        let _ = write!(
            svg,
            r#"<line class="chart-grid" x1="{PADDING_X}" y1="{y:.2}" x2="{x2}" y2="{y:.2}" /><text class="chart-label" x="{lx}" y="{ly:.2}" text-anchor="end">{label}</text>"#,
            y = y(value),
            x2 = WIDTH - PADDING_X,
            lx = PADDING_X - 10.0,
            ly = y(value) + 4.0,
            label = MoodBand::for_score(value).label(),
        );
    }

    let path: Vec<String> = summary
        .scores
        .iter()
        .enumerate()
        .map(|(index, score)| {
            let command = if index == 0 { 'M' } else { 'L' };
            format!("{command} {:.2} {:.2}", x(index), y(f64::from(*score)))
        })
        .collect();
    let _ = write!(svg, r#"<path class="chart-line" d="{}" />"#, path.join(" "));

    for (index, (score, label)) in summary.scores.iter().zip(&summary.chart_labels).enumerate() {
        let _ = write!(
            svg,
            r#"<circle class="chart-point" cx="{cx:.2}" cy="{cy:.2}" r="5"><title>{band} (Score: {score})</title></circle><text class="chart-label" x="{cx:.2}" y="{ly:.2}" text-anchor="middle">{label}</text>"#,
            cx = x(index),
            cy = y(f64::from(*score)),
            band = MoodBand::for_score(f64::from(*score)).label(),
            ly = HEIGHT - PADDING_Y + 18.0,
            label = escape_html(label),
        );
    }
    svg
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

const SIGNED_OUT_HTML: &str = r#"<header>
      <h1>MoodMate</h1>
      <p class="subtitle">Track your emotions. Understand your mind.</p>
    </header>
    <p class="hint">Sign in to start logging how you feel each day.</p>"#;

const DASHBOARD_HTML: &str = r#"<header>
      <h1>MoodMate</h1>
      <p class="subtitle">How are you feeling?</p>
    </header>
    <section class="panel">
      <div class="stat">
        <span class="label">Average mood</span>
        <span id="average" class="value">{{AVERAGE}}</span>
      </div>
      <div class="stat">
        <span class="label">This week</span>
        <span id="band" class="value accent">{{LABEL}}</span>
      </div>
    </section>
    <section class="chart-area">
      <h2>Weekly Mood Trend</h2>
      <div class="chart-card">
        <svg id="chart" viewBox="0 0 600 260" aria-label="Mood trend" role="img">{{CHART}}</svg>
      </div>
    </section>
    <section>
      <form method="post" action="/users/{{USER}}/moods" class="picker">
        <label>Date <input type="date" name="date" value="{{TODAY}}" required /></label>
        <textarea name="note" placeholder="Say me how you feel .."></textarea>
        {{ERROR}}
        {{PICKER}}
      </form>
    </section>
    <section>
      <h2>Mood History</h2>
      {{HISTORY}}
    </section>
    <section class="actions">
      <a class="button" href="/api/users/{{USER}}/report">Download PDF</a>
    </section>"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <style>
    :root {
      --bg-1: #f5f0ff;
      --bg-2: #f9d0e8;
      --ink: #2b2a28;
      --accent: #f472b6;
      --accent-2: #6d28d9;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(109, 40, 217, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #fde7f3 60%, #f7f2ff 100%);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(860px, 100%);
      background: var(--card);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 28px;
    }

    h1 {
      font-family: "Georgia", serif;
      font-size: clamp(2rem, 4vw, 2.8rem);
      margin: 0;
      color: var(--accent-2);
    }

    .subtitle,
    .hint {
      margin: 0;
      color: #5f5c57;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 16px;
    }

    .stat,
    .chart-card {
      background: white;
      border-radius: 18px;
      padding: 18px;
      border: 1px solid rgba(109, 40, 217, 0.08);
      display: grid;
      gap: 8px;
    }

    .stat .label {
      font-size: 0.85rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    .stat .value {
      font-size: 1.7rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    .stat .value.accent {
      color: var(--accent);
    }

    #chart {
      width: 100%;
      height: 260px;
    }

    .chart-line {
      fill: none;
      stroke: var(--accent);
      stroke-width: 3;
    }

    .chart-point {
      fill: #9333ea;
      stroke: var(--accent);
      stroke-width: 2;
    }

    .chart-grid {
      stroke: #e5e7eb;
    }

    .chart-label {
      fill: #a78bfa;
      font-size: 11px;
    }

    .picker {
      display: grid;
      gap: 12px;
    }

    textarea {
      min-height: 80px;
      border-radius: 12px;
      padding: 12px;
      border: 1px solid #d8cff5;
      font: inherit;
    }

    .emoji-row {
      display: flex;
      gap: 8px;
      flex-wrap: wrap;
    }

    .emoji {
      border: none;
      background: white;
      border-radius: 12px;
      font-size: 1.6rem;
      padding: 6px 10px;
      cursor: pointer;
    }

    table {
      width: 100%;
      border-collapse: collapse;
    }

    th,
    td {
      border: 1px solid #e5e7eb;
      padding: 8px 12px;
    }

    td.mood {
      text-align: center;
      font-size: 1.3rem;
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }

    .button {
      display: inline-block;
      background: var(--accent-2);
      color: white;
      border-radius: 999px;
      padding: 12px 20px;
      font-weight: 600;
      text-decoration: none;
    }
  </style>
</head>
<body>
  <main class="app">
    {{CONTENT}}
  </main>
</body>
</html>
"#;
