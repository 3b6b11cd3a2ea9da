use crate::calendar::CalendarView;
use crate::picker::{PickerCell, PickerModel};
use crate::selection::{CellTone, SelectionPhase};
use std::fmt::Write;
use url::form_urlencoded;

pub fn render_index(model: &PickerModel, today: &str) -> String {
    let clear = calendar_href(CalendarView::new(model.year, model.month), "", "");
    INDEX_HTML
        .replace("{{TODAY}}", &escape_html(today))
        .replace("{{NAV}}", &render_nav(model))
        .replace("{{WEEKDAYS}}", &render_weekdays(model))
        .replace("{{GRID}}", &render_grid(model))
        .replace("{{SUMMARY}}", &render_summary(model))
        .replace("{{CLEAR}}", &escape_html(&clear))
}

/// Picker URL for `view` carrying the current selection, query-encoded.
pub fn calendar_href(view: CalendarView, start: &str, end: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("year", &view.year.to_string())
        .append_pair("month", &view.month.to_string())
        .append_pair("start", start)
        .append_pair("end", end)
        .finish();
    format!("/?{query}")
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
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

fn render_nav(model: &PickerModel) -> String {
    let start = &model.selection.start_date;
    let end = &model.selection.end_date;
    let mut html = String::new();

    let _ = write!(
        html,
        r#"<a class="nav-btn" href="{}" aria-label="Mês anterior">&lsaquo;</a>"#,
        escape_html(&calendar_href(model.prev, start, end))
    );

    html.push_str(r#"<form class="pickers" method="get" action="/">"#);
    let _ = write!(
        html,
        r#"<input type="hidden" name="start" value="{}" /><input type="hidden" name="end" value="{}" />"#,
        escape_html(start),
        escape_html(end)
    );
    html.push_str(r#"<select name="month" aria-label="Selecionar mês" onchange="this.form.submit()">"#);
    for (index, name) in crate::calendar::MONTH_NAMES.iter().enumerate() {
        let selected = if index as u32 == model.display_month { " selected" } else { "" };
        let _ = write!(html, r#"<option value="{index}"{selected}>{name}</option>"#);
    }
    html.push_str("</select>");
    html.push_str(r#"<select name="year" aria-label="Selecionar ano" onchange="this.form.submit()">"#);
    if !model.years.contains(&model.display_year) {
        let _ = write!(html, r#"<option value="{0}" selected>{0}</option>"#, model.display_year);
    }
    for year in &model.years {
        let selected = if *year == model.display_year { " selected" } else { "" };
        let _ = write!(html, r#"<option value="{year}"{selected}>{year}</option>"#);
    }
    html.push_str("</select><noscript><button type=\"submit\">Ir</button></noscript></form>");

    let _ = write!(
        html,
        r#"<a class="nav-btn" href="{}" aria-label="Próximo mês">&rsaquo;</a>"#,
        escape_html(&calendar_href(model.next, start, end))
    );
    html
}

fn render_weekdays(model: &PickerModel) -> String {
    model
        .weekdays
        .iter()
        .map(|label| format!(r#"<div class="weekday">{label}</div>"#))
        .collect()
}

fn render_grid(model: &PickerModel) -> String {
    let mut html = String::new();
    for cell in model.weeks.iter().flatten() {
        html.push_str(&render_cell(model, cell));
    }
    html
}

fn render_cell(model: &PickerModel, cell: &PickerCell) -> String {
    let (Some(day), Some(date)) = (cell.day, cell.iso_date.as_deref()) else {
        return r#"<div class="day pad"></div>"#.to_string();
    };
    let class = cell.tone.unwrap_or(CellTone::Plain).css_class();
    format!(
        r#"<form method="post" action="/calendar/select">
          <input type="hidden" name="date" value="{date}" />
          <input type="hidden" name="start" value="{start}" />
          <input type="hidden" name="end" value="{end}" />
          <input type="hidden" name="year" value="{year}" />
          <input type="hidden" name="month" value="{month}" />
          <button class="{class}" type="submit" data-date="{date}">{day}</button>
        </form>"#,
        date = escape_html(date),
        start = escape_html(&model.selection.start_date),
        end = escape_html(&model.selection.end_date),
        year = model.year,
        month = model.month,
    )
}

fn render_summary(model: &PickerModel) -> String {
    let selection = &model.selection;
    match selection.phase() {
        SelectionPhase::Empty => {
            r#"<p class="hint">Clique em uma data para iniciar o período.</p>"#.to_string()
        }
        SelectionPhase::StartOnly => format!(
            r#"<div class="stat"><span class="label">Início</span><span id="start" class="value">{}</span></div>
      <p class="hint">Clique em outra data para definir o fim do período.</p>"#,
            display_date(&selection.start_date)
        ),
        SelectionPhase::Complete => format!(
            r#"<div class="stat"><span class="label">Início</span><span id="start" class="value">{}</span></div>
      <div class="stat"><span class="label">Fim</span><span id="end" class="value">{}</span></div>"#,
            display_date(&selection.start_date),
            display_date(&selection.end_date)
        ),
    }
}

/// `YYYY-MM-DD` shown as `DD/MM/YYYY`; anything else is shown escaped.
fn display_date(iso: &str) -> String {
    match iso.splitn(3, '-').collect::<Vec<_>>().as_slice() {
        [year, month, day] => escape_html(&format!("{day}/{month}/{year}")),
        _ => escape_html(iso),
    }
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>EletroON · Período</title>
  <style>
    :root {
      --bg-1: #eef4fb;
      --bg-2: #cfe1f7;
      --ink: #1f2933;
      --accent: #1d4ed8;
      --accent-2: #0f172a;
      --range: #e2e8f0;
      --card: rgba(255, 255, 255, 0.9);
      --shadow: 0 24px 60px rgba(15, 23, 42, 0.16);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #f8fafc 70%);
      color: var(--ink);
      font-family: "Inter", "Segoe UI", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(420px, 100%);
      background: var(--card);
      border-radius: 24px;
      box-shadow: var(--shadow);
      padding: 28px;
      display: grid;
      gap: 20px;
    }

    h1 {
      margin: 0;
      font-size: 1.6rem;
    }

    .subtitle {
      margin: 4px 0 0;
      color: #52606d;
      font-size: 0.95rem;
    }

    .nav {
      display: flex;
      align-items: center;
      justify-content: space-between;
      gap: 8px;
    }

    .nav-btn {
      width: 30px;
      height: 30px;
      display: inline-flex;
      align-items: center;
      justify-content: center;
      border: 1px solid #cbd2d9;
      border-radius: 6px;
      color: var(--accent-2);
      text-decoration: none;
    }

    .pickers {
      display: flex;
      gap: 8px;
    }

    .pickers select {
      height: 30px;
      border: 1px solid #cbd2d9;
      border-radius: 6px;
      background: white;
      padding: 0 8px;
    }

    .grid {
      display: grid;
      grid-template-columns: repeat(7, 1fr);
      gap: 4px;
    }

    .grid form {
      margin: 0;
    }

    .weekday {
      text-align: center;
      font-size: 11px;
    }

    .day {
      width: 100%;
      height: 34px;
      border-radius: 6px;
      border: 1px solid #e4e7eb;
      background: white;
      font-size: 0.9rem;
      cursor: pointer;
    }

    .day.pad {
      border: none;
      background: transparent;
    }

    .day.today {
      border-color: var(--accent);
      color: var(--accent);
    }

    .day.in-range {
      background: var(--range);
      border-color: #cbd2d9;
    }

    .day.endpoint {
      background: var(--accent-2);
      color: white;
      font-weight: 700;
    }

    .summary {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(140px, 1fr));
      gap: 12px;
    }

    .stat {
      background: white;
      border-radius: 14px;
      padding: 12px 14px;
      border: 1px solid rgba(15, 23, 42, 0.08);
      display: grid;
      gap: 4px;
    }

    .stat .label {
      font-size: 0.75rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #7b8794;
    }

    .stat .value {
      font-size: 1.2rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    .hint {
      margin: 0;
      color: #616e7c;
      font-size: 0.9rem;
    }

    .clear {
      justify-self: start;
      color: var(--accent);
      font-size: 0.9rem;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Seleção de Período</h1>
      <p class="subtitle">Hoje: {{TODAY}}. Clique em duas datas para montar o intervalo.</p>
    </header>

    <nav class="nav">{{NAV}}</nav>

    <section class="grid">
      {{WEEKDAYS}}
      {{GRID}}
    </section>

    <section class="summary">
      {{SUMMARY}}
    </section>

    <a class="clear" href="{{CLEAR}}">Limpar</a>
  </main>
</body>
</html>
"#;
