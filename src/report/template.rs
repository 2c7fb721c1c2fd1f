//! The receipt-report HTML template: snapshot in, markup out.
//!
//! The template is a function of [`ReportSnapshot`] only — every conditional
//! section is a data-presence check on the snapshot, never a string flag.
//! That makes the one layout rule that matters easy to keep: an optional
//! table column (note, represented-count) appears in the header row and the
//! data row *together*, or in neither. The two rows are emitted from the
//! same `Option`s, so they cannot desynchronise.
//!
//! Column order is fixed for compatibility with existing consumers: the six
//! base columns, then the note column, then the represented-count column.
//!
//! All interpolated data is HTML-escaped; the markup is fed to a real
//! browser engine, so unescaped user text would execute.

use crate::model::ReportSnapshot;
use std::fmt::Write;

const STYLE: &str = r#"
    body {
      font-family: "Segoe UI", Tahoma, Geneva, Verdana, sans-serif;
      padding: 10px;
      color: #333;
    }

    #header {
      font-size: 16px;
      font-weight: bold;
      margin-bottom: 4px;
    }

    .sub-header {
      font-size: 12px;
      color: #555;
      margin-bottom: 4px;
    }

    .section {
      margin-top: 10px;
    }

    .info {
      font-size: 11px;
      margin-bottom: 2px;
    }

    table {
      width: 100%;
      border-collapse: collapse;
      margin-top: 10px;
    }

    th, td {
      border: 1px solid #ccc;
      padding: 4px;
      text-align: center;
      font-size: 11px;
    }

    th {
      background-color: #f0f0f0;
      font-weight: 600;
    }

    .image-container {
      text-align: center;
    }

    .receipt-image {
      max-height: 800px;
      max-width: 500px;
      height: auto;
      display: inline-block;
    }

    .vertical-list {
      display: flex;
      flex-direction: column;
      gap: 16px;
      font-size: 21px;
      list-style-type: none;
      margin: 0;
      padding: 0;
    }
"#;

/// Render the report HTML for one snapshot.
pub fn render(snapshot: &ReportSnapshot) -> String {
    let receipt = &snapshot.receipt;

    let badge = if receipt.company_card {
        "Företagskort"
    } else {
        "Eget Utlägg"
    };

    let charged_names = snapshot
        .charged_companies
        .iter()
        .map(|c| escape(&c.company_name))
        .collect::<Vec<_>>()
        .join(", ");

    // Optional columns, header and cell built side by side from the same
    // presence checks.
    let note = snapshot.note.as_deref();
    let represented_count = (!snapshot.represented.is_empty()).then(|| snapshot.represented.len());

    let mut html = String::with_capacity(4096);
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8" />
  <style>{STYLE}</style>
  <title>Receipt Report</title>
</head>
<body>

  <div id="header">{description}</div>
  <div class="sub-header">{creation_date}</div>

  <div class="section">
    <div class="info"><strong>Typ:</strong> {badge}</div>
    <div class="info"><strong>Användare:</strong> {user}</div>
    <div class="info"><strong>Email:</strong> {email}</div>
    <div class="info"><strong>Företag:</strong> {company}</div>
  </div>
"#,
        description = escape(&receipt.description),
        creation_date = receipt.creation_date.format("%Y-%m-%d"),
        badge = badge,
        user = escape(&snapshot.submitter.first_name),
        email = escape(&snapshot.submitter.email),
        company = escape(&snapshot.company.company_name),
    );

    // ── Table ────────────────────────────────────────────────────────────
    html.push_str("\n  <div class=\"section\">\n    <table>\n      <thead>\n        <tr>\n");
    html.push_str("          <th>Datum</th>\n");
    html.push_str("          <th>Beskrivning</th>\n");
    html.push_str("          <th>Netto</th>\n");
    html.push_str("          <th>Moms</th>\n");
    html.push_str("          <th>Belopp</th>\n");
    html.push_str("          <th>Belastade företag</th>\n");
    if note.is_some() {
        html.push_str("          <th>Övrigt</th>\n");
    }
    if represented_count.is_some() {
        html.push_str("          <th>Antal Representerade</th>\n");
    }
    html.push_str("        </tr>\n      </thead>\n      <tbody>\n        <tr>\n");
    let _ = write!(
        html,
        "          <td>{}</td>\n          <td>{}</td>\n          <td>{:.2}</td>\n          <td>{:.2}</td>\n          <td>{:.2}</td>\n          <td>{}</td>\n",
        receipt.receipt_date.format("%Y-%m-%d"),
        escape(&receipt.description),
        receipt.net,
        receipt.tax,
        receipt.total(),
        charged_names,
    );
    if let Some(text) = note {
        let _ = write!(html, "          <td>{}</td>\n", escape(text));
    }
    if let Some(count) = represented_count {
        let _ = write!(html, "          <td>{count}</td>\n");
    }
    html.push_str("        </tr>\n      </tbody>\n    </table>\n");

    // ── Represented persons ──────────────────────────────────────────────
    if !snapshot.represented.is_empty() {
        html.push_str(
            "    <div class=\"section\">\n      <h2>Representerade Personer</h2>\n      <ul class=\"vertical-list\">\n",
        );
        for person in &snapshot.represented {
            let _ = write!(html, "        <li>{}</li>\n", escape(&person.name));
        }
        html.push_str("      </ul>\n    </div>\n");
    }
    html.push_str("  </div>\n");

    // ── Page images ──────────────────────────────────────────────────────
    html.push_str("\n  <div class=\"image-container\">\n");
    for image in &snapshot.images {
        let _ = write!(
            html,
            "    <img class=\"receipt-image\" src=\"{}\" alt=\"Kvitto Bild\" />\n",
            escape(&image.link)
        );
    }
    html.push_str("  </div>\n\n</body>\n</html>\n");

    html
}

/// Minimal HTML escaping for text and attribute positions.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
