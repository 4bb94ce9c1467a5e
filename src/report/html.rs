// Assembles the final HTML document.

use crate::report::charts::RenderedChart;
use crate::report::*;

const STYLE: &str = r#"    body { font-family: Arial, sans-serif; max-width: 900px; margin: auto; padding: 20px; background: #f9f9f9; }
    h1 { color: #2c3e50; }
    h2 { color: #34495e; margin-top: 40px; }
    .qa-section { background: #ecf0f1; padding: 15px; border-radius: 8px; margin-bottom: 30px; }
    .question { font-weight: bold; color: #2980b9; margin-top: 20px; }
    .answer { margin-left: 20px; }
    img { max-width: 100%; height: auto; border: 1px solid #ccc; margin-top: 10px; }
"#;

/// Escapes the characters that are special in HTML and XML content and attributes.
pub fn escape_markup(s: &str) -> String {
    let mut res = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => res.push_str("&amp;"),
            '<' => res.push_str("&lt;"),
            '>' => res.push_str("&gt;"),
            '"' => res.push_str("&quot;"),
            '\'' => res.push_str("&#39;"),
            c => res.push(c),
        }
    }
    res
}

/// Builds the report: the title, the question/answer blocks, then one section per chart.
pub fn assemble_html(config: &ReportConfig, charts: &[RenderedChart]) -> String {
    let title = escape_markup(&config.title);
    let mut doc = String::new();
    doc.push_str("<!DOCTYPE html>\n");
    doc.push_str(&format!("<html lang=\"{}\">\n", escape_markup(&config.lang)));
    doc.push_str("<head>\n<meta charset=\"UTF-8\" />\n");
    doc.push_str(&format!("<title>{}</title>\n", title));
    doc.push_str("<style>\n");
    doc.push_str(STYLE);
    doc.push_str("</style>\n</head>\n<body>\n\n");
    doc.push_str(&format!("<h1>{}</h1>\n\n", title));

    doc.push_str("<div class=\"qa-section\">\n");
    for qa in config.questions.iter() {
        doc.push_str(&format!(
            "    <div class=\"question\">{}</div>\n    <div class=\"answer\">{}</div>\n\n",
            escape_markup(&qa.question),
            escape_markup(&qa.answer)
        ));
    }
    doc.push_str("</div>\n\n");

    for chart in charts.iter() {
        doc.push_str(&format!(
            "<h2>{}</h2>\n<img src=\"{}\" alt=\"{}\" />\n\n",
            escape_markup(&chart.title),
            chart.data_uri(),
            escape_markup(&chart.alt)
        ));
    }
    doc.push_str("</body>\n</html>\n");
    debug!(
        "assemble_html: {} charts, {} bytes",
        charts.len(),
        doc.len()
    );
    doc
}
