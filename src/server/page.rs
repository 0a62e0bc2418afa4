//! HTML for the index page.

use std::fmt::Write;

/// What the index page shows besides the artifact list
#[derive(Debug, Clone, Default)]
pub struct PageNotice {
    /// Artifact produced by the current submission
    pub created: Option<String>,
    /// Failure of the current submission
    pub error: Option<String>,
}

const HEAD: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Barcode Generator</title>
<style>
body { font-family: sans-serif; margin: 2rem; }
form label { display: block; margin: .4rem 0; }
.notice { padding: .6rem; margin: 1rem 0; }
.created { background: #e6f4ea; }
.error { background: #fce8e6; }
ul.barcodes { list-style: none; padding: 0; }
ul.barcodes li { margin: 1rem 0; }
ul.barcodes img { display: block; max-width: 480px; }
</style>
</head>
<body>
<h1>Barcode Generator</h1>
<form method="post" action="/">
<label>Serial number <input name="serial_number" required></label>
<label>Customer name <input name="customer_name"></label>
<label>Customer number <input name="customer_number"></label>
<button type="submit">Generate</button>
</form>
"#;

const TAIL: &str = r#"<script>
function deleteBarcode(button) {
  fetch('/delete_image', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ filename: button.dataset.filename })
  }).then(function () { window.location.href = '/'; });
}
</script>
</body>
</html>
"#;

/// Render the full index page
pub fn render_index(barcodes: &[String], notice: &PageNotice) -> String {
    let mut html = String::from(HEAD);

    if let Some(created) = &notice.created {
        let _ = writeln!(
            html,
            r#"<div class="notice created">Created <strong>{}</strong></div>"#,
            escape_html(created)
        );
    }
    if let Some(error) = &notice.error {
        let _ = writeln!(
            html,
            r#"<div class="notice error">No barcode created: {}</div>"#,
            escape_html(error)
        );
    }

    html.push_str("<h2>Barcodes</h2>\n");
    if barcodes.is_empty() {
        html.push_str("<p>No barcodes yet.</p>\n");
    } else {
        html.push_str("<ul class=\"barcodes\">\n");
        for name in barcodes {
            let text = escape_html(name);
            let url = urlencoding::encode(name);
            let _ = writeln!(
                html,
                r#"<li><img src="/static/Barcodes/{url}" alt="{text}"><span>{text}</span> <a href="/download/{url}">Download</a> <button type="button" data-filename="{text}" onclick="deleteBarcode(this)">Delete</button></li>"#
            );
        }
        html.push_str("</ul>\n");
    }

    html.push_str(TAIL);
    html
}

/// Escape text for HTML element and attribute content
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
