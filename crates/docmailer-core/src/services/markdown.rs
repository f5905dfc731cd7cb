//! Markdown to HTML conversion for emails and documents

use pulldown_cmark::{html, Options, Parser};

const EMAIL_CSS: &str = r#"
        body {
            font-family: Arial, sans-serif;
            line-height: 1.6;
            color: #333;
        }
        h1, h2, h3 {
            color: #2c5aa0;
        }
        .container {
            max-width: 600px;
            margin: 0 auto;
            padding: 20px;
        }"#;

/// Stylesheet used when a document template names none
pub const DEFAULT_DOCUMENT_CSS: &str = r#"
        body {
            font-family: Arial, sans-serif;
            margin: 40px;
            line-height: 1.6;
        }
        h1, h2, h3 {
            color: #333;
            text-align: center;
        }
        .header {
            text-align: center;
            padding-bottom: 30px;
            margin-bottom: 30px;
        }
        .header img {
            max-width: 200px;
            max-height: 80px;
            height: auto;
        }
        .content {
            margin-top: 20px;
        }
        .footer {
            border-top: 1px solid #ccc;
            padding-top: 20px;
            margin-top: 30px;
            font-size: 12px;
            color: #666;
        }"#;

/// Convert Markdown with tables, footnotes, strikethrough and task lists enabled
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

/// Full HTML email body with inline styling
pub fn email_html(markdown: &str) -> String {
    format!(
        "<html>\n<head>\n    <style>{}\n    </style>\n</head>\n<body>\n    <div class='container'>\n{}    </div>\n</body>\n</html>",
        EMAIL_CSS,
        to_html(markdown)
    )
}

/// Full HTML page for PDF rendering
pub fn document_html(markdown: &str, css: &str, header_html: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n    <meta charset='UTF-8'>\n    <style>\n{}\n    </style>\n</head>\n<body>\n    {}\n    <div class='content'>\n{}    </div>\n</body>\n</html>",
        css,
        header_html,
        to_html(markdown)
    )
}
