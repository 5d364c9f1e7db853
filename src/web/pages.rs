//! Server-rendered HTML pages.
//!
//! Every value taken from a memo or a request passes through [`escape_html`]
//! before it is interpolated.

use crate::store::{Memo, MemoId, MemoTitle, TITLE_MAX_CHARS};

/// Shared stylesheet served at `/style.css`.
pub const STYLE_CSS: &str = r#"body {
  font-family: sans-serif;
  max-width: 40rem;
  margin: 2rem auto;
  color: #222;
}
header a {
  color: inherit;
  text-decoration: none;
}
ul.memos li {
  margin: 0.3rem 0;
}
form.memo input,
form.memo textarea {
  width: 100%;
  box-sizing: border-box;
}
form.memo textarea {
  min-height: 12rem;
}
.content {
  white-space: pre-wrap;
}
.error {
  color: #b00020;
}
.actions form {
  display: inline;
}
"#;

/// Escape text for use in HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '/' => escaped.push_str("&#x2F;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(page_title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{} | memopad</title>
<link rel="stylesheet" href="/style.css">
</head>
<body>
<header><h1><a href="/">memopad</a></h1></header>
<main>
{}
</main>
</body>
</html>
"#,
        escape_html(page_title),
        body
    )
}

/// Memo list, doubling as the top page.
pub fn index_page(titles: &[MemoTitle]) -> String {
    let mut body = String::from("<h2>Memos</h2>\n");
    if titles.is_empty() {
        body.push_str("<p>No memos yet.</p>\n");
    } else {
        body.push_str("<ul class=\"memos\">\n");
        for memo in titles {
            body.push_str(&format!(
                "<li><a href=\"/memos/{}\">{}</a></li>\n",
                memo.id,
                escape_html(&memo.title)
            ));
        }
        body.push_str("</ul>\n");
    }
    body.push_str("<p><a href=\"/memos/new\">New memo</a></p>\n");
    layout("Top", &body)
}

pub fn memo_page(memo: &Memo) -> String {
    let body = format!(
        r#"<h2>{title}</h2>
<div class="content">{content}</div>
<div class="actions">
<a href="/memos/{id}/edit">Edit</a>
<form method="post" action="/memos/{id}">
<input type="hidden" name="_method" value="delete">
<button type="submit">Delete</button>
</form>
</div>
"#,
        id = memo.id,
        title = escape_html(&memo.title),
        content = escape_html(&memo.content),
    );
    layout(&format!("Memo {}", memo.id), &body)
}

/// Values shown in the create/edit form.
#[derive(Debug, Clone, Default)]
pub struct FormValues<'a> {
    pub title: &'a str,
    pub content: &'a str,
}

/// Create form when `id` is `None`, edit form otherwise.
pub fn edit_page(id: Option<MemoId>, values: &FormValues<'_>, error: Option<&str>) -> String {
    let (page_title, action, method) = match id {
        Some(id) => (
            format!("Edit memo {}", id),
            format!("/memos/{}", id),
            "<input type=\"hidden\" name=\"_method\" value=\"patch\">\n",
        ),
        None => ("New memo".to_string(), "/memos".to_string(), ""),
    };

    let error = error
        .map(|e| format!("<p class=\"error\">{}</p>\n", escape_html(e)))
        .unwrap_or_default();

    let body = format!(
        r#"<h2>{heading}</h2>
{error}<form class="memo" method="post" action="{action}">
{method}<p><label>Title<br><input type="text" name="title" maxlength="{max}" required value="{title}"></label></p>
<p><label>Content<br><textarea name="content">{content}</textarea></label></p>
<p><button type="submit">Save</button></p>
</form>
"#,
        heading = escape_html(&page_title),
        error = error,
        action = action,
        method = method,
        max = TITLE_MAX_CHARS,
        title = escape_html(values.title),
        content = escape_html(values.content),
    );
    layout(&page_title, &body)
}

pub fn error_page(page_title: &str, message: &str) -> String {
    let body = format!(
        "<p class=\"error\">{}</p>\n<p><a href=\"/\">Back to top</a></p>\n",
        escape_html(message)
    );
    layout(page_title, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#x27;y&#x27;&lt;&#x2F;script&gt;"
        );
        assert_eq!(escape_html("メモ"), "メモ");
    }

    #[test]
    fn test_memo_page_escapes_fields() {
        let memo = Memo {
            id: 7,
            title: "<b>bold</b>".to_string(),
            content: "a & b".to_string(),
        };
        let html = memo_page(&memo);
        assert!(html.contains("&lt;b&gt;bold&lt;&#x2F;b&gt;"));
        assert!(html.contains("a &amp; b"));
        assert!(!html.contains("<b>bold"));
        assert!(html.contains("/memos/7/edit"));
    }

    #[test]
    fn test_edit_page_modes() {
        let values = FormValues::default();
        let new = edit_page(None, &values, None);
        assert!(new.contains("action=\"/memos\""));
        assert!(!new.contains("_method"));

        let edit = edit_page(Some(3), &values, Some("title is empty"));
        assert!(edit.contains("action=\"/memos/3\""));
        assert!(edit.contains("value=\"patch\""));
        assert!(edit.contains("title is empty"));
    }

    #[test]
    fn test_index_lists_titles() {
        let html = index_page(&[
            MemoTitle { id: 1, title: "first".to_string() },
            MemoTitle { id: 4, title: "fourth".to_string() },
        ]);
        assert!(html.contains("<a href=\"/memos/1\">first</a>"));
        assert!(html.contains("<a href=\"/memos/4\">fourth</a>"));
        assert!(html.starts_with("<!DOCTYPE html>"));
    }
}
