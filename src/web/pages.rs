//! Page templates, compiled into the binary.

const LOGIN_TEMPLATE: &str = include_str!("../../templates/index.html");
const ADMIN_TEMPLATE: &str = include_str!("../../templates/admin.html");
const CHATBOT_TEMPLATE: &str = include_str!("../../templates/chatbot.html");

pub const APP_JS: &str = include_str!("../../static/app.js");
pub const STYLE_CSS: &str = include_str!("../../static/style.css");

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Login form, with an optional message shown under it.
pub fn login_page(message: Option<&str>) -> String {
    let message = message
        .map(|m| format!("<p class=\"error\">{}</p>", escape_html(m)))
        .unwrap_or_default();
    LOGIN_TEMPLATE.replace("{{ message }}", &message)
}

pub fn admin_page(indexes: &[String]) -> String {
    ADMIN_TEMPLATE.replace("{{ index_options }}", &index_options(indexes))
}

pub fn chatbot_page(indexes: &[String]) -> String {
    CHATBOT_TEMPLATE.replace("{{ index_options }}", &index_options(indexes))
}

fn index_options(indexes: &[String]) -> String {
    if indexes.is_empty() {
        return "<option value=\"\">No documents indexed yet</option>".to_string();
    }
    indexes
        .iter()
        .map(|name| {
            let name = escape_html(name);
            format!("<option value=\"{}\">{}</option>", name, name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn login_message_is_rendered_escaped() {
        let page = login_page(Some("Unrecognized role: <x>"));
        assert!(page.contains("Unrecognized role: &lt;x&gt;"));
        assert!(!page.contains("{{ message }}"));

        assert!(!login_page(None).contains("class=\"error\""));
    }

    #[test]
    fn chatbot_lists_indexes() {
        let page = chatbot_page(&["faiss_index_doc".into(), "faiss_index_faq".into()]);
        assert!(page.contains("<option value=\"faiss_index_doc\">faiss_index_doc</option>"));
        assert!(page.contains("faiss_index_faq"));
        assert!(page.contains("chat-page"));
    }

    #[test]
    fn empty_index_list_has_placeholder() {
        let page = admin_page(&[]);
        assert!(page.contains("No documents indexed yet"));
        assert!(page.contains("admin-page"));
    }
}
