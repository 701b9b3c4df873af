//! Page rendering
//!
//! The whole page is rebuilt from session state on every request.

use zm_core::{ChatMessage, Notice, NoticeArea, NoticeLevel};

/// Page title shown in the browser tab
pub const PAGE_TITLE: &str = "Zoom Transcript Assistant";

/// Everything needed to render one page
#[derive(Debug, Default)]
pub struct PageView<'a> {
    /// Displayed chat history
    pub messages: &'a [ChatMessage],
    /// Pending notice, if any
    pub notice: Option<&'a Notice>,
    /// Whether a conversation is open
    pub started: bool,
    /// Directory of the open conversation, prefilled in the sidebar
    pub directory: Option<&'a str>,
}

/// Escape text for inclusion in HTML content or attribute values
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

/// Render one chat bubble
pub fn message_bubble(message: &ChatMessage) -> String {
    let class = if message.is_user() { "bubble user" } else { "bubble assistant" };
    format!(
        r#"<div class="{}">{}</div>"#,
        class,
        escape_html(&message.text)
    )
}

fn notice_html(notice: &Notice) -> String {
    let class = match notice.level {
        NoticeLevel::Success => "notice success",
        NoticeLevel::Info => "notice info",
        NoticeLevel::Error => "notice error",
    };
    format!(
        r#"<div class="{}" role="status">{}</div>"#,
        class,
        escape_html(&notice.message)
    )
}

/// Render the full page
pub fn page(view: &PageView<'_>) -> String {
    let notice_in = |area: NoticeArea| {
        view.notice
            .filter(|n| n.area == area)
            .map(notice_html)
            .unwrap_or_default()
    };

    let history: String = view.messages.iter().map(message_bubble).collect();
    let history = if history.is_empty() {
        let hint = if view.started {
            "Ask a question about the transcripts below."
        } else {
            "Load a transcript directory from the sidebar to start chatting."
        };
        format!(r#"<p class="empty">{}</p>"#, hint)
    } else {
        history
    };

    let disabled = if view.started { "" } else { " disabled" };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="icon" href="data:image/svg+xml,<svg xmlns=%22http://www.w3.org/2000/svg%22 viewBox=%220 0 100 100%22><text y=%22.9em%22 font-size=%2290%22>📜</text></svg>">
    <style>{css}</style>
</head>
<body>
    <aside class="sidebar">
        <h2>⚙️ Configuration</h2>
        <p>Use this section to load and configure the transcript files.</p>
        <form method="post" action="/start">
            <label for="directory">📂 Enter the directory path containing transcript files:</label>
            <input type="text" id="directory" name="directory" value="{directory}">
            <button type="submit">🚀 Start Chat</button>
        </form>
        {sidebar_notice}
        <form method="post" action="/reset" class="reset">
            <button type="submit">End session</button>
        </form>
    </aside>
    <main>
        <h1>📜 Zoominary - Transcript Chat Assistant</h1>
        <p>Welcome to the <strong>Zoominary</strong>! This tool helps you analyze Zoom call transcripts and query details from them.
        Simply provide the directory path to your transcript files in the sidebar, and you're good to go!</p>
        <h3>💬 Chat History</h3>
        <div class="history" id="history">{history}</div>
        {chat_notice}
        <form method="post" action="/chat" class="ask">
            <label for="message">📝 Ask a question about the transcripts:</label>
            <input type="text" id="message" name="message" placeholder="Type your message here..." autocomplete="off"{disabled} autofocus>
        </form>
    </main>
    <script>
        const chatHistory = document.getElementById('history');
        chatHistory.scrollTop = chatHistory.scrollHeight;
    </script>
</body>
</html>
"#,
        title = PAGE_TITLE,
        css = PAGE_CSS,
        directory = escape_html(view.directory.unwrap_or_default()),
        sidebar_notice = notice_in(NoticeArea::Sidebar),
        chat_notice = notice_in(NoticeArea::Chat),
        history = history,
        disabled = disabled,
    )
}

const PAGE_CSS: &str = r#"
        * { box-sizing: border-box; }
        body {
            margin: 0;
            display: flex;
            min-height: 100vh;
            font-family: Arial, sans-serif;
            color: #31333f;
        }
        .sidebar {
            width: 320px;
            padding: 20px;
            background: #f0f2f6;
        }
        .sidebar input, .ask input {
            width: 100%;
            padding: 8px;
            margin: 8px 0;
        }
        .sidebar button {
            padding: 8px 16px;
            cursor: pointer;
        }
        .reset { margin-top: 30px; }
        main {
            flex: 1;
            padding: 20px 40px;
            display: flex;
            flex-direction: column;
        }
        .history {
            flex: 1;
            display: flex;
            flex-direction: column;
            overflow-y: auto;
            max-height: 60vh;
        }
        .bubble {
            color: white;
            padding: 10px;
            margin: 5px;
            border-radius: 10px;
            max-width: 75%;
            word-wrap: break-word;
            white-space: pre-wrap;
        }
        .bubble.user { background-color: #ff7070; align-self: flex-end; }
        .bubble.assistant { background-color: #2e2bb5; align-self: flex-start; }
        .empty { color: #808495; }
        .notice { padding: 10px; border-radius: 6px; margin: 10px 0; }
        .notice.success { background: #d4edda; color: #155724; }
        .notice.info { background: #d1ecf1; color: #0c5460; }
        .notice.error { background: #f8d7da; color: #721c24; }
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_bubbles_by_role() {
        let user = message_bubble(&ChatMessage::user("Who spoke?"));
        let assistant = message_bubble(&ChatMessage::assistant("Alice <host>"));

        assert_eq!(user, r#"<div class="bubble user">Who spoke?</div>"#);
        assert_eq!(
            assistant,
            r#"<div class="bubble assistant">Alice &lt;host&gt;</div>"#
        );
    }

    #[test]
    fn test_page_renders_history_in_order() {
        let messages = vec![
            ChatMessage::user("first question"),
            ChatMessage::assistant("first answer"),
            ChatMessage::user("second question"),
        ];
        let html = page(&PageView {
            messages: &messages,
            started: true,
            ..PageView::default()
        });

        let a = html.find("first question").unwrap();
        let b = html.find("first answer").unwrap();
        let c = html.find("second question").unwrap();
        assert!(a < b && b < c);
        assert!(html.contains("<title>Zoom Transcript Assistant</title>"));
        assert!(!html.contains(r#"placeholder="Type your message here..." autocomplete="off" disabled"#));
    }

    #[test]
    fn test_chat_input_disabled_until_started() {
        let html = page(&PageView::default());
        assert!(html.contains(r#"autocomplete="off" disabled"#));
        assert!(html.contains("Load a transcript directory"));
    }

    #[test]
    fn test_notice_placed_in_its_area() {
        let notice = Notice::new(NoticeLevel::Error, NoticeArea::Sidebar, "❌ No transcript files found");
        let html = page(&PageView {
            notice: Some(&notice),
            ..PageView::default()
        });

        let sidebar_end = html.find("</aside>").unwrap();
        let at = html.find(r#"<div class="notice error""#).unwrap();
        assert!(at < sidebar_end);
    }

    #[test]
    fn test_directory_prefill_is_escaped() {
        let html = page(&PageView {
            directory: Some(r#"/tmp/"calls""#),
            ..PageView::default()
        });
        assert!(html.contains(r#"value="/tmp/&quot;calls&quot;""#));
    }
}
