//! Markup for reasoning blocks.

use crate::streaming::BlockId;

/// What a renderer needs to draw one reasoning block.
#[derive(Debug, Clone, Copy)]
pub struct BlockView<'a> {
    pub id: BlockId,
    pub content: &'a str,
    /// Whether the block is presented expanded
    pub open: bool,
    /// Whether a streaming cursor follows the content
    pub cursor: bool,
}

/// Turns reasoning blocks into display markup.
pub trait BlockRenderer: Send + Sync {
    /// Collapsible section for one block.
    fn render_block(&self, block: &BlockView<'_>) -> String;

    /// Marker appended while output is still streaming.
    fn cursor(&self) -> &str;

    /// Inserted between consecutive block sections.
    fn block_separator(&self) -> &str {
        "\n"
    }
}

/// HTML `<details>` sections with a blinking-cursor span, for web front-ends.
///
/// Content is inserted verbatim; the host page decides how to sanitize.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    pub const CURSOR: &'static str = r#"<span class="streaming-cursor"></span>"#;
}

impl BlockRenderer for HtmlRenderer {
    fn render_block(&self, block: &BlockView<'_>) -> String {
        let cursor = if block.cursor { Self::CURSOR } else { "" };
        let details = if block.open { "<details open>" } else { "<details>" };
        format!(
            concat!(
                "<div class=\"thinking\" data-open=\"{open}\" data-id=\"{id}\">\n",
                "    {details}\n",
                "        <summary>🤔 Thinking Process</summary>\n",
                "        <div class=\"thinking-content\">{content}{cursor}</div>\n",
                "    </details>\n",
                "</div>\n",
            ),
            open = block.open,
            id = block.id,
            details = details,
            content = block.content,
            cursor = cursor,
        )
    }

    fn cursor(&self) -> &str {
        Self::CURSOR
    }
}

/// Bracketed plain-text sections, for terminals and logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

impl PlainRenderer {
    pub const CURSOR: &'static str = "▌";
}

impl BlockRenderer for PlainRenderer {
    fn render_block(&self, block: &BlockView<'_>) -> String {
        let cursor = if block.cursor { Self::CURSOR } else { "" };
        format!("[thinking]\n{}{}\n[/thinking]\n", block.content, cursor)
    }

    fn cursor(&self) -> &str {
        Self::CURSOR
    }
}
