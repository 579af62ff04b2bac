// ABOUTME: Converts a document's content blocks into Markdown text
// ABOUTME: One block kind at a time, preserving inline formatting

use crate::model::{Block, RichText};

/// Render blocks as Markdown. Blocks that render to nothing are dropped; the rest are
/// separated by one blank line.
pub fn blocks_to_markdown(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(block_to_markdown)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn block_to_markdown(block: &Block) -> String {
    match block {
        Block::Paragraph(spans) => render_rich_text(spans),
        Block::Heading { level, text } => {
            prefixed(&format!("{} ", "#".repeat(usize::from(*level))), text)
        }
        Block::BulletedItem(spans) => prefixed("- ", spans),
        // Renderers number consecutive `1.` items themselves.
        Block::NumberedItem(spans) => prefixed("1. ", spans),
        Block::Code { language, text } => {
            let code = render_rich_text(text);
            if code.is_empty() {
                String::new()
            } else {
                format!("```{}\n{}\n```", language, code)
            }
        }
        Block::Image { url } => {
            if url.is_empty() {
                String::new()
            } else {
                format!("![image]({})", url)
            }
        }
        Block::Unsupported { .. } => String::new(),
    }
}

fn prefixed(prefix: &str, spans: &[RichText]) -> String {
    let text = render_rich_text(spans);
    if text.is_empty() {
        text
    } else {
        format!("{}{}", prefix, text)
    }
}

pub fn render_rich_text(spans: &[RichText]) -> String {
    spans.iter().map(render_span).collect()
}

/// Wraps are applied link, bold, italic, strikethrough, code, each around the previous result.
fn render_span(span: &RichText) -> String {
    let mut content = span.text.clone();
    if let Some(url) = &span.link {
        content = format!("[{}]({})", content, url);
    }
    if span.bold {
        content = format!("**{}**", content);
    }
    if span.italic {
        content = format!("*{}*", content);
    }
    if span.strikethrough {
        content = format!("~~{}~~", content);
    }
    if span.code {
        content = format!("`{}`", content);
    }
    content
}


#[cfg(test)]
mod snapshot_tests {
    use super::*;

    #[test]
    fn test_markdown_output_snapshot() {
        let blocks = vec![
            Block::Heading {
                level: 1,
                text: vec![RichText::plain("Release notes")],
            },
            Block::Paragraph(vec![
                RichText::plain("We shipped "),
                RichText {
                    text: "dedup".into(),
                    bold: true,
                    ..Default::default()
                },
                RichText::plain(" for "),
                RichText {
                    text: "assets".into(),
                    code: true,
                    ..Default::default()
                },
                RichText::plain("."),
            ]),
            Block::BulletedItem(vec![RichText::plain("faster")]),
            Block::BulletedItem(vec![RichText {
                text: "older flow".into(),
                strikethrough: true,
                ..Default::default()
            }]),
            Block::Code {
                language: "rust".into(),
                text: vec![RichText::plain("fn main() {}")],
            },
            Block::Image {
                url: "https://file.example/f/ABCDEFGH12/img/name.png".into(),
            },
        ];

        insta::assert_snapshot!(blocks_to_markdown(&blocks), @r###"
        # Release notes

        We shipped **dedup** for `assets`.

        - faster

        - ~~older flow~~

        ```rust
        fn main() {}
        ```

        ![image](https://file.example/f/ABCDEFGH12/img/name.png)
        "###);
    }
}
