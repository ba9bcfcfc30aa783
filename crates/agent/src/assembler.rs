//! Final answer assembly.
//!
//! The final round's text blocks are appended to the turn's accumulated
//! content, citations across those blocks are deduplicated by URL into a
//! markdown "Sources" list, and the result is cut to the output limit.

use orcas_core::message::{Citation, ContentBlock};
use orcas_core::provider::Usage;

/// Appended after a truncated answer.
pub const TRUNCATION_MARKER: &str = "[Response truncated due to length]";

/// A deduplicated source reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub url: String,
    pub title: Option<String>,
}

/// Token usage summed over every round trip of a turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl UsageTotals {
    pub fn add(&mut self, usage: &Usage) {
        self.input_tokens += u64::from(usage.input_tokens);
        self.output_tokens += u64::from(usage.output_tokens);
    }
}

/// Builds the answer the user sees at the end of a turn.
#[derive(Debug, Clone)]
pub struct ResponseAssembler {
    max_output_chars: usize,
}

impl Default for ResponseAssembler {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl ResponseAssembler {
    pub fn new(max_output_chars: usize) -> Self {
        Self { max_output_chars }
    }

    /// Combine accumulated content with the final response blocks.
    pub fn assemble(&self, accumulated: &str, final_blocks: &[ContentBlock]) -> String {
        let text: String = final_blocks.iter().filter_map(ContentBlock::as_text).collect();
        let mut content = accumulated.to_string();
        append_segment(&mut content, &text);

        let sources = collect_sources(final_blocks);
        if !sources.is_empty() {
            content.push_str(&render_sources(&sources));
        }

        self.truncate(content)
    }

    /// Cut `content` to the character limit, appending the marker when cut.
    pub fn truncate(&self, content: String) -> String {
        match content.char_indices().nth(self.max_output_chars) {
            None => content,
            Some((cut, _)) => {
                let mut out = content[..cut].to_string();
                out.push_str("\n\n");
                out.push_str(TRUNCATION_MARKER);
                out
            }
        }
    }
}

/// Append `segment` to `content`, separated by a blank line.
pub(crate) fn append_segment(content: &mut String, segment: &str) {
    if segment.is_empty() {
        return;
    }
    if !content.is_empty() {
        content.push_str("\n\n");
    }
    content.push_str(segment);
}

/// Citations from every text block, deduplicated by URL in first-seen order.
///
/// The first citation of a URL decides its title.
pub fn collect_sources(blocks: &[ContentBlock]) -> Vec<Source> {
    let mut sources: Vec<Source> = Vec::new();
    for citation in blocks.iter().flat_map(citations_of) {
        let Some(url) = citation.url.as_deref().filter(|u| !u.is_empty()) else {
            continue;
        };
        if sources.iter().any(|s| s.url == url) {
            continue;
        }
        sources.push(Source {
            url: url.to_string(),
            title: citation.title.clone().filter(|t| !t.is_empty()),
        });
    }
    sources
}

fn citations_of(block: &ContentBlock) -> &[Citation] {
    match block {
        ContentBlock::Text { citations, .. } => citations,
        _ => &[],
    }
}

fn render_sources(sources: &[Source]) -> String {
    let mut out = String::from("\n\n**Sources:**\n");
    for source in sources {
        let title = source.title.as_deref().unwrap_or(&source.url);
        out.push_str(&format!("- [{title}]({})\n", source.url));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cite(url: &str, title: Option<&str>) -> Citation {
        Citation {
            url: Some(url.into()),
            title: title.map(Into::into),
            extra: serde_json::Map::new(),
        }
    }

    fn cited(text: &str, citations: Vec<Citation>) -> ContentBlock {
        ContentBlock::Text {
            text: text.into(),
            citations,
        }
    }

    #[test]
    fn concatenates_text_blocks() {
        let blocks = vec![
            ContentBlock::text("Hello, "),
            ContentBlock::ServerToolUse {
                id: "srv_1".into(),
                name: "web_search".into(),
                input: serde_json::json!({"query": "x"}),
            },
            ContentBlock::text("world."),
        ];
        assert_eq!(ResponseAssembler::default().assemble("", &blocks), "Hello, world.");
    }

    #[test]
    fn appends_to_accumulated_content() {
        let out = ResponseAssembler::default().assemble("_Using tool: list_agents_", &[ContentBlock::text("Done.")]);
        assert_eq!(out, "_Using tool: list_agents_\n\nDone.");
    }

    #[test]
    fn sources_are_deduplicated_by_url() {
        let blocks = vec![
            cited("A", vec![cite("https://a.example", Some("Alpha")), cite("https://b.example", Some("Beta"))]),
            cited("B", vec![cite("https://a.example", Some("Alpha again")), cite("https://c.example", None)]),
        ];

        let sources = collect_sources(&blocks);
        assert_eq!(
            sources,
            vec![
                Source {
                    url: "https://a.example".into(),
                    title: Some("Alpha".into())
                },
                Source {
                    url: "https://b.example".into(),
                    title: Some("Beta".into())
                },
                Source {
                    url: "https://c.example".into(),
                    title: None
                },
            ]
        );

        let out = ResponseAssembler::default().assemble("", &blocks);
        assert_eq!(
            out,
            "AB\n\n**Sources:**\n- [Alpha](https://a.example)\n- [Beta](https://b.example)\n- [https://c.example](https://c.example)\n"
        );
    }

    #[test]
    fn untitled_source_uses_url() {
        let out = ResponseAssembler::default()
            .assemble("", &[cited("See", vec![cite("https://c.example", None)])]);
        assert!(out.ends_with("- [https://c.example](https://c.example)\n"));
    }

    #[test]
    fn long_answer_is_truncated_with_marker() {
        let out = ResponseAssembler::default().assemble("", &[ContentBlock::text("x".repeat(10_050))]);
        let expected = format!("{}\n\n{TRUNCATION_MARKER}", "x".repeat(10_000));
        assert_eq!(out, expected);
    }

    #[test]
    fn answer_at_limit_is_untouched() {
        let out = ResponseAssembler::default().assemble("", &[ContentBlock::text("y".repeat(10_000))]);
        assert_eq!(out.chars().count(), 10_000);
        assert!(!out.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn usage_accumulates_across_rounds() {
        let mut totals = UsageTotals::default();
        totals.add(&Usage {
            input_tokens: 120,
            output_tokens: 30,
        });
        totals.add(&Usage {
            input_tokens: 200,
            output_tokens: 45,
        });
        assert_eq!(totals.input_tokens, 320);
        assert_eq!(totals.output_tokens, 75);
    }

    #[test]
    fn truncation_counts_characters() {
        let out = ResponseAssembler::new(3).truncate("ééééé".into());
        assert!(out.starts_with("ééé\n\n"));
    }
}
