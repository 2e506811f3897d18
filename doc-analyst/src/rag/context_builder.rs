//! Prompt assembly for the answer synthesizer.
//!
//! Ranked chunks become labeled `### Context {i}` blocks (table data vs plain
//! text, with the source file name), wrapped in a fixed analyst instruction.

use crate::protocol::{ChatMessage, RetrievedContext, ScoredChunk, TABLE_MARKER};

// ============ Prompt Constants ============

/// System instruction sent with every synthesis request
pub const SYSTEM_INSTRUCTION: &str = "\
You are a meticulous document analyst. Always:
- Stick strictly to provided content
- Acknowledge uncertainty
- Cite sources";

/// Instructions appended after the document context
pub const ANALYSIS_INSTRUCTIONS: &str = "\
Instructions:
1. Pay special attention to leadership sections and tables
2. If mentioning people, include their titles and roles
3. Reference specific pages/tables when possible
4. If unsure, say \"The documents state...\" instead of assuming.";

/// Separator between context blocks
const CONTEXT_SEPARATOR: &str = "\n\n";

/// Table content of a chunk: everything after the last table marker.
pub fn table_content_after_marker(text: &str) -> Option<&str> {
    text.rsplit_once(TABLE_MARKER).map(|(_, after)| after.trim())
}

/// Render one ranked chunk as a numbered context block (1-based).
pub fn format_context_block(position: usize, scored: &ScoredChunk<'_>) -> String {
    let source = scored.chunk.document.source_name();
    let body = match table_content_after_marker(&scored.chunk.text) {
        Some(table) => format!("TABLE DATA (from {}):\n{}", source, table),
        None => format!("TEXT CONTENT (from {}):\n{}", source, scored.chunk.text),
    };
    format!("### Context {}:\n{}", position, body)
}

/// Join ranked chunks into the document context, preserving rank order.
pub fn assemble_context(ranked: &[ScoredChunk<'_>]) -> String {
    ranked
        .iter()
        .enumerate()
        .map(|(i, scored)| format_context_block(i + 1, scored))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Wrap the document context in the analysis template.
pub fn build_user_prompt(query: &str, context: &str) -> String {
    format!(
        "Analyze these documents to answer: \"{}\"\n\nDocument Context:\n{}\n\n{}",
        query, context, ANALYSIS_INSTRUCTIONS
    )
}

/// System + user messages for one query.
pub fn assemble_prompt(query: &str, ranked: &[ScoredChunk<'_>]) -> Vec<ChatMessage> {
    let context = assemble_context(ranked);
    vec![
        ChatMessage::system(SYSTEM_INSTRUCTION),
        ChatMessage::user(build_user_prompt(query, &context)),
    ]
}

/// Report entry for a chunk handed to the synthesizer.
pub fn describe_retrieved(scored: &ScoredChunk<'_>) -> RetrievedContext {
    RetrievedContext {
        source: scored.chunk.document.source_name(),
        chunk_index: scored.chunk.index,
        similarity: scored.similarity,
        is_table: scored.chunk.contains_table(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Chunk, Document};
    use std::sync::Arc;

    fn chunk(path: &str, text: &str) -> Chunk {
        Chunk::new(text.to_string(), Arc::new(Document::new(path)), 0)
    }

    #[test]
    fn test_table_content_after_last_marker() {
        let text = format!("intro {} Name | Title {} second", TABLE_MARKER, TABLE_MARKER);
        assert_eq!(table_content_after_marker(&text), Some("second"));
        assert_eq!(table_content_after_marker("plain text"), None);
    }

    #[test]
    fn test_text_block_is_labeled_with_basename() {
        let c = chunk("/srv/uploads/report.pdf", "Revenue grew 10%.");
        let scored = ScoredChunk { chunk: &c, similarity: 0.9 };
        assert_eq!(
            format_context_block(1, &scored),
            "### Context 1:\nTEXT CONTENT (from report.pdf):\nRevenue grew 10%."
        );
    }

    #[test]
    fn test_table_block_drops_text_before_marker() {
        let c = chunk(
            "/srv/uploads/board.pdf",
            &format!("PAGE 2 TEXT: prose {} Table 1 (page 2): Jane Doe | CFO", TABLE_MARKER),
        );
        let scored = ScoredChunk { chunk: &c, similarity: 0.9 };
        assert_eq!(
            format_context_block(2, &scored),
            "### Context 2:\nTABLE DATA (from board.pdf):\nTable 1 (page 2): Jane Doe | CFO"
        );
    }

    #[test]
    fn test_table_block_with_two_tables_keeps_last() {
        let c = chunk(
            "/srv/uploads/a.pdf",
            &format!("prose {} T1 rows {} T2 rows", TABLE_MARKER, TABLE_MARKER),
        );
        let scored = ScoredChunk { chunk: &c, similarity: 0.5 };
        let block = format_context_block(1, &scored);
        assert_eq!(block, "### Context 1:\nTABLE DATA (from a.pdf):\nT2 rows");
        assert!(!block.contains(TABLE_MARKER));
    }

    #[test]
    fn test_assemble_context_keeps_rank_order() {
        let a = chunk("/a.pdf", "first");
        let b = chunk("/b.pdf", "second");
        let ranked = vec![
            ScoredChunk { chunk: &b, similarity: 0.8 },
            ScoredChunk { chunk: &a, similarity: 0.2 },
        ];
        let context = assemble_context(&ranked);
        assert_eq!(
            context,
            "### Context 1:\nTEXT CONTENT (from b.pdf):\nsecond\n\n### Context 2:\nTEXT CONTENT (from a.pdf):\nfirst"
        );
    }

    #[test]
    fn test_assemble_prompt_wraps_template() {
        let c = chunk("/a.pdf", "Jane Doe is the CFO.");
        let ranked = vec![ScoredChunk { chunk: &c, similarity: 1.0 }];
        let messages = assemble_prompt("Who is the CFO?", &ranked);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, SYSTEM_INSTRUCTION);
        assert_eq!(messages[1].role, "user");
        let prompt = &messages[1].content;
        assert!(prompt.starts_with("Analyze these documents to answer: \"Who is the CFO?\"\n\nDocument Context:\n### Context 1:"));
        assert!(prompt.contains("include their titles and roles"));
        assert!(prompt.ends_with("say \"The documents state...\" instead of assuming."));
    }

    #[test]
    fn test_describe_retrieved() {
        let c = chunk("/x/board.pdf", &format!("{} A | B", TABLE_MARKER));
        let described = describe_retrieved(&ScoredChunk { chunk: &c, similarity: 0.5 });
        assert_eq!(described.source, "board.pdf");
        assert!(described.is_table);
        assert_eq!(described.similarity, 0.5);
    }
}
