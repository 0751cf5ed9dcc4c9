//! Prompt template and context assembly.
//!
//! The generator only ever sees the flattened text produced here; raw
//! metadata structures never cross that boundary.

use docshelf_core::types::{file_name_of, page_label, ScoredMatch};

/// Default instruction template. Tunable wording, not a structural
/// invariant; `{context}` and `{question}` are the binding points.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
You are a helpful assistant that answers questions based on the provided context.

Context:
{context}

Question: {question}

Instructions:
1. Answer the question using ONLY the information from the provided context.
2. If the information is not in the context, state clearly that you do not have that information.
3. Provide a clear and concise answer.
4. Cite your sources by naming the document the information comes from.

Answer:
";

pub fn render(template: &str, context: &str, question: &str) -> String {
    template
        .replace("{context}", context)
        .replace("{question}", question)
}

/// Flattens ranked matches into labeled context blocks, best match first.
pub fn assemble_context(matches: &[ScoredMatch]) -> String {
    let mut blocks = Vec::with_capacity(matches.len());
    for (i, m) in matches.iter().enumerate() {
        blocks.push(format!(
            "[Document {}]\nSource: {}\nPage: {}\nContent: {}\n",
            i + 1,
            file_name_of(&m.chunk.source_path),
            page_label(m.chunk.page),
            m.chunk.content,
        ));
    }
    blocks.join("\n")
}
