//! Context assembly and prompt composition.
//!
//! Order of operations is fixed: render each hit, compose the full prompt
//! around the rendered grounding block, then truncate the composed prompt
//! to the character budget.
//!
//! The composed layout is instructions first, then the question, then the
//! grounding block. A hard cutoff on a long context therefore removes the
//! tail of the grounding block and never the grounding rules.

use tracing::debug;

use crate::models::{Document, RetrievalHit};

/// Returned when retrieval produces no hits.
pub const NO_DATA_MESSAGE: &str = "Xin lỗi, mình chưa có dữ liệu để trả lời câu hỏi này.";

/// Returned when any stage of answering fails.
pub const APOLOGY_MESSAGE: &str = "Xin lỗi, mình gặp lỗi khi xử lý câu hỏi của bạn.";

pub const DEFAULT_MAX_CHARS: usize = 2000;

pub const ELLIPSIS: &str = "...";

const INSTRUCTIONS: &str = "\
Bạn là trợ lý AI chuyên về pháp luật Việt Nam.

Yêu cầu:
1. Nếu câu hỏi không hỏi hay bàn về vấn đề pháp luật, trả lời \"Tôi chỉ giải quyết các vấn đề về pháp luật\".
2. Nếu người dùng hỏi về tính đúng đắn hay sai trái của luật thì đưa ra các cách kiểm tra cho người dùng. Không trả lời một cách chắc chắn.
3. Nếu người dùng hỏi về nội dung luật pháp thì chỉ sử dụng dữ liệu trong phần Ngữ cảnh. Không sửa đổi hay bổ sung thêm.
4. Không thêm bất kì lưu ý hay nhắc nhở nào về nội dung trong phần Ngữ cảnh.
5. Nếu phần Ngữ cảnh không có dữ liệu phù hợp thì bắt đầu câu trả lời bằng \"Mặc dù dữ liệu chưa được cung cấp theo tôi biết...\" rồi thêm ý của bạn.
6. Không nhắc đến việc bạn đã được cung cấp phần Ngữ cảnh trong câu trả lời.";

/// Outcome of assembling a prompt from retrieval hits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembled {
    /// Retrieval returned nothing; answer with [`NO_DATA_MESSAGE`].
    NoData,
    Prompt(String),
}

/// Render one document as a labelled block.
pub fn render_document(document: &Document) -> String {
    match document {
        Document::Law { source, text, kind } => {
            format!("Source: {}\nText: {}\nType: {}", source, text, kind)
        }
        Document::Dialect {
            dialect,
            text,
            meaning,
        } => format!("Dialect: {}\nText: {}\nMeaning: {}", dialect, text, meaning),
    }
}

/// Render hits in rank order, separated by a blank line.
pub fn render_context(hits: &[RetrievalHit]) -> String {
    hits.iter()
        .map(|hit| render_document(&hit.document))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn compose_prompt(question: &str, context: &str) -> String {
    format!(
        "{}\n\nNgười dùng hỏi: {}\n\nNgữ cảnh (lấy từ cơ sở dữ liệu, dùng để trả lời câu hỏi):\n{}",
        INSTRUCTIONS, question, context
    )
}

/// Hard cutoff at `max_chars` Unicode scalar values plus [`ELLIPSIS`].
/// Prompts within budget are returned unchanged.
pub fn truncate_prompt(prompt: &str, max_chars: usize) -> String {
    match prompt.char_indices().nth(max_chars) {
        None => prompt.to_string(),
        Some((cut, _)) => {
            let mut truncated = String::with_capacity(cut + ELLIPSIS.len());
            truncated.push_str(&prompt[..cut]);
            truncated.push_str(ELLIPSIS);
            truncated
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    max_chars: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHARS)
    }
}

impl PromptBuilder {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn assemble(&self, question: &str, hits: &[RetrievalHit]) -> Assembled {
        if hits.is_empty() {
            return Assembled::NoData;
        }
        let context = render_context(hits);
        let composed = compose_prompt(question, &context);
        let composed_chars = composed.chars().count();
        let prompt = truncate_prompt(&composed, self.max_chars);
        debug!(
            hits = hits.len(),
            composed_chars,
            truncated = composed_chars > self.max_chars,
            "prompt assembled"
        );
        Assembled::Prompt(prompt)
    }
}
