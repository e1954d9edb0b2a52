// Answer generation
// Grounds a question in retrieved snippets and asks a chat model for the answer

pub mod cohere;


use tracing::debug;

use crate::remote::RemoteServiceError;

pub use cohere::CohereChat;

/// A hosted chat model that completes a single prompt
pub trait ChatCompletion {
    fn complete(&self, model: &str, prompt: &str) -> Result<String, RemoteServiceError>;
}

/// Build the grounding prompt; snippets are joined with newlines in the order given
#[inline]
pub fn build_prompt(question: &str, snippets: &[String]) -> String {
    let context = snippets.join("\n");
    format!(
        "Answer the question based on the context below:\nContext: {}\nQuestion: {}\nAnswer:\n",
        context, question
    )
}

/// Produces grounded answers through a [`ChatCompletion`] capability
pub struct AnswerGenerator<'a> {
    chat: &'a dyn ChatCompletion,
    model: String,
}

impl<'a> AnswerGenerator<'a> {
    #[inline]
    pub fn new(chat: &'a dyn ChatCompletion, model: impl Into<String>) -> Self {
        Self {
            chat,
            model: model.into(),
        }
    }

    /// Answer `question` from `snippets`. The model's text is returned verbatim.
    #[inline]
    pub fn generate(
        &self,
        question: &str,
        snippets: &[String],
    ) -> Result<String, RemoteServiceError> {
        let prompt = build_prompt(question, snippets);
        debug!(
            "Requesting answer from {} ({} snippets, {} prompt characters)",
            self.model,
            snippets.len(),
            prompt.chars().count()
        );

        self.chat.complete(&self.model, &prompt)
    }
}
