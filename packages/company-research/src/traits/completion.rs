//! Completion service trait for LLM calls.
//!
//! The research loop needs two call shapes from a language model:
//! - "generate N short strings" (query planning)
//! - "fill typed record fields from context" (extraction)
//!
//! Both go through [`CompletionService::complete`]; the typed shape is layered
//! on top by [`complete_structured`], which decodes the reply strictly against
//! the requested type. There is no code-fence stripping or brace scanning: a
//! reply either decodes or it is a parse error.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::schema::StructuredOutput;

/// A prompt for the completion service.
#[derive(Debug, Clone)]
pub struct Prompt {
    /// System instructions
    pub system: String,

    /// User message
    pub user: String,

    /// Schema the reply must follow, if structured output is wanted
    pub schema: Option<ResponseSchema>,
}

/// Named JSON schema for structured output.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: Value,
}

impl Prompt {
    /// Create a free-text prompt.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            schema: None,
        }
    }

    /// Create a prompt whose reply must decode as `T`.
    pub fn structured<T: StructuredOutput>(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            schema: Some(ResponseSchema {
                name: T::type_name(),
                schema: T::strict_schema(),
            }),
        }
    }
}

/// Completion service (language model) abstraction.
///
/// Implementations wrap a specific provider and return the raw reply text.
/// Timeouts and transport errors are returned as errors; callers in the
/// research loop recover from them locally.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Run a prompt and return the reply text.
    async fn complete(&self, prompt: &Prompt) -> Result<String>;
}

#[async_trait]
impl<T: CompletionService + ?Sized> CompletionService for std::sync::Arc<T> {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        (**self).complete(prompt).await
    }
}

/// Run a structured prompt and decode the reply as `T`.
pub async fn complete_structured<T, A>(ai: &A, system: &str, user: &str) -> Result<T>
where
    T: StructuredOutput,
    A: CompletionService + ?Sized,
{
    let prompt = Prompt::structured::<T>(system, user);
    let raw = ai.complete(&prompt).await?;
    decode_strict(&raw)
}

/// Decode a reply as `T` with no repair attempts.
pub fn decode_strict<T: StructuredOutput>(raw: &str) -> Result<T> {
    Ok(serde_json::from_str(raw.trim())?)
}
