use crate::error::DocqaError;

/// Sampling temperature used for answers.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// A hosted generative model.
#[async_trait::async_trait]
pub trait Generator {
    fn id(&self) -> &'static str;

    fn model(&self) -> &str;

    /// Complete `prompt` in a single, non-streaming call.
    async fn generate(&self, prompt: &str) -> Result<String, DocqaError>;
}
