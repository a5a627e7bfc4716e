pub mod error;
pub mod gemini;
pub mod normalize;
pub mod prompt;

use async_trait::async_trait;

pub use error::Error;
pub use gemini::GeminiSynthesizer;
pub use normalize::normalize_completion;

/// Turns a natural-language question into SQL text.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Returns the model completion as-is. Callers normalize it.
    async fn synthesize(&self, question: &str) -> Result<String, Error>;
}
