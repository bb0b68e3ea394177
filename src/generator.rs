//! Generator capability seam
//!
//! The engine treats text generation as a black box: workers and the
//! synthesizer hand an instruction plus raw input to a [`Generator`] and get
//! text back, or an error. Latency and failure are nondeterministic from the
//! engine's point of view, so everything downstream of this trait is written
//! to degrade rather than propagate.

use crate::error::Result;
use async_trait::async_trait;

/// Black-box text-producing capability consumed by workers and the synthesizer
///
/// Implementations may be remote API calls, local models, or deterministic
/// test stubs. Cancellation is drop-based: an implementation must not block
/// in a way that survives its future being dropped (the engine enforces
/// deadlines with `tokio::time::timeout`).
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce text for the given instruction and raw input
    async fn generate(&self, instruction: &str, input: &str) -> Result<String>;

    /// Get the generator type for debugging/logging
    fn generator_type(&self) -> &str;
}

#[cfg(test)]
pub(crate) mod stubs {
    //! Deterministic generator stubs shared by the engine tests

    use super::Generator;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Returns a fixed string regardless of input
    pub struct StaticGenerator(pub &'static str);

    #[async_trait]
    impl Generator for StaticGenerator {
        async fn generate(&self, _instruction: &str, _input: &str) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn generator_type(&self) -> &str {
            "static"
        }
    }

    /// Echoes the input back, prefixed by the instruction
    pub struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, instruction: &str, input: &str) -> Result<String> {
            Ok(format!("[{instruction}] {input}"))
        }

        fn generator_type(&self) -> &str {
            "echo"
        }
    }

    /// Always fails
    pub struct FailingGenerator;

    #[async_trait]
    impl Generator for FailingGenerator {
        async fn generate(&self, _instruction: &str, _input: &str) -> Result<String> {
            Err(Error::generator("stub failure"))
        }

        fn generator_type(&self) -> &str {
            "failing"
        }
    }

    /// Sleeps past any reasonable deadline before answering
    pub struct SleepyGenerator(pub Duration);

    #[async_trait]
    impl Generator for SleepyGenerator {
        async fn generate(&self, _instruction: &str, _input: &str) -> Result<String> {
            tokio::time::sleep(self.0).await;
            Ok("too late".to_string())
        }

        fn generator_type(&self) -> &str {
            "sleepy"
        }
    }

    /// Panics when invoked
    pub struct PanickingGenerator;

    #[async_trait]
    impl Generator for PanickingGenerator {
        async fn generate(&self, _instruction: &str, _input: &str) -> Result<String> {
            panic!("stub panic")
        }

        fn generator_type(&self) -> &str {
            "panicking"
        }
    }
}
