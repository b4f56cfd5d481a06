pub mod builtin;
#[cfg(feature = "open-trivia")]
pub mod open_trivia;

use std::{error::Error, fmt, sync::Arc, time::Duration};

use futures::future::BoxFuture;
use rand::{Rng, seq::SliceRandom};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::{
    config::{AppConfig, QuestionSourceConfig},
    state::game::Question,
};

/// Result alias for question supplier operations.
pub type SupplierResult<T> = Result<T, SupplierError>;

/// Error raised by question suppliers regardless of where questions come from.
#[derive(Debug, Error)]
pub enum SupplierError {
    /// The backend could not be reached or answered garbage.
    #[error("question source unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The backend answered but refused the request.
    #[error("question source rejected the request (code {code})")]
    Rejected { code: u8 },
    /// Fewer questions are available than requested.
    #[error("only {available} questions available, {requested} requested")]
    Exhausted { requested: usize, available: usize },
    /// The backend did not answer in time.
    #[error("question source timed out after {0:?}")]
    Timeout(Duration),
}

impl SupplierError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        SupplierError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Question difficulty requested from a supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Lowercase name used by remote APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of trivia questions for a new round.
///
/// Suppliers shuffle each question's options themselves; the returned
/// `correct_index` refers to the shuffled order.
pub trait QuestionSupplier: Send + Sync {
    /// Fetch `count` questions of the given difficulty.
    fn fetch(
        &self,
        count: usize,
        difficulty: Difficulty,
    ) -> BoxFuture<'static, SupplierResult<Vec<Question>>>;

    /// Short name of the backend, used in logs.
    fn name(&self) -> &'static str;
}

/// Build a question with its options shuffled and the correct index tracked.
pub fn shuffled_question<R>(
    prompt: String,
    correct: String,
    incorrect: Vec<String>,
    rng: &mut R,
) -> Question
where
    R: Rng + ?Sized,
{
    let mut options = Vec::with_capacity(incorrect.len() + 1);
    options.push(correct);
    options.extend(incorrect);

    let mut order: Vec<usize> = (0..options.len()).collect();
    order.shuffle(rng);

    let correct_index = order
        .iter()
        .position(|original| *original == 0)
        .unwrap_or_default();
    let mut slots: Vec<Option<String>> = options.into_iter().map(Some).collect();
    let options = order
        .iter()
        .filter_map(|original| slots[*original].take())
        .collect();

    Question {
        prompt,
        options,
        correct_index,
    }
}

/// Instantiate the supplier selected by the configuration.
pub fn supplier_from_config(config: &AppConfig) -> SupplierResult<Arc<dyn QuestionSupplier>> {
    match &config.question_source {
        QuestionSourceConfig::Builtin => {
            info!("using built-in question bank");
            Ok(Arc::new(builtin::BuiltinSupplier::new()))
        }
        #[cfg(feature = "open-trivia")]
        QuestionSourceConfig::OpenTrivia { base_url } => {
            info!(%base_url, "using Open Trivia DB question source");
            let supplier = open_trivia::OpenTriviaSupplier::new(
                open_trivia::config::OpenTriviaConfig::new(base_url.clone())
                    .with_request_timeout(config.supplier_timeout),
            )
            .map_err(|err| SupplierError::unavailable("failed to build HTTP client".into(), err))?;
            Ok(Arc::new(supplier))
        }
        #[cfg(not(feature = "open-trivia"))]
        QuestionSourceConfig::OpenTrivia { base_url } => {
            tracing::warn!(
                %base_url,
                "open-trivia feature disabled; falling back to built-in question bank"
            );
            Ok(Arc::new(builtin::BuiltinSupplier::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn shuffled_question_tracks_correct_option() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let question = shuffled_question(
                "What is the capital of France?".into(),
                "Paris".into(),
                vec!["London".into(), "Berlin".into(), "Madrid".into()],
                &mut rng,
            );
            assert_eq!(question.options.len(), 4);
            assert_eq!(question.options[question.correct_index], "Paris");
            for city in ["London", "Berlin", "Madrid"] {
                assert!(question.options.iter().any(|option| option == city));
            }
        }
    }

    #[test]
    fn difficulty_parses_lowercase() {
        let difficulty: Difficulty = serde_json::from_str("\"hard\"").unwrap();
        assert_eq!(difficulty, Difficulty::Hard);
        assert_eq!(difficulty.to_string(), "hard");
    }
}
