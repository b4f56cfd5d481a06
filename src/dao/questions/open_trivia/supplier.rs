use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use tracing::debug;

use super::{
    config::OpenTriviaConfig,
    error::{OpenTriviaError, OpenTriviaResult},
    models::{QuestionRecord, QuestionsResponse, RESPONSE_SUCCESS},
};
use crate::{
    dao::questions::{
        Difficulty, QuestionSupplier, SupplierError, SupplierResult, shuffled_question,
    },
    state::game::Question,
};

const API_PATH: &str = "api.php";

/// Question supplier backed by the Open Trivia DB HTTP API.
#[derive(Clone)]
pub struct OpenTriviaSupplier {
    client: Client,
    base_url: Arc<str>,
}

impl OpenTriviaSupplier {
    /// Build the HTTP client for the configured endpoint.
    pub fn new(config: OpenTriviaConfig) -> OpenTriviaResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| OpenTriviaError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
        })
    }

    async fn request_questions(
        &self,
        count: usize,
        difficulty: Difficulty,
    ) -> OpenTriviaResult<QuestionsResponse> {
        let url = format!("{}/{}", self.base_url, API_PATH);
        let query = [
            ("amount", count.to_string()),
            ("type", "multiple".to_string()),
            ("difficulty", difficulty.to_string()),
        ];

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|source| OpenTriviaError::RequestSend {
                path: API_PATH.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(OpenTriviaError::RequestStatus {
                path: API_PATH.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<QuestionsResponse>()
            .await
            .map_err(|source| OpenTriviaError::DecodeResponse {
                path: API_PATH.to_string(),
                source,
            })
    }
}

impl QuestionSupplier for OpenTriviaSupplier {
    fn fetch(
        &self,
        count: usize,
        difficulty: Difficulty,
    ) -> BoxFuture<'static, SupplierResult<Vec<Question>>> {
        let this = self.clone();
        Box::pin(async move {
            let response = this
                .request_questions(count, difficulty)
                .await
                .map_err(|err| SupplierError::unavailable(err.to_string(), err))?;
            debug!(
                code = response.response_code,
                results = response.results.len(),
                "Open Trivia DB answered"
            );
            questions_from_response(response, count)
        })
    }

    fn name(&self) -> &'static str {
        "open-trivia"
    }
}

/// Turn an API payload into shuffled questions.
fn questions_from_response(
    response: QuestionsResponse,
    count: usize,
) -> SupplierResult<Vec<Question>> {
    if response.response_code != RESPONSE_SUCCESS {
        return Err(SupplierError::Rejected {
            code: response.response_code,
        });
    }

    if response.results.len() < count {
        return Err(SupplierError::Exhausted {
            requested: count,
            available: response.results.len(),
        });
    }

    let mut rng = rand::rng();
    Ok(response
        .results
        .into_iter()
        .take(count)
        .map(|record: QuestionRecord| {
            shuffled_question(
                record.question,
                record.correct_answer,
                record.incorrect_answers,
                &mut rng,
            )
        })
        .collect())
}
