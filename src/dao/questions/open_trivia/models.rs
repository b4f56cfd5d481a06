use serde::Deserialize;

/// `response_code` value of a successful request.
pub const RESPONSE_SUCCESS: u8 = 0;

#[derive(Debug, Deserialize)]
pub struct QuestionsResponse {
    pub response_code: u8,
    #[serde(default)]
    pub results: Vec<QuestionRecord>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    pub correct_answer: String,
    pub incorrect_answers: Vec<String>,
}
