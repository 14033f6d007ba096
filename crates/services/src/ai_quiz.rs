use std::env;

use quest_core::model::{Difficulty, Question, QuestionId, TopicCategory};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AiQuizError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Clone, Debug)]
pub struct AiQuizConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl AiQuizConfig {
    /// Read `MATHQUEST_AI_API_KEY`, `MATHQUEST_AI_BASE_URL` and
    /// `MATHQUEST_AI_MODEL`. Returns `None` without an API key or when the
    /// base URL does not parse.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("MATHQUEST_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("MATHQUEST_AI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        Url::parse(&base_url).ok()?;
        let model = env::var("MATHQUEST_AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Client for an OpenAI-compatible chat completions endpoint that writes
/// multiple-choice questions.
#[derive(Clone)]
pub struct AiQuizClient {
    client: Client,
    config: Option<AiQuizConfig>,
}

impl AiQuizClient {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(AiQuizConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<AiQuizConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Ask the model for `count` questions on a topic.
    ///
    /// # Errors
    ///
    /// Returns `AiQuizError` when the client is disabled, the request fails,
    /// or the reply holds no usable questions.
    pub async fn generate_questions(
        &self,
        topic_title: &str,
        category: TopicCategory,
        count: usize,
        difficulty: Difficulty,
    ) -> Result<Vec<Question>, AiQuizError> {
        let config = self.config.as_ref().ok_or(AiQuizError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Write {count} {difficulty} multiple-choice questions about \
                         \"{topic_title}\" ({category})."
                    ),
                },
            ],
            temperature: 0.7,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AiQuizError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(AiQuizError::EmptyResponse)?;

        let mut questions = parse_questions(&content, category, difficulty)?;
        questions.truncate(count);
        Ok(questions)
    }
}

const SYSTEM_PROMPT: &str = "You write math quiz questions for school students. \
Reply with JSON only: an array of objects with fields \"question\" (string), \
\"options\" (array of 4 strings), \"correct_answer\" (0-based index of the right option) \
and \"explanation\" (string).";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeneratedPayload {
    List(Vec<GeneratedQuestion>),
    Wrapped { questions: Vec<GeneratedQuestion> },
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    question: String,
    options: Vec<String>,
    #[serde(alias = "correctAnswer", alias = "answer")]
    correct_answer: usize,
    #[serde(default)]
    explanation: Option<String>,
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Turn a model reply into validated questions numbered from 1.
///
/// Items that fail validation are dropped.
///
/// # Errors
///
/// Returns `AiQuizError::Malformed` if the reply is not the expected JSON or
/// no item survives validation.
pub fn parse_questions(
    content: &str,
    category: TopicCategory,
    difficulty: Difficulty,
) -> Result<Vec<Question>, AiQuizError> {
    let payload: GeneratedPayload = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| AiQuizError::Malformed(e.to_string()))?;
    let items = match payload {
        GeneratedPayload::List(items) | GeneratedPayload::Wrapped { questions: items } => items,
    };

    let questions: Vec<Question> = items
        .into_iter()
        .filter_map(|item| {
            Question::new(
                QuestionId::new(1),
                item.question,
                item.options,
                item.correct_answer,
                difficulty,
                category,
                item.explanation,
            )
            .ok()
        })
        .zip(1_u64..)
        .map(|(q, n)| q.with_id(QuestionId::new(n)))
        .collect();

    if questions.is_empty() {
        return Err(AiQuizError::Malformed("no valid questions".into()));
    }
    Ok(questions)
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_list_and_drops_invalid_items() {
        let reply = r#"```json
[
  {"question": "What is 2 + 2?", "options": ["3", "4", "5", "6"], "correct_answer": 1, "explanation": "Two pairs."},
  {"question": "Broken", "options": ["only one"], "correct_answer": 0},
  {"question": "What is 10 / 2?", "options": ["2", "5"], "correctAnswer": 1}
]
```"#;
        let questions =
            parse_questions(reply, TopicCategory::Arithmetic, Difficulty::Easy).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id(), QuestionId::new(1));
        assert_eq!(questions[1].id(), QuestionId::new(2));
        assert_eq!(questions[0].correct(), 1);
        assert_eq!(questions[1].explanation(), None);
        assert!(questions.iter().all(|q| q.difficulty() == Difficulty::Easy));
    }

    #[test]
    fn accepts_wrapped_payload() {
        let reply =
            r#"{"questions": [{"question": "x + 1 = 3, x = ?", "options": ["1", "2"], "answer": 1}]}"#;
        let questions = parse_questions(reply, TopicCategory::Algebra, Difficulty::Medium).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].category(), TopicCategory::Algebra);
    }

    #[test]
    fn rejects_prose() {
        let err = parse_questions(
            "Sure! Here are some questions.",
            TopicCategory::Algebra,
            Difficulty::Hard,
        )
        .unwrap_err();
        assert!(matches!(err, AiQuizError::Malformed(_)));
    }

    #[tokio::test]
    async fn disabled_client_refuses() {
        let client = AiQuizClient::new(None);
        assert!(!client.enabled());
        let err = client
            .generate_questions("Counting", TopicCategory::Arithmetic, 3, Difficulty::Easy)
            .await
            .unwrap_err();
        assert!(matches!(err, AiQuizError::Disabled));
    }
}
