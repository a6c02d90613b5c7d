use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::Deserialize;

/// Instruction prompt for the joke persona. Fixed; the transcription text is
/// the only variable input.
pub const JOKE_INSTRUCTIONS: &str = "You are a Dad Joke generator. You will receive a piece of \
the user's conversation. You must respond with a relevant Dad Joke. It must be a short joke, \
no more than 20 words. Do not include any additional text or explanations.";

#[derive(Debug, Deserialize)]
pub struct GenerationResponse {
    pub output_text: String,
}

// The `JokeGenerator` trait is the seam between the session state machine and
// the text-generation service. Unit tests substitute `mockall`'s
// `MockJokeGenerator` so no network calls are made.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait JokeGenerator {
    async fn generate_joke(&self, transcript: &str) -> Result<String>;
}

pub struct GeneratorClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeneratorClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl JokeGenerator for GeneratorClient {
    async fn generate_joke(&self, transcript: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "instructions": JOKE_INSTRUCTIONS,
            "input": transcript,
        });

        let resp = self
            .client
            .post("https://api.openai.com/v1/responses")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .json::<GenerationResponse>()
            .await?;

        let joke = resp.output_text.trim().to_string();
        if joke.is_empty() {
            return Err(anyhow::anyhow!("empty response from text generation"));
        }
        Ok(joke)
    }
}
