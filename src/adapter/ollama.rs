use super::*;

const ANALYST_PREAMBLE: &str = "You are an expert literary analyst.";
const ANALYSIS_REQUIREMENTS: &str = "CRITICAL ANALYSIS REQUIREMENTS:
- Characters: Only extract actual character names (people, beings, entities with names)
- Locations: Only extract specific place names, buildings, geographic locations
- Key Items/Concepts: Extract important objects, abilities, technologies, abstract concepts
- Narrative Purpose: Be concise but specific about the story function
- Links: Reference UIDs that are thematically or narratively connected

Be accurate and only extract meaningful story elements.";

/// Client for an Ollama-compatible `/api/chat` endpoint.
pub struct OllamaAdapter {
    name: String,
    chat_url: String,
    model: String,
    sampling: SamplingOptions,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    top_p: f32,
    repeat_penalty: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OllamaAdapter {
    pub fn new(config: &AdapterConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build http client for ollama adapter")?;

        Ok(Self {
            name: format!("ollama:{}", config.model),
            chat_url: format!("{}/api/chat", config.endpoint.trim_end_matches('/')),
            model: config.model.clone(),
            sampling: config.sampling.clone(),
            client,
        })
    }

    fn request(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: ChatOptions {
                temperature: self.sampling.temperature,
                top_p: self.sampling.top_p,
                repeat_penalty: self.sampling.repeat_penalty,
            },
        };

        let response = self
            .client
            .post(&self.chat_url)
            .json(&body)
            .send()
            .with_context(|| format!("request to {} failed", self.chat_url))?
            .error_for_status()
            .with_context(|| format!("{} returned an error status", self.chat_url))?;

        let parsed: ChatResponse = response
            .json()
            .with_context(|| format!("failed to parse chat response from {}", self.chat_url))?;
        Ok(parsed.message.content)
    }
}

impl TransformAdapter for OllamaAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, batch: &Batch) -> TransformOutcome {
        let prompt = format!(
            "{ANALYST_PREAMBLE} {}\n\n{ANALYSIS_REQUIREMENTS}",
            batch.instruction_payload
        );
        debug!(batch_id = %batch.batch_id, url = %self.chat_url, "sending batch to ollama");

        match self.request(&prompt) {
            Ok(content) if content.trim().is_empty() => {
                TransformOutcome::Failure("empty response from model".to_string())
            }
            Ok(content) => TransformOutcome::Success(content),
            Err(err) => TransformOutcome::Failure(format!("{err:#}")),
        }
    }
}
