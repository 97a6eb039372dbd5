use damage_triage::{ImageRef, OpenAIClient};

pub const CAR_URL: &str = "https://images.example.com/car-accident-front-view.jpeg";

pub const SINGLE_DENT_XML: &str = r#"<damageReport><damage type="Dent" severity="Minor" estimatedCostUSD="150.00"/><totalEstimatedCostUSD>150.00</totalEstimatedCostUSD><notes>Small door dent.</notes></damageReport>"#;

#[allow(dead_code)]
pub const FRONT_IMPACT_XML: &str = r#"<damageReport>
  <damage type="Dent" severity="Moderate" location="Front Bumper" estimatedCostUSD="850.00"/>
  <damage type="BrokenLamp" severity="Severe" location="Left Headlight" estimatedCostUSD="420.00"/>
  <damage type="Scratch" severity="Minor" location="Hood" estimatedCostUSD="180.00"/>
  <totalEstimatedCostUSD>1450.00</totalEstimatedCostUSD>
  <notes>Front-end collision with headlight and bumper damage.</notes>
</damageReport>"#;

#[allow(dead_code)]
pub fn car_image() -> ImageRef {
    ImageRef::from_url(CAR_URL).expect("fixture URL is valid")
}

/// Completion response body with `content` as the first choice.
#[allow(dead_code)]
pub fn completion_body(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "gpt-4o-2024-08-06",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 812, "completion_tokens": 96, "total_tokens": 908 }
    })
    .to_string()
}

#[allow(dead_code)]
pub fn client_for(base_url: &str) -> OpenAIClient {
    OpenAIClient::new("sk-test")
        .expect("Failed to create OpenAI client")
        .base_url(base_url)
}
