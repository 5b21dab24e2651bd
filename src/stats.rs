//! Display helpers for the response statistics line.

use crate::models::Provider;
use std::time::Duration;

/// USD per million (input, output) tokens.
const OPENAI_PRICING: &[(&str, f64, f64)] = &[
    ("gpt-4o", 5.0, 15.0),
    ("gpt-4o-mini", 0.15, 0.6),
    ("gpt-3.5-turbo", 0.5, 1.5),
];

/// `850ms` below one second, `1.25s` above.
pub fn format_duration(elapsed: Duration) -> String {
    let ms = elapsed.as_millis();
    if ms < 1000 {
        format!("{}ms", ms)
    } else {
        format!("{:.2}s", elapsed.as_secs_f64())
    }
}

/// Rough request cost. Groq is reported as free tier; unpriced OpenAI models
/// as `N/A`.
pub fn estimate_cost(provider: Provider, model: &str, prompt_tokens: u32, completion_tokens: u32) -> String {
    if provider == Provider::Groq {
        return "Free tier".to_string();
    }

    match OPENAI_PRICING.iter().find(|(id, _, _)| *id == model) {
        Some((_, input, output)) => {
            let cost = (prompt_tokens as f64 / 1_000_000.0) * input
                + (completion_tokens as f64 / 1_000_000.0) * output;
            format!("~${:.6}", cost)
        }
        None => "N/A".to_string(),
    }
}
