//! Prompt-engine instructions and response clean-up.

use stolink_core::providers::ProviderError;

/// Negative hint passed with every generation request.
pub const NEGATIVE_PROMPT: &str = "blurry, distorted, low quality, deformed face";

/// Edit prompts shorter than this are treated as a failed generation.
const MIN_EDIT_PROMPT_CHARS: usize = 10;

/// System prompt for turning a character description into a generation
/// prompt.
pub const CREATE_CHARACTER_SYSTEM_PROMPT: &str = "\
You are an expert prompt engineer for ID and profile photographs.

Write an English image-generation prompt that renders the requested person \
as an ID photo.

Rules:
1. Pose: facing the camera, still, like an ID photo (ID photo pose, front view, looking at camera).
2. Framing: shoulder-up portrait, passport photo style.
3. Background: a plain solid background that does not distract from the person.
4. Consistency: a high-resolution description in which facial features are clearly visible.
5. Output only the English prompt. No explanations.";

/// System prompt for turning an edit request into an identity-preserving
/// edit instruction.
pub const EDIT_IMAGE_SYSTEM_PROMPT: &str = "\
You are an expert at crafting prompts for an image editing model.

Convert the user's edit request into an optimized English prompt that \
describes the desired change while PRESERVING the original person's identity.

Identity preservation:
1. Always emphasize preserving the person's facial features and identity.
2. Describe the specific change, not a complete redescription of the person.
3. Be precise about which aspect changes (hair, clothing, expression, accessories).
4. The model should only modify what you specifically mention.

Content:
- Keep prompts positive and constructive.
- Describe the desired result, not what to remove.

Examples:
- \"Transform the short black hair into long flowing silver hair reaching past the shoulders. Keep the person's face and features exactly the same.\"
- \"Age this person naturally by about 15 years. Add salt-and-pepper gray hair. Preserve their facial identity and features.\"
- \"Change the formal suit to a casual sweater. Keep everything else the same.\"

Return ONLY the English prompt text. No JSON, no quotes.";

/// User turn for a create job.
pub fn create_user_text(message: &str) -> String {
    format!(
        "Write an ID-photo style English prompt for the following character description:\n\n{message}"
    )
}

/// User turn for an edit job.
pub fn edit_user_text(request: &str) -> String {
    format!(
        "Convert this edit request to an optimized English prompt for the image editor:\n\n{request}"
    )
}

/// Trim a generated creation prompt; empty output is a failure.
pub fn clean_create_prompt(raw: &str) -> Result<String, ProviderError> {
    let prompt = raw.trim();
    if prompt.is_empty() {
        return Err(ProviderError::NoResult("generated prompt is empty".into()));
    }
    Ok(prompt.to_string())
}

/// Trim a generated edit prompt and strip one layer of wrapping quotes.
pub fn clean_edit_prompt(raw: &str) -> Result<String, ProviderError> {
    let mut prompt = raw.trim();
    for quote in ['"', '\''] {
        if prompt.len() >= 2 && prompt.starts_with(quote) && prompt.ends_with(quote) {
            prompt = &prompt[1..prompt.len() - 1];
        }
    }

    if prompt.chars().count() < MIN_EDIT_PROMPT_CHARS {
        return Err(ProviderError::NoResult(format!(
            "edit prompt too short or empty: {prompt:?}"
        )));
    }
    Ok(prompt.to_string())
}
