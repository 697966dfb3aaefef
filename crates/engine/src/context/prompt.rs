//! System prompt composition.

use synapse_config::AssistantConfig;

use crate::request::LOCATION_UNKNOWN;

/// Compose the system instruction for one request.
pub fn system_prompt(
    assistant: &AssistantConfig,
    tone: &str,
    language_code: &str,
    location: &str,
) -> String {
    let name = &assistant.name;
    let region = &assistant.region;
    let language = assistant.language_name(language_code);
    let location_clause = location_clause(location, region);

    format!(
        "You are {name}, an AI for Everyday {region}. {location_clause}Respond in {language}. \
         TONE: {tone} CONTEXT: You understand code files, archives, and the everyday nuances \
         of life in {region}. Analyze any code or document provided. If you see code, explain \
         it or debug it if asked. Never say 'As an AI model'."
    )
}

/// `"The user is in {location}, {region}. "`, or empty when unknown.
pub fn location_clause(location: &str, region: &str) -> String {
    let location = location.trim();
    if location.is_empty() || location == LOCATION_UNKNOWN {
        String::new()
    } else {
        format!("The user is in {location}, {region}. ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_with_location_and_hindi() {
        let assistant = AssistantConfig::default();
        let prompt = system_prompt(&assistant, "Explain simply.", "hi", "Pune");
        assert!(prompt.starts_with("You are Synapse-V, an AI for Everyday India. "));
        assert!(prompt.contains("The user is in Pune, India. Respond in Hindi."));
        assert!(prompt.contains("TONE: Explain simply. CONTEXT:"));
        assert!(prompt.ends_with("Never say 'As an AI model'."));
    }

    #[test]
    fn unknown_location_is_omitted() {
        let assistant = AssistantConfig::default();
        let prompt = system_prompt(&assistant, "t", "en", LOCATION_UNKNOWN);
        assert!(!prompt.contains("The user is in"));
        assert!(prompt.contains("Everyday India. Respond in English."));
    }

    #[test]
    fn empty_location_is_omitted() {
        assert_eq!(location_clause("  ", "India"), "");
        assert_eq!(location_clause("Chennai", "India"), "The user is in Chennai, India. ");
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        let prompt = system_prompt(&AssistantConfig::default(), "t", "xx", "Unknown");
        assert!(prompt.contains("Respond in English."));
    }
}
