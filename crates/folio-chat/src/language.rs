use std::fmt;

use serde::{Deserialize, Serialize};

/// Languages the assistant can listen, answer and speak in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "ne-NP")]
    NeNp,
    #[serde(rename = "hi-IN")]
    HiIn,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::EnUs, Language::NeNp, Language::HiIn];

    /// BCP-47 tag, used for speech recognition and synthesis.
    pub fn code(self) -> &'static str {
        match self {
            Language::EnUs => "en-US",
            Language::NeNp => "ne-NP",
            Language::HiIn => "hi-IN",
        }
    }

    pub fn from_code(code: &str) -> Option<Language> {
        Language::ALL.into_iter().find(|l| l.code().eq_ignore_ascii_case(code))
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::EnUs => "English",
            Language::NeNp => "Nepali",
            Language::HiIn => "Hindi",
        }
    }

    pub fn welcome_message(self) -> &'static str {
        match self {
            Language::EnUs => {
                "Hello! I'm the AI assistant for this portfolio. Ask me about skills, projects, education or experience."
            }
            Language::NeNp => {
                "नमस्ते! म यस पोर्टफोलियोको एआई सहायक हुँ। सीप, परियोजना, शिक्षा वा अनुभवबारे सोध्नुहोस्।"
            }
            Language::HiIn => {
                "नमस्ते! मैं इस पोर्टफोलियो का एआई सहायक हूँ। कौशल, परियोजनाओं, शिक्षा या अनुभव के बारे में पूछिए।"
            }
        }
    }

    /// First sentence of the welcome text, used when the history is cleared.
    pub fn greeting(self) -> &'static str {
        let welcome = self.welcome_message();
        welcome.split('.').next().unwrap_or(welcome)
    }

    pub fn system_instruction(self) -> String {
        format!(
            "You are a friendly assistant embedded in a personal portfolio website. \
             Answer questions about the site owner's skills, projects, education and work experience. \
             Keep answers short enough to be read aloud. \
             If a question is unrelated to the portfolio, politely steer the conversation back. \
             Always respond in {}.",
            self.name()
        )
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for lang in Language::ALL {
            assert_eq!(Language::from_code(lang.code()), Some(lang));
        }
        assert_eq!(Language::from_code("EN-us"), Some(Language::EnUs));
        assert_eq!(Language::from_code("fr-FR"), None);
    }

    #[test]
    fn greeting_is_first_sentence() {
        assert_eq!(Language::EnUs.greeting(), "Hello! I'm the AI assistant for this portfolio");
        // no ASCII full stop in Devanagari text
        assert_eq!(Language::HiIn.greeting(), Language::HiIn.welcome_message());
    }

    #[test]
    fn serde_uses_codes() {
        assert_eq!(serde_json::to_string(&Language::NeNp).unwrap(), "\"ne-NP\"");
        let lang: Language = serde_json::from_str("\"hi-IN\"").unwrap();
        assert_eq!(lang, Language::HiIn);
    }

    #[test]
    fn instruction_names_language() {
        assert!(Language::NeNp.system_instruction().ends_with("Always respond in Nepali."));
    }
}
