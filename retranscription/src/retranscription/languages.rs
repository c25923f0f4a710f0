// retranscription/languages.rs
//
// Languages offered by the retranscription picker. Codes follow Whisper.

use serde::Serialize;

/// Let the engine detect the spoken language. Sent to the worker as `null`.
pub const AUTO_LANGUAGE: &str = "auto";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LanguageOption {
    pub code: &'static str,
    pub name: &'static str,
}

const fn lang(code: &'static str, name: &'static str) -> LanguageOption {
    LanguageOption { code, name }
}

pub const LANGUAGES: &[LanguageOption] = &[
    lang(AUTO_LANGUAGE, "Auto Detect"),
    lang("en", "English"),
    lang("zh", "Chinese"),
    lang("de", "German"),
    lang("es", "Spanish"),
    lang("ru", "Russian"),
    lang("ko", "Korean"),
    lang("fr", "French"),
    lang("ja", "Japanese"),
    lang("pt", "Portuguese"),
    lang("tr", "Turkish"),
    lang("pl", "Polish"),
    lang("ca", "Catalan"),
    lang("nl", "Dutch"),
    lang("ar", "Arabic"),
    lang("sv", "Swedish"),
    lang("it", "Italian"),
    lang("id", "Indonesian"),
    lang("hi", "Hindi"),
    lang("fi", "Finnish"),
    lang("vi", "Vietnamese"),
    lang("he", "Hebrew"),
    lang("uk", "Ukrainian"),
    lang("el", "Greek"),
    lang("ms", "Malay"),
    lang("cs", "Czech"),
    lang("ro", "Romanian"),
    lang("da", "Danish"),
    lang("hu", "Hungarian"),
    lang("ta", "Tamil"),
    lang("no", "Norwegian"),
    lang("th", "Thai"),
    lang("ur", "Urdu"),
    lang("hr", "Croatian"),
    lang("bg", "Bulgarian"),
    lang("lt", "Lithuanian"),
    lang("la", "Latin"),
    lang("fa", "Persian"),
    lang("sk", "Slovak"),
    lang("bn", "Bengali"),
    lang("sr", "Serbian"),
    lang("sl", "Slovenian"),
];

pub fn is_supported(code: &str) -> bool {
    LANGUAGES.iter().any(|l| l.code == code)
}

/// Worker-side language: `None` for auto detection.
pub fn request_language(code: &str) -> Option<String> {
    if code == AUTO_LANGUAGE {
        None
    } else {
        Some(code.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_maps_to_none() {
        assert_eq!(request_language(AUTO_LANGUAGE), None);
        assert_eq!(request_language("fr"), Some("fr".to_string()));
    }

    #[test]
    fn test_supported_codes() {
        assert_eq!(LANGUAGES[0].code, AUTO_LANGUAGE);
        assert!(is_supported("en"));
        assert!(!is_supported("klingon"));
    }
}
