use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Named style directive selecting which rewrite instruction prefixes the text.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Relatable,
    Funny,
    Strict,
    Concise,
    Supportive,
}

impl Tone {
    pub const ALL: [Tone; 7] = [
        Tone::Professional,
        Tone::Friendly,
        Tone::Relatable,
        Tone::Funny,
        Tone::Strict,
        Tone::Concise,
        Tone::Supportive,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Friendly => "friendly",
            Self::Relatable => "relatable",
            Self::Funny => "funny",
            Self::Strict => "strict",
            Self::Concise => "concise",
            Self::Supportive => "supportive",
        }
    }

    const fn builtin_instruction(self) -> &'static str {
        match self {
            Self::Professional => "Rewrite this message to sound professional and respectful.",
            Self::Friendly => "Rewrite this message in a friendly, supportive tone.",
            Self::Relatable => "Rewrite this message to sound down-to-earth and relatable.",
            Self::Funny => {
                "Rewrite this message with light humor while still making the point clear."
            }
            Self::Strict => {
                "Rewrite this message in an assertive and direct tone, while maintaining respect."
            }
            Self::Concise => {
                "Rewrite this message to be clear and concise, getting to the point quickly."
            }
            Self::Supportive => {
                "Rewrite this message to be detailed and encouraging, offering support."
            }
        }
    }

    /// Resolve an optional, caller-supplied tone name.
    ///
    /// Missing or unrecognised names fall back to [`Tone::Professional`].
    pub fn resolve(raw: Option<&str>) -> Tone {
        normalize_tone(raw)
            .and_then(|name| name.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tone '{value}'")]
pub struct ToneParseError {
    value: String,
}

impl FromStr for Tone {
    type Err = ToneParseError;

    /// Exact match against the lowercase tone names. Use [`normalize_tone`] first for
    /// case-insensitive input.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Tone::ALL
            .into_iter()
            .find(|t| t.name() == value)
            .ok_or_else(|| ToneParseError {
                value: value.to_owned(),
            })
    }
}

/// Lower-case a caller-supplied tone name. No trimming is applied.
pub fn normalize_tone(raw: Option<&str>) -> Option<String> {
    raw.map(str::to_lowercase)
}

/// Build the outbound user message from a tone instruction and the original text.
pub fn build_user_message(instruction: &str, text: &str) -> String {
    format!("{instruction}\n\nOriginal Message:\n{text}")
}

static BUILTIN: Lazy<ToneTemplates> = Lazy::new(|| ToneTemplates {
    instructions: Tone::ALL
        .into_iter()
        .map(|t| (t, t.builtin_instruction().to_owned()))
        .collect(),
});

/// Immutable tone → instruction table.
///
/// Always holds an entry for every [`Tone`]; built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToneTemplates {
    instructions: BTreeMap<Tone, String>,
}

/// Optional JSON file replacing some of the built-in instructions.
///
/// ```json
/// { "tones": { "friendly": "Rewrite this warmly.", "strict": "Be firm." } }
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToneOverrides {
    #[serde(default)]
    pub tones: HashMap<Tone, String>,
}

impl ToneTemplates {
    /// The built-in instruction table.
    pub fn builtin() -> &'static ToneTemplates {
        &BUILTIN
    }

    /// Built-in table with `overrides` applied. Blank override strings are ignored.
    pub fn with_overrides(overrides: &ToneOverrides) -> Self {
        let mut table = BUILTIN.clone();
        for (tone, instruction) in &overrides.tones {
            let instruction = instruction.trim();
            if instruction.is_empty() {
                continue;
            }
            table.instructions.insert(*tone, instruction.to_owned());
        }
        table
    }

    /// Load overrides from a JSON file and apply them to the built-in table.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "Failed to read tones config file: {}",
                path.as_ref().display()
            )
        })?;

        let overrides: ToneOverrides = serde_json::from_str(&content)
            .with_context(|| "Failed to parse tones config JSON")?;

        Ok(Self::with_overrides(&overrides))
    }

    /// Instruction for a resolved tone.
    pub fn instruction(&self, tone: Tone) -> &str {
        self.instructions
            .get(&tone)
            .map(String::as_str)
            .unwrap_or_else(|| tone.builtin_instruction())
    }

    /// Resolve a caller-supplied tone name and return it with its instruction.
    pub fn select(&self, raw: Option<&str>) -> (Tone, &str) {
        let tone = Tone::resolve(raw);
        (tone, self.instruction(tone))
    }

    /// All tone names, in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.instructions.keys().map(|t| t.name()).collect()
    }
}

impl Default for ToneTemplates {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("friendly"), Tone::Friendly)]
    #[case(Some("Friendly"), Tone::Friendly)]
    #[case(Some("FRIENDLY"), Tone::Friendly)]
    #[case(Some("strict"), Tone::Strict)]
    #[case(Some("Supportive"), Tone::Supportive)]
    #[case(Some("sarcastic"), Tone::Professional)]
    #[case(Some(""), Tone::Professional)]
    #[case(Some(" friendly"), Tone::Professional)]
    #[case(None, Tone::Professional)]
    fn resolve_is_case_insensitive_with_fallback(#[case] raw: Option<&str>, #[case] want: Tone) {
        assert_eq!(Tone::resolve(raw), want);
    }

    #[test]
    fn unknown_tone_uses_professional_instruction() {
        let table = ToneTemplates::builtin();
        let (_, professional) = table.select(Some("professional"));
        let (tone, fallback) = table.select(Some("pirate"));
        assert_eq!(tone, Tone::Professional);
        assert_eq!(fallback, professional);
        assert_eq!(
            fallback,
            "Rewrite this message to sound professional and respectful."
        );
    }

    #[test]
    fn builtin_covers_every_tone() {
        let table = ToneTemplates::builtin();
        assert_eq!(
            table.names(),
            vec![
                "professional",
                "friendly",
                "relatable",
                "funny",
                "strict",
                "concise",
                "supportive"
            ]
        );
        for tone in Tone::ALL {
            assert!(table.instruction(tone).starts_with("Rewrite this message"));
        }
    }

    #[test]
    fn user_message_layout() {
        assert_eq!(
            build_user_message("Be nice.", "hey you"),
            "Be nice.\n\nOriginal Message:\nhey you"
        );
    }

    #[test]
    fn overrides_replace_only_named_tones() {
        let overrides: ToneOverrides = serde_json::from_str(
            r#"{ "tones": { "funny": "Make it a pun.", "strict": "   " } }"#,
        )
        .unwrap();
        let table = ToneTemplates::with_overrides(&overrides);
        assert_eq!(table.instruction(Tone::Funny), "Make it a pun.");
        assert_eq!(
            table.instruction(Tone::Strict),
            ToneTemplates::builtin().instruction(Tone::Strict)
        );
        assert_eq!(table.names().len(), Tone::ALL.len());
    }

    #[test]
    fn overrides_reject_unknown_tones() {
        let parsed = serde_json::from_str::<ToneOverrides>(r#"{ "tones": { "pirate": "Arr." } }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn load_from_missing_file_reports_path() {
        let err = ToneTemplates::load_from_file("/nonexistent/tones.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tones.json"));
    }
}
