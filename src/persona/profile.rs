//! Tone and vocabulary definitions.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::events::EventContext;

/// Closed tone set. Unknown override strings fall back to the companion's
/// archetype default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Warm,
    Direct,
}

impl Tone {
    /// Parse a tone label, accepting only the closed set.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "warm" => Some(Tone::Warm),
            "direct" => Some(Tone::Direct),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Tone::Warm => "warm",
            Tone::Direct => "direct",
        };
        write!(f, "{s}")
    }
}

/// Candidate strings for each semantic slot used by reaction templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyProfile {
    pub greetings: Vec<String>,
    pub affirmations: Vec<String>,
    pub focus_cues: Vec<String>,
    pub closers: Vec<String>,
}

fn vocab(slots: [&[&str]; 4]) -> VocabularyProfile {
    let [greetings, affirmations, focus_cues, closers] = slots;
    let own = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
    VocabularyProfile {
        greetings: own(greetings),
        affirmations: own(affirmations),
        focus_cues: own(focus_cues),
        closers: own(closers),
    }
}

static WARM_VOCABULARY: Lazy<VocabularyProfile> = Lazy::new(|| {
    vocab([
        &["Hey, good to see you", "Welcome back", "There you are", "Hi again"],
        &["That was lovely work", "You did really well", "Nicely done"],
        &["Take it one step at a time", "Let's ease into it", "No rush today"],
        &["I'm right here with you", "Glad you're here", "Let's make it a good one"],
    ])
});

static DIRECT_VOCABULARY: Lazy<VocabularyProfile> = Lazy::new(|| {
    vocab([
        &["Back at it", "Session open", "Let's go", "Ready when you are"],
        &["Solid run", "Clean finish", "Good execution"],
        &["Pick a target and start", "First task, then the rest", "Focus up"],
        &["On to the next", "Keep the pace", "Make it count"],
    ])
});

/// Vocabulary for a tone.
pub fn vocabulary_for(tone: Tone) -> &'static VocabularyProfile {
    match tone {
        Tone::Warm => &WARM_VOCABULARY,
        Tone::Direct => &DIRECT_VOCABULARY,
    }
}

/// Default tone for a companion archetype. Unknown archetypes read warm.
pub fn default_tone_for(archetype: &str) -> Tone {
    match archetype {
        "coach" | "strategist" | "sentinel" => Tone::Direct,
        _ => Tone::Warm,
    }
}

/// Resolve the effective tone from context: a valid portable-preference
/// override wins, otherwise the active companion's archetype default.
pub fn resolve_tone(context: &EventContext) -> Tone {
    if let Some(label) = context.portable.tone.as_deref() {
        if let Some(tone) = Tone::parse(label) {
            return tone;
        }
    }
    context
        .companion
        .as_ref()
        .map(|c| default_tone_for(&c.archetype))
        .unwrap_or(Tone::Warm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ActiveCompanion;

    fn context(archetype: &str, tone: Option<&str>) -> EventContext {
        let mut ctx = EventContext::default();
        ctx.companion = Some(ActiveCompanion {
            id: "c1".into(),
            name: "Nova".into(),
            archetype: archetype.into(),
        });
        ctx.portable.tone = tone.map(str::to_string);
        ctx
    }

    #[test]
    fn test_override_wins_when_valid() {
        assert_eq!(resolve_tone(&context("coach", Some("warm"))), Tone::Warm);
        assert_eq!(resolve_tone(&context("dreamer", Some("direct"))), Tone::Direct);
    }

    #[test]
    fn test_invalid_override_falls_back_to_archetype() {
        assert_eq!(resolve_tone(&context("coach", Some("sassy"))), Tone::Direct);
        assert_eq!(resolve_tone(&context("dreamer", Some("sassy"))), Tone::Warm);
    }

    #[test]
    fn test_no_companion_defaults_warm() {
        assert_eq!(resolve_tone(&EventContext::default()), Tone::Warm);
    }

    #[test]
    fn test_vocabularies_have_candidates_per_slot() {
        for tone in [Tone::Warm, Tone::Direct] {
            let v = vocabulary_for(tone);
            assert!(v.greetings.len() >= 2);
            assert!(!v.affirmations.is_empty());
            assert!(!v.focus_cues.is_empty());
            assert!(!v.closers.is_empty());
        }
    }
}
