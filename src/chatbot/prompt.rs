//! Fixed system instructions and the request sent to the model.

use std::fmt;

/// Persona, scope restriction, refusal text and the exact output template.
pub const SYSTEM_PROMPT: &str = "You are a Jamaica crowd analysis expert. ONLY respond to questions about \
crowd levels, busyness, or how \"packed\" Jamaican locations will be.

If the user asks about anything other than crowd analysis (weather alone, \
directions, general info, etc.), respond with: \"I only provide crowd \
level predictions for Jamaican locations. Ask me something like 'Will Ocho \
Rios be packed this weekend?'\"

For valid crowd analysis queries, analyze and predict crowd levels for \
Jamaican towns based on your knowledge of:

- Weather conditions and seasonal patterns
- Cruise ship schedules and maritime traffic
- Major events, festivals, concerts, and entertainment
- Jamaican holidays and observances
- Tourism patterns and peak seasons
- Local market days and economic factors
- Infrastructure and transportation patterns

Provide a crowd analysis in this EXACT format:

🏙️ [TOWN NAME] Crowd Forecast - [DATE]

📊 Crowd Level: [Very High/High/Moderate/Low/Very Low]

🔍 Key Factors:
• [Factor 1 - impact level]
• [Factor 2 - impact level]  
• [Factor 3 - impact level]

⏰ Best Times: [Specific time recommendations]

🎯 Avoid: [Areas/times to avoid if crowded]

☁️ Weather Impact: [Brief weather influence note]

📈 Confidence: [X/10]

Keep responses under 280 characters total. Focus on the specific town and \
date mentioned in the user's query.";

/// System instructions paired with one user question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    system: &'static str,
    user: String,
}

impl PromptRequest {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            system: SYSTEM_PROMPT,
            user: user.into(),
        }
    }

    pub fn system(&self) -> &str {
        self.system
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

/// Crowd levels the template allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrowdLevel {
    VeryHigh,
    High,
    Moderate,
    Low,
    VeryLow,
}

impl CrowdLevel {
    pub const ALL: [CrowdLevel; 5] = [
        CrowdLevel::VeryHigh,
        CrowdLevel::High,
        CrowdLevel::Moderate,
        CrowdLevel::Low,
        CrowdLevel::VeryLow,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CrowdLevel::VeryHigh => "Very High",
            CrowdLevel::High => "High",
            CrowdLevel::Moderate => "Moderate",
            CrowdLevel::Low => "Low",
            CrowdLevel::VeryLow => "Very Low",
        }
    }

    /// Read the level from a `Crowd Level:` line of a forecast.
    pub fn find_in(forecast: &str) -> Option<CrowdLevel> {
        let line = forecast
            .lines()
            .find_map(|l| l.split_once("Crowd Level:").map(|(_, rest)| rest.trim()))?;
        let line = line.trim_matches(|c: char| c == '*' || c == '[' || c == ']' || c.is_whitespace());
        // Two-word labels first so "Very High" is not read as "High"
        let mut levels = Self::ALL;
        levels.sort_by_key(|level| std::cmp::Reverse(level.label().len()));
        levels.into_iter().find(|level| {
            line.get(..level.label().len())
                .is_some_and(|head| head.eq_ignore_ascii_case(level.label()))
        })
    }
}

impl fmt::Display for CrowdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_pairs_fixed_prompt_with_question() {
        let request = PromptRequest::new("Will Negril be packed this weekend?");
        assert_eq!(request.system(), SYSTEM_PROMPT);
        assert_eq!(request.user(), "Will Negril be packed this weekend?");
    }

    #[test]
    fn test_prompt_template_sections() {
        for section in [
            "Crowd Forecast - [DATE]",
            "📊 Crowd Level: [Very High/High/Moderate/Low/Very Low]",
            "🔍 Key Factors:",
            "⏰ Best Times:",
            "🎯 Avoid:",
            "☁️ Weather Impact:",
            "📈 Confidence: [X/10]",
        ] {
            assert!(SYSTEM_PROMPT.contains(section), "missing {section}");
        }
        assert_eq!(SYSTEM_PROMPT.matches("• [Factor").count(), 3);
    }

    #[test]
    fn test_template_factor_lines_exact() {
        let factors: Vec<&str> = SYSTEM_PROMPT.lines().filter(|l| l.starts_with("• [Factor")).collect();
        assert_eq!(
            factors,
            vec![
                "• [Factor 1 - impact level]",
                "• [Factor 2 - impact level]  ",
                "• [Factor 3 - impact level]",
            ]
        );
    }

    #[test]
    fn test_prompt_has_refusal_template() {
        assert!(SYSTEM_PROMPT.contains("I only provide crowd level predictions for Jamaican locations."));
        assert!(SYSTEM_PROMPT.starts_with("You are a Jamaica crowd analysis expert."));
    }

    #[test]
    fn test_every_label_listed_in_prompt() {
        for level in CrowdLevel::ALL {
            assert!(SYSTEM_PROMPT.contains(level.label()));
        }
    }

    #[test]
    fn test_find_level() {
        let forecast = "🏙️ Ocho Rios Crowd Forecast - Saturday\n\n📊 Crowd Level: Very High\n\n🔍 Key Factors:";
        assert_eq!(CrowdLevel::find_in(forecast), Some(CrowdLevel::VeryHigh));

        assert_eq!(CrowdLevel::find_in("📊 Crowd Level: High"), Some(CrowdLevel::High));
        assert_eq!(CrowdLevel::find_in("Crowd Level: **moderate**"), Some(CrowdLevel::Moderate));
        assert_eq!(CrowdLevel::find_in("Crowd Level: [Very Low]"), Some(CrowdLevel::VeryLow));
        assert_eq!(CrowdLevel::find_in("Crowd Level: Low (quiet week)"), Some(CrowdLevel::Low));
    }

    #[test]
    fn test_find_level_missing() {
        assert_eq!(CrowdLevel::find_in("I only provide crowd level predictions."), None);
        assert_eq!(CrowdLevel::find_in("Crowd Level: unknown"), None);
    }
}
