//! Mission prompt assembly.
//!
//! Renders a generation request (who the user is, what they like, what
//! they already did) into the text prompt sent to the model, including the
//! JSON contract the reply has to follow.

use mission::{MissionNode, MissionPeriodType};
use std::collections::BTreeMap;

use crate::config::PromptLimits;

/// Past-missions section for users without any history.
pub const NO_PAST_MISSIONS: &str = "I have not completed any missions yet.";

/// Period-specific wording of the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodPhrasing {
    /// When the missions happen ("this week")
    pub period_phrase: String,
    /// Extra instruction on scope and detail
    pub period_emphasis: String,
    /// Adjective for the expected impact
    pub impact_qualifier: String,
    pub title_word_limit: usize,
    pub description_word_limit: usize,
}

impl PeriodPhrasing {
    /// Wording for a period type.
    pub fn for_period(period: MissionPeriodType, limits: &PromptLimits) -> Self {
        let (period_phrase, period_emphasis, impact_qualifier) = match period {
            MissionPeriodType::Weekly => (
                "this week",
                "Keep every mission brief and easy to finish within a single week. \
                 Scope each one to an impact I can see by the end of the week.",
                "small but measurable",
            ),
            MissionPeriodType::Ongoing => (
                "over the coming months",
                "These are longer-term commitments. Describe each mission in detail, \
                 including roughly how long it should take and how I will know it is done.",
                "lasting",
            ),
        };

        Self {
            period_phrase: period_phrase.to_string(),
            period_emphasis: period_emphasis.to_string(),
            impact_qualifier: impact_qualifier.to_string(),
            title_word_limit: limits.title_words,
            description_word_limit: limits.description_words,
        }
    }
}

/// Everything a mission prompt is rendered from.
#[derive(Debug, Clone)]
pub struct MissionPrompt {
    /// Number of missions requested
    pub count: usize,
    /// Facts about the user, rendered as `- key: value`
    pub personal_info: BTreeMap<String, String>,
    pub interests: Vec<String>,
    /// Already rendered mission blocks, see [`PromptBuilder::past_missions_as_strings`]
    pub past_missions: Vec<String>,
    pub phrasing: PeriodPhrasing,
}

/// Builds mission prompts.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Render the mission-generation prompt.
    pub fn build_mission_prompt(request: &MissionPrompt) -> String {
        let phrasing = &request.phrasing;
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "Your goal is to suggest {} missions for me to do {} to help the environment and reduce global warming.\n",
            request.count, phrasing.period_phrase
        ));
        prompt.push_str(&format!(
            "Each mission should have a {} impact and be personalized to my personal information and interests listed below.\n",
            phrasing.impact_qualifier
        ));
        prompt.push_str(&format!("{}\n\n", phrasing.period_emphasis));

        prompt.push_str("Personal information:\n");
        for (key, value) in &request.personal_info {
            prompt.push_str(&format!("- {}: {}\n", key, value));
        }

        prompt.push_str("\nMy interests:\n");
        for interest in &request.interests {
            prompt.push_str(&format!("- {}\n", interest));
        }

        prompt.push_str("\nMissions I have already done:\n");
        prompt.push_str(&request.past_missions.join("\n"));
        prompt.push_str("\n\n");

        prompt.push_str("These missions ideally should (in one or a few ways):\n");
        prompt.push_str("- Be clear enough for me to keep track of my progress with.\n");
        prompt.push_str("- Relate to my occupation.\n");
        prompt.push_str("- Relate to environmental problems that my location is known to have.\n");
        prompt.push_str("- Relate to me personally.\n");
        prompt.push_str("- Not repeat missions I have already done.\n\n");

        prompt.push_str("Some hints for you about the steps to take:\n");
        prompt.push_str("1. Do an internet search for environmental problems near my location.\n");
        prompt.push_str("2. Determine the environmental problems that I can make an impact in.\n");
        prompt.push_str(
            "3. Devise the missions, each with a clear description of why it is important and relevant to me, and clear steps for me to take.\n\n",
        );

        prompt.push_str("## OUTPUT FORMAT\n\n");
        prompt.push_str(
            "Answer with a JSON array and nothing else. Do not wrap it in a code block and do not add \"```json\".\n",
        );
        prompt.push_str("Each element is an object with exactly these fields:\n");
        prompt.push_str(&format!(
            "- \"title\": string, at most {} words\n",
            phrasing.title_word_limit
        ));
        prompt.push_str(&format!(
            "- \"description\": string, at most {} words, saying why the mission matters and why it fits me\n",
            phrasing.description_word_limit
        ));
        prompt.push_str(&format!(
            "- \"steps\": array of strings, each step at most {} words\n\n",
            phrasing.title_word_limit
        ));
        prompt.push_str("Example:\n");
        prompt.push_str(
            "[{\"title\": \"...\", \"description\": \"...\", \"steps\": [\"...\", \"...\"]}]\n",
        );

        prompt
    }

    /// Render past missions as prompt blocks.
    ///
    /// Each block is `N. title` followed by one `- step title` line per
    /// direct step. Deeper levels are left out to keep the prompt short.
    pub fn past_missions_as_strings(past_missions: &[MissionNode]) -> Vec<String> {
        if past_missions.is_empty() {
            return vec![NO_PAST_MISSIONS.to_string()];
        }

        past_missions
            .iter()
            .enumerate()
            .map(|(i, mission)| {
                let mut block = format!("{}. {}", i + 1, mission.title);
                for step in mission.step_nodes() {
                    block.push_str(&format!("\n- {}", step.title));
                }
                block
            })
            .collect()
    }
}
