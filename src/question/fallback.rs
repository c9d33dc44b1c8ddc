//! Deterministic fallback question sets.
//!
//! Used whenever the generation service is unavailable or misconfigured.
//! Selection is keyed on case-insensitive substring matching against the
//! problem statement, so the same input always yields the same list and the
//! user is never blocked on an upstream failure.

use super::model::Question;

/// Pick the fallback set for a problem statement.
pub fn fallback_questions(problem: &str) -> Vec<Question> {
    let lower = problem.to_lowercase();

    if lower.contains("crm") || lower.contains("sales") {
        return sales_questions();
    }

    if lower.contains("support") || lower.contains("ticket") || lower.contains("helpdesk") {
        return support_questions();
    }

    generic_questions()
}

fn sales_questions() -> Vec<Question> {
    vec![
        Question::free_text(
            "sales_process",
            "Walk me through your current sales process. Where does it break down?",
            "Understanding your current workflow helps us identify exactly what features you need in a new CRM.",
            true,
        ),
        Question::numeric(
            "team_size",
            "How many sales reps will be using this CRM?",
            "Team size affects pricing and which CRM features you'll actually need.",
            true,
        ),
        Question::free_text(
            "current_system",
            "What are you using now to track sales, and why isn't it working?",
            "Knowing what's not working prevents us from recommending similar solutions.",
            false,
        ),
        Question::free_text(
            "must_haves",
            "What features are absolutely critical for your team?",
            "Must-haves help us filter to vendors that meet your core needs.",
            true,
        ),
        Question::boolean(
            "integration_needs",
            "Do you need this to integrate with your email, calendar, or other tools?",
            "Integration requirements significantly narrow down your options.",
            false,
        ),
    ]
}

fn support_questions() -> Vec<Question> {
    vec![
        Question::free_text(
            "volume_trend",
            "Is your support volume growing, or has it been steady?",
            "Growth trends help us recommend solutions that can scale with you.",
            true,
        ),
        Question::free_text(
            "customer_impact",
            "What happens when customers wait too long? Are you seeing churn or complaints?",
            "Understanding business impact helps us prioritize the right features.",
            true,
        ),
        Question::free_text(
            "current_process",
            "How does your team manage tickets today? What's breaking down?",
            "Knowing current pain points helps us avoid recommending similar systems.",
            true,
        ),
        Question::numeric(
            "team_size",
            "How many support agents are handling tickets?",
            "Team size affects vendor selection and pricing models.",
            true,
        ),
        Question::free_text(
            "success_vision",
            "What would success look like in 6 months?",
            "Your vision helps us match you with the right type of solution.",
            false,
        ),
    ]
}

fn generic_questions() -> Vec<Question> {
    vec![
        Question::free_text(
            "problem_scope",
            "Help me understand the scope of this challenge. How long has this been an issue?",
            "Knowing the history helps us gauge urgency and understand what's changed.",
            true,
        ),
        Question::free_text(
            "impact",
            "What's the impact on your business? Revenue, costs, team productivity?",
            "Business impact helps us prioritize features and justify investments.",
            true,
        ),
        Question::free_text(
            "current_state",
            "What are you doing today to address this, and why isn't it working?",
            "Understanding current approaches helps us avoid similar solutions.",
            true,
        ),
        Question::free_text(
            "ideal_solution",
            "If you could wave a magic wand, what would be different in 6 months?",
            "Your ideal outcome helps us find solutions that match your vision.",
            true,
        ),
        Question::free_text(
            "must_haves",
            "Any must-have features or absolute deal-breakers?",
            "Critical requirements help us filter vendors effectively.",
            false,
        ),
    ]
}
