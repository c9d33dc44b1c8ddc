//! Static firmographic question catalog.
//!
//! Company-profile questions asked after signup, independent of the user's
//! stated problem. This list is canonical: it is never persisted with flow
//! state and is re-fetched on resume instead.

use super::model::Question;

/// The fixed firmographic question list.
pub fn firmographic_catalog() -> Vec<Question> {
    vec![
        Question::numeric(
            "team_size",
            "How many team members will be using this solution?",
            "This helps us recommend vendors that scale to your team size and provide accurate pricing.",
            true,
        ),
        Question::single_select(
            "industry",
            "What industry is your company in?",
            "Industry affects compliance requirements and vendor expertise in your sector.",
            &[
                "Technology/SaaS",
                "Healthcare",
                "Finance/Banking",
                "Retail/E-commerce",
                "Manufacturing",
                "Professional Services",
                "Education",
                "Government",
                "Other",
            ],
            false,
        ),
        Question::single_select(
            "company_size",
            "What's your company size?",
            "Company size helps match you with vendors who specialize in businesses of your scale.",
            &[
                "Just me",
                "2-10 employees",
                "11-50 employees",
                "51-200 employees",
                "201-500 employees",
                "500+ employees",
            ],
            false,
        ),
        Question::single_select(
            "budget",
            "What's your budget range for this solution?",
            "Budget helps us filter to vendors that fit your financial constraints.",
            &[
                "Under $5K/year",
                "$5K-$20K/year",
                "$20K-$50K/year",
                "$50K-$100K/year",
                "Over $100K/year",
                "Not sure yet",
            ],
            false,
        ),
        Question::single_select(
            "timeline",
            "When do you need this solution in place?",
            "Timeline affects which vendors we recommend based on implementation speed.",
            &[
                "Immediately (within 1 month)",
                "1-3 months",
                "3-6 months",
                "6+ months",
                "No rush",
            ],
            false,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::model::QuestionKind;

    #[test]
    fn catalog_has_expected_shape() {
        let catalog = firmographic_catalog();
        let ids: Vec<&str> = catalog.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(
            ids,
            ["team_size", "industry", "company_size", "budget", "timeline"]
        );
        for q in &catalog {
            assert!(q.is_valid(), "invalid catalog question {}", q.id);
        }
    }

    #[test]
    fn only_team_size_is_required() {
        for q in firmographic_catalog() {
            assert_eq!(q.required, q.id == "team_size", "required mismatch for {}", q.id);
        }
    }

    #[test]
    fn selects_carry_choices() {
        for q in firmographic_catalog() {
            if q.kind == QuestionKind::SingleSelect {
                assert!(q.choices.as_ref().is_some_and(|c| c.len() >= 5));
            }
        }
    }

    #[test]
    fn catalog_is_deterministic() {
        assert_eq!(firmographic_catalog(), firmographic_catalog());
    }
}
