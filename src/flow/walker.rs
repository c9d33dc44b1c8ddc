//! Question walker — presenter-side state for one question set.
//!
//! Shows exactly one question at a time in sequence order, blocks
//! advancement past a required question until a non-empty answer is
//! entered, allows skipping non-required questions, and allows unrestricted
//! backward navigation that preserves entered answers for re-display.

use crate::error::FlowError;
use crate::question::{AnswerSet, Question};

/// Outcome of answering or skipping the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Moved to the next question.
    Advanced,
    /// The last question is satisfied; call `finish()`.
    Complete,
}

/// Walks an ordered question list, collecting an `AnswerSet`.
#[derive(Debug)]
pub struct QuestionWalker {
    questions: Vec<Question>,
    answers: AnswerSet,
    index: usize,
}

impl QuestionWalker {
    pub fn new(questions: Vec<Question>) -> Self {
        Self::with_answers(questions, AnswerSet::new())
    }

    /// Walker pre-seeded with prior answers ("edit answers" regression).
    pub fn with_answers(questions: Vec<Question>, answers: AnswerSet) -> Self {
        Self {
            questions,
            answers,
            index: 0,
        }
    }

    /// The question currently shown, or `None` once past the last one.
    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.index)
    }

    /// The previously entered answer for the current question, for
    /// re-display after backward navigation.
    pub fn current_answer(&self) -> Option<&str> {
        self.current().and_then(|q| self.answers.get(&q.id))
    }

    /// 1-based position and total, for progress display.
    pub fn position(&self) -> (usize, usize) {
        (
            (self.index + 1).min(self.questions.len().max(1)),
            self.questions.len(),
        )
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.questions.len()
    }

    /// Submit an answer for the current question and advance.
    ///
    /// An empty answer on a required question is rejected; an empty answer
    /// on a non-required one is treated as a skip and records nothing.
    pub fn answer(&mut self, value: &str) -> Result<Progress, FlowError> {
        let Some(question) = self.current() else {
            return Ok(Progress::Complete);
        };

        let trimmed = value.trim();
        if trimmed.is_empty() {
            if question.required {
                return Err(FlowError::AnswerRequired {
                    id: question.id.clone(),
                });
            }
            return self.skip();
        }

        // Select questions only accept one of their listed options.
        if let Some(choices) = &question.choices {
            if !choices.iter().any(|c| c == trimmed) {
                return Err(FlowError::InvalidChoice {
                    id: question.id.clone(),
                    value: trimmed.to_string(),
                });
            }
        }

        self.answers.insert(question.id.clone(), trimmed);
        self.index += 1;
        Ok(self.progress())
    }

    /// Skip the current question without recording an answer. Only allowed
    /// on non-required questions.
    pub fn skip(&mut self) -> Result<Progress, FlowError> {
        let Some(question) = self.current() else {
            return Ok(Progress::Complete);
        };

        if question.required {
            return Err(FlowError::SkipRequired {
                id: question.id.clone(),
            });
        }

        self.index += 1;
        Ok(self.progress())
    }

    /// Navigate back one question. Entered answers are preserved. No-op at
    /// the first question.
    pub fn back(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    /// Consume the walker and hand over the collected answers. Errors if
    /// questions remain unsatisfied.
    pub fn finish(self) -> Result<AnswerSet, FlowError> {
        if !self.is_complete() {
            return Err(FlowError::WalkIncomplete {
                remaining: self.questions.len() - self.index,
            });
        }
        Ok(self.answers)
    }

    fn progress(&self) -> Progress {
        if self.is_complete() {
            Progress::Complete
        } else {
            Progress::Advanced
        }
    }
}
