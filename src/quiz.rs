//! Interactive quiz scoring.

use crate::package::LearningPackage;
use serde::Serialize;

/// Result of a submitted attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
}

impl std::fmt::Display for QuizScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.correct, self.total)
    }
}

/// One learner's answers to a package's quiz.
///
/// Answers can be changed freely until [`submit`](Self::submit); afterwards
/// the attempt is frozen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAttempt {
    answers: Vec<Option<usize>>,
    option_counts: Vec<usize>,
    submitted: bool,
}

impl QuizAttempt {
    /// Start an attempt with every question unanswered.
    pub fn new(package: &LearningPackage) -> Self {
        Self {
            answers: vec![None; package.quiz.len()],
            option_counts: package.quiz.iter().map(|q| q.options.len()).collect(),
            submitted: false,
        }
    }

    /// Choose option `option` for question `question`.
    ///
    /// Returns `false` (and changes nothing) after submission or when the
    /// question or option does not exist.
    pub fn select(&mut self, question: usize, option: usize) -> bool {
        if self.submitted || self.option_counts.get(question).map_or(true, |&n| option >= n) {
            return false;
        }
        self.answers[question] = Some(option);
        true
    }

    pub fn answer(&self, question: usize) -> Option<usize> {
        self.answers.get(question).copied().flatten()
    }

    pub fn answered(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    /// Whether every question has an answer. Front-ends only offer
    /// submission once this holds.
    pub fn is_complete(&self) -> bool {
        self.answers.iter().all(Option::is_some)
    }

    pub fn submit(&mut self) {
        self.submitted = true;
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Count answers equal to the question's correct index.
    pub fn score(&self, package: &LearningPackage) -> QuizScore {
        let correct = package
            .quiz
            .iter()
            .zip(&self.answers)
            .filter(|(q, a)| matches!(a, Some(choice) if q.is_correct(*choice)))
            .count();
        QuizScore {
            correct,
            total: package.quiz.len(),
        }
    }
}
