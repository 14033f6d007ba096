//! Built-in question bank.
//!
//! Used for practice quizzes and as the fallback when quiz generation is
//! unavailable. Question ids are the 1-based position in the bank.

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::model::Difficulty::{Easy, Hard, Medium};
use crate::model::TopicCategory::{
    Algebra, Arithmetic, Fractions, Geometry, Measurement, Statistics,
};
use crate::model::{Difficulty, Question, QuestionId, TopicCategory};

struct BankEntry {
    prompt: &'static str,
    options: &'static [&'static str],
    correct: usize,
    difficulty: Difficulty,
    category: TopicCategory,
    explanation: &'static str,
}

const fn entry(
    prompt: &'static str,
    options: &'static [&'static str],
    correct: usize,
    difficulty: Difficulty,
    category: TopicCategory,
    explanation: &'static str,
) -> BankEntry {
    BankEntry {
        prompt,
        options,
        correct,
        difficulty,
        category,
        explanation,
    }
}

#[rustfmt::skip]
const BANK: &[BankEntry] = &[
    entry("What is 7 + 5?", &["11", "12", "13", "14"], 1, Easy, Arithmetic, "7 + 5 = 12."),
    entry("What is 15 - 8?", &["6", "7", "8", "9"], 1, Easy, Arithmetic, "15 - 8 = 7."),
    entry("What is 6 x 4?", &["20", "22", "24", "26"], 2, Easy, Arithmetic, "6 groups of 4 make 24."),
    entry("What is 36 / 6?", &["5", "6", "7", "8"], 1, Easy, Arithmetic, "6 x 6 = 36."),
    entry("What is 9 x 8?", &["63", "64", "72", "81"], 2, Medium, Arithmetic, "9 x 8 = 72."),
    entry("What is 144 / 12?", &["11", "12", "13", "14"], 1, Medium, Arithmetic, "12 x 12 = 144."),
    entry("What is 25 x 16?", &["350", "375", "400", "425"], 2, Hard, Arithmetic, "25 x 16 = 25 x 4 x 4 = 400."),
    entry("What is 1,000 - 387?", &["613", "623", "713", "687"], 0, Medium, Arithmetic, "1,000 - 387 = 613."),
    entry("What is 2 + 3 x 4?", &["20", "14", "24", "10"], 1, Hard, Arithmetic, "Multiply first: 3 x 4 = 12, then 2 + 12 = 14."),

    entry("Which fraction equals 1/2?", &["2/3", "3/6", "3/4", "4/6"], 1, Easy, Fractions, "3/6 simplifies to 1/2."),
    entry("What is 1/4 + 1/4?", &["1/8", "2/8", "1/2", "1/4"], 2, Easy, Fractions, "Two quarters make one half."),
    entry("What is 2/3 of 12?", &["6", "8", "9", "4"], 1, Medium, Fractions, "12 / 3 = 4, and 4 x 2 = 8."),
    entry("What is 3/4 - 1/8?", &["5/8", "1/2", "2/4", "3/8"], 0, Medium, Fractions, "3/4 = 6/8, and 6/8 - 1/8 = 5/8."),
    entry("What is 2/5 x 5/6?", &["1/3", "10/11", "7/11", "2/6"], 0, Hard, Fractions, "2/5 x 5/6 = 10/30 = 1/3."),
    entry("Which is largest?", &["3/5", "5/8", "2/3", "7/12"], 2, Hard, Fractions, "As decimals: 0.6, 0.625, 0.667, 0.583."),

    entry("How many sides does a hexagon have?", &["5", "6", "7", "8"], 1, Easy, Geometry, "Hex means six."),
    entry("What is the perimeter of a square with side 5?", &["10", "15", "20", "25"], 2, Easy, Geometry, "4 x 5 = 20."),
    entry("What is the area of a 6 by 4 rectangle?", &["10", "20", "24", "28"], 2, Medium, Geometry, "Area = length x width = 24."),
    entry("The angles of a triangle add up to?", &["90", "180", "270", "360"], 1, Medium, Geometry, "Interior angles of any triangle sum to 180 degrees."),
    entry("What is the area of a triangle with base 10 and height 6?", &["60", "30", "16", "36"], 1, Hard, Geometry, "Half of base x height: 10 x 6 / 2 = 30."),

    entry("Solve: x + 7 = 12", &["4", "5", "6", "19"], 1, Easy, Algebra, "Subtract 7 from both sides."),
    entry("Solve: 3x = 21", &["6", "7", "8", "18"], 1, Easy, Algebra, "Divide both sides by 3."),
    entry("Solve: 2x + 3 = 11", &["3", "4", "5", "7"], 1, Medium, Algebra, "2x = 8, so x = 4."),
    entry("If y = 3x - 2, what is y when x = 5?", &["11", "13", "15", "17"], 1, Medium, Algebra, "3 x 5 - 2 = 13."),
    entry("Solve: 5(x - 2) = 3x + 4", &["5", "6", "7", "8"], 2, Hard, Algebra, "5x - 10 = 3x + 4, so 2x = 14 and x = 7."),

    entry("How many centimeters are in a meter?", &["10", "100", "1,000", "60"], 1, Easy, Measurement, "A meter is 100 centimeters."),
    entry("How many minutes are in 2 hours?", &["60", "100", "120", "200"], 2, Easy, Measurement, "2 x 60 = 120."),
    entry("How many grams are in 2.5 kilograms?", &["250", "2,500", "25,000", "25"], 1, Medium, Measurement, "1 kg = 1,000 g."),
    entry("A car travels 180 km in 3 hours. What is its average speed in km/h?", &["50", "60", "70", "90"], 1, Hard, Measurement, "180 / 3 = 60."),

    entry("What is the mode of 2, 3, 3, 5, 7?", &["2", "3", "5", "7"], 1, Easy, Statistics, "3 appears most often."),
    entry("What is the mean of 4, 6, 8?", &["5", "6", "7", "8"], 1, Medium, Statistics, "(4 + 6 + 8) / 3 = 6."),
    entry("What is the median of 9, 1, 5, 3, 7?", &["3", "5", "7", "9"], 1, Medium, Statistics, "Sorted: 1, 3, 5, 7, 9; the middle value is 5."),
    entry("A fair die is rolled. What is the probability of an even number?", &["1/6", "1/3", "1/2", "2/3"], 2, Hard, Statistics, "3 of the 6 faces are even."),
];

/// Counts of bank questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionStats {
    pub total: usize,
    pub by_difficulty: BTreeMap<Difficulty, usize>,
    pub by_category: BTreeMap<TopicCategory, usize>,
}

fn to_question(index: usize, e: &BankEntry) -> Question {
    Question::from_static(
        QuestionId::new(index as u64 + 1),
        e.prompt,
        e.options,
        e.correct,
        e.difficulty,
        e.category,
        e.explanation,
    )
}

fn sample<R, F>(count: usize, rng: &mut R, keep: F) -> Vec<Question>
where
    R: Rng + ?Sized,
    F: Fn(&BankEntry) -> bool,
{
    if count == 0 {
        return Vec::new();
    }
    let mut matching: Vec<(usize, &BankEntry)> =
        BANK.iter().enumerate().filter(|(_, e)| keep(e)).collect();
    matching.shuffle(rng);
    matching.truncate(count);
    matching.into_iter().map(|(i, e)| to_question(i, e)).collect()
}

/// Up to `count` distinct questions of the given difficulty (`None` = any).
///
/// Returns every matching question, shuffled, when fewer than `count` exist.
pub fn get_random_questions<R: Rng + ?Sized>(
    count: usize,
    difficulty: Option<Difficulty>,
    rng: &mut R,
) -> Vec<Question> {
    sample(count, rng, |e| difficulty.is_none_or(|d| e.difficulty == d))
}

/// Like [`get_random_questions`], restricted to one category.
pub fn get_random_questions_in<R: Rng + ?Sized>(
    category: TopicCategory,
    count: usize,
    difficulty: Option<Difficulty>,
    rng: &mut R,
) -> Vec<Question> {
    sample(count, rng, |e| {
        e.category == category && difficulty.is_none_or(|d| e.difficulty == d)
    })
}

#[must_use]
pub fn get_question_stats() -> QuestionStats {
    let mut by_difficulty = BTreeMap::new();
    let mut by_category = BTreeMap::new();
    for e in BANK {
        *by_difficulty.entry(e.difficulty).or_insert(0) += 1;
        *by_category.entry(e.category).or_insert(0) += 1;
    }
    QuestionStats {
        total: BANK.len(),
        by_difficulty,
        by_category,
    }
}
