//! Plain-text rendering for the terminal front end.
//!
//! Quiz content goes to stdout; transient progress (spinner, streamed
//! partials) goes to stderr so `generate --json` output stays clean.

use std::io::Write as _;

use quiz_core::model::{Question, QuestionSet, QuizStats, QuizSummary};
use quiz_core::partial::PartialQuestionSet;
use quiz_core::session::{AnswerOutcome, AnswerRecord, OptionMark};
use services::{GenerationError, QuizCompletion, QuizError, SessionSnapshot};

fn label(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .and_then(|i| b'A'.checked_add(i))
        .map_or('?', char::from)
}

pub fn question(snapshot: &SessionSnapshot, question: &Question) {
    println!();
    println!(
        "Question {} / {}   (score {})",
        snapshot.position(),
        snapshot.total,
        snapshot.score
    );
    println!("{}", question.text());
    for (i, option) in question.options().iter().enumerate() {
        println!("  {}) {option}", label(i));
    }
}

pub fn prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

pub fn invalid_choice(options: usize) {
    println!(
        "Pick one of the listed options (A-{} or 1-{options}), or q to quit.",
        label(options.saturating_sub(1))
    );
}

pub fn feedback(question: &Question, outcome: AnswerOutcome) {
    for (i, option) in question.options().iter().enumerate() {
        let mark = match outcome.mark(i) {
            OptionMark::Correct => "[ok]",
            OptionMark::WrongChoice => "[x] ",
            OptionMark::Neutral => "    ",
        };
        println!("  {mark} {}) {option}", label(i));
    }
    if outcome.is_correct() {
        println!("Correct!");
    } else {
        println!("Incorrect. The right answer is {}.", label(question.correct_answer()));
    }
}

fn score_line(summary: &QuizSummary) {
    println!(
        "You scored {} / {} ({}%).{}",
        summary.score,
        summary.total,
        summary.percentage,
        if summary.is_perfect() { " Perfect!" } else { "" }
    );
}

pub fn summary(completion: &QuizCompletion) {
    println!();
    println!("Quiz complete.");
    score_line(&completion.summary);
    stats(&completion.stats);
}

/// Score shown when the result could not be saved.
pub fn unsaved_summary(summary: &QuizSummary) {
    println!();
    println!("Quiz complete (not saved).");
    score_line(summary);
}

pub fn review(questions: &QuestionSet, answers: &[AnswerRecord]) {
    println!();
    println!("Review:");
    for record in answers {
        let Some(question) = questions.get(record.question) else {
            continue;
        };
        let verdict = if record.correct { "correct" } else { "wrong" };
        println!("{}. {} ({verdict})", record.question + 1, question.text());
        if !record.correct {
            if let Some(chosen) = question.options().get(record.chosen) {
                println!("   Your answer: {chosen}");
            }
        }
        println!("   Answer: {}", question.correct_option());
        if let Some(explanation) = question.explanation() {
            println!("   {explanation}");
        }
    }
}

pub fn stats(stats: &QuizStats) {
    if stats.quizzes_taken == 0 {
        println!("No quizzes completed yet.");
    } else {
        println!(
            "Quizzes taken: {}   Average score: {}%",
            stats.quizzes_taken, stats.average_score
        );
    }
}

/// Explain a failure with guidance specific to its class.
pub fn error(err: &QuizError) {
    println!();
    match err {
        QuizError::Generation(GenerationError::Disabled) => {
            println!("Question generation is not configured.");
            println!("Set QUIZ_AI_API_KEY or run with --offline.");
        }
        QuizError::Generation(GenerationError::HttpStatus(status)) => {
            println!("The question service answered with {status}.");
            println!("Check the API key and model settings, then try again.");
        }
        QuizError::Generation(err) => {
            println!("Could not get questions from the generator: {err}");
            println!("Check your connection, then try again.");
        }
        QuizError::Validation(err) => {
            println!("The generated questions were not usable: {err}");
            println!("Asking again usually produces a valid set.");
        }
        QuizError::EmptyQuestionSet(_) => {
            println!("No questions were returned.");
        }
        QuizError::Storage(err) => {
            println!("Could not access saved progress: {err}");
        }
        other => println!("Something went wrong: {other}"),
    }
}

/// Print a set with the correct answers marked, for `generate`.
pub fn question_set(set: &QuestionSet) {
    for (n, question) in set.iter().enumerate() {
        println!("{}. {}", n + 1, question.text());
        for (i, option) in question.options().iter().enumerate() {
            let mark = if question.is_correct(i) { '*' } else { ' ' };
            println!("  {mark} {}) {option}", label(i));
        }
        if let Some(explanation) = question.explanation() {
            println!("    {explanation}");
        }
        println!();
    }
}

pub fn partial_progress(partial: &PartialQuestionSet) {
    let latest = partial
        .questions
        .last()
        .and_then(|q| q.text.as_deref())
        .unwrap_or("");
    let mut preview: String = latest.chars().take(60).collect();
    if latest.chars().count() > 60 {
        preview.push_str("...");
    }
    eprint!("\r\x1b[2KReceiving question {}: {preview}", partial.len());
    let _ = std::io::stderr().flush();
}

pub fn spinner_frame(frame: &str, text: &str) {
    eprint!("\r\x1b[2K{frame} {text}");
    let _ = std::io::stderr().flush();
}

pub fn clear_line() {
    eprint!("\r\x1b[2K");
    let _ = std::io::stderr().flush();
}
