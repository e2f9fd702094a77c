use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::QuestionSet;
use services::{
    BankQuestionSource, LlmQuestionSource, QuizError, QuizLoopService, QuizSessionService,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::render;

const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

/// Where questions come from for this run.
pub enum QuestionLoader {
    Llm {
        source: Arc<LlmQuestionSource>,
        stream: bool,
    },
    Bank(Arc<BankQuestionSource>),
}

impl QuestionLoader {
    /// Fetch a validated set, showing progress while waiting.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` when generation fails or the payload is rejected.
    pub async fn load(
        &self,
        service: &QuizLoopService,
        count: u32,
    ) -> Result<QuestionSet, QuizError> {
        match self {
            Self::Llm {
                source,
                stream: true,
            } => {
                let request = service.generation_request(count).await?;
                render::spinner_frame(SPINNER_FRAMES[0], "Generating questions");
                let result = match source.stream(&request).await {
                    Ok(stream) => stream
                        .collect(render::partial_progress)
                        .await
                        .map_err(QuizError::from),
                    Err(err) => Err(err.into()),
                };
                render::clear_line();
                result
            }
            _ => with_spinner("Generating questions", service.generate(count)).await,
        }
    }
}

async fn with_spinner<F: Future>(text: &str, fut: F) -> F::Output {
    tokio::pin!(fut);
    let mut ticker = tokio::time::interval(Duration::from_millis(120));
    let mut frame = 0;
    let output = loop {
        tokio::select! {
            output = &mut fut => break output,
            _ = ticker.tick() => {
                render::spinner_frame(SPINNER_FRAMES[frame % SPINNER_FRAMES.len()], text);
                frame += 1;
            }
        }
    };
    render::clear_line();
    output
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Answer(usize),
    Quit,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NextStep {
    Retry,
    NewQuiz,
    Quit,
}

/// Accepts `1`-based numbers or option letters.
fn parse_choice(input: &str) -> Choice {
    let input = input.trim().to_ascii_lowercase();
    match input.as_str() {
        "q" | "quit" => return Choice::Quit,
        "" => return Choice::Invalid,
        _ => {}
    }
    if let Ok(n) = input.parse::<usize>() {
        return n.checked_sub(1).map_or(Choice::Invalid, Choice::Answer);
    }
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (Some(c @ 'a'..='z'), None) => Choice::Answer(c as usize - 'a' as usize),
        _ => Choice::Invalid,
    }
}

fn parse_next_step(input: &str) -> Option<NextStep> {
    match input.trim().to_ascii_lowercase().as_str() {
        "r" | "retry" => Some(NextStep::Retry),
        "" | "n" | "new" => Some(NextStep::NewQuiz),
        "q" | "quit" => Some(NextStep::Quit),
        _ => None,
    }
}

/// Interactive quiz loop over stdin/stdout.
pub struct QuizApp {
    service: QuizLoopService,
    loader: QuestionLoader,
    count: u32,
    input: Lines<BufReader<Stdin>>,
}

impl QuizApp {
    pub fn new(service: QuizLoopService, loader: QuestionLoader, count: u32) -> Self {
        Self {
            service,
            loader,
            count,
            input: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Play quizzes until the player quits.
    ///
    /// # Errors
    ///
    /// Returns an error if stdin cannot be read or a session cannot be started.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        match self.service.stats().await {
            Ok(stats) => render::stats(&stats),
            Err(err) => render::error(&err),
        }

        loop {
            let questions = match self.loader.load(&self.service, self.count).await {
                Ok(questions) => questions,
                Err(err) => {
                    render::error(&err);
                    if self.confirm("Try again? [Y/n] ").await? {
                        continue;
                    }
                    return Ok(());
                }
            };
            tracing::debug!(
                source = self.service.source_name(),
                questions = questions.len(),
                "starting quiz"
            );

            let mut session = self.service.start(questions)?;
            loop {
                if !self.play_session(&mut session).await? {
                    return Ok(());
                }
                self.complete(&mut session).await?;

                match self.next_step().await? {
                    NextStep::Retry => session.retry(),
                    NextStep::NewQuiz => break,
                    NextStep::Quit => return Ok(()),
                }
            }
        }
    }

    /// Returns `false` if the player quit mid-quiz.
    async fn play_session(&mut self, session: &mut QuizSessionService) -> io::Result<bool> {
        loop {
            let snapshot = session.snapshot();
            let Some(question) = snapshot.question.clone() else {
                return Ok(true);
            };
            render::question(&snapshot, &question);

            let outcome = loop {
                render::prompt("Your answer: ");
                let Some(line) = self.input.next_line().await? else {
                    return Ok(false);
                };
                match parse_choice(&line) {
                    Choice::Quit => return Ok(false),
                    Choice::Invalid => render::invalid_choice(question.options().len()),
                    Choice::Answer(option) => {
                        let outcome = session.submit_answer(option);
                        if !outcome.is_ignored() {
                            break outcome;
                        }
                        render::invalid_choice(question.options().len());
                    }
                }
            };

            render::feedback(&question, outcome);
            session.wait_for_advance().await;
        }
    }

    async fn complete(&mut self, session: &mut QuizSessionService) -> io::Result<()> {
        loop {
            match self.service.finish(session).await {
                Ok(completion) => {
                    render::summary(&completion);
                    break;
                }
                Err(err) => {
                    render::error(&err);
                    if !self.confirm("Retry saving the result? [Y/n] ").await? {
                        if let Some(summary) = session.summary() {
                            render::unsaved_summary(&summary);
                        }
                        break;
                    }
                }
            }
        }
        render::review(&session.questions(), &session.answers());
        Ok(())
    }

    async fn next_step(&mut self) -> io::Result<NextStep> {
        loop {
            render::prompt("\n[r]etry these questions, [n]ew quiz, [q]uit: ");
            let Some(line) = self.input.next_line().await? else {
                return Ok(NextStep::Quit);
            };
            if let Some(step) = parse_next_step(&line) {
                return Ok(step);
            }
        }
    }

    async fn confirm(&mut self, text: &str) -> io::Result<bool> {
        render::prompt(text);
        let Some(line) = self.input.next_line().await? else {
            return Ok(false);
        };
        Ok(matches!(
            line.trim().to_ascii_lowercase().as_str(),
            "" | "y" | "yes"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_and_letters() {
        assert_eq!(parse_choice("1"), Choice::Answer(0));
        assert_eq!(parse_choice(" 4 \n"), Choice::Answer(3));
        assert_eq!(parse_choice("b"), Choice::Answer(1));
        assert_eq!(parse_choice("D"), Choice::Answer(3));
        assert_eq!(parse_choice("0"), Choice::Invalid);
        assert_eq!(parse_choice(""), Choice::Invalid);
        assert_eq!(parse_choice("ab"), Choice::Invalid);
        assert_eq!(parse_choice("Q"), Choice::Quit);
    }

    #[test]
    fn parses_next_step() {
        assert_eq!(parse_next_step("r"), Some(NextStep::Retry));
        assert_eq!(parse_next_step(""), Some(NextStep::NewQuiz));
        assert_eq!(parse_next_step("quit"), Some(NextStep::Quit));
        assert_eq!(parse_next_step("x"), None);
    }

    #[tokio::test]
    async fn spinner_returns_the_future_output() {
        let value = with_spinner("working", async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            42
        })
        .await;
        assert_eq!(value, 42);
    }
}
