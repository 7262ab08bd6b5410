// Terminal front-end: asks the intake questions on stdin, then chats line by
// line. Drives the same session hooks as the web UI.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::constants::PAGE_TITLE;
use crate::llm_interaction::{Message, Role};
use crate::profile::{AgeRange, FormSubmission, Temperament};
use crate::session::Session;

const RESET_COMMAND: &str = "/reset";
const QUIT_COMMAND: &str = "/quit";

// `None` on end of input. Only the line terminator is stripped.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line).context("Failed to read input")? == 0 {
        return Ok(None);
    }
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(Some(line))
}

fn ask_age<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Option<AgeRange>> {
    writeln!(output, "Child's age range:")?;
    for (i, age) in AgeRange::ALL.iter().enumerate() {
        writeln!(output, "  {}. {}", i + 1, age)?;
    }
    loop {
        write!(output, "Choose 1-{} [1]: ", AgeRange::ALL.len())?;
        output.flush()?;
        let Some(line) = read_line(input)? else {
            return Ok(None);
        };
        let answer = line.trim();
        if answer.is_empty() {
            return Ok(Some(AgeRange::NotSpecified));
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=AgeRange::ALL.len()).contains(&n) => return Ok(Some(AgeRange::ALL[n - 1])),
            _ => writeln!(output, "Please enter a number between 1 and {}.", AgeRange::ALL.len())?,
        }
    }
}

fn parse_trait_numbers(answer: &str) -> Option<Vec<Temperament>> {
    answer
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.parse::<usize>() {
            Ok(n) if (1..=Temperament::ALL.len()).contains(&n) => Some(Temperament::ALL[n - 1]),
            _ => None,
        })
        .collect()
}

fn ask_traits<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<Option<Vec<Temperament>>> {
    writeln!(output, "Select traits that describe your child's general temperament (optional):")?;
    for (i, temperament) in Temperament::ALL.iter().enumerate() {
        writeln!(output, "  {}. {}", i + 1, temperament)?;
    }
    loop {
        write!(output, "Comma-separated numbers, blank for none: ")?;
        output.flush()?;
        let Some(line) = read_line(input)? else {
            return Ok(None);
        };
        match parse_trait_numbers(&line) {
            Some(traits) => return Ok(Some(traits)),
            None => writeln!(output, "Please use numbers between 1 and {}.", Temperament::ALL.len())?,
        }
    }
}

fn ask_form<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Option<FormSubmission>> {
    writeln!(output, "Tell us a bit about your child to receive more personalized advice.")?;
    let Some(age_range) = ask_age(input, output)? else {
        return Ok(None);
    };
    let Some(temperament_traits) = ask_traits(input, output)? else {
        return Ok(None);
    };
    write!(output, "Any current challenges or parenting goals (optional): ")?;
    output.flush()?;
    let Some(current_challenges) = read_line(input)? else {
        return Ok(None);
    };

    Ok(Some(FormSubmission {
        age_range,
        temperament_traits,
        current_challenges,
    }))
}

fn print_message<W: Write>(output: &mut W, message: &Message) -> Result<()> {
    let speaker = match message.role {
        Role::User => "you",
        _ => "assistant",
    };
    writeln!(output, "{}> {}", speaker, message.content)?;
    Ok(())
}

/// Runs the intake form and chat loop until input ends or `/quit`.
/// A fatal session error (no API key, unreachable service) ends the run with an error.
pub async fn run_terminal_chat<R: BufRead, W: Write>(
    session: &mut Session,
    input: &mut R,
    output: &mut W,
) -> Result<()> {
    info!("Starting terminal chat session...");
    writeln!(output, "🧸 {}", PAGE_TITLE)?;

    'form: loop {
        let Some(submission) = ask_form(input, output)? else {
            return Ok(());
        };
        session.submit_form(submission)?;
        writeln!(output, "Thanks! Setting up your personalized chat...")?;
        session.enter_chat().await?;

        let view = session.view();
        writeln!(output, "{}", view.context_caption)?;
        writeln!(output, "{}", view.model_caption)?;
        writeln!(output, "Type {} to edit the child info, {} to leave.", RESET_COMMAND, QUIT_COMMAND)?;
        for message in &view.messages {
            print_message(output, message)?;
        }

        loop {
            write!(output, "you> ")?;
            output.flush()?;
            let Some(line) = read_line(input)? else {
                return Ok(());
            };
            match line.trim() {
                QUIT_COMMAND => return Ok(()),
                RESET_COMMAND => {
                    session.reset();
                    continue 'form;
                }
                _ => {}
            }
            match session.send_user_message(&line).await {
                Ok(Some(reply)) => print_message(output, &Message::assistant(reply))?,
                Ok(None) => {}
                Err(e) => writeln!(output, "Error: {}", e)?,
            }
        }
    }
}
