//! A terminal chat that walks through the pattern dialogue.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::pin::pin;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use stitch::core::Pattern;
use stitch::{Config, PatternServiceBuilder};
use stitch_openai_model::OpenAIProvider;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::select;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    let model_provider = OpenAIProvider::new(config.openai().clone());
    let service = PatternServiceBuilder::with_model_provider(model_provider)
        .with_store(config.session_store())
        .build();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    print_assistant(&service.greeting());

    let mut stdin = BufReader::new(io::stdin());
    let mut session_id = None;
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line(&mut stdin).await else {
            break;
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit")
        {
            break;
        }

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("🧶 Thinking...");

        let mut turn = pin!(service.advance(session_id, line));
        let result = loop {
            select! {
                result = &mut turn => break result,
                _ = sleep(Duration::from_millis(100)) => progress_bar.inc(1),
            }
        };

        // Finish the progress bar before printing anything else.
        progress_bar.finish_and_clear();

        match result {
            Ok(resp) => {
                session_id = Some(resp.session_id);
                print_assistant(&resp.response);
                if let Some(pattern) = &resp.pattern {
                    print_pattern(pattern);
                }
            }
            Err(err) => {
                // Keep the session, the next turn retries the pattern.
                if let Some(id) = err.session_id() {
                    session_id = Some(id);
                }
                println!(
                    "{}⚠️  {}",
                    BAR_CHAR.bright_yellow(),
                    err.to_string().bright_white()
                );
            }
        }
    }
}

fn print_assistant(text: &str) {
    println!("{}🤖 {}", BAR_CHAR.bright_cyan(), text.bright_white());
}

fn print_pattern(pattern: &Pattern) {
    let bar = BAR_CHAR.bright_magenta();
    let title = format!("{} {}", pattern.size, pattern.piece_type);
    println!("\n{bar}{}", title.bright_white().bold());
    for (label, value) in [
        ("Color", &pattern.color),
        ("Yarn weight", &pattern.yarn_weight),
        ("Hook", &pattern.hook_size),
        ("Gauge", &pattern.gauge),
        ("Difficulty", &pattern.difficulty_level),
        ("Time", &pattern.estimated_time),
    ] {
        println!("{bar}{}: {value}", label.bold());
    }

    let sections = [
        ("Materials", &pattern.materials),
        ("Instructions", &pattern.instructions),
        ("Notes", &pattern.special_notes),
    ];
    for (label, items) in sections {
        println!("{bar}");
        println!("{bar}{}", label.bold());
        for item in items {
            println!("{bar}  - {item}");
        }
    }
    println!();
}

async fn read_line<R: AsyncBufRead + Unpin>(input: &mut R) -> Option<String> {
    let mut line = String::new();

    match input.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_line_keeps_buffered_input() {
        let mut input: &[u8] = b"a red hat\nsize M\n";
        assert_eq!(read_line(&mut input).await.as_deref(), Some("a red hat\n"));
        assert_eq!(read_line(&mut input).await.as_deref(), Some("size M\n"));
        assert_eq!(read_line(&mut input).await, None);
    }
}
