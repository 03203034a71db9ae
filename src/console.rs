//! Terminal presentation: coloured chat output and highlighted code blocks.

use std::io::{self, Write};

use crossterm::style::{Color, Stylize};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

use crate::agent::{AgentEvent, EventSink};

const USER_COLOR: Color = Color::White;
const ASSISTANT_COLOR: Color = Color::Blue;
const TOOL_COLOR: Color = Color::Yellow;
const RESULT_COLOR: Color = Color::Green;
const ERROR_COLOR: Color = Color::Red;

/// A piece of an answer split on ``` fences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text outside any fence.
    Prose(&'a str),
    /// A fenced block with code. `language` is empty when the fence was untagged.
    Code { language: &'a str, code: String },
    /// A fenced block without code, printed as-is.
    Raw(&'a str),
}

/// Split text on ``` fences. Even parts are prose, odd parts are fenced blocks
/// whose first line names the language.
pub fn split_fenced(text: &str) -> Vec<Segment<'_>> {
    text.split("```")
        .enumerate()
        .map(|(i, part)| {
            if i % 2 == 0 {
                return Segment::Prose(part);
            }

            let mut lines = part.split('\n');
            let language = lines.next().unwrap_or("").trim();
            let code = lines.collect::<Vec<_>>().join("\n");

            if code.is_empty() {
                Segment::Raw(part)
            } else {
                Segment::Code { language, code }
            }
        })
        .collect()
}

/// Prints chat output to stdout.
pub struct Console {
    syntaxes: SyntaxSet,
    theme: Theme,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub fn new() -> Self {
        let mut themes = ThemeSet::load_defaults().themes;
        let theme = themes.remove("base16-ocean.dark").unwrap_or_default();

        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    }

    pub fn print_colored(&self, text: &str, color: Color) {
        println!("{}", text.with(color));
    }

    pub fn welcome(&self) {
        self.print_colored("Welcome to the Engineer Chat!", ASSISTANT_COLOR);
        self.print_colored("Type 'exit' to end the conversation.", ASSISTANT_COLOR);
    }

    pub fn goodbye(&self) {
        self.print_colored("Thank you for chatting. Goodbye!", ASSISTANT_COLOR);
    }

    pub fn prompt(&self) -> io::Result<()> {
        print!("\n{} ", "You:".with(USER_COLOR));
        io::stdout().flush()
    }

    pub fn error(&self, message: &str) {
        self.print_colored(&format!("\nError: {}", message), ERROR_COLOR);
    }

    /// Print a final answer, highlighting fenced code blocks.
    pub fn answer(&self, text: &str) {
        // Plain answers were already printed as they arrived.
        if !text.contains("```") {
            return;
        }

        for segment in split_fenced(text) {
            match segment {
                Segment::Prose(part) | Segment::Raw(part) => {
                    self.print_colored(part, ASSISTANT_COLOR)
                }
                Segment::Code { language, code } if language.is_empty() => {
                    self.print_colored(&format!("Code:\n{}", code), ASSISTANT_COLOR)
                }
                Segment::Code { language, code } => match self.highlight(&code, language) {
                    Some(highlighted) => println!("{}", highlighted),
                    None => self.print_colored(
                        &format!("Code (language: {}):\n{}", language, code),
                        ASSISTANT_COLOR,
                    ),
                },
            }
        }
    }

    fn highlight(&self, code: &str, language: &str) -> Option<String> {
        let syntax = self.syntaxes.find_syntax_by_token(language)?;
        let mut highlighter = HighlightLines::new(syntax, &self.theme);

        let mut out = String::new();
        for line in LinesWithEndings::from(code) {
            let ranges = highlighter.highlight_line(line, &self.syntaxes).ok()?;
            out.push_str(&as_24_bit_terminal_escaped(&ranges, false));
        }
        out.push_str("\x1b[0m");
        Some(out)
    }
}

impl EventSink for Console {
    fn emit(&self, event: AgentEvent) {
        match event {
            AgentEvent::AssistantText { content } => {
                self.print_colored(&format!("\nAssistant: {}", content), ASSISTANT_COLOR)
            }
            AgentEvent::ToolCall {
                name, arguments, ..
            } => {
                self.print_colored(&format!("\nTool Used: {}", name), TOOL_COLOR);
                self.print_colored(&format!("Tool Input: {}", arguments), TOOL_COLOR);
            }
            AgentEvent::ToolResult {
                content, success, ..
            } => {
                let color = if success { RESULT_COLOR } else { ERROR_COLOR };
                self.print_colored(&format!("Tool Result: {}", content), color);
            }
            AgentEvent::RoundLimitExceeded { rounds } => self.print_colored(
                &format!("\nStopped after {} rounds without a final answer.", rounds),
                ERROR_COLOR,
            ),
        }
    }
}
