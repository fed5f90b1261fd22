use serde::Serialize;
use thiserror::Error;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::history::{TraversalReport, Visit, VisitOutcome};
use crate::session::ChatSummary;

const TITLE_WIDTH: usize = 48;
const THREAD_INDENT: &str = "    ";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Copy)]
pub enum JsonFormat {
    Pretty,
    Compact,
}

pub fn json_string<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String, OutputError> {
    let payload = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value)?,
        JsonFormat::Compact => serde_json::to_string(value)?,
    };
    Ok(payload)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<(), OutputError> {
    let payload = json_string(value, format)?;
    println!("{payload}");
    Ok(())
}

pub fn print_chat_list(chats: &[ChatSummary], json: bool) -> Result<(), OutputError> {
    if json {
        return print_json(chats, JsonFormat::Pretty);
    }
    for line in chat_lines(chats) {
        println!("{line}");
    }
    Ok(())
}

fn chat_lines(chats: &[ChatSummary]) -> Vec<String> {
    let kind_width = chats
        .iter()
        .map(|chat| display_width(chat.kind))
        .max()
        .unwrap_or_default();
    let id_width = chats
        .iter()
        .map(|chat| display_width(&format!("[{}]", chat.id)))
        .max()
        .unwrap_or_default();
    chats
        .iter()
        .map(|chat| {
            format!(
                "{} {} -> {}",
                pad_right(chat.kind, kind_width),
                pad_right(&format!("[{}]", chat.id), id_width),
                truncate_display(&chat.title, TITLE_WIDTH),
            )
        })
        .collect()
}

/// Prints one progress record: a padded index, the message id and kind,
/// then the media caption and download label.
pub fn print_visit(visit: &Visit, json: bool) -> Result<(), OutputError> {
    if json {
        return print_json(visit, JsonFormat::Compact);
    }
    println!("{}", visit_line(visit));
    Ok(())
}

fn visit_line(visit: &Visit) -> String {
    let indent = if visit.thread_of.is_some() { THREAD_INDENT } else { "" };
    let index = pad_by_max(visit.index, visit.budget);
    match &visit.outcome {
        VisitOutcome::Seen { kind, caption, label } => match caption {
            Some(caption) => format!("{indent}{index} [{}:{kind}] - {caption} ... {label}", visit.message_id),
            None => format!("{indent}{index} [{}:{kind}] - {label}", visit.message_id),
        },
        VisitOutcome::Skipped { reason } => {
            format!("{indent}{index} [{}] - skipped: {reason}", visit.message_id)
        }
    }
}

pub fn print_report(report: &TraversalReport, json: bool) -> Result<(), OutputError> {
    if json {
        return print_json(report, JsonFormat::Compact);
    }
    println!(
        "Visited {} messages and {} replies ({} skipped, {} threads unavailable).",
        report.messages, report.replies, report.skipped, report.abandoned_threads
    );
    Ok(())
}

/// Left-pads `value` to the digit count of `max`.
pub fn pad_by_max(value: usize, max: usize) -> String {
    pad_left(&value.to_string(), max.to_string().len())
}

fn display_width(value: &str) -> usize {
    UnicodeWidthStr::width(value)
}

fn truncate_display(value: &str, max_width: usize) -> String {
    if display_width(value) <= max_width {
        return value.to_string();
    }
    let ellipsis = "...";
    let mut width = 0usize;
    let mut output = String::new();
    for ch in value.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width + ellipsis.len() > max_width {
            break;
        }
        output.push(ch);
        width += ch_width;
    }
    output.push_str(ellipsis);
    output
}

fn pad_right(value: &str, width: usize) -> String {
    let mut output = value.to_string();
    let current = display_width(value);
    if current < width {
        output.push_str(&" ".repeat(width - current));
    }
    output
}

fn pad_left(value: &str, width: usize) -> String {
    let current = display_width(value);
    if current >= width {
        return value.to_string();
    }
    let mut output = " ".repeat(width - current);
    output.push_str(value);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seen(index: usize, budget: usize, caption: Option<&str>, label: &str) -> Visit {
        Visit {
            index,
            budget,
            thread_of: None,
            message_id: 4096,
            outcome: VisitOutcome::Seen {
                kind: "messageVideo",
                caption: caption.map(str::to_string),
                label: label.to_string(),
            },
        }
    }

    #[test]
    fn index_is_padded_to_budget_width() {
        assert_eq!(pad_by_max(3, 25), " 3");
        assert_eq!(pad_by_max(12, 25), "12");
        assert_eq!(pad_by_max(7, 1000), "   7");
        assert_eq!(pad_by_max(0, 5), "0");
    }

    #[test]
    fn media_line_shows_caption_and_label() {
        let line = visit_line(&seen(3, 25, Some("[12s] clip"), "skipped download"));
        assert_eq!(line, " 3 [4096:messageVideo] - [12s] clip ... skipped download");
    }

    #[test]
    fn thread_lines_are_indented() {
        let mut visit = seen(0, 3, None, "hello");
        visit.thread_of = Some(1);
        assert_eq!(visit_line(&visit), "    0 [4096:messageVideo] - hello");
    }

    #[test]
    fn skipped_line_names_reason() {
        let visit = Visit {
            index: 10,
            budget: 25,
            thread_of: None,
            message_id: 17,
            outcome: VisitOutcome::Skipped {
                reason: "Not Found (code 404)".to_string(),
            },
        };
        assert_eq!(visit_line(&visit), "10 [17] - skipped: Not Found (code 404)");
    }

    #[test]
    fn visit_json_is_flat() {
        let payload = json_string(&seen(1, 25, None, "downloaded"), JsonFormat::Compact).expect("json");
        let value: serde_json::Value = serde_json::from_str(&payload).expect("parse");
        assert_eq!(value["status"], "seen");
        assert_eq!(value["messageId"], 4096);
        assert_eq!(value["label"], "downloaded");
    }

    #[test]
    fn chat_lines_align_columns() {
        let chats = vec![
            ChatSummary {
                id: 42,
                kind: "private",
                title: "Ada".to_string(),
            },
            ChatSummary {
                id: -1001,
                kind: "channel",
                title: "Release notes".to_string(),
            },
        ];
        assert_eq!(
            chat_lines(&chats),
            vec!["private [42]    -> Ada", "channel [-1001] -> Release notes"]
        );
    }

    #[test]
    fn long_titles_are_truncated() {
        let title = "x".repeat(80);
        let truncated = truncate_display(&title, TITLE_WIDTH);
        assert_eq!(display_width(&truncated), TITLE_WIDTH);
        assert!(truncated.ends_with("..."));
    }
}
