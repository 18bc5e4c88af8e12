use crate::models::quota::{Label, Status};
use crossterm::style::Stylize;

/// Label text with its sub-group segment emphasized unless `plain`.
pub fn label(label: &Label, plain: bool) -> String {
    match &label.highlight {
        Some(range) if !plain => {
            let text = &label.text;
            format!(
                "{}{}{}",
                &text[..range.start],
                text[range.clone()].bold().yellow(),
                &text[range.end..]
            )
        }
        _ => label.text.clone(),
    }
}

pub fn status(status: Status, plain: bool) -> String {
    match status {
        Status::Exceeded if !plain => status.label().red().bold().slow_blink().to_string(),
        Status::Unknown if !plain  => status.label().dim().to_string(),
        _                          => status.label().to_string(),
    }
}
