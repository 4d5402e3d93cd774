//! Status line messages for the TUI
//!
//! Feedback from actions (tag saved, save failed, filter changed) shows up in
//! the status bar and is cleared after a few seconds. Errors stay until the
//! next message replaces them.

use std::time::{Duration, Instant};

use ratatui::style::Color;

/// How long informational messages stay visible
const DEFAULT_DISMISS: Duration = Duration::from_secs(4);

/// Message level (determines styling and lifetime)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

impl StatusLevel {
    pub fn color(&self) -> Color {
        match self {
            StatusLevel::Info => Color::Blue,
            StatusLevel::Success => Color::Green,
            StatusLevel::Error => Color::Red,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            StatusLevel::Info => "ℹ",
            StatusLevel::Success => "✓",
            StatusLevel::Error => "✗",
        }
    }
}

/// A single status message
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
    created_at: Instant,
}

impl StatusMessage {
    pub fn new(level: StatusLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            created_at: Instant::now(),
        }
    }

    /// Errors never expire on their own.
    pub fn is_expired(&self) -> bool {
        self.level != StatusLevel::Error && self.created_at.elapsed() >= DEFAULT_DISMISS
    }

    pub fn display(&self) -> String {
        format!("{} {}", self.level.icon(), self.text)
    }
}

/// Holds the current status message, if any.
#[derive(Debug, Default)]
pub struct StatusLine {
    current: Option<StatusMessage>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.current = Some(StatusMessage::new(StatusLevel::Info, text));
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.current = Some(StatusMessage::new(StatusLevel::Success, text));
    }

    pub fn error(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::warn!(error = %text, "tui error");
        self.current = Some(StatusMessage::new(StatusLevel::Error, text));
    }

    /// Current message, dropping it first if it has expired.
    pub fn current(&mut self) -> Option<&StatusMessage> {
        if self.current.as_ref().is_some_and(StatusMessage::is_expired) {
            self.current = None;
        }
        self.current.as_ref()
    }
}
