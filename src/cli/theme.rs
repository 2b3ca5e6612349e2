use crate::router::IntentKind;
use crossterm::style::{Color, Stylize};

/// Colors for the line REPL. A disabled theme returns text unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    enabled: bool,
}

impl Theme {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn prompt(&self, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        text.with(Color::Rgb {
            r: 158,
            g: 206,
            b: 106,
        })
        .bold()
        .to_string()
    }

    pub fn kind_label(&self, kind: IntentKind) -> String {
        let label = format!("[{kind}]");
        if !self.enabled {
            return label;
        }
        label.with(kind_color(kind)).bold().to_string()
    }

    pub fn info(&self, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        text.with(Color::Rgb {
            r: 86,
            g: 95,
            b: 137,
        })
        .to_string()
    }

    pub fn error(&self, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        text.with(Color::Rgb {
            r: 247,
            g: 118,
            b: 142,
        })
        .bold()
        .to_string()
    }
}

fn kind_color(kind: IntentKind) -> Color {
    match kind {
        IntentKind::Unit => Color::Rgb {
            r: 125,
            g: 207,
            b: 255,
        },
        IntentKind::Calc => Color::Rgb {
            r: 158,
            g: 206,
            b: 106,
        },
        IntentKind::Weather => Color::Rgb {
            r: 224,
            g: 175,
            b: 104,
        },
        IntentKind::Wiki => Color::Rgb {
            r: 187,
            g: 154,
            b: 247,
        },
        IntentKind::Chat => Color::Rgb {
            r: 192,
            g: 202,
            b: 245,
        },
    }
}
