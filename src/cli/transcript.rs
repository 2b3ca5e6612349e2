use crate::router::IntentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub kind: Option<IntentKind>,
}

impl Turn {
    pub fn render(&self) -> String {
        match (self.role, self.kind) {
            (Role::User, _) => format!("you> {}", self.content),
            (Role::Assistant, Some(kind)) => format!("[{kind}] {}", self.content),
            (Role::Assistant, None) => self.content.clone(),
        }
    }
}

/// Append-only record of the conversation.
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn push_user(&mut self, content: &str) {
        self.turns.push(Turn {
            role: Role::User,
            content: content.to_string(),
            kind: None,
        });
    }

    pub fn push_reply(&mut self, kind: IntentKind, content: &str) {
        self.turns.push(Turn {
            role: Role::Assistant,
            content: content.to_string(),
            kind: Some(kind),
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The last `n` turns, or all of them.
    pub fn tail(&self, n: Option<usize>) -> &[Turn] {
        let n = n.unwrap_or(self.turns.len()).min(self.turns.len());
        &self.turns[self.turns.len() - n..]
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
