/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The input messages.
    pub messages: Vec<ModelMessage>,
}

impl ModelRequest {
    /// Creates a single-turn request made of system instructions followed
    /// by one user prompt.
    #[inline]
    pub fn with_prompts<S: Into<String>, U: Into<String>>(
        system_prompt: S,
        user_prompt: U,
    ) -> Self {
        Self {
            messages: vec![
                ModelMessage::System(system_prompt.into()),
                ModelMessage::User(user_prompt.into()),
            ],
        }
    }

    /// Returns the last user message in this request, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|msg| match msg {
            ModelMessage::User(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
}
