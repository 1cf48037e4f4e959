//! Conversation-related types and the dialogue controller.

use serde::{Deserialize, Serialize};

use crate::extract::extract_answer;
use crate::question;
use crate::slot::{CollectedData, Slot};
use crate::step::Step;

/// Who authored a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person designing the piece.
    User,
    /// The dialogue controller.
    Assistant,
}

/// One entry of the conversation transcript.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Turn {
    /// Author of the turn.
    pub role: Role,
    /// Text of the turn.
    pub content: String,
}

/// The state of one dialogue session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    current_step: Step,
    collected_data: CollectedData,
    missing_information: Vec<Slot>,
    conversation_history: Vec<Turn>,
}

impl ConversationState {
    /// Creates a fresh state at the greeting step.
    #[inline]
    pub fn new() -> Self {
        Self {
            missing_information: Slot::REQUIRED.to_vec(),
            ..Default::default()
        }
    }

    /// Creates a state that already knows some slots, as if they had been
    /// volunteered earlier. The step is still the greeting until the next
    /// [`advance`](Self::advance).
    pub fn with_collected_data(collected_data: CollectedData) -> Self {
        Self {
            missing_information: collected_data.missing(),
            collected_data,
            ..Default::default()
        }
    }

    /// The step the dialogue is targeting.
    #[inline]
    pub fn current_step(&self) -> Step {
        self.current_step
    }

    /// Everything learned so far.
    #[inline]
    pub fn collected_data(&self) -> &CollectedData {
        &self.collected_data
    }

    /// Required slots still pending after the last turn, in asking order.
    #[inline]
    pub fn missing_information(&self) -> &[Slot] {
        &self.missing_information
    }

    /// The transcript, oldest turn first.
    #[inline]
    pub fn history(&self) -> &[Turn] {
        &self.conversation_history
    }

    /// Returns `true` once every required slot is filled.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current_step.is_terminal()
    }

    /// Handles one user utterance and returns the next question.
    ///
    /// The utterance is recorded, mined for slot values, and the first
    /// required slot still empty decides the next step. Both the utterance
    /// and the question are appended to the history. Once the dialogue has
    /// reached [`Step::PatternGeneration`] the collected data is frozen and
    /// every call returns the same closing message.
    pub fn advance(&mut self, utterance: &str) -> String {
        self.push_turn(Role::User, utterance);

        let previous_step = self.current_step;
        if !previous_step.is_terminal() {
            extract_answer(&mut self.collected_data, utterance, previous_step);
        }

        let next_step = Step::next_for(&self.collected_data);
        let question = question::render(next_step, &self.collected_data);
        if next_step != previous_step {
            debug!(from = %previous_step, to = %next_step, "dialogue advanced");
        }
        self.current_step = next_step;
        self.missing_information = self.collected_data.missing();

        self.push_turn(Role::Assistant, question.as_str());
        question
    }

    fn push_turn(&mut self, role: Role, content: &str) {
        self.conversation_history.push(Turn {
            role,
            content: content.to_owned(),
        });
    }
}

/// The text hosts display before the first user turn.
#[inline]
pub fn greeting() -> String {
    question::render(Step::Greeting, &CollectedData::default())
}
