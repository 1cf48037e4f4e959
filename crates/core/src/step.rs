//! Dialogue steps.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::slot::{CollectedData, Slot};

/// The step the dialogue is currently targeting.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// A fresh conversation, nothing has been asked yet.
    #[default]
    Greeting,
    /// Asking for the kind of piece.
    PieceType,
    /// Asking for the size.
    Size,
    /// Asking for the color.
    Color,
    /// Asking for the yarn fiber and weight.
    YarnPreferences,
    /// Asking for style details.
    StyleDetails,
    /// Everything is known, the pattern can be generated.
    PatternGeneration,
}

impl Step {
    /// Derives the next step from the collected data: the first required
    /// slot that is still empty decides.
    pub fn next_for(data: &CollectedData) -> Step {
        let Some(slot) = Slot::REQUIRED.into_iter().find(|s| !data.contains(*s))
        else {
            return Step::PatternGeneration;
        };
        match slot {
            Slot::PieceType => Step::PieceType,
            Slot::Size => Step::Size,
            Slot::Color => Step::Color,
            Slot::YarnType | Slot::YarnWeight => Step::YarnPreferences,
            Slot::StyleDetails | Slot::SleeveType => Step::StyleDetails,
        }
    }

    /// Returns `true` for the terminal step.
    #[inline]
    pub fn is_terminal(self) -> bool {
        self == Step::PatternGeneration
    }

    /// Returns the snake_case name of this step.
    pub const fn as_str(self) -> &'static str {
        match self {
            Step::Greeting => "greeting",
            Step::PieceType => "piece_type",
            Step::Size => "size",
            Step::Color => "color",
            Step::YarnPreferences => "yarn_preferences",
            Step::StyleDetails => "style_details",
            Step::PatternGeneration => "pattern_generation",
        }
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
