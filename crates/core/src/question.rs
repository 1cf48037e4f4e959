use crate::slot::{CollectedData, Slot};
use crate::step::Step;

/// Pieces that have sleeves worth asking about.
const SLEEVED_PIECES: &[&str] = &["coat", "sweater"];

/// Renders the question asked at `step`.
pub fn render(step: Step, data: &CollectedData) -> String {
    match step {
        Step::Greeting => "Hi! I'd love to help you create a custom crochet \
            pattern. What kind of piece would you like to make today?"
            .to_owned(),
        Step::PieceType => "What kind of piece would you like to make? It \
            could be a coat, sweater, hat, scarf, gloves, socks, blanket or bag."
            .to_owned(),
        Step::Size => {
            let piece = data.get(Slot::PieceType).unwrap_or("piece");
            format!(
                "Perfect! A {piece}. What size do you need? (XS, S, M, L, XL, \
                XXL, or do you have specific measurements?)"
            )
        }
        Step::Color => "What color would you like? Tell me your favorite \
            color or any palette you have in mind."
            .to_owned(),
        Step::YarnPreferences => {
            match (data.get(Slot::YarnType), data.get(Slot::YarnWeight)) {
                (Some(fiber), None) => format!(
                    "Nice, {fiber} it is. Which yarn weight would you like? \
                    (lace, super fine, fine, light, medium, bulky, super \
                    bulky or jumbo)"
                ),
                (None, Some(weight)) => format!(
                    "A {weight} weight, got it. Which fiber do you prefer? \
                    (cotton, wool, acrylic, merino, alpaca, ...)"
                ),
                _ => "What kind of yarn do you prefer to work with, and \
                    what weight? (For example: fine cotton, medium wool, \
                    bulky acrylic.)"
                    .to_owned(),
            }
        }
        Step::StyleDetails => {
            match data.get(Slot::PieceType) {
                Some(piece) if SLEEVED_PIECES.contains(&piece) => {
                    "What details would you like? For example: sleeve type \
                    (puffy, fitted, sleeveless), neckline, length, etc."
                        .to_owned()
                }
                Some(piece) => format!(
                    "Is there any specific detail you'd like to include in \
                    this {piece}?"
                ),
                None => "Is there any specific detail you'd like to include?"
                    .to_owned(),
            }
        }
        Step::PatternGeneration => "Perfect! I have all the information I \
            need. I'll generate your custom pattern now!"
            .to_owned(),
    }
}
