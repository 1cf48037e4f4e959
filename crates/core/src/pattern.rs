//! The generated pattern and the prompts used to obtain it.

use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Deserializer, Serialize};

use crate::slot::{CollectedData, Slot};

const DEFAULT_HOOK_SIZE: &str = "5.0mm";
const DEFAULT_GAUGE: &str = "18 stitches x 20 rows = 10cm";
const DEFAULT_DIFFICULTY: &str = "Intermediate";
const DEFAULT_ESTIMATED_TIME: &str = "Not estimated";

/// A complete crochet pattern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// Kind of piece.
    pub piece_type: String,
    /// Size of the piece.
    pub size: String,
    /// Main color.
    pub color: String,
    /// Yarn weight.
    pub yarn_weight: String,
    /// Recommended hook size.
    pub hook_size: String,
    /// Gauge swatch measurement.
    pub gauge: String,
    /// Materials needed.
    pub materials: Vec<String>,
    /// Step-by-step instructions.
    pub instructions: Vec<String>,
    /// Extra notes.
    pub special_notes: Vec<String>,
    /// Difficulty level.
    pub difficulty_level: String,
    /// Estimated time to finish the piece.
    pub estimated_time: String,
}

/// The part of a pattern the model is asked to write.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(default)]
pub(crate) struct GeneratedPattern {
    #[schemars(description = "Recommended hook size, e.g. \"5.0mm\".")]
    hook_size: String,
    #[schemars(description = "Gauge swatch, e.g. \"18 stitches x 20 rows = 10cm\".")]
    gauge: String,
    #[schemars(description = "Every material needed, one per item.")]
    #[serde(deserialize_with = "lines")]
    #[schemars(with = "Vec<String>")]
    materials: Vec<String>,
    #[schemars(description = "Step-by-step instructions, one row or step per item.")]
    #[serde(deserialize_with = "lines")]
    #[schemars(with = "Vec<String>")]
    instructions: Vec<String>,
    #[schemars(description = "Stitches used, tips and other notes.")]
    #[serde(deserialize_with = "lines")]
    #[schemars(with = "Vec<String>")]
    special_notes: Vec<String>,
    #[schemars(description = "Beginner, Intermediate or Advanced.")]
    difficulty_level: String,
    #[schemars(description = "Estimated time to finish, e.g. \"10 hours\".")]
    estimated_time: String,
}

/// A list field, also accepted as one newline-separated string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lines {
    Text(String),
    Items(Vec<String>),
}

fn lines<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<String>, D::Error> {
    let text = match Lines::deserialize(deserializer)? {
        Lines::Text(text) => text,
        Lines::Items(items) => items.join("\n"),
    };
    Ok(non_blank_lines(&text))
}

pub(crate) fn system_prompt() -> String {
    let schema = schema_for!(GeneratedPattern);
    let schema = serde_json::to_string_pretty(&schema).unwrap_or_default();
    format!(
        "You are a crochet expert who writes detailed, professional patterns.\n\
        Reply with a single JSON object and nothing else. The object must \
        match this JSON schema:\n{schema}"
    )
}

pub(crate) fn user_prompt(data: &CollectedData) -> String {
    let field = |slot: Slot| data.get(slot).unwrap_or("not specified");
    let mut prompt = format!(
        "Write a complete and detailed crochet pattern for the following \
        piece.\n\n\
        Piece type: {}\n\
        Size: {}\n\
        Color: {}\n\
        Yarn type: {}\n\
        Yarn weight: {}\n\
        Style details: {}\n",
        field(Slot::PieceType),
        field(Slot::Size),
        field(Slot::Color),
        field(Slot::YarnType),
        field(Slot::YarnWeight),
        field(Slot::StyleDetails),
    );
    if let Some(sleeve) = data.get(Slot::SleeveType) {
        prompt.push_str(&format!("Sleeve type: {sleeve}\n"));
    }
    prompt.push_str(
        "\nThe pattern must include:\n\
        1. The list of materials needed\n\
        2. The recommended hook size\n\
        3. The gauge\n\
        4. Detailed step-by-step instructions\n\
        5. The stitches used\n\
        6. The difficulty level\n\
        7. Special notes\n\n\
        Be specific and technical, but keep the instructions clear for \
        intermediate crocheters.",
    );
    prompt
}

/// Builds a pattern from the model reply.
///
/// The reply is expected to be JSON, optionally inside a Markdown code
/// fence. Prose is accepted too: each non-blank line becomes one
/// instruction. Returns `None` when the reply holds no instructions.
pub(crate) fn parse_reply(data: &CollectedData, reply: &str) -> Option<Pattern> {
    let reply = reply.trim();
    if reply.is_empty() {
        return None;
    }

    let generated = match parse_json(reply) {
        Some(generated) => generated,
        None => {
            debug!("model reply is not JSON, reading it as plain text");
            GeneratedPattern {
                instructions: non_blank_lines(reply),
                ..Default::default()
            }
        }
    };
    if generated.instructions.is_empty() {
        debug!("model reply has no instructions");
        return None;
    }
    Some(assemble(data, generated))
}

fn parse_json(reply: &str) -> Option<GeneratedPattern> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&reply[start..=end])
        .inspect_err(|err| debug!("invalid pattern JSON: {err}"))
        .ok()
}

fn non_blank_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

fn assemble(data: &CollectedData, generated: GeneratedPattern) -> Pattern {
    let slot = |slot: Slot| data.get(slot).unwrap_or_default().to_owned();
    let or_default = |value: String, default: &str| {
        if value.trim().is_empty() {
            default.to_owned()
        } else {
            value
        }
    };
    let materials = if generated.materials.is_empty() {
        default_materials(data)
    } else {
        generated.materials
    };
    let special_notes = if generated.special_notes.is_empty() {
        vec!["Adjust the size as needed".to_owned()]
    } else {
        generated.special_notes
    };

    Pattern {
        piece_type: slot(Slot::PieceType),
        size: slot(Slot::Size),
        color: slot(Slot::Color),
        yarn_weight: slot(Slot::YarnWeight),
        hook_size: or_default(generated.hook_size, DEFAULT_HOOK_SIZE),
        gauge: or_default(generated.gauge, DEFAULT_GAUGE),
        materials,
        instructions: generated.instructions,
        special_notes,
        difficulty_level: or_default(
            generated.difficulty_level,
            DEFAULT_DIFFICULTY,
        ),
        estimated_time: or_default(
            generated.estimated_time,
            DEFAULT_ESTIMATED_TIME,
        ),
    }
}

fn default_materials(data: &CollectedData) -> Vec<String> {
    let yarn = match data.get(Slot::YarnType) {
        Some(fiber) => {
            let color = data.get(Slot::Color).unwrap_or("any color");
            format!("{} {fiber} yarn", capitalize(color))
        }
        None => "Yarn".to_owned(),
    };
    vec![
        yarn,
        format!("{DEFAULT_HOOK_SIZE} crochet hook"),
        "Scissors".to_owned(),
        "Tapestry needle".to_owned(),
    ]
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hat() -> CollectedData {
        [
            (Slot::PieceType, "hat"),
            (Slot::Size, "M"),
            (Slot::Color, "blue"),
            (Slot::YarnType, "wool"),
            (Slot::YarnWeight, "bulky"),
            (Slot::StyleDetails, "a big pom-pom"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_user_prompt_lists_slots() {
        let prompt = user_prompt(&hat());
        assert!(prompt.contains("Piece type: hat\n"));
        assert!(prompt.contains("Yarn weight: bulky\n"));
        assert!(!prompt.contains("Sleeve type"));

        let prompt = user_prompt(&CollectedData::default());
        assert!(prompt.contains("Color: not specified\n"));
    }

    #[test]
    fn test_system_prompt_has_schema() {
        let prompt = system_prompt();
        assert!(prompt.contains("\"hook_size\""));
        assert!(prompt.contains("\"instructions\""));
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = r#"Here you go:
```json
{
  "hook_size": "6.5mm",
  "gauge": "12 hdc x 10 rows = 10cm",
  "materials": ["200g bulky wool"],
  "instructions": ["Rnd 1: 8 hdc in magic ring", "Rnd 2: 2 hdc in each st"],
  "special_notes": [],
  "difficulty_level": "Beginner",
  "estimated_time": "4 hours"
}
```"#;
        let pattern = parse_reply(&hat(), reply).unwrap();
        assert_eq!(pattern.piece_type, "hat");
        assert_eq!(pattern.yarn_weight, "bulky");
        assert_eq!(pattern.hook_size, "6.5mm");
        assert_eq!(pattern.instructions.len(), 2);
        assert_eq!(pattern.special_notes, vec!["Adjust the size as needed"]);
        assert_eq!(pattern.estimated_time, "4 hours");
    }

    #[test]
    fn test_parse_plain_text() {
        let reply = "Materials: wool\n\n  Rnd 1: ch 4, join  \nRnd 2: sc around\n";
        let pattern = parse_reply(&hat(), reply).unwrap();
        assert_eq!(
            pattern.instructions,
            vec!["Materials: wool", "Rnd 1: ch 4, join", "Rnd 2: sc around"]
        );
        assert_eq!(pattern.hook_size, DEFAULT_HOOK_SIZE);
        assert_eq!(pattern.gauge, DEFAULT_GAUGE);
        assert_eq!(pattern.difficulty_level, DEFAULT_DIFFICULTY);
        assert_eq!(pattern.materials[0], "Blue wool yarn");
    }

    #[test]
    fn test_model_cannot_override_collected_data() {
        let reply = r#"{"piece_type": "sock", "instructions": ["Row 1"]}"#;
        let pattern = parse_reply(&hat(), reply).unwrap();
        assert_eq!(pattern.piece_type, "hat");
        assert_eq!(pattern.instructions, vec!["Row 1"]);
    }

    #[test]
    fn test_blank_reply() {
        assert_eq!(parse_reply(&hat(), " \n\t"), None);
    }

    #[test]
    fn test_reply_without_instructions() {
        assert_eq!(parse_reply(&hat(), "{}"), None);
        let reply = r#"{"hook_size": "6mm", "instructions": ["", "  "]}"#;
        assert_eq!(parse_reply(&hat(), reply), None);
    }

    #[test]
    fn test_instructions_as_text() {
        let reply = r#"{"instructions": "Row 1: sc\nRow 2: sc", "materials": "Wool\nHook"}"#;
        let pattern = parse_reply(&hat(), reply).unwrap();
        assert_eq!(pattern.instructions, vec!["Row 1: sc", "Row 2: sc"]);
        assert_eq!(pattern.materials, vec!["Wool", "Hook"]);
    }
}
