use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed emoji set users can react with. The glyphs are the durable JSON
/// keys of a post's reaction counts; the tags are the storage names.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
pub enum Emoji {
    #[serde(rename = "❤️")]
    Heart,
    #[serde(rename = "🤗")]
    Hug,
    #[serde(rename = "😢")]
    Crying,
    #[serde(rename = "😡")]
    Angry,
    #[serde(rename = "💪")]
    Muscle,
    #[serde(rename = "🙏")]
    Pray,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown reaction emoji: {0}")]
pub struct InvalidEmojiError(String);

impl Emoji {
    pub const ALL: [Emoji; 6] = [
        Emoji::Heart,
        Emoji::Hug,
        Emoji::Crying,
        Emoji::Angry,
        Emoji::Muscle,
        Emoji::Pray,
    ];

    #[must_use]
    pub fn glyph(self) -> &'static str {
        match self {
            Emoji::Heart => "❤️",
            Emoji::Hug => "🤗",
            Emoji::Crying => "😢",
            Emoji::Angry => "😡",
            Emoji::Muscle => "💪",
            Emoji::Pray => "🙏",
        }
    }

    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Emoji::Heart => "heart",
            Emoji::Hug => "hug",
            Emoji::Crying => "crying",
            Emoji::Angry => "angry",
            Emoji::Muscle => "muscle",
            Emoji::Pray => "pray",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, InvalidEmojiError> {
        Self::ALL
            .into_iter()
            .find(|emoji| emoji.tag() == tag)
            .ok_or_else(|| InvalidEmojiError(tag.to_owned()))
    }
}

/// Denormalized per-emoji reaction counters of a post. Always present, all
/// keys zero-initialized.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
pub struct ReactionCounts {
    #[serde(rename = "❤️")]
    pub heart: i32,
    #[serde(rename = "🤗")]
    pub hug: i32,
    #[serde(rename = "😢")]
    pub crying: i32,
    #[serde(rename = "😡")]
    pub angry: i32,
    #[serde(rename = "💪")]
    pub muscle: i32,
    #[serde(rename = "🙏")]
    pub pray: i32,
}

impl ReactionCounts {
    #[must_use]
    pub fn get(self, emoji: Emoji) -> i32 {
        match emoji {
            Emoji::Heart => self.heart,
            Emoji::Hug => self.hug,
            Emoji::Crying => self.crying,
            Emoji::Angry => self.angry,
            Emoji::Muscle => self.muscle,
            Emoji::Pray => self.pray,
        }
    }

    pub fn get_mut(&mut self, emoji: Emoji) -> &mut i32 {
        match emoji {
            Emoji::Heart => &mut self.heart,
            Emoji::Hug => &mut self.hug,
            Emoji::Crying => &mut self.crying,
            Emoji::Angry => &mut self.angry,
            Emoji::Muscle => &mut self.muscle,
            Emoji::Pray => &mut self.pray,
        }
    }

    pub fn apply(&mut self, emoji: Emoji, delta: i32) {
        *self.get_mut(emoji) += delta;
    }

    #[must_use]
    pub fn total(self) -> i64 {
        Emoji::ALL
            .into_iter()
            .map(|emoji| i64::from(self.get(emoji)))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::{Emoji, ReactionCounts};

    #[test]
    fn tags_round_trip() {
        for emoji in Emoji::ALL {
            assert_eq!(Emoji::from_tag(emoji.tag()).unwrap(), emoji);
        }
        assert!(Emoji::from_tag("thumbsup").is_err());
    }

    #[test]
    fn counts_serialize_with_glyph_keys() {
        let mut counts = ReactionCounts::default();
        counts.apply(Emoji::Heart, 2);
        counts.apply(Emoji::Pray, 1);

        let json: serde_json::Value = serde_json::to_value(counts).unwrap();
        assert_eq!(json["❤️"], 2);
        assert_eq!(json["🙏"], 1);
        assert_eq!(json["😡"], 0);
    }

    #[test]
    fn emoji_deserializes_from_glyph() {
        let emoji: Emoji = serde_json::from_str("\"💪\"").unwrap();
        assert_eq!(emoji, Emoji::Muscle);
    }

    #[test]
    fn total_sums_all_keys() {
        let mut counts = ReactionCounts::default();
        for emoji in Emoji::ALL {
            counts.apply(emoji, 3);
        }
        assert_eq!(counts.total(), 18);
    }
}
