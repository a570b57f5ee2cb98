use serde::Serialize;

/// Score used for glyphs that are not in the catalog.
pub const NEUTRAL_SCORE: u8 = 3;

/// Number of glyphs shown per picker row.
pub const PICKER_ROW_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmojiCatalogEntry {
    pub glyph: &'static str,
    pub identifier: &'static str,
    pub score: u8,
}

const fn emoji(glyph: &'static str, identifier: &'static str, score: u8) -> EmojiCatalogEntry {
    EmojiCatalogEntry {
        glyph,
        identifier,
        score,
    }
}

static CATALOG: [EmojiCatalogEntry; 16] = [
    emoji("😄", "joyful", 5),
    emoji("😊", "happy", 5),
    emoji("🥰", "loved", 5),
    emoji("🤩", "excited", 5),
    emoji("😎", "confident", 4),
    emoji("🙂", "content", 4),
    emoji("😌", "relieved", 4),
    emoji("❤️‍🩹", "healing", 3),
    emoji("😐", "neutral", 3),
    emoji("🤔", "thoughtful", 3),
    emoji("😴", "tired", 2),
    emoji("😕", "confused", 2),
    emoji("😔", "sad", 2),
    emoji("😢", "crying", 1),
    emoji("😡", "angry", 1),
    emoji("😰", "anxious", 1),
];

pub fn entries() -> &'static [EmojiCatalogEntry] {
    &CATALOG
}

pub fn find(glyph: &str) -> Option<&'static EmojiCatalogEntry> {
    CATALOG.iter().find(|entry| entry.glyph == glyph)
}

/// Valence score for a glyph. Unknown or tampered glyphs score as neutral.
pub fn lookup_score(glyph: &str) -> u8 {
    find(glyph).map_or(NEUTRAL_SCORE, |entry| entry.score)
}

pub fn rows(width: usize) -> Vec<&'static [EmojiCatalogEntry]> {
    CATALOG.chunks(width.max(1)).collect()
}
