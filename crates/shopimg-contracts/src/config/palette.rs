use anyhow::{bail, Context, Result};
use indexmap::IndexMap;

pub const DEFAULT_FALLBACK_HEX: &str = "#6B7280";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#RRGGBB` (the leading `#` is optional).
    pub fn parse_hex(raw: &str) -> Result<Self> {
        let trimmed = raw.trim().trim_start_matches('#');
        if trimmed.len() != 6 {
            bail!("invalid color '{raw}': expected #RRGGBB");
        }
        let bytes = hex::decode(trimmed).with_context(|| format!("invalid color '{raw}'"))?;
        Ok(Self::new(bytes[0], bytes[1], bytes[2]))
    }

    pub fn to_hex(&self) -> String {
        format!("#{}", hex::encode_upper([self.r, self.g, self.b]))
    }

    pub fn channels(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Category name to placeholder fill colour.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPalette {
    colors: IndexMap<String, Color>,
    fallback: Color,
}

impl ColorPalette {
    pub fn new(colors: IndexMap<String, Color>, fallback: Color) -> Self {
        Self { colors, fallback }
    }

    pub fn builtin() -> Self {
        let mut colors = IndexMap::new();
        let mut insert = |category: &str, r: u8, g: u8, b: u8| {
            colors.insert(category.to_string(), Color::new(r, g, b));
        };
        insert("Electronics", 0x3B, 0x82, 0xF6);
        insert("Clothing", 0xEF, 0x44, 0x44);
        insert("Books", 0x10, 0xB9, 0x81);
        insert("Home & Garden", 0xF5, 0x9E, 0x0B);
        insert("Sports & Outdoors", 0x8B, 0x5C, 0xF6);
        insert("Health & Beauty", 0xEC, 0x48, 0x99);
        Self::new(colors, Color::new(0x6B, 0x72, 0x80))
    }

    pub fn get(&self, category: &str) -> Option<Color> {
        self.colors.get(category).copied()
    }

    /// Never fails: unknown categories get the neutral fallback.
    pub fn color_for(&self, category: &str) -> Color {
        self.get(category).unwrap_or(self.fallback)
    }

    pub fn fallback(&self) -> Color {
        self.fallback
    }

    pub fn set_fallback(&mut self, color: Color) {
        self.fallback = color;
    }

    pub fn insert(&mut self, category: impl Into<String>, color: Color) {
        self.colors.insert(category.into(), color);
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.colors.keys().map(String::as_str)
    }

    /// Overlays `#RRGGBB` entries, replacing colours of existing categories.
    pub fn merge_hex(&mut self, entries: &IndexMap<String, String>) -> Result<()> {
        for (category, raw) in entries {
            let color = Color::parse_hex(raw)
                .with_context(|| format!("palette entry for category '{category}'"))?;
            self.insert(category.clone(), color);
        }
        Ok(())
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::builtin()
    }
}
