use std::collections::BTreeMap;

/// Colour tag used when a range carries none.
pub const DEFAULT_COLOR: &str = "yellow";

/// Maps logical colour tags to the presentation value written on markers.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    default_tag: String,
    colors: BTreeMap<String, String>,
}

impl Default for Palette {
    fn default() -> Self {
        let colors = [
            ("yellow", "#fef08a"),
            ("green", "#bbf7d0"),
            ("blue", "#bfdbfe"),
            ("pink", "#fbcfe8"),
            ("purple", "#e9d5ff"),
        ]
        .into_iter()
        .map(|(tag, value)| (tag.to_string(), value.to_string()))
        .collect();

        Self {
            default_tag: DEFAULT_COLOR.to_string(),
            colors,
        }
    }
}

impl Palette {
    /// Build a palette from configured entries. The default tag keeps the
    /// built-in value unless the entries override it.
    pub fn new(default_tag: impl Into<String>, entries: BTreeMap<String, String>) -> Self {
        let mut palette = Self::default();
        palette.default_tag = default_tag.into();
        palette.colors.extend(entries);
        palette
    }

    pub fn default_tag(&self) -> &str {
        &self.default_tag
    }

    /// Resolve the tag a marker should carry. Unknown tags fall back to the default.
    pub fn tag_for<'a>(&'a self, color: Option<&'a str>) -> &'a str {
        match color {
            Some(tag) if self.colors.contains_key(tag) => tag,
            _ => &self.default_tag,
        }
    }

    /// Presentation value (CSS colour) for a logical tag.
    pub fn presentation(&self, color: Option<&str>) -> &str {
        let tag = self.tag_for(color);
        self.colors
            .get(tag)
            .map(String::as_str)
            .unwrap_or("#fef08a")
    }
}
