use indexmap::IndexSet;

const FAMILIES: [&str; 10] = [
    "sans-serif",
    "serif",
    "monospace",
    "cursive",
    "fantasy",
    "Arial",
    "Times New Roman",
    "Courier New",
    "Georgia",
    "Verdana",
];

const SIZES_PX: [u16; 8] = [12, 14, 16, 18, 20, 24, 28, 32];

/// Font families and preset sizes the composer toolbar offers.
#[derive(Debug, Clone)]
pub struct FontRegistry {
    families: IndexSet<&'static str>,
    sizes_px: Vec<u16>,
}

impl FontRegistry {
    pub fn contains_family(&self, family: &str) -> bool {
        self.families.contains(family)
    }

    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.families.iter().copied()
    }

    pub fn preset_sizes(&self) -> &[u16] {
        &self.sizes_px
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self {
            families: FAMILIES.into_iter().collect(),
            sizes_px: SIZES_PX.to_vec(),
        }
    }
}
