//! Theme unlock ladder
//!
//! Static `(threshold, theme)` pairs. Two themes share threshold 10 and
//! unlock together.

use std::collections::BTreeSet;

use crate::domain::DEFAULT_THEME;

/// A theme and the level that unlocks it
#[derive(Debug, Clone, Copy)]
pub struct ThemeUnlock {
    pub threshold: u32,
    pub theme: &'static str,
}

/// All theme unlocks (sorted by threshold)
pub static THEME_LADDER: &[ThemeUnlock] = &[
    ThemeUnlock { threshold: 2, theme: "Light" },
    ThemeUnlock { threshold: 3, theme: "Dark" },
    ThemeUnlock { threshold: 4, theme: "material-light" },
    ThemeUnlock { threshold: 5, theme: "Galaxy" },
    ThemeUnlock { threshold: 6, theme: "material-dark" },
    ThemeUnlock { threshold: 7, theme: "Forest" },
    ThemeUnlock { threshold: 8, theme: "dracula" },
    ThemeUnlock { threshold: 10, theme: "Sunset" },
    ThemeUnlock { threshold: 10, theme: "nord" },
    ThemeUnlock { threshold: 12, theme: "solarized-light" },
    ThemeUnlock { threshold: 14, theme: "solarized-dark" },
    ThemeUnlock { threshold: 15, theme: "Neon" },
    ThemeUnlock { threshold: 16, theme: "monokai" },
    ThemeUnlock { threshold: 18, theme: "one-dark" },
    ThemeUnlock { threshold: 20, theme: "gruvbox-dark" },
    ThemeUnlock { threshold: 22, theme: "gruvbox-light" },
    ThemeUnlock { threshold: 24, theme: "oceanic" },
    ThemeUnlock { threshold: 26, theme: "synthwave" },
    ThemeUnlock { threshold: 28, theme: "night-owl" },
    ThemeUnlock { threshold: 30, theme: "tokyo-night" },
    ThemeUnlock { threshold: 32, theme: "ayu-light" },
];

/// Unlock every theme whose threshold `level` has reached.
///
/// Returns the newly unlocked themes in ladder order. Never removes.
pub fn unlock_for_level(level: u32, unlocked: &mut BTreeSet<String>) -> Vec<String> {
    let mut newly_unlocked = Vec::new();

    for unlock in THEME_LADDER.iter().filter(|u| level >= u.threshold) {
        if unlocked.insert(unlock.theme.to_string()) {
            newly_unlocked.push(unlock.theme.to_string());
        }
    }

    newly_unlocked
}

/// Whether the theme exists at all
pub fn is_known_theme(theme: &str) -> bool {
    theme == DEFAULT_THEME || THEME_LADDER.iter().any(|u| u.theme == theme)
}

/// Level needed for a theme (`None` for unknown themes)
pub fn threshold_for(theme: &str) -> Option<u32> {
    if theme == DEFAULT_THEME {
        return Some(1);
    }
    THEME_LADDER
        .iter()
        .find(|u| u.theme == theme)
        .map(|u| u.threshold)
}
