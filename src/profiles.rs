//! Compiled per-application profile and shortcut tables.
//!
//! Both watchers resolve the active window class through these books: the
//! focus watcher applies `(draw list, masks)` profiles, the shortcut watcher
//! looks up modifier combos. Everything is compiled to key indices at load
//! time so the hot paths never touch labels.

use std::collections::HashMap;

pub const MOD_CTRL: u8 = 1;
pub const MOD_SHIFT: u8 = 2;
pub const MOD_ALT: u8 = 4;
pub const MOD_SUPER: u8 = 8;

/// Parse a combo key like `"ctrl"`, `"ctrl+shift"`, `"super+alt"` into a
/// modifier bitmask. Unknown tokens invalidate the whole combo.
pub fn parse_modifier_mask(s: &str) -> Option<u8> {
    let mut mask = 0u8;
    for token in s.split('+') {
        mask |= match token.trim().to_ascii_lowercase().as_str() {
            "ctrl" | "control" => MOD_CTRL,
            "shift" => MOD_SHIFT,
            "alt" => MOD_ALT,
            "super" | "meta" | "win" => MOD_SUPER,
            _ => return None,
        };
    }
    if mask == 0 {
        None
    } else {
        Some(mask)
    }
}

/// One named `(draw list, masks)` bundle
#[derive(Debug, Clone)]
pub struct ProfileSpec {
    pub draw_list: Vec<usize>,
    pub masks: Vec<Vec<bool>>,
}

/// Profiles selected by active window class
#[derive(Debug, Clone, Default)]
pub struct ProfileBook {
    pub default_profile: String,
    pub class_to_profile: HashMap<String, String>,
    pub profiles: HashMap<String, ProfileSpec>,
}

impl ProfileBook {
    pub fn profile_name_for_class(&self, class: &str) -> &str {
        self.class_to_profile
            .get(class)
            .map(String::as_str)
            .unwrap_or(&self.default_profile)
    }

    /// Profile for a window class, falling back to the default profile.
    /// `None` when the resolved name has no profile data.
    pub fn resolve(&self, class: &str) -> Option<&ProfileSpec> {
        self.profiles.get(self.profile_name_for_class(class))
    }
}

/// One shortcut cheat sheet: overlay color plus modifier-mask → key indices
#[derive(Debug, Clone, Default)]
pub struct ShortcutSpec {
    pub color: Option<String>,
    pub combos: HashMap<u8, Vec<usize>>,
}

/// Shortcut profiles selected by active window class
#[derive(Debug, Clone, Default)]
pub struct ShortcutBook {
    pub default_shortcut: String,
    pub class_to_shortcut: HashMap<String, String>,
    pub shortcuts: HashMap<String, ShortcutSpec>,
}

impl ShortcutBook {
    pub fn shortcut_name_for_class(&self, class: &str) -> &str {
        self.class_to_shortcut
            .get(class)
            .map(String::as_str)
            .unwrap_or(&self.default_shortcut)
    }

    pub fn get(&self, name: &str) -> Option<&ShortcutSpec> {
        self.shortcuts.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_mask_parsing() {
        assert_eq!(parse_modifier_mask("ctrl"), Some(MOD_CTRL));
        assert_eq!(
            parse_modifier_mask("ctrl+shift"),
            Some(MOD_CTRL | MOD_SHIFT)
        );
        assert_eq!(parse_modifier_mask("Super"), Some(MOD_SUPER));
        assert_eq!(
            parse_modifier_mask("alt + meta"),
            Some(MOD_ALT | MOD_SUPER)
        );
        assert_eq!(parse_modifier_mask("hyper"), None);
        assert_eq!(parse_modifier_mask(""), None);
    }

    #[test]
    fn class_resolution_falls_back_to_default() {
        let mut book = ProfileBook {
            default_profile: "base".to_string(),
            ..Default::default()
        };
        book.class_to_profile
            .insert("firefox".to_string(), "browse".to_string());
        book.profiles.insert(
            "base".to_string(),
            ProfileSpec {
                draw_list: vec![0],
                masks: vec![vec![true]],
            },
        );

        assert_eq!(book.profile_name_for_class("firefox"), "browse");
        assert!(book.resolve("firefox").is_none());
        assert_eq!(book.profile_name_for_class("terminal"), "base");
        assert!(book.resolve("terminal").is_some());
    }
}
