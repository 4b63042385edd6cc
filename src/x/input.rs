//! Key input into the window manager

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{EnumIter, IntoEnumIterator};
use x11rb::protocol::xproto::{Keysym, ModMask as XModMask};

// ============================== ModMask =============================
// ====================================================================

/// Keycode modifier that is held
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum ModMask {
    /// Left or right `shift` key
    Shift,
    /// The lock modifier, usually caps-lock
    Lock,
    /// Left or right `control` key
    #[serde(alias = "ctrl")]
    Control,
    /// Modifier 1 as defined in `xmodmap` (usually `alt`)
    Mod1,
    /// Modifier 2 as defined in `xmodmap` (usually `num-lock`)
    Mod2,
    /// Modifier 3 as defined in `xmodmap` (usually blank)
    Mod3,
    /// Modifier 4 as defined in `xmodmap` (usually `super`)
    Mod4,
    /// Modifier 5 as defined in `xmodmap` (usually `mode_shift`)
    Mod5,
}

impl ModMask {
    /// Was this modifier held in the given key-state field?
    #[must_use]
    pub fn was_held(self, mask: u16) -> bool {
        mask & u16::from(self) > 0
    }
}

/// Convert to an [`x11rb`] [`ModMask`](XModMask)
impl From<ModMask> for XModMask {
    fn from(m: ModMask) -> Self {
        match m {
            ModMask::Shift => Self::SHIFT,
            ModMask::Lock => Self::LOCK,
            ModMask::Control => Self::CONTROL,
            ModMask::Mod1 => Self::M1,
            ModMask::Mod2 => Self::M2,
            ModMask::Mod3 => Self::M3,
            ModMask::Mod4 => Self::M4,
            ModMask::Mod5 => Self::M5,
        }
    }
}

impl From<ModMask> for u16 {
    fn from(m: ModMask) -> Self {
        Self::from(XModMask::from(m))
    }
}

impl fmt::Display for ModMask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Shift => "shift",
            Self::Lock => "lock",
            Self::Control => "control",
            Self::Mod1 => "mod1",
            Self::Mod2 => "mod2",
            Self::Mod3 => "mod3",
            Self::Mod4 => "mod4",
            Self::Mod5 => "mod5",
        })
    }
}

// ============================== Stroke ==============================
// ====================================================================

/// The eight modifier bits of a key-state field; everything above them
/// reports pointer buttons
const MODIFIER_BITS: u16 = 0x00ff;

/// A normalized (modifier mask, key symbol) pair representing one logical
/// keybinding trigger.
///
/// A [`Stroke`] is immutable: it is built once per physical key press, after
/// the lock modifiers have been stripped, and compared against the strokes
/// the session was configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stroke {
    /// Held modifier mask
    pub modifiers: u16,
    /// The key symbol that was pressed
    pub sym:       Keysym,
}

impl Stroke {
    /// Create a new [`Stroke`] from the modifiers that must be held
    #[must_use]
    pub fn new(modifiers: &[ModMask], sym: Keysym) -> Self {
        Self {
            modifiers: modifiers.iter().fold(0, |acc, &m| acc | u16::from(m)),
            sym,
        }
    }

    /// Decode a raw key-press state into a logical [`Stroke`].
    ///
    /// Caps-lock, the resolved num-lock modifier, and the pointer-button
    /// bits are stripped, so a binding fires identically whichever lock keys
    /// happen to be latched.
    #[must_use]
    pub(crate) fn normalized(state: u16, sym: Keysym, numlock_mask: u16) -> Self {
        let ignored = u16::from(ModMask::Lock) | numlock_mask;
        Self {
            modifiers: state & MODIFIER_BITS & !ignored,
            sym,
        }
    }

    /// The held modifiers, decomposed
    #[must_use]
    pub fn held(&self) -> Vec<ModMask> {
        ModMask::iter()
            .filter(|m| m.was_held(self.modifiers))
            .collect()
    }
}

impl fmt::Display for Stroke {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for modifier in self.held() {
            write!(f, "{}+", modifier)?;
        }
        write!(f, "{:#x}", self.sym)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{keysym, x::keymap::lock_combinations};

    #[test]
    fn stroke_mask_builds_from_modifier_list() {
        let stroke = Stroke::new(&[ModMask::Mod4, ModMask::Shift], keysym::XK_RETURN);
        assert_eq!(stroke.modifiers, 0x0040 | 0x0001);
        assert_eq!(stroke.held(), vec![ModMask::Shift, ModMask::Mod4]);
    }

    #[test]
    fn lock_bits_do_not_change_the_stroke() {
        let numlock = u16::from(ModMask::Mod2);
        let base = Stroke::new(&[ModMask::Mod4], keysym::XK_RETURN);

        for combo in lock_combinations(numlock) {
            let decoded = Stroke::normalized(base.modifiers | combo, keysym::XK_RETURN, numlock);
            assert_eq!(decoded, base);
        }
    }

    #[test]
    fn pointer_button_bits_are_stripped() {
        // Button1 is reported as bit 8 of the state field
        let state = u16::from(ModMask::Control) | 0x0100;
        let decoded = Stroke::normalized(state, keysym::XK_F1, 0);
        assert_eq!(decoded, Stroke::new(&[ModMask::Control], keysym::XK_F1));
    }

    #[test]
    fn display_lists_held_modifiers() {
        let stroke = Stroke::new(&[ModMask::Control, ModMask::Mod1], keysym::XK_TAB);
        assert_eq!(stroke.to_string(), "control+mod1+0xff09");
    }
}
