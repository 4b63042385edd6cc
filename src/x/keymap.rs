//! Keyboard and modifier mapping tables
//!
//! Both tables are read from the server exactly once at bootstrap and are
//! immutable afterwards, so they need no synchronization.

use std::collections::HashMap;
use x11rb::protocol::xproto::{
    GetKeyboardMappingReply,
    GetModifierMappingReply,
    Keycode,
    Keysym,
    ModMask as XModMask,
};

/// The lowest keycode the core protocol can deliver
pub(crate) const MIN_KEYCODE: usize = 8;
/// The highest keycode the core protocol can deliver
pub(crate) const MAX_KEYCODE: usize = 255;

// ============================== Keymap ==============================
// ====================================================================

/// Bidirectional keycode <-> keysym tables.
///
/// One symbol may be bound to several physical keys; grabbing logic must
/// cover all of them, which is why [`codes_for_sym`](Self::codes_for_sym)
/// returns a list.
#[derive(Debug, Clone)]
pub(crate) struct Keymap {
    /// All symbol slots per keycode, indexed by keycode
    code_to_syms: Vec<Vec<Keysym>>,
    /// Every keycode a symbol is bound to
    sym_to_codes: HashMap<Keysym, Vec<Keycode>>,
}

impl Keymap {
    /// Build the tables from the server's keyboard-mapping reply
    pub(crate) fn from_reply(reply: &GetKeyboardMappingReply) -> Self {
        Self::from_table(reply.keysyms_per_keycode, &reply.keysyms)
    }

    /// Build the tables from a raw symbol table holding
    /// `keysyms_per_keycode` slots for every keycode starting at
    /// [`MIN_KEYCODE`]. Null slots are skipped.
    pub(crate) fn from_table(keysyms_per_keycode: u8, keysyms: &[Keysym]) -> Self {
        let per = keysyms_per_keycode as usize;
        let mut code_to_syms = vec![Vec::new(); MAX_KEYCODE + 1];
        let mut sym_to_codes: HashMap<Keysym, Vec<Keycode>> = HashMap::new();

        for code in MIN_KEYCODE..=MAX_KEYCODE {
            let start = (code - MIN_KEYCODE) * per;
            for &sym in keysyms.get(start..start + per).unwrap_or(&[]) {
                if sym == x11rb::NONE {
                    continue;
                }
                code_to_syms[code].push(sym);
                sym_to_codes.entry(sym).or_default().push(code as Keycode);
            }
        }

        Self { code_to_syms, sym_to_codes }
    }

    /// All symbols bound to a physical key, in slot order
    pub(crate) fn syms_for_code(&self, code: Keycode) -> &[Keysym] {
        self.code_to_syms
            .get(usize::from(code))
            .map_or(&[], Vec::as_slice)
    }

    /// Every physical key the symbol is bound to
    pub(crate) fn codes_for_sym(&self, sym: Keysym) -> &[Keycode] {
        self.sym_to_codes.get(&sym).map_or(&[], Vec::as_slice)
    }

    /// The slot-0 symbol of a physical key.
    ///
    /// Shift-level variants in the remaining slots are intentionally not
    /// consulted when decoding a live key press.
    pub(crate) fn first_sym(&self, code: Keycode) -> Option<Keysym> {
        self.syms_for_code(code).first().copied()
    }
}

// ============================ ModifierMap ===========================
// ====================================================================

/// The eight modifier slots and the keycodes bound to each
#[derive(Debug, Clone)]
pub(crate) struct ModifierMap {
    /// Number of keycodes the server reports per modifier slot
    keycodes_per_modifier: u8,
    /// The flattened 8 x `keycodes_per_modifier` table
    keycodes:              Vec<Keycode>,
}

impl ModifierMap {
    /// Build the table from the server's modifier-mapping reply.
    ///
    /// The slot width is not a wire field; the reply computes it from the
    /// keycode list length.
    pub(crate) fn from_reply(reply: GetModifierMappingReply) -> Self {
        let keycodes_per_modifier = reply.keycodes_per_modifier();
        Self::from_table(keycodes_per_modifier, reply.keycodes)
    }

    /// Build the table from its raw parts
    pub(crate) fn from_table(keycodes_per_modifier: u8, keycodes: Vec<Keycode>) -> Self {
        Self { keycodes_per_modifier, keycodes }
    }

    /// Locate which of the eight modifier slots carries a keycode bound to
    /// `sym`, returned as that slot's modifier mask.
    ///
    /// `None` means no keycode bound to the symbol sits in any slot, e.g. a
    /// keyboard without a num-lock key.
    pub(crate) fn mask_for_sym(&self, sym: Keysym, keymap: &Keymap) -> Option<u16> {
        const MASKS: [XModMask; 8] = [
            XModMask::SHIFT,
            XModMask::LOCK,
            XModMask::CONTROL,
            XModMask::M1,
            XModMask::M2,
            XModMask::M3,
            XModMask::M4,
            XModMask::M5,
        ];

        let per = usize::from(self.keycodes_per_modifier).max(1);
        for &code in keymap.codes_for_sym(sym) {
            for (index, slot) in self.keycodes.chunks(per).enumerate().take(MASKS.len()) {
                if slot.contains(&code) {
                    return Some(u16::from(MASKS[index]));
                }
            }
        }

        None
    }
}

/// The lock-modifier combinations a grab must cover so the binding fires
/// regardless of caps-lock/num-lock state
pub(crate) fn lock_combinations(numlock_mask: u16) -> [u16; 4] {
    let caps = u16::from(XModMask::LOCK);
    [0, caps, numlock_mask, caps | numlock_mask]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keysym;

    /// Two slots per keycode; keycode 8 and 10 both carry Return
    fn sample_keymap() -> Keymap {
        let mut table = vec![0; 2 * (MAX_KEYCODE - MIN_KEYCODE + 1)];
        table[0] = keysym::XK_RETURN; // keycode 8, slot 0
        table[2] = u32::from('a'); // keycode 9, slot 0
        table[3] = u32::from('A'); // keycode 9, slot 1
        table[4] = keysym::XK_RETURN; // keycode 10, slot 0
        table[6] = keysym::XK_NUM_LOCK; // keycode 11, slot 0
        Keymap::from_table(2, &table)
    }

    #[test]
    fn null_slots_are_skipped() {
        let keymap = sample_keymap();
        assert_eq!(keymap.syms_for_code(8), &[keysym::XK_RETURN]);
        assert!(keymap.syms_for_code(12).is_empty());
        assert_eq!(keymap.first_sym(12), None);
    }

    #[test]
    fn one_sym_may_cover_several_keycodes() {
        let keymap = sample_keymap();
        assert_eq!(keymap.codes_for_sym(keysym::XK_RETURN), &[8, 10]);
    }

    #[test]
    fn live_decoding_selects_slot_zero() {
        let keymap = sample_keymap();
        assert_eq!(keymap.first_sym(9), Some(u32::from('a')));
        assert_eq!(keymap.syms_for_code(9), &[u32::from('a'), u32::from('A')]);
    }

    #[test]
    fn numlock_slot_resolves_to_its_mask() {
        let keymap = sample_keymap();
        // Slot 4 (Mod2) holds keycode 11, which carries Num_Lock
        let mut mods = vec![0; 16];
        mods[8] = 11;
        let modmap = ModifierMap::from_table(2, mods);

        assert_eq!(
            modmap.mask_for_sym(keysym::XK_NUM_LOCK, &keymap),
            Some(u16::from(XModMask::M2))
        );
        assert_eq!(modmap.mask_for_sym(keysym::XK_CAPS_LOCK, &keymap), None);
    }

    #[test]
    fn modifier_reply_slot_width_comes_from_the_list_length() {
        // 16 keycodes over 8 slots means 2 per slot; keycode 11 lands in
        // slot 4 (Mod2)
        let mut keycodes = vec![0; 16];
        keycodes[8] = 11;
        let reply = GetModifierMappingReply { sequence: 0, length: 4, keycodes };
        let modmap = ModifierMap::from_reply(reply);

        assert_eq!(
            modmap.mask_for_sym(keysym::XK_NUM_LOCK, &sample_keymap()),
            Some(u16::from(XModMask::M2))
        );
    }

    #[test]
    fn grabs_cover_all_four_lock_combinations() {
        let numlock = u16::from(XModMask::M2);
        let caps = u16::from(XModMask::LOCK);
        assert_eq!(lock_combinations(numlock), [0, caps, numlock, caps | numlock]);
    }
}
