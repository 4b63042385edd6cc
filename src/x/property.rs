//! Decoding ICCCM/EWMH property values
//!
//! Textual properties arrive as null-separated byte strings; atom lists and
//! window ids arrive as 32-bit-aligned integer arrays in the connection's
//! byte order.

use x11rb::protocol::xproto::{Atom, Window as Xid};

/// Decode a null-separated text list.
///
/// A trailing element without its null terminator is kept (the
/// trailing-remainder rule), so `"firefox\0Firefox\0"` and
/// `"firefox\0Firefox"` decode identically.
pub(crate) fn text_list(value: &[u8]) -> Vec<String> {
    value
        .split(|&byte| byte == 0)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}

/// Decode a `WM_CLASS` value into its (instance, class) pair
pub(crate) fn class_pair(value: &[u8]) -> Option<(String, String)> {
    let mut parts = text_list(value);
    if parts.is_empty() {
        return None;
    }
    let class = if parts.len() > 1 {
        parts.swap_remove(1)
    } else {
        String::new()
    };
    Some((parts.swap_remove(0), class))
}

/// Decode a 32-bit integer array property value
pub(crate) fn card32_list(value: &[u8]) -> Vec<u32> {
    value
        .chunks_exact(4)
        .map(|bytes| u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect()
}

/// Decode an atom-list property value (e.g. `WM_PROTOCOLS`)
pub(crate) fn atom_list(value: &[u8]) -> Vec<Atom> {
    card32_list(value)
}

/// Decode the leading window id of a property value (e.g. `WM_TRANSIENT_FOR`)
pub(crate) fn first_window(value: &[u8]) -> Option<Xid> {
    card32_list(value).first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_list_splits_on_nulls() {
        assert_eq!(text_list(b"firefox\0Firefox\0"), vec!["firefox", "Firefox"]);
    }

    #[test]
    fn text_list_keeps_the_trailing_remainder() {
        assert_eq!(text_list(b"firefox\0Firefox"), vec!["firefox", "Firefox"]);
    }

    #[test]
    fn empty_value_decodes_to_nothing() {
        assert!(text_list(b"").is_empty());
        assert!(text_list(b"\0").is_empty());
        assert_eq!(class_pair(b""), None);
    }

    #[test]
    fn class_pair_is_instance_then_class() {
        assert_eq!(
            class_pair(b"firefox\0Firefox\0"),
            Some(("firefox".to_owned(), "Firefox".to_owned()))
        );
        assert_eq!(
            class_pair(b"xterm"),
            Some(("xterm".to_owned(), String::new()))
        );
    }

    #[test]
    fn card32_values_use_native_byte_order() {
        let mut value = Vec::new();
        for n in [1_u32, 0x0042, 0xdead_beef] {
            value.extend_from_slice(&n.to_ne_bytes());
        }
        assert_eq!(card32_list(&value), vec![1, 0x0042, 0xdead_beef]);
        assert_eq!(first_window(&value), Some(1));

        // a short tail is not a value
        value.push(0xff);
        assert_eq!(card32_list(&value).len(), 3);
    }
}
