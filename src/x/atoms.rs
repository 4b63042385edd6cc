//! Named protocol atoms and the session-owned atom cache

use std::{
    collections::HashMap,
    sync::Mutex,
};
use x11rb::{
    atom_manager,
    errors::ReplyError,
    protocol::xproto::{Atom, ConnectionExt},
    rust_connection::RustConnection,
};

// =============================== Atoms ==============================
// ====================================================================

// An `Atom` is a unique ID corresponding to a string name that is used to
// identify properties, types, and selections, stable for the life of the
// server. These are the ICCCM/EWMH names this engine speaks; everything
// else goes through the `AtomCache`.
atom_manager! {
    pub(crate) Atoms: AtomsCookie {
        // UTF-8 encoded string data, the type of the EWMH name properties
        UTF8_STRING,

        // ============ ICCCM client properties ============
        // Title or name of the window
        WM_NAME,
        // Title of the window's icon
        WM_ICON_NAME,
        // Consecutive null-terminated strings; instance and class names
        WM_CLASS,
        // ID of another top-level window this one is a pop-up for
        WM_TRANSIENT_FOR,
        // List of atoms identifying protocols between client and manager
        WM_PROTOCOLS,
        // Present if the client wants a say in its own deletion
        WM_DELETE_WINDOW,

        // ========== ICCCM window manager properties ======
        // Top-level windows not in withdrawn state carry this tag
        WM_STATE,

        // ============== EWMH root properties =============
        // Indicates which hints the manager supports
        _NET_SUPPORTED,

        // ========== EWMH application properties ==========
        // If set, preferred to WM_NAME
        _NET_WM_NAME,
        // Title of the icon (preferred over WM_ICON_NAME)
        _NET_WM_ICON_NAME,
    }
}

// ============================= AtomCache ============================
// ====================================================================

/// Memoized name <-> id resolution for arbitrary atoms.
///
/// Owned by the session rather than shared process-wide, so concurrent
/// sessions (e.g. under test) never cross-contaminate. Entries are
/// append-only: the protocol guarantees atom identity for the life of the
/// server, so a resolved pair is permanently correct. A failed round trip is
/// logged, not cached, and retried on the next call.
#[derive(Debug, Default)]
pub(crate) struct AtomCache {
    /// name -> id, filled by [`id`](Self::id) lookups
    ids:   Mutex<HashMap<String, Atom>>,
    /// id -> name, filled by both lookup directions
    names: Mutex<HashMap<Atom, String>>,
}

impl AtomCache {
    /// Create an empty [`AtomCache`]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Resolve a name to its atom, interning it on the server on a miss.
    ///
    /// Returns `x11rb::NONE` (and logs) if the round trip fails.
    pub(crate) fn id(&self, dpy: &RustConnection, name: &str) -> Atom {
        if let Some(&atom) = self
            .ids
            .lock()
            .expect("atom cache lock poisoned")
            .get(name)
        {
            return atom;
        }

        let resolved = dpy
            .intern_atom(false, name.as_bytes())
            .map_err(ReplyError::from)
            .and_then(|cookie| cookie.reply());

        match resolved {
            Ok(reply) => {
                log::debug!("interned atom `{}` as {}", name, reply.atom);
                self.ids
                    .lock()
                    .expect("atom cache lock poisoned")
                    .insert(name.to_owned(), reply.atom);
                self.names
                    .lock()
                    .expect("atom cache lock poisoned")
                    .insert(reply.atom, name.to_owned());
                reply.atom
            },
            Err(e) => {
                log::error!("failed to intern atom `{}`: {}", name, e);
                x11rb::NONE
            },
        }
    }

    /// Resolve an atom back to its name, asking the server on a miss.
    ///
    /// Returns the empty string (and logs) if the round trip fails.
    pub(crate) fn name(&self, dpy: &RustConnection, atom: Atom) -> String {
        if let Some(name) = self
            .names
            .lock()
            .expect("atom cache lock poisoned")
            .get(&atom)
        {
            return name.clone();
        }

        let resolved = dpy
            .get_atom_name(atom)
            .map_err(ReplyError::from)
            .and_then(|cookie| cookie.reply());

        match resolved {
            Ok(reply) => match String::from_utf8(reply.name) {
                Ok(name) => {
                    self.names
                        .lock()
                        .expect("atom cache lock poisoned")
                        .insert(atom, name.clone());
                    name
                },
                Err(e) => {
                    log::error!("atom {} has a non-UTF-8 name: {}", atom, e);
                    String::new()
                },
            },
            Err(e) => {
                log::error!("failed to resolve the name of atom {}: {}", atom, e);
                String::new()
            },
        }
    }
}
