//! A client window and the session's registry of them
//!
//! [`Window`] handles are cheap clones around shared state: the dispatch
//! loop keeps the cached attributes current while the embedding program
//! reads them and issues operations. Operations deliberately return nothing;
//! a client may disappear at any moment, so a failed request against it is
//! an event to log, not an error to handle.

use crate::{
    geometry::{Dimension, Point, Rectangle},
    x::connection::XConnection,
};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, RwLock},
};
use x11rb::protocol::xproto::{Atom, ConfigureWindowAux, StackMode};

/// A window's protocol-level identifier
pub type Xid = x11rb::protocol::xproto::Window;

// ============================ Attributes ============================
// ====================================================================

/// The cached state of a client window, kept current by the dispatch loop
#[derive(Debug, Default, Clone)]
pub(crate) struct Attributes {
    /// Last known position and size
    pub(crate) rect:      Rectangle,
    /// Last known border width in pixels
    pub(crate) border:    u32,
    /// Whether the window is currently visible
    pub(crate) mapped:    bool,
    /// The window's title
    pub(crate) name:      String,
    /// The title of the window's icon
    pub(crate) icon:      String,
    /// First half of `WM_CLASS`
    pub(crate) instance:  String,
    /// Second half of `WM_CLASS`
    pub(crate) class:     String,
    /// Whether the window is a pop-up for another window
    pub(crate) transient: bool,
    /// The `WM_PROTOCOLS` the client takes part in
    pub(crate) protocols: Vec<Atom>,
}

// ============================== Window ==============================
// ====================================================================

struct Inner {
    conn:   Arc<XConnection>,
    id:     Xid,
    parent: Xid,
    attrs:  RwLock<Attributes>,
}

/// A handle on one client window
#[derive(Clone)]
pub struct Window {
    inner: Arc<Inner>,
}

impl Window {
    pub(crate) fn new(conn: Arc<XConnection>, id: Xid, parent: Xid, attrs: Attributes) -> Self {
        Self {
            inner: Arc::new(Inner {
                conn,
                id,
                parent,
                attrs: RwLock::new(attrs),
            }),
        }
    }

    /// Read the cached attributes under the lock
    fn read<T>(&self, f: impl FnOnce(&Attributes) -> T) -> T {
        f(&self.inner.attrs.read().expect("window lock poisoned"))
    }

    /// Update the cached attributes under the lock
    pub(crate) fn write<T>(&self, f: impl FnOnce(&mut Attributes) -> T) -> T {
        f(&mut self.inner.attrs.write().expect("window lock poisoned"))
    }

    // ========================= Accessor =========================

    /// The window's protocol-level identifier
    #[must_use]
    pub fn id(&self) -> Xid {
        self.inner.id
    }

    /// The window's parent, usually the root window
    #[must_use]
    pub fn parent(&self) -> Xid {
        self.inner.parent
    }

    /// Last known position and size, read atomically
    #[must_use]
    pub fn geometry(&self) -> Rectangle {
        self.read(|a| a.rect)
    }

    /// Last known border width in pixels
    #[must_use]
    pub fn border_width(&self) -> u32 {
        self.read(|a| a.border)
    }

    /// Whether the window is currently visible
    #[must_use]
    pub fn mapped(&self) -> bool {
        self.read(|a| a.mapped)
    }

    /// The window's title
    #[must_use]
    pub fn name(&self) -> String {
        self.read(|a| a.name.clone())
    }

    /// The title of the window's icon
    #[must_use]
    pub fn icon(&self) -> String {
        self.read(|a| a.icon.clone())
    }

    /// The instance half of `WM_CLASS`
    #[must_use]
    pub fn instance(&self) -> String {
        self.read(|a| a.instance.clone())
    }

    /// The class half of `WM_CLASS`
    #[must_use]
    pub fn class(&self) -> String {
        self.read(|a| a.class.clone())
    }

    /// Whether the window is a pop-up for another window
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.read(|a| a.transient)
    }

    /// The `WM_PROTOCOLS` the client takes part in
    #[must_use]
    pub fn protocols(&self) -> Vec<Atom> {
        self.read(|a| a.protocols.clone())
    }

    /// Whether the client declared a protocol in `WM_PROTOCOLS`
    #[must_use]
    pub fn supports_protocol(&self, atom: Atom) -> bool {
        self.read(|a| a.protocols.contains(&atom))
    }

    /// Read an arbitrary textual property fresh from the server.
    ///
    /// Empty on any failure, including an unresolvable property name.
    #[must_use]
    pub fn text_property(&self, name: &str) -> Vec<String> {
        let atom = self.inner.conn.atom(name);
        if atom == x11rb::NONE {
            return Vec::new();
        }
        match self.inner.conn.text_property(self.inner.id, atom) {
            Ok(pieces) => pieces,
            Err(e) => {
                log::error!(
                    "failed to read `{}` of Window({:#0x}): {}",
                    name,
                    self.inner.id,
                    e
                );
                Vec::new()
            },
        }
    }

    // ======================== Operations ========================

    /// Move the window to a new position
    pub fn set_position(&self, point: Point) {
        let aux = ConfigureWindowAux::new().x(point.x).y(point.y);
        if let Err(e) = self.inner.conn.configure(self.inner.id, &aux) {
            log::error!("failed to move Window({:#0x}): {}", self.inner.id, e);
            return;
        }
        self.write(|a| a.rect.point = point);
    }

    /// Resize the window
    pub fn set_size(&self, dimension: Dimension) {
        let aux = ConfigureWindowAux::new()
            .width(dimension.width)
            .height(dimension.height);
        if let Err(e) = self.inner.conn.configure(self.inner.id, &aux) {
            log::error!("failed to resize Window({:#0x}): {}", self.inner.id, e);
            return;
        }
        self.write(|a| a.rect.dimension = dimension);
    }

    /// Move and resize the window in one request
    pub fn set_geometry(&self, rect: Rectangle) {
        let aux = ConfigureWindowAux::new()
            .x(rect.point.x)
            .y(rect.point.y)
            .width(rect.dimension.width)
            .height(rect.dimension.height);
        if let Err(e) = self.inner.conn.configure(self.inner.id, &aux) {
            log::error!(
                "failed to set the geometry of Window({:#0x}): {}",
                self.inner.id,
                e
            );
            return;
        }
        self.write(|a| a.rect = rect);
    }

    /// Restack the window in the given direction relative to an optional
    /// sibling
    fn restack(&self, mode: StackMode, sibling: Option<&Self>) {
        let mut aux = ConfigureWindowAux::new().stack_mode(mode);
        if let Some(sibling) = sibling {
            aux = aux.sibling(sibling.id());
        }
        if let Err(e) = self.inner.conn.configure(self.inner.id, &aux) {
            log::error!("failed to restack Window({:#0x}): {}", self.inner.id, e);
        }
    }

    /// Raise the window above a sibling, or to the top of the stack
    pub fn raise(&self, sibling: Option<&Self>) {
        self.restack(StackMode::ABOVE, sibling);
    }

    /// Lower the window below a sibling, or to the bottom of the stack
    pub fn lower(&self, sibling: Option<&Self>) {
        self.restack(StackMode::BELOW, sibling);
    }

    /// Raise the window only if it is occluded
    pub fn raise_if_occluded(&self, sibling: Option<&Self>) {
        self.restack(StackMode::TOP_IF, sibling);
    }

    /// Lower the window only if it occludes another
    pub fn lower_if_occluding(&self, sibling: Option<&Self>) {
        self.restack(StackMode::BOTTOM_IF, sibling);
    }

    /// Flip the window to whichever end of the stack resolves an occlusion
    pub fn flip_stacking(&self, sibling: Option<&Self>) {
        self.restack(StackMode::OPPOSITE, sibling);
    }

    /// Ask the window to go away.
    ///
    /// Clients taking part in `WM_DELETE_WINDOW` get a chance to object
    /// (or save their state); everything else is destroyed outright.
    pub fn destroy(&self) {
        let delete = self.inner.conn.atoms().WM_DELETE_WINDOW;
        if self.supports_protocol(delete) {
            if let Err(e) = self.inner.conn.send_protocol_client_message(self.inner.id, delete) {
                log::error!(
                    "failed to send the delete request to Window({:#0x}): {}",
                    self.inner.id,
                    e
                );
            }
        } else {
            self.kill();
        }
    }

    /// Destroy the window without asking
    pub fn kill(&self) {
        if let Err(e) = self.inner.conn.destroy_window(self.inner.id) {
            log::error!("failed to destroy Window({:#0x}): {}", self.inner.id, e);
        }
    }

    /// Give the window the input focus
    pub fn focus(&self) {
        if let Err(e) = self.inner.conn.focus_window(self.inner.id) {
            log::error!("failed to focus Window({:#0x}): {}", self.inner.id, e);
        }
    }

    /// Move the pointer to the window's top-left corner
    pub fn warp_pointer(&self) {
        if let Err(e) = self.inner.conn.warp_pointer(self.inner.id) {
            log::error!(
                "failed to warp the pointer to Window({:#0x}): {}",
                self.inner.id,
                e
            );
        }
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.inner.id)
            .field("name", &self.name())
            .finish()
    }
}

impl PartialEq for Window {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Window {}

// ============================= Registry =============================
// ====================================================================

/// Every window the session currently knows about, keyed by id
#[derive(Default)]
pub(crate) struct Registry {
    windows: RwLock<HashMap<Xid, Window>>,
}

impl Registry {
    pub(crate) fn get(&self, id: Xid) -> Option<Window> {
        self.windows
            .read()
            .expect("window registry lock poisoned")
            .get(&id)
            .cloned()
    }

    pub(crate) fn insert(&self, window: Window) {
        self.windows
            .write()
            .expect("window registry lock poisoned")
            .insert(window.id(), window);
    }

    pub(crate) fn remove(&self, id: Xid) -> Option<Window> {
        self.windows
            .write()
            .expect("window registry lock poisoned")
            .remove(&id)
    }

    pub(crate) fn all(&self) -> Vec<Window> {
        self.windows
            .read()
            .expect("window registry lock poisoned")
            .values()
            .cloned()
            .collect()
    }
}
