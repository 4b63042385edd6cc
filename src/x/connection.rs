//! The session's connection to the X server
//!
//! Thin checked wrappers around the requests the engine issues. Callers in
//! the bootstrap path propagate the [`Error`]; callers in the steady-state
//! path log and carry on, so one misbehaving client cannot take the manager
//! down.

use crate::{
    error::Error,
    geometry::{Dimension, Rectangle},
    x::{
        atoms::{AtomCache, Atoms},
        keymap::{MAX_KEYCODE, MIN_KEYCODE},
        property,
    },
};
use x11rb::{
    connection::Connection,
    errors::{ConnectionError, ReplyError},
    protocol::{
        xproto::{
            self,
            Atom,
            AtomEnum,
            ChangeWindowAttributesAux,
            ClientMessageEvent,
            ConfigureWindowAux,
            ConnectionExt,
            EventMask,
            GetInputFocusReply,
            GetKeyboardMappingReply,
            GetModifierMappingReply,
            Grab,
            GrabMode,
            InputFocus,
            Keycode,
            ModMask,
            PropMode,
            QueryPointerReply,
            Window as Xid,
        },
        ErrorKind,
        Event,
    },
    rust_connection::RustConnection,
    wrapper::ConnectionExt as _,
    CURRENT_TIME,
};

/// The ICCCM `WM_STATE` value for a window in normal (visible) state
const ICCCM_NORMAL_STATE: u32 = 1;

// ============================ XConnection ===========================
// ====================================================================

/// The main connection to the X-Server
pub(crate) struct XConnection {
    /// The actual [`Connection`](RustConnection)
    dpy:         RustConnection,
    /// The root window of the default screen
    root:        Xid,
    /// Size of the default screen
    screen_size: Dimension,
    /// The named [`Atoms`] the engine speaks
    atoms:       Atoms,
    /// Session-owned memoization for every other atom
    cache:       AtomCache,
}

impl XConnection {
    /// Connect to the display named by `$DISPLAY`
    pub(crate) fn connect() -> Result<Self, Error> {
        let (dpy, screen_num) = x11rb::connect(None)?;

        let screen = &dpy.setup().roots[screen_num];
        let root = screen.root;
        let screen_size = Dimension::new(
            u32::from(screen.width_in_pixels),
            u32::from(screen.height_in_pixels),
        );

        log::debug!("interning atoms");
        let atoms = Atoms::new(&dpy)?.reply()?;

        Ok(Self {
            dpy,
            root,
            screen_size,
            atoms,
            cache: AtomCache::new(),
        })
    }

    // ========================= Accessor =========================

    /// The root window of the default screen
    pub(crate) const fn root(&self) -> Xid {
        self.root
    }

    /// Size of the default screen
    pub(crate) const fn screen_size(&self) -> Dimension {
        self.screen_size
    }

    /// The named [`Atoms`] of the connection
    pub(crate) const fn atoms(&self) -> Atoms {
        self.atoms
    }

    /// Resolve an arbitrary atom name through the session cache
    pub(crate) fn atom(&self, name: &str) -> Atom {
        self.cache.id(&self.dpy, name)
    }

    /// Resolve an atom id back to its name through the session cache
    pub(crate) fn atom_name(&self, atom: Atom) -> String {
        self.cache.name(&self.dpy, atom)
    }

    // ====================== Window Manager ======================

    /// Make an attempt to become the window manager by claiming
    /// substructure redirection on the root window
    pub(crate) fn become_wm(&self) -> Result<(), Error> {
        log::debug!("attempting to become the window manager");
        let aux = ChangeWindowAttributesAux::new().event_mask(
            EventMask::SUBSTRUCTURE_REDIRECT
                | EventMask::SUBSTRUCTURE_NOTIFY
                | EventMask::PROPERTY_CHANGE,
        );

        match self.dpy.change_window_attributes(self.root, &aux)?.check() {
            Err(ReplyError::X11Error(ref err)) if err.error_kind == ErrorKind::Access =>
                Err(Error::AlreadyManaged),
            Err(err) => Err(err.into()),
            Ok(()) => Ok(()),
        }
    }

    /// Restore the root window's event mask to empty; part of teardown, so
    /// failures are only logged
    pub(crate) fn reset_root_mask(&self) {
        log::debug!("restoring the root window's event mask");
        let aux = ChangeWindowAttributesAux::new().event_mask(EventMask::NO_EVENT);
        let result = self
            .dpy
            .change_window_attributes(self.root, &aux)
            .map_err(ReplyError::from)
            .and_then(|cookie| cookie.check());
        if let Err(e) = result {
            log::warn!("failed to restore the root event mask: {}", e);
        }
        drop(self.dpy.flush());
    }

    /// Advertise the EWMH hints this engine implements via `_NET_SUPPORTED`
    pub(crate) fn advertise_supported(&self) -> Result<(), Error> {
        let supported = [
            self.atoms._NET_SUPPORTED,
            self.atoms._NET_WM_NAME,
            self.atoms._NET_WM_ICON_NAME,
        ];
        self.dpy
            .change_property32(
                PropMode::REPLACE,
                self.root,
                self.atoms._NET_SUPPORTED,
                AtomEnum::ATOM,
                &supported,
            )?
            .check()?;
        Ok(())
    }

    // ========================== Keyboard ========================

    /// Read the full keyboard mapping (keycodes 8-255)
    pub(crate) fn keyboard_mapping(&self) -> Result<GetKeyboardMappingReply, Error> {
        let count = (MAX_KEYCODE - MIN_KEYCODE + 1) as u8;
        Ok(self
            .dpy
            .get_keyboard_mapping(MIN_KEYCODE as Keycode, count)?
            .reply()?)
    }

    /// Read the modifier mapping
    pub(crate) fn modifier_mapping(&self) -> Result<GetModifierMappingReply, Error> {
        Ok(self.dpy.get_modifier_mapping()?.reply()?)
    }

    /// Release every key grab on the root window
    pub(crate) fn ungrab_all_keys(&self) -> Result<(), Error> {
        log::debug!("ungrabbing all keys on the root window");
        self.dpy
            .ungrab_key(Grab::ANY, self.root, ModMask::ANY)?
            .check()?;
        Ok(())
    }

    /// Grab one (modifier mask, keycode) combination on the root window
    pub(crate) fn grab_key(&self, mask: u16, keycode: Keycode) -> Result<(), Error> {
        log::debug!("grabbing keycode {} with mask {:#06x}", keycode, mask);
        self.dpy
            .grab_key(
                true,
                self.root,
                mask,
                keycode,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )?
            .check()
            .map_err(|_| Error::GrabFailed { mask, keycode })
    }

    // ========================== Requests ========================

    /// Select the given event mask on a window
    pub(crate) fn change_event_mask(&self, window: Xid, mask: EventMask) -> Result<(), Error> {
        self.dpy
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().event_mask(mask))?
            .check()?;
        Ok(())
    }

    /// Issue a checked configure request
    pub(crate) fn configure(&self, window: Xid, aux: &ConfigureWindowAux) -> Result<(), Error> {
        self.dpy.configure_window(window, aux)?.check()?;
        Ok(())
    }

    /// Map a window, waiting for the server's acknowledgment
    pub(crate) fn map_window(&self, window: Xid) -> Result<(), Error> {
        self.dpy.map_window(window)?.check()?;
        Ok(())
    }

    /// Destroy a window unconditionally
    pub(crate) fn destroy_window(&self, window: Xid) -> Result<(), Error> {
        self.dpy.destroy_window(window)?.check()?;
        Ok(())
    }

    /// Give a window the input focus
    pub(crate) fn focus_window(&self, window: Xid) -> Result<(), Error> {
        self.dpy
            .set_input_focus(InputFocus::PARENT, window, CURRENT_TIME)?
            .check()?;
        Ok(())
    }

    /// Return the input focus to pointer-root mode
    pub(crate) fn focus_pointer_root(&self) -> Result<(), Error> {
        self.dpy
            .set_input_focus(InputFocus::NONE, InputFocus::POINTER_ROOT, CURRENT_TIME)?
            .check()?;
        Ok(())
    }

    /// Move the pointer to the top-left corner of a window
    pub(crate) fn warp_pointer(&self, window: Xid) -> Result<(), Error> {
        self.dpy
            .warp_pointer(x11rb::NONE, window, 0, 0, 0, 0, 0, 0)?
            .check()?;
        Ok(())
    }

    /// Which window the pointer is currently over
    pub(crate) fn query_pointer(&self) -> Result<QueryPointerReply, Error> {
        Ok(self.dpy.query_pointer(self.root)?.reply()?)
    }

    /// Which window currently holds the input focus
    pub(crate) fn input_focus(&self) -> Result<GetInputFocusReply, Error> {
        Ok(self.dpy.get_input_focus()?.reply()?)
    }

    /// Send a `WM_PROTOCOLS` client message (e.g. `WM_DELETE_WINDOW`) to a
    /// window
    pub(crate) fn send_protocol_client_message(&self, window: Xid, atom: Atom) -> Result<(), Error> {
        log::debug!(
            "sending protocol message `{}` to Window({:#0x})",
            self.atom_name(atom),
            window
        );
        let data = [atom, CURRENT_TIME, 0, 0, 0];
        let event = ClientMessageEvent::new(32, window, self.atoms.WM_PROTOCOLS, data);
        self.dpy
            .send_event(false, window, EventMask::NO_EVENT, &event)?
            .check()?;
        self.flush()?;
        Ok(())
    }

    /// Tell a client its geometry is unchanged via a synthetic
    /// `ConfigureNotify` carrying the last known values
    pub(crate) fn send_configure_notify(
        &self,
        window: Xid,
        rect: Rectangle,
        border: u32,
    ) -> Result<(), Error> {
        let event = xproto::ConfigureNotifyEvent {
            response_type: xproto::CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: x11rb::NONE,
            x: rect.point.x as i16,
            y: rect.point.y as i16,
            width: rect.dimension.width as u16,
            height: rect.dimension.height as u16,
            border_width: border as u16,
            override_redirect: false,
        };
        self.dpy
            .send_event(false, window, EventMask::STRUCTURE_NOTIFY, &event)?
            .check()?;
        Ok(())
    }

    /// Wake the dispatch loop out of its blocking read with a synthetic
    /// client message on the root window
    pub(crate) fn wake(&self) -> Result<(), Error> {
        let event = ClientMessageEvent::new(32, self.root, self.atoms.WM_STATE, [0_u32; 5]);
        self.dpy
            .send_event(false, self.root, EventMask::SUBSTRUCTURE_NOTIFY, &event)?
            .check()?;
        self.flush()?;
        Ok(())
    }

    // ========================= Properties =======================

    /// Read a textual (null-separated) property
    pub(crate) fn text_property(&self, window: Xid, property: Atom) -> Result<Vec<String>, Error> {
        let reply = self
            .dpy
            .get_property(false, window, property, 0_u32, 0, u32::MAX)?
            .reply()?;
        Ok(property::text_list(&reply.value))
    }

    /// Read the `WM_CLASS` (instance, class) pair
    pub(crate) fn class_property(&self, window: Xid) -> Result<Option<(String, String)>, Error> {
        let reply = self
            .dpy
            .get_property(false, window, self.atoms.WM_CLASS, AtomEnum::STRING, 0, u32::MAX)?
            .reply()?;
        Ok(property::class_pair(&reply.value))
    }

    /// Read the window this one is transient for, if any
    pub(crate) fn transient_for(&self, window: Xid) -> Result<Option<Xid>, Error> {
        let reply = self
            .dpy
            .get_property(
                false,
                window,
                self.atoms.WM_TRANSIENT_FOR,
                AtomEnum::WINDOW,
                0,
                u32::MAX,
            )?
            .reply()?;
        Ok(property::first_window(&reply.value))
    }

    /// Read the `WM_PROTOCOLS` atom set
    pub(crate) fn protocols(&self, window: Xid) -> Result<Vec<Atom>, Error> {
        let reply = self
            .dpy
            .get_property(
                false,
                window,
                self.atoms.WM_PROTOCOLS,
                AtomEnum::ATOM,
                0,
                u32::MAX,
            )?
            .reply()?;
        Ok(property::atom_list(&reply.value))
    }

    /// Mark a window as being in the ICCCM normal state
    pub(crate) fn set_wm_state_normal(&self, window: Xid) -> Result<(), Error> {
        self.dpy
            .change_property32(
                PropMode::REPLACE,
                window,
                self.atoms.WM_STATE,
                self.atoms.WM_STATE,
                &[ICCCM_NORMAL_STATE, x11rb::NONE],
            )?
            .check()?;
        Ok(())
    }

    // ======================= Base Wrappers ======================

    /// Block until the next event arrives
    pub(crate) fn wait_for_event(&self) -> Result<Event, ConnectionError> {
        self.dpy.wait_for_event()
    }

    /// Flush pending requests to the server
    pub(crate) fn flush(&self) -> Result<(), Error> {
        self.dpy.flush()?;
        Ok(())
    }
}
