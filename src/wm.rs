//! The window manager session and its event dispatch loop
//!
//! [`Session::open`] claims the display, grabs the configured keybindings,
//! and spawns one background thread that turns raw protocol events into
//! registry updates and [`Notifications`]. [`Session::close`] unwinds all of
//! that and hands the display back.

use crate::{
    config::Config,
    error::Error,
    events::{self, Notifications, ResizeRequest, Sinks},
    geometry::{Dimension, Point, Rectangle},
    keysym,
    window::{Attributes, Registry, Window, Xid},
    x::{
        connection::XConnection,
        input::Stroke,
        keymap::{lock_combinations, Keymap, ModifierMap},
    },
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};
use x11rb::protocol::{
    xproto::{
        Atom,
        ClientMessageEvent,
        ConfigWindow,
        ConfigureRequestEvent,
        ConfigureWindowAux,
        CreateNotifyEvent,
        DestroyNotifyEvent,
        EventMask,
        KeyPressEvent,
        MapRequestEvent,
        PropertyNotifyEvent,
        UnmapNotifyEvent,
    },
    Event,
};

// ============================== Session =============================
// ====================================================================

/// An open window manager session on the default screen.
///
/// Dropping a [`Session`] without calling [`close`](Self::close) leaks the
/// dispatch thread; close it.
pub struct Session {
    conn:        Arc<XConnection>,
    registry:    Arc<Registry>,
    /// The notification channels fed by the dispatch loop
    pub events:  Notifications,
    closing:     Arc<AtomicBool>,
    loop_thread: JoinHandle<()>,
}

impl Session {
    /// Claim the display, grab the configured strokes, and start the
    /// dispatch loop.
    ///
    /// Fails with [`Error::AlreadyManaged`] if another manager owns the
    /// display, [`Error::UnmappedKeysym`] if a configured stroke names a
    /// symbol the keyboard does not carry, and [`Error::GrabFailed`] if a
    /// grab is rejected.
    pub fn open(config: Config) -> Result<Self, Error> {
        let conn = Arc::new(XConnection::connect()?);
        conn.become_wm()?;

        let keymap = Keymap::from_reply(&conn.keyboard_mapping()?);
        let modmap = ModifierMap::from_reply(conn.modifier_mapping()?);
        let numlock_mask = modmap
            .mask_for_sym(keysym::XK_NUM_LOCK, &keymap)
            .unwrap_or_else(|| {
                log::warn!("no num-lock key found; grabs will ignore it");
                0
            });

        conn.ungrab_all_keys()?;
        for stroke in &config.strokes {
            let codes = keymap.codes_for_sym(stroke.sym);
            if codes.is_empty() {
                return Err(Error::UnmappedKeysym(stroke.sym));
            }
            for combo in lock_combinations(numlock_mask) {
                for &code in codes {
                    conn.grab_key(stroke.modifiers | combo, code)?;
                }
            }
        }

        conn.advertise_supported()?;
        conn.flush()?;

        let registry = Arc::new(Registry::default());
        let closing = Arc::new(AtomicBool::new(false));
        let (sinks, notifications) = events::channels(config.channel_bound.unwrap_or(0));

        let dispatch = Dispatch {
            conn: Arc::clone(&conn),
            registry: Arc::clone(&registry),
            keymap,
            numlock_mask,
            sinks,
            closing: Arc::clone(&closing),
        };
        let loop_thread = thread::spawn(move || dispatch.run());

        log::info!("session open on root Window({:#0x})", conn.root());
        Ok(Self {
            conn,
            registry,
            events: notifications,
            closing,
            loop_thread,
        })
    }

    /// Stop the dispatch loop and release the display.
    ///
    /// Safe to call while the loop is blocked mid-delivery: dropping the
    /// notification receivers unblocks it before the wake-up is sent.
    pub fn close(self) {
        let Self {
            conn,
            registry: _,
            events,
            closing,
            loop_thread,
        } = self;

        log::info!("closing the session");
        closing.store(true, Ordering::SeqCst);
        drop(events);
        if let Err(e) = conn.wake() {
            log::warn!("failed to wake the dispatch loop: {}", e);
        }
        if loop_thread.join().is_err() {
            log::error!("the dispatch loop panicked");
        }
        conn.reset_root_mask();
    }

    // ========================= Accessor =========================

    /// The root window of the managed screen
    #[must_use]
    pub fn root(&self) -> Xid {
        self.conn.root()
    }

    /// Size of the managed screen in pixels
    #[must_use]
    pub fn screen_size(&self) -> Dimension {
        self.conn.screen_size()
    }

    /// Every window the session currently knows about
    #[must_use]
    pub fn windows(&self) -> Vec<Window> {
        self.registry.all()
    }

    /// Look up a managed window by its protocol id
    #[must_use]
    pub fn window(&self, id: Xid) -> Option<Window> {
        self.registry.get(id)
    }

    /// The managed window currently under the pointer, if any
    #[must_use]
    pub fn pointed_window(&self) -> Option<Window> {
        match self.conn.query_pointer() {
            Ok(reply) => self.registry.get(reply.child),
            Err(e) => {
                log::error!("failed to query the pointer: {}", e);
                None
            },
        }
    }

    /// The managed window currently holding the input focus, if any
    #[must_use]
    pub fn focused_window(&self) -> Option<Window> {
        match self.conn.input_focus() {
            Ok(reply) => self.registry.get(reply.focus),
            Err(e) => {
                log::error!("failed to query the input focus: {}", e);
                None
            },
        }
    }

    /// Return the input focus to pointer-root mode
    pub fn focus_pointer_root(&self) {
        if let Err(e) = self.conn.focus_pointer_root() {
            log::error!("failed to focus the pointer root: {}", e);
        }
    }

    /// Resolve an atom name, caching the result for the session
    #[must_use]
    pub fn atom(&self, name: &str) -> Atom {
        self.conn.atom(name)
    }

    /// Resolve an atom id back to its name
    #[must_use]
    pub fn atom_name(&self, atom: Atom) -> String {
        self.conn.atom_name(atom)
    }
}

// ============================= Dispatch =============================
// ====================================================================

/// The dispatch loop's working state, owned by its thread
struct Dispatch {
    conn:         Arc<XConnection>,
    registry:     Arc<Registry>,
    keymap:       Keymap,
    numlock_mask: u16,
    sinks:        Sinks,
    closing:      Arc<AtomicBool>,
}

impl Dispatch {
    /// Block on the event stream until the session closes or the connection
    /// dies
    fn run(self) {
        loop {
            let event = match self.conn.wait_for_event() {
                Ok(event) => event,
                Err(e) => {
                    log::error!("connection to the server died: {}", e);
                    break;
                },
            };
            if self.closing.load(Ordering::SeqCst) {
                break;
            }
            self.handle_event(event);
        }
        log::debug!("dispatch loop finished");
    }

    fn handle_event(&self, event: Event) {
        match event {
            Event::CreateNotify(ev) => self.on_create_notify(&ev),
            Event::ConfigureRequest(ev) => self.on_configure_request(&ev),
            Event::MapRequest(ev) => self.on_map_request(&ev),
            Event::UnmapNotify(ev) => self.on_unmap_notify(&ev),
            Event::DestroyNotify(ev) => self.on_destroy_notify(&ev),
            Event::KeyPress(ev) => self.on_key_press(&ev),
            Event::PropertyNotify(ev) => self.on_property_notify(&ev),
            Event::ClientMessage(ev) => self.on_client_message(&ev),
            // Mapping and geometry are confirmed at request time; releases
            // carry no binding semantics
            Event::ConfigureNotify(_) | Event::MapNotify(_) | Event::KeyRelease(_) => {},
            Event::Error(err) => log::warn!("request failed: {:?}", err),
            other => log::trace!("ignoring {:?}", other),
        }
    }

    /// A window came into existence; start tracking it
    fn on_create_notify(&self, ev: &CreateNotifyEvent) {
        if ev.override_redirect {
            log::debug!("ignoring override-redirect Window({:#0x})", ev.window);
            return;
        }

        let atoms = self.conn.atoms();
        let mut attrs = Attributes {
            rect: Rectangle::new(
                Point::new(i32::from(ev.x), i32::from(ev.y)),
                Dimension::new(u32::from(ev.width), u32::from(ev.height)),
            ),
            border: u32::from(ev.border_width),
            ..Attributes::default()
        };
        attrs.name = self.read_text(ev.window, atoms._NET_WM_NAME, atoms.WM_NAME);
        attrs.icon = self.read_text(ev.window, atoms._NET_WM_ICON_NAME, atoms.WM_ICON_NAME);

        match self.conn.class_property(ev.window) {
            Ok(Some((instance, class))) => {
                attrs.instance = instance;
                attrs.class = class;
            },
            Ok(None) => {},
            Err(e) => log::error!("failed to read the class of Window({:#0x}): {}", ev.window, e),
        }
        match self.conn.transient_for(ev.window) {
            Ok(leader) => attrs.transient = leader.is_some(),
            Err(e) => log::error!(
                "failed to read the transient leader of Window({:#0x}): {}",
                ev.window,
                e
            ),
        }
        match self.conn.protocols(ev.window) {
            Ok(protocols) => attrs.protocols = protocols,
            Err(e) => log::error!(
                "failed to read the protocols of Window({:#0x}): {}",
                ev.window,
                e
            ),
        }

        if let Err(e) = self.conn.change_event_mask(ev.window, EventMask::PROPERTY_CHANGE) {
            log::error!("failed to watch Window({:#0x}): {}", ev.window, e);
        }
        if let Err(e) = self.conn.set_wm_state_normal(ev.window) {
            log::error!(
                "failed to set the state of Window({:#0x}): {}",
                ev.window,
                e
            );
        }

        log::debug!("tracking Window({:#0x}) `{}`", ev.window, attrs.name);
        self.registry.insert(Window::new(
            Arc::clone(&self.conn),
            ev.window,
            ev.parent,
            attrs,
        ));
    }

    /// A client asked to be reconfigured.
    ///
    /// Unmapped and unknown windows get what they asked for verbatim. Mapped
    /// windows stay put: the client is told its geometry is unchanged, and a
    /// size request is surfaced as a [`ResizeRequest`] for the embedding
    /// program to rule on.
    fn on_configure_request(&self, ev: &ConfigureRequestEvent) {
        if let Some(window) = self.registry.get(ev.window).filter(Window::mapped) {
            let echo = self
                .conn
                .send_configure_notify(ev.window, window.geometry(), window.border_width());
            if let Err(e) = echo {
                log::error!(
                    "failed to echo the geometry of Window({:#0x}): {}",
                    ev.window,
                    e
                );
            }
            if let Some((width, height)) = requested_resize(ev.value_mask, ev.width, ev.height) {
                events::deliver(
                    &self.sinks.resize_requests,
                    "resize",
                    ResizeRequest { width, height, window },
                );
            }
            return;
        }

        let aux = ConfigureWindowAux::from_configure_request(ev);
        if let Err(e) = self.conn.configure(ev.window, &aux) {
            log::error!("failed to configure Window({:#0x}): {}", ev.window, e);
            return;
        }
        // Keep the cached geometry current for a tracked-but-unmapped
        // window, so the first echo after it maps reports what was applied
        if let Some(window) = self.registry.get(ev.window) {
            window.write(|a| apply_requested_geometry(a, ev));
        }
    }

    /// A client asked to become visible; map it and confirm before telling
    /// anyone
    fn on_map_request(&self, ev: &MapRequestEvent) {
        if let Err(e) = self.conn.map_window(ev.window) {
            log::error!("failed to map Window({:#0x}): {}", ev.window, e);
            return;
        }
        if let Some(window) = self.registry.get(ev.window) {
            window.write(|a| a.mapped = true);
            events::deliver(&self.sinks.mapped, "mapped", window);
        }
    }

    fn on_unmap_notify(&self, ev: &UnmapNotifyEvent) {
        if let Some(window) = self.registry.get(ev.window) {
            window.write(|a| a.mapped = false);
            events::deliver(&self.sinks.unmapped, "unmapped", window);
        }
    }

    fn on_destroy_notify(&self, ev: &DestroyNotifyEvent) {
        if self.registry.remove(ev.window).is_some() {
            log::debug!("forgetting Window({:#0x})", ev.window);
        }
    }

    /// A grabbed key fired; normalize it into a [`Stroke`]
    fn on_key_press(&self, ev: &KeyPressEvent) {
        let sym = match self.keymap.first_sym(ev.detail) {
            Some(sym) => sym,
            None => {
                log::warn!("key press on unmapped keycode {}", ev.detail);
                return;
            },
        };
        let stroke = Stroke::normalized(ev.state, sym, self.numlock_mask);
        log::debug!("stroke `{}` fired", stroke);
        events::deliver(&self.sinks.strokes, "strokes", stroke);
    }

    fn on_property_notify(&self, ev: &PropertyNotifyEvent) {
        let window = match self.registry.get(ev.window) {
            Some(window) => window,
            None => return,
        };

        let atoms = self.conn.atoms();
        if ev.atom == atoms.WM_NAME || ev.atom == atoms._NET_WM_NAME {
            let name = self.read_text(ev.window, atoms._NET_WM_NAME, atoms.WM_NAME);
            window.write(|a| a.name = name);
            events::deliver(&self.sinks.name_changed, "name", window);
        } else if ev.atom == atoms.WM_ICON_NAME || ev.atom == atoms._NET_WM_ICON_NAME {
            let icon = self.read_text(ev.window, atoms._NET_WM_ICON_NAME, atoms.WM_ICON_NAME);
            window.write(|a| a.icon = icon);
            events::deliver(&self.sinks.icon_changed, "icon", window);
        } else {
            log::debug!(
                "property `{}` of Window({:#0x}) changed",
                self.conn.atom_name(ev.atom),
                ev.window
            );
        }
    }

    fn on_client_message(&self, ev: &ClientMessageEvent) {
        log::debug!(
            "client message `{}` from Window({:#0x})",
            self.conn.atom_name(ev.type_),
            ev.window
        );
    }

    /// Read a textual property, preferring the UTF-8 EWMH variant
    fn read_text(&self, window: Xid, preferred: Atom, fallback: Atom) -> String {
        for atom in [preferred, fallback] {
            match self.conn.text_property(window, atom) {
                Ok(pieces) if !pieces.is_empty() => return pieces.concat(),
                Ok(_) => {},
                Err(e) => log::error!(
                    "failed to read a text property of Window({:#0x}): {}",
                    window,
                    e
                ),
            }
        }
        String::new()
    }
}

/// Fold the fields present in a configure request into the cached geometry
fn apply_requested_geometry(attrs: &mut Attributes, ev: &ConfigureRequestEvent) {
    let mask = ev.value_mask;
    if mask & u16::from(ConfigWindow::X) != 0 {
        attrs.rect.point.x = i32::from(ev.x);
    }
    if mask & u16::from(ConfigWindow::Y) != 0 {
        attrs.rect.point.y = i32::from(ev.y);
    }
    if mask & u16::from(ConfigWindow::WIDTH) != 0 {
        attrs.rect.dimension.width = u32::from(ev.width);
    }
    if mask & u16::from(ConfigWindow::HEIGHT) != 0 {
        attrs.rect.dimension.height = u32::from(ev.height);
    }
    if mask & u16::from(ConfigWindow::BORDER_WIDTH) != 0 {
        attrs.border = u32::from(ev.border_width);
    }
}

/// Which dimensions (if any) a configure request is asking to change.
///
/// An axis the client did not mention comes back as zero.
fn requested_resize(value_mask: u16, width: u16, height: u16) -> Option<(u32, u32)> {
    let wants_width = value_mask & u16::from(ConfigWindow::WIDTH) != 0;
    let wants_height = value_mask & u16::from(ConfigWindow::HEIGHT) != 0;
    if !wants_width && !wants_height {
        return None;
    }
    Some((
        if wants_width { u32::from(width) } else { 0 },
        if wants_height { u32::from(height) } else { 0 },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use x11rb::protocol::xproto::{self, StackMode};

    fn sample_request(value_mask: u16) -> ConfigureRequestEvent {
        ConfigureRequestEvent {
            response_type: xproto::CONFIGURE_REQUEST_EVENT,
            stack_mode: StackMode::ABOVE,
            sequence: 0,
            parent: 1,
            window: 2,
            sibling: x11rb::NONE,
            x: 30,
            y: 40,
            width: 300,
            height: 200,
            border_width: 2,
            value_mask,
        }
    }

    #[test]
    fn only_requested_fields_reach_the_cached_geometry() {
        let mut attrs = Attributes::default();
        let mask = u16::from(ConfigWindow::X) | u16::from(ConfigWindow::WIDTH);
        apply_requested_geometry(&mut attrs, &sample_request(mask));

        assert_eq!(attrs.rect.point.x, 30);
        assert_eq!(attrs.rect.point.y, 0);
        assert_eq!(attrs.rect.dimension.width, 300);
        assert_eq!(attrs.rect.dimension.height, 0);
        assert_eq!(attrs.border, 0);
    }

    #[test]
    fn a_full_request_covers_every_field() {
        let mut attrs = Attributes::default();
        let mask = u16::from(ConfigWindow::X)
            | u16::from(ConfigWindow::Y)
            | u16::from(ConfigWindow::WIDTH)
            | u16::from(ConfigWindow::HEIGHT)
            | u16::from(ConfigWindow::BORDER_WIDTH);
        apply_requested_geometry(&mut attrs, &sample_request(mask));

        assert_eq!(
            attrs.rect,
            Rectangle::new(Point::new(30, 40), Dimension::new(300, 200))
        );
        assert_eq!(attrs.border, 2);
    }

    #[test]
    fn move_only_requests_are_not_resizes() {
        let mask = u16::from(ConfigWindow::X) | u16::from(ConfigWindow::Y);
        assert_eq!(requested_resize(mask, 300, 200), None);
    }

    #[test]
    fn unrequested_axes_come_back_as_zero() {
        let mask = u16::from(ConfigWindow::WIDTH);
        assert_eq!(requested_resize(mask, 300, 200), Some((300, 0)));

        let mask = u16::from(ConfigWindow::HEIGHT) | u16::from(ConfigWindow::X);
        assert_eq!(requested_resize(mask, 300, 200), Some((0, 200)));
    }

    #[test]
    fn full_resizes_carry_both_axes() {
        let mask = u16::from(ConfigWindow::WIDTH) | u16::from(ConfigWindow::HEIGHT);
        assert_eq!(requested_resize(mask, 300, 200), Some((300, 200)));
    }
}
