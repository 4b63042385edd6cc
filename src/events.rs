//! Notification channels between the dispatch loop and the embedding program
//!
//! Each category gets its own channel so a consumer can select over exactly
//! the notifications it cares about. Channels are rendezvous by default: the
//! dispatch loop blocks until the consumer has taken the notification, which
//! keeps the two sides in lock-step. [`Config::buffered`](crate::Config)
//! trades that guarantee for slack.

use crate::{window::Window, x::input::Stroke};
use crossbeam_channel::{bounded, Receiver, Sender};

// =========================== ResizeRequest ==========================
// ====================================================================

/// A mapped client asked for a new size instead of being reconfigured
/// directly; the embedding program decides whether to honor it.
///
/// A zero field means the client did not ask about that axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeRequest {
    /// Requested width in pixels, `0` if not requested
    pub width:  u32,
    /// Requested height in pixels, `0` if not requested
    pub height: u32,
    /// The window asking
    pub window: Window,
}

// =========================== Notifications ==========================
// ====================================================================

/// The consumer half of every notification channel.
///
/// Window notifications carry the [`Window`] handle itself, so a consumer
/// can act on it without a registry lookup.
#[derive(Debug)]
pub struct Notifications {
    /// A window became visible
    pub mapped:          Receiver<Window>,
    /// A window was hidden or destroyed
    pub unmapped:        Receiver<Window>,
    /// A configured keybinding fired
    pub strokes:         Receiver<Stroke>,
    /// A window's title changed
    pub name_changed:    Receiver<Window>,
    /// A window's icon title changed
    pub icon_changed:    Receiver<Window>,
    /// A mapped window asked to be resized
    pub resize_requests: Receiver<ResizeRequest>,
}

/// The dispatch loop's half of every notification channel
#[derive(Debug)]
pub(crate) struct Sinks {
    pub(crate) mapped:          Sender<Window>,
    pub(crate) unmapped:        Sender<Window>,
    pub(crate) strokes:         Sender<Stroke>,
    pub(crate) name_changed:    Sender<Window>,
    pub(crate) icon_changed:    Sender<Window>,
    pub(crate) resize_requests: Sender<ResizeRequest>,
}

/// Create both halves of the notification channels.
///
/// `bound` of zero makes every channel a rendezvous point.
pub(crate) fn channels(bound: usize) -> (Sinks, Notifications) {
    let (mapped_tx, mapped) = bounded(bound);
    let (unmapped_tx, unmapped) = bounded(bound);
    let (strokes_tx, strokes) = bounded(bound);
    let (name_tx, name_changed) = bounded(bound);
    let (icon_tx, icon_changed) = bounded(bound);
    let (resize_tx, resize_requests) = bounded(bound);

    (
        Sinks {
            mapped:          mapped_tx,
            unmapped:        unmapped_tx,
            strokes:         strokes_tx,
            name_changed:    name_tx,
            icon_changed:    icon_tx,
            resize_requests: resize_tx,
        },
        Notifications {
            mapped,
            unmapped,
            strokes,
            name_changed,
            icon_changed,
            resize_requests,
        },
    )
}

/// Hand a notification to the consumer, blocking on a rendezvous channel.
///
/// A dropped [`Notifications`] receiver is how shutdown looks from here, so
/// a failed send is logged and swallowed.
pub(crate) fn deliver<T>(tx: &Sender<T>, kind: &str, item: T) {
    if tx.send(item).is_err() {
        log::warn!("dropping `{}` notification: receiver is gone", kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_channels_hold_notifications() {
        let (sinks, notifications) = channels(1);
        let stroke = Stroke { modifiers: 0, sym: 0xff0d };
        deliver(&sinks.strokes, "strokes", stroke);
        assert_eq!(notifications.strokes.recv(), Ok(stroke));
    }

    #[test]
    fn delivery_to_a_gone_receiver_does_not_panic() {
        let (sinks, notifications) = channels(1);
        drop(notifications);
        deliver(&sinks.strokes, "strokes", Stroke { modifiers: 0, sym: 0xff0d });
    }
}
