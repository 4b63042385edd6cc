//! Exercises a full session against a live display.
//!
//! Run a nested server first (e.g. `Xephyr :1 -screen 800x600`), point
//! `DISPLAY` at it, start a couple of clients, then:
//!
//! ```sh
//! DISPLAY=:1 cargo test --test live -- --ignored --nocapture
//! ```
//!
//! Press `control+f` inside the nested display to ask the focused window to
//! close; the test finishes after a few seconds of quiet.

use anyhow::Result;
use crossbeam_channel::select;
use std::time::Duration;
use wmcore::{Config, ModMask, Point, Session, Stroke};

const QUIET_PERIOD: Duration = Duration::from_secs(5);

#[test]
#[ignore = "requires a live X display (set DISPLAY to a nested server)"]
fn manage_a_live_display() -> Result<()> {
    flexi_logger::Logger::try_with_str("debug")?.start()?;

    let close_stroke = Stroke::new(&[ModMask::Control], u32::from('f'));
    let session = Session::open(Config::new(vec![close_stroke]))?;
    println!(
        "managing root {:#0x} at {}",
        session.root(),
        session.screen_size()
    );

    // arbitrary names resolve both ways and stay stable across lookups
    let active = session.atom("_NET_ACTIVE_WINDOW");
    assert_ne!(active, 0);
    assert_eq!(session.atom_name(active), "_NET_ACTIVE_WINDOW");
    assert_eq!(session.atom("_NET_ACTIVE_WINDOW"), active);

    loop {
        select! {
            recv(session.events.mapped) -> window => {
                let window = window?;
                println!("mapped: {:?} class `{}`", window, window.class());
                assert_eq!(session.window(window.id()).as_ref(), Some(&window));
                window.set_position(Point::new(20, 20));
                window.raise(None);
                window.focus();
            },
            recv(session.events.unmapped) -> window => {
                println!("unmapped: {:?}", window?);
            },
            recv(session.events.strokes) -> stroke => {
                let stroke = stroke?;
                println!("stroke: {}", stroke);
                if stroke == close_stroke {
                    if let Some(window) = session.focused_window() {
                        println!("asking {:?} to close", window);
                        window.destroy();
                    }
                }
            },
            recv(session.events.name_changed) -> window => {
                println!("name changed: {:?}", window?);
            },
            recv(session.events.resize_requests) -> request => {
                let request = request?;
                println!(
                    "resize request from {:?}: {}x{}",
                    request.window, request.width, request.height
                );
            },
            default(QUIET_PERIOD) => break,
        }
    }

    session.close();
    Ok(())
}
