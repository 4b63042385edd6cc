//! Symbolic constants for the key symbols the manager commonly grabs
//!
//! Keysym values come from `X11/keysymdef.h`. Printable Latin-1 characters
//! are their own keysym, so a binding for the `f` key is written
//! `u32::from('f')`; only the function and modifier keys need named
//! constants.

use x11rb::protocol::xproto::Keysym;

pub const XK_SPACE: Keysym = 0x0020;

pub const XK_BACKSPACE: Keysym = 0xff08;
pub const XK_TAB: Keysym = 0xff09;
pub const XK_RETURN: Keysym = 0xff0d;
pub const XK_PAUSE: Keysym = 0xff13;
pub const XK_SCROLL_LOCK: Keysym = 0xff14;
pub const XK_ESCAPE: Keysym = 0xff1b;
pub const XK_DELETE: Keysym = 0xffff;

pub const XK_HOME: Keysym = 0xff50;
pub const XK_LEFT: Keysym = 0xff51;
pub const XK_UP: Keysym = 0xff52;
pub const XK_RIGHT: Keysym = 0xff53;
pub const XK_DOWN: Keysym = 0xff54;
pub const XK_PAGE_UP: Keysym = 0xff55;
pub const XK_PAGE_DOWN: Keysym = 0xff56;
pub const XK_END: Keysym = 0xff57;

pub const XK_NUM_LOCK: Keysym = 0xff7f;

pub const XK_F1: Keysym = 0xffbe;
pub const XK_F2: Keysym = 0xffbf;
pub const XK_F3: Keysym = 0xffc0;
pub const XK_F4: Keysym = 0xffc1;
pub const XK_F5: Keysym = 0xffc2;
pub const XK_F6: Keysym = 0xffc3;
pub const XK_F7: Keysym = 0xffc4;
pub const XK_F8: Keysym = 0xffc5;
pub const XK_F9: Keysym = 0xffc6;
pub const XK_F10: Keysym = 0xffc7;
pub const XK_F11: Keysym = 0xffc8;
pub const XK_F12: Keysym = 0xffc9;

pub const XK_SHIFT_L: Keysym = 0xffe1;
pub const XK_SHIFT_R: Keysym = 0xffe2;
pub const XK_CONTROL_L: Keysym = 0xffe3;
pub const XK_CONTROL_R: Keysym = 0xffe4;
pub const XK_CAPS_LOCK: Keysym = 0xffe5;
pub const XK_SHIFT_LOCK: Keysym = 0xffe6;
pub const XK_META_L: Keysym = 0xffe7;
pub const XK_META_R: Keysym = 0xffe8;
pub const XK_ALT_L: Keysym = 0xffe9;
pub const XK_ALT_R: Keysym = 0xffea;
pub const XK_SUPER_L: Keysym = 0xffeb;
pub const XK_SUPER_R: Keysym = 0xffec;
