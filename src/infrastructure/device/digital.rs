//! Digital keyboard polling over `device_query`.
//!
//! `device_query` reports the currently pressed keys as platform-neutral
//! `Keycode` variants.  The overlay needs USB HID usage IDs (page 0x07) so
//! the digital reading for a key matches the identifier the analogue device
//! reports for the same physical key; [`keycode_to_hid`] performs that
//! translation.  Keys with no standard HID mapping are dropped — the
//! analogue device cannot report them either, so they can never appear in a
//! snapshot.

use device_query::{DeviceQuery, DeviceState, Keycode};
use tracing::info;

use crate::domain::keys::KeyId;
use crate::infrastructure::device::DigitalSource;

/// Digital source backed by `device_query` polling.
pub struct PolledDigitalSource {
    state: DeviceState,
}

impl PolledDigitalSource {
    /// Opens the platform keyboard state poller.
    ///
    /// Returns `None` when no pollable keyboard backend exists (e.g. a
    /// headless Linux box without X11); the caller falls back to
    /// [`super::NullDigitalSource`].
    pub fn new() -> Option<Self> {
        let state = DeviceState::checked_new()?;
        info!("digital keyboard poller initialised");
        Some(Self { state })
    }
}

// SAFETY: the inner `DeviceState` holds the only `Rc` to its X11 connection
// (created in `new()` and never cloned out of this struct), so moving the
// whole source to the sampler thread and using it only there is sound.
unsafe impl Send for PolledDigitalSource {}

impl DigitalSource for PolledDigitalSource {
    fn pressed_keys(&mut self) -> Vec<KeyId> {
        self.state
            .get_keys()
            .into_iter()
            .filter_map(keycode_to_hid)
            .collect()
    }
}

/// Translates a `device_query` keycode to its USB HID usage ID (page 0x07).
///
/// Reference: USB HID Usage Tables 1.3, Section 10 (Keyboard/Keypad page).
pub fn keycode_to_hid(keycode: Keycode) -> Option<KeyId> {
    use Keycode as K;
    let hid: KeyId = match keycode {
        // Letters (HID 0x04–0x1D)
        K::A => 0x04,
        K::B => 0x05,
        K::C => 0x06,
        K::D => 0x07,
        K::E => 0x08,
        K::F => 0x09,
        K::G => 0x0A,
        K::H => 0x0B,
        K::I => 0x0C,
        K::J => 0x0D,
        K::K => 0x0E,
        K::L => 0x0F,
        K::M => 0x10,
        K::N => 0x11,
        K::O => 0x12,
        K::P => 0x13,
        K::Q => 0x14,
        K::R => 0x15,
        K::S => 0x16,
        K::T => 0x17,
        K::U => 0x18,
        K::V => 0x19,
        K::W => 0x1A,
        K::X => 0x1B,
        K::Y => 0x1C,
        K::Z => 0x1D,
        // Digit row (HID 0x1E–0x27; note 1 starts the range, 0 ends it)
        K::Key1 => 0x1E,
        K::Key2 => 0x1F,
        K::Key3 => 0x20,
        K::Key4 => 0x21,
        K::Key5 => 0x22,
        K::Key6 => 0x23,
        K::Key7 => 0x24,
        K::Key8 => 0x25,
        K::Key9 => 0x26,
        K::Key0 => 0x27,
        // Control and whitespace
        K::Enter => 0x28,
        K::Escape => 0x29,
        K::Backspace => 0x2A,
        K::Tab => 0x2B,
        K::Space => 0x2C,
        // Punctuation
        K::Minus => 0x2D,
        K::Equal => 0x2E,
        K::LeftBracket => 0x2F,
        K::RightBracket => 0x30,
        K::BackSlash => 0x31,
        K::Semicolon => 0x33,
        K::Apostrophe => 0x34,
        K::Grave => 0x35,
        K::Comma => 0x36,
        K::Dot => 0x37,
        K::Slash => 0x38,
        K::CapsLock => 0x39,
        // Function row (HID 0x3A–0x45)
        K::F1 => 0x3A,
        K::F2 => 0x3B,
        K::F3 => 0x3C,
        K::F4 => 0x3D,
        K::F5 => 0x3E,
        K::F6 => 0x3F,
        K::F7 => 0x40,
        K::F8 => 0x41,
        K::F9 => 0x42,
        K::F10 => 0x43,
        K::F11 => 0x44,
        K::F12 => 0x45,
        // Navigation cluster
        K::Insert => 0x49,
        K::Home => 0x4A,
        K::PageUp => 0x4B,
        K::Delete => 0x4C,
        K::End => 0x4D,
        K::PageDown => 0x4E,
        K::Right => 0x4F,
        K::Left => 0x50,
        K::Down => 0x51,
        K::Up => 0x52,
        // Numpad
        K::NumpadDivide => 0x54,
        K::NumpadMultiply => 0x55,
        K::NumpadSubtract => 0x56,
        K::NumpadAdd => 0x57,
        K::Numpad1 => 0x59,
        K::Numpad2 => 0x5A,
        K::Numpad3 => 0x5B,
        K::Numpad4 => 0x5C,
        K::Numpad5 => 0x5D,
        K::Numpad6 => 0x5E,
        K::Numpad7 => 0x5F,
        K::Numpad8 => 0x60,
        K::Numpad9 => 0x61,
        K::Numpad0 => 0x62,
        // Modifiers (HID 0xE0–0xE7)
        K::LControl => 0xE0,
        K::LShift => 0xE1,
        K::LAlt => 0xE2,
        K::LMeta => 0xE3,
        K::RControl => 0xE4,
        K::RShift => 0xE5,
        K::RAlt => 0xE6,
        K::RMeta => 0xE7,
        // No standard keyboard-page mapping (vendor/media keys).
        _ => return None,
    };
    Some(hid)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
