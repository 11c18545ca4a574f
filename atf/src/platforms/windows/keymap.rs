//! Virtual-key codes and `SendInput` keyboard synthesis.

use crate::errors::AutomationError;
use crate::keys::{combo_strokes, Key, KeyMap, KeyStroke};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, VkKeyScanW, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_KEYUP, KEYEVENTF_UNICODE, VIRTUAL_KEY, VK_CONTROL, VK_DOWN, VK_END, VK_ESCAPE, VK_F4, VK_HOME,
    VK_LEFT, VK_LWIN, VK_MENU, VK_RETURN, VK_RIGHT, VK_SHIFT, VK_TAB, VK_UP,
};

pub static UIA_KEYS: KeyMap<VIRTUAL_KEY> = KeyMap::new(&[
    (Key::Escape, VK_ESCAPE),
    (Key::Enter, VK_RETURN),
    (Key::Home, VK_HOME),
    (Key::End, VK_END),
    (Key::ArrowDown, VK_DOWN),
    (Key::ArrowUp, VK_UP),
    (Key::ArrowLeft, VK_LEFT),
    (Key::ArrowRight, VK_RIGHT),
    (Key::Control, VK_CONTROL),
    (Key::Windows, VK_LWIN),
    (Key::Alt, VK_MENU),
    (Key::F4, VK_F4),
    (Key::Shift, VK_SHIFT),
    (Key::Tab, VK_TAB),
]);

fn key_input(vk: VIRTUAL_KEY, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    keyboard_input(vk, 0, flags)
}

fn keyboard_input(vk: VIRTUAL_KEY, scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn down(vk: VIRTUAL_KEY) -> INPUT {
    key_input(vk, KEYBD_EVENT_FLAGS(0))
}

fn up(vk: VIRTUAL_KEY) -> INPUT {
    key_input(vk, KEYEVENTF_KEYUP)
}

fn send(inputs: &[INPUT]) -> Result<(), AutomationError> {
    let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
    if sent as usize != inputs.len() {
        return Err(AutomationError::PlatformError(format!(
            "SendInput injected {sent} of {} events",
            inputs.len()
        )));
    }
    Ok(())
}

/// Virtual key producing `c` on the current keyboard layout.
pub fn char_key(c: char) -> Result<VIRTUAL_KEY, AutomationError> {
    let mut unit = [0u16; 2];
    let [code] = c.encode_utf16(&mut unit) else {
        return Err(AutomationError::InvalidArgument(format!(
            "'{c}' is outside the basic multilingual plane"
        )));
    };
    let scan = unsafe { VkKeyScanW(*code) };
    if scan == -1 {
        return Err(AutomationError::InvalidArgument(format!(
            "no virtual key types '{c}'"
        )));
    }
    Ok(VIRTUAL_KEY((scan & 0xff) as u16))
}

/// Down and up events typing `c`; characters without a virtual key on the
/// current layout are sent as UTF-16 units.
fn char_inputs(c: char) -> Vec<INPUT> {
    if let Ok(vk) = char_key(c) {
        return vec![down(vk), up(vk)];
    }
    let mut units = [0u16; 2];
    c.encode_utf16(&mut units)
        .iter()
        .flat_map(|&unit| {
            [
                keyboard_input(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE),
                keyboard_input(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE | KEYEVENTF_KEYUP),
            ]
        })
        .collect()
}

pub fn press_key(key: Key) -> Result<(), AutomationError> {
    let vk = UIA_KEYS.lookup(key)?;
    send(&[down(vk), up(vk)])
}

pub fn press_modified_key(modifier: Key, c: char) -> Result<(), AutomationError> {
    let m = UIA_KEYS.lookup(modifier)?;
    let mut inputs = vec![down(m)];
    inputs.extend(char_inputs(c));
    inputs.push(up(m));
    send(&inputs)
}

pub fn press_key_combo(keys: &[Key]) -> Result<(), AutomationError> {
    let mut inputs = Vec::with_capacity(keys.len() * 2);
    for stroke in combo_strokes(keys) {
        match stroke {
            KeyStroke::Down(k) => inputs.push(down(UIA_KEYS.lookup(k)?)),
            KeyStroke::Press(k) => {
                let vk = UIA_KEYS.lookup(k)?;
                inputs.push(down(vk));
                inputs.push(up(vk));
            }
            KeyStroke::Up(k) => inputs.push(up(UIA_KEYS.lookup(k)?)),
        }
    }
    send(&inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_logical_key_has_a_virtual_key() {
        for key in [
            Key::Escape,
            Key::Enter,
            Key::Home,
            Key::End,
            Key::ArrowDown,
            Key::ArrowUp,
            Key::ArrowLeft,
            Key::ArrowRight,
            Key::Control,
            Key::Windows,
            Key::Alt,
            Key::F4,
            Key::Shift,
            Key::Tab,
        ] {
            assert!(UIA_KEYS.lookup(key).is_ok(), "{key} is not mapped");
        }
        assert_eq!(UIA_KEYS.lookup(Key::Alt).unwrap(), VK_MENU);
    }

    #[test]
    fn letters_map_to_their_virtual_keys() {
        assert_eq!(char_key('a').unwrap(), VIRTUAL_KEY(b'A' as u16));
    }

    #[test]
    fn astral_characters_are_typed_as_surrogate_pairs() {
        let err = char_key('\u{1F600}').unwrap_err();
        assert!(matches!(err, AutomationError::InvalidArgument(_)));

        let inputs = char_inputs('\u{1F600}');
        let sent: Vec<(u16, bool)> = inputs
            .iter()
            .map(|input| {
                let ki = unsafe { input.Anonymous.ki };
                assert_eq!(ki.wVk, VIRTUAL_KEY(0));
                assert!(ki.dwFlags.contains(KEYEVENTF_UNICODE));
                (ki.wScan, ki.dwFlags.contains(KEYEVENTF_KEYUP))
            })
            .collect();
        assert_eq!(
            sent,
            vec![(0xD83D, false), (0xD83D, true), (0xDE00, false), (0xDE00, true)]
        );
    }
}
