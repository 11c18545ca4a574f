//! WebDriver key code points.

use crate::errors::AutomationError;
use crate::keys::{Key, KeyMap};

pub static APPIUM_KEYS: KeyMap<char> = KeyMap::new(&[
    (Key::Escape, '\u{E00C}'),
    (Key::Enter, '\u{E007}'),
    (Key::Home, '\u{E011}'),
    (Key::End, '\u{E010}'),
    (Key::ArrowDown, '\u{E015}'),
    (Key::ArrowUp, '\u{E013}'),
    (Key::ArrowLeft, '\u{E012}'),
    (Key::ArrowRight, '\u{E014}'),
    (Key::Control, '\u{E009}'),
    (Key::Windows, '\u{E03D}'),
    (Key::Alt, '\u{E00A}'),
    (Key::F4, '\u{E034}'),
    (Key::Shift, '\u{E008}'),
    (Key::Tab, '\u{E004}'),
]);

/// A modifier key typed a second time releases it.
pub fn modified_key_text(modifier: Key, c: char) -> Result<String, AutomationError> {
    let m = APPIUM_KEYS.lookup(modifier)?;
    Ok([m, c, m].iter().collect())
}

/// `[k1, k2, .., kn]` becomes `k1 k2 .. kn .. k2 k1`.
pub fn combo_text(keys: &[Key]) -> Result<String, AutomationError> {
    let codes = keys
        .iter()
        .map(|k| APPIUM_KEYS.lookup(*k))
        .collect::<Result<Vec<char>, _>>()?;
    let Some((last, held)) = codes.split_last() else {
        return Ok(String::new());
    };
    let mut text: String = held.iter().collect();
    text.push(*last);
    text.extend(held.iter().rev());
    Ok(text)
}
