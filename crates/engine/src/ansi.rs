//! ANSI escape stripping for coloured console output.
//!
//! Spring Boot (and most JVM launchers run from a terminal) colourise the
//! level and logger columns. Escape sequences sit between the tokens the
//! line-shape rules anchor on, so they are removed before classification.

use std::borrow::Cow;

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

/// Strip ANSI escape sequences from a line.
///
/// Handles:
/// - CSI sequences: `ESC [ ... <final byte 0x40-0x7E>` (colours, cursor moves)
/// - OSC sequences: `ESC ] ... BEL` or `ESC ] ... ESC \` (hyperlinks, titles)
/// - Two-byte Fe sequences: `ESC <0x40-0x5F>`
///
/// Returns `Cow::Borrowed` when the line carries no ESC byte.
pub fn strip_ansi_codes(line: &str) -> Cow<'_, str> {
    let input = line.as_bytes();
    if !input.contains(&ESC) {
        return Cow::Borrowed(line);
    }

    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        if input[i] != ESC {
            out.push(input[i]);
            i += 1;
            continue;
        }

        // Lone trailing ESC
        let Some(&next) = input.get(i + 1) else {
            break;
        };

        i = match next {
            b'[' => skip_csi(input, i + 2),
            b']' => skip_osc(input, i + 2),
            0x40..=0x5F => i + 2,
            _ => {
                // Not an escape we understand; drop the ESC byte only.
                i + 1
            }
        };
    }

    // A malformed CSI can swallow part of a multi-byte character.
    match String::from_utf8(out) {
        Ok(s) => Cow::Owned(s),
        Err(e) => Cow::Owned(String::from_utf8_lossy(e.as_bytes()).into_owned()),
    }
}

/// Returns the index just past the CSI final byte.
fn skip_csi(input: &[u8], mut i: usize) -> usize {
    while i < input.len() {
        let b = input[i];
        i += 1;
        if (0x40..=0x7E).contains(&b) {
            break;
        }
    }
    i
}

/// Returns the index just past the OSC terminator (BEL or ST).
fn skip_osc(input: &[u8], mut i: usize) -> usize {
    while i < input.len() {
        if input[i] == BEL {
            return i + 1;
        }
        if input[i] == ESC && input.get(i + 1) == Some(&b'\\') {
            return i + 2;
        }
        i += 1;
    }
    i
}
