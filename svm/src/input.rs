//! The interactive input device
//!
//! The VM's `ReadUnit` instruction yields UTF-16 code units one at a time.
//! The device decodes a UTF-8 byte stream into characters and serves each
//! character as one or two units, with a one-unit mark/reset lookback so a
//! program can peek past a high surrogate and rewind.

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read};

pub struct InputDevice {
    src: Option<Box<dyn Read>>,
    pending: VecDeque<u16>,
    replay: VecDeque<u16>,
    recorded: Vec<u16>,
    marked: bool,
}

impl InputDevice {
    pub fn new(src: Box<dyn Read>) -> Self {
        Self {
            src: Some(src),
            pending: VecDeque::new(),
            replay: VecDeque::new(),
            recorded: Vec::new(),
            marked: false,
        }
    }

    /// A device that is already at end of stream
    pub fn closed() -> Self {
        Self {
            src: None,
            pending: VecDeque::new(),
            replay: VecDeque::new(),
            recorded: Vec::new(),
            marked: false,
        }
    }

    /// Next UTF-16 unit, or -1 at end of stream
    pub fn read_unit(&mut self) -> io::Result<i32> {
        let unit = match self.replay.pop_front() {
            Some(u) => Some(u),
            None => {
                if self.pending.is_empty() {
                    self.refill()?;
                }
                self.pending.pop_front()
            }
        };
        match unit {
            Some(u) => {
                if self.marked {
                    self.recorded.push(u);
                }
                Ok(u as i32)
            }
            None => Ok(-1),
        }
    }

    /// Remember the current position; units read after this can be rewound
    pub fn mark(&mut self) {
        self.marked = true;
        self.recorded.clear();
    }

    /// Rewind to the marked position
    pub fn reset(&mut self) {
        if self.marked {
            for unit in self.recorded.drain(..).rev() {
                self.replay.push_front(unit);
            }
            self.marked = false;
        }
    }

    /// Close the stream; subsequent reads report end of stream
    pub fn close(&mut self) {
        self.src = None;
        self.pending.clear();
        self.replay.clear();
        self.recorded.clear();
        self.marked = false;
    }

    /// Decode the next UTF-8 sequence from the source into pending units.
    /// Invalid sequences decode as U+FFFD rather than failing the program.
    fn refill(&mut self) -> io::Result<()> {
        let Some(src) = self.src.as_mut() else {
            return Ok(());
        };
        let Some(first) = read_byte(src.as_mut())? else {
            return Ok(());
        };

        let (extra, mut value) = match first {
            0x00..=0x7F => (0, first as u32),
            0xC0..=0xDF => (1, (first & 0x1F) as u32),
            0xE0..=0xEF => (2, (first & 0x0F) as u32),
            0xF0..=0xF7 => (3, (first & 0x07) as u32),
            _ => {
                self.push_char(char::REPLACEMENT_CHARACTER);
                return Ok(());
            }
        };
        for _ in 0..extra {
            match read_byte(src.as_mut())? {
                Some(byte) if byte & 0xC0 == 0x80 => {
                    value = (value << 6) | (byte as u32 & 0x3F);
                }
                _ => {
                    self.push_char(char::REPLACEMENT_CHARACTER);
                    return Ok(());
                }
            }
        }

        self.push_char(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
        Ok(())
    }

    fn push_char(&mut self, ch: char) {
        let mut buf = [0u16; 2];
        for unit in ch.encode_utf16(&mut buf) {
            self.pending.push_back(*unit);
        }
    }
}

fn read_byte(src: &mut dyn Read) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match src.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(text: &str) -> InputDevice {
        InputDevice::new(Box::new(io::Cursor::new(text.as_bytes().to_vec())))
    }

    #[test]
    fn test_ascii_units() {
        let mut input = device("ab");
        assert_eq!(input.read_unit().unwrap(), 'a' as i32);
        assert_eq!(input.read_unit().unwrap(), 'b' as i32);
        assert_eq!(input.read_unit().unwrap(), -1);
        assert_eq!(input.read_unit().unwrap(), -1);
    }

    #[test]
    fn test_astral_char_becomes_surrogate_pair() {
        // U+1F600 -> D83D DE00
        let mut input = device("\u{1F600}");
        assert_eq!(input.read_unit().unwrap(), 0xD83D);
        assert_eq!(input.read_unit().unwrap(), 0xDE00);
        assert_eq!(input.read_unit().unwrap(), -1);
    }

    #[test]
    fn test_mark_reset_replays_units() {
        let mut input = device("xy");
        assert_eq!(input.read_unit().unwrap(), 'x' as i32);
        input.mark();
        assert_eq!(input.read_unit().unwrap(), 'y' as i32);
        input.reset();
        assert_eq!(input.read_unit().unwrap(), 'y' as i32);
        assert_eq!(input.read_unit().unwrap(), -1);
    }

    #[test]
    fn test_closed_device() {
        let mut input = InputDevice::closed();
        assert_eq!(input.read_unit().unwrap(), -1);
    }

    #[test]
    fn test_invalid_utf8_is_replacement() {
        let mut input = InputDevice::new(Box::new(io::Cursor::new(vec![0xFF, b'a'])));
        assert_eq!(input.read_unit().unwrap(), 0xFFFD);
        assert_eq!(input.read_unit().unwrap(), 'a' as i32);
    }
}
