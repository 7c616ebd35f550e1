mod error;
pub use error::Error;

pub mod msg;
pub use msg::{Event, Msg, MsgList};

pub mod port;
pub use port::Ports;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Tag(u8);

impl Tag {
    pub const fn from_tag_chan(byte: u8) -> Self {
        Self(byte & 0xf0)
    }
}

impl From<Tag> for u8 {
    fn from(tag: Tag) -> u8 {
        tag.0
    }
}

pub const NOTE_OFF: Tag = Tag::from_tag_chan(0x80);
pub const NOTE_ON: Tag = Tag::from_tag_chan(0x90);
pub const CONTROL_CHANGE: Tag = Tag::from_tag_chan(0xb0);

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Channel(u8);

impl Channel {
    pub const fn from(byte: u8) -> Self {
        Self(byte & 0x0f)
    }

    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl From<Channel> for u8 {
    fn from(chan: Channel) -> u8 {
        chan.0
    }
}

impl std::ops::BitOr<Channel> for Tag {
    type Output = u8;

    fn bitor(self, chan: Channel) -> Self::Output {
        self.0 | chan.0
    }
}

pub mod sysex {
    pub const TAG: u8 = 0xf0;
    pub const END_TAG: u8 = 0xf7;
}

pub mod u7 {
    use super::Error;

    pub const MAX: u8 = 0x7f;

    #[inline]
    pub fn check(val: u8) -> Result<u8, Error> {
        if val > MAX {
            return Err(Error::InvalidU7(val));
        }

        Ok(val)
    }
}

/// Conversions between a normalized `[0, 1]` value and a 7 bits MIDI value.
pub mod normalized_f64 {
    use super::{u7, Error};

    pub const MAX: f64 = 1f64;
    pub const QUANTUM: f64 = 1f64 / u7::MAX as f64;

    #[inline]
    pub fn from_u7(val: u8) -> Result<f64, Error> {
        Ok(u7::check(val)? as f64 * QUANTUM)
    }

    #[inline]
    pub fn to_u7(val: f64) -> Result<u8, Error> {
        if !(0f64..=MAX).contains(&val) {
            return Err(Error::InvalidNormalizedFloat(val));
        }

        Ok((val * u7::MAX as f64).round() as u8)
    }
}
