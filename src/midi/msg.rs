use super::{sysex, Channel};
use crate::bytes;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Msg(Box<[u8]>);

impl Msg {
    pub fn inner(&self) -> &[u8] {
        self.0.as_ref()
    }

    pub fn display(&self) -> bytes::Displayable {
        bytes::Displayable::from(self.0.as_ref())
    }

    pub fn note_on(chan: Channel, note: u8, velocity: u8) -> Self {
        [super::NOTE_ON | chan, note & 0x7f, velocity & 0x7f].into()
    }

    pub fn control_change(chan: Channel, controller: u8, value: u8) -> Self {
        [super::CONTROL_CHANGE | chan, controller & 0x7f, value & 0x7f].into()
    }

    pub fn new_sysex(data: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(data.len() + 2);

        buf.push(sysex::TAG);
        buf.extend(data);
        buf.push(sysex::END_TAG);

        Self(buf.into())
    }

    pub fn event(&self) -> Event<'_> {
        Event::from(self.inner())
    }
}

impl<const S: usize> From<[u8; S]> for Msg {
    fn from(buf: [u8; S]) -> Self {
        Self(buf.into())
    }
}

impl From<&[u8]> for Msg {
    fn from(buf: &[u8]) -> Self {
        Self(buf.into())
    }
}

impl std::ops::Deref for Msg {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// Decoded view of an incoming MIDI buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event<'a> {
    NoteOn {
        chan: Channel,
        note: u8,
        velocity: u8,
    },
    /// Also produced for a note-on with a null velocity.
    NoteOff {
        chan: Channel,
        note: u8,
        velocity: u8,
    },
    ControlChange {
        chan: Channel,
        controller: u8,
        value: u8,
    },
    SysEx(&'a [u8]),
    Other(&'a [u8]),
}

impl<'a> From<&'a [u8]> for Event<'a> {
    fn from(buf: &'a [u8]) -> Self {
        use Event::*;

        let (tag_chan, data1, data2) = match buf {
            [sysex::TAG, payload @ .., sysex::END_TAG] => return SysEx(payload),
            [tag_chan, data1, data2] => (*tag_chan, *data1, *data2),
            _ => return Other(buf),
        };

        let chan = Channel::from(tag_chan);
        match super::Tag::from_tag_chan(tag_chan) {
            super::NOTE_ON if data2 == 0 => NoteOff {
                chan,
                note: data1,
                velocity: 0,
            },
            super::NOTE_ON => NoteOn {
                chan,
                note: data1,
                velocity: data2,
            },
            super::NOTE_OFF => NoteOff {
                chan,
                note: data1,
                velocity: data2,
            },
            super::CONTROL_CHANGE => ControlChange {
                chan,
                controller: data1,
                value: data2,
            },
            _ => Other(buf),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MsgList(Vec<Msg>);

impl MsgList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn none() -> Self {
        Self(Vec::with_capacity(0))
    }

    pub fn push(&mut self, msg: impl Into<Msg>) {
        self.0.push(msg.into())
    }

    pub fn extend(&mut self, other: MsgList) {
        self.0.extend(other.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Msg> {
        self.0.iter()
    }
}

impl IntoIterator for MsgList {
    type Item = Msg;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<T: Into<Msg>> From<T> for MsgList {
    fn from(msg: T) -> Self {
        Self(vec![msg.into()])
    }
}
