use std::fmt;

/// Hex rendering of a MIDI buffer for logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Displayable<'a>(&'a [u8]);

impl<'a> From<&'a [u8]> for Displayable<'a> {
    fn from(buf: &'a [u8]) -> Self {
        Self(buf)
    }
}

impl<'a> fmt::Display for Displayable<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(hex):")?;

        let mut sep = " ";
        for byte in self.0.iter() {
            write!(f, "{sep}{byte:02x}")?;
            sep = ", ";
        }

        Ok(())
    }
}
