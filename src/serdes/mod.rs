//! Binary column descriptions.
//!
//! Every realized chain can describe itself as a nested
//! [`StorageDescriptor`]; [`Encode`] writes such a description as tagged,
//! little-endian binary.

mod descriptor;
mod num;

use std::io;

pub use descriptor::{NumericPayload, StorageDescriptor};

pub trait Encode {
    fn encode<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: io::Write;

    /// Exact number of bytes [`encode`](Self::encode) writes.
    fn size(&self) -> usize;
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: io::Write,
    {
        Encode::encode(*self, writer)
    }

    fn size(&self) -> usize {
        Encode::size(*self)
    }
}

impl<T: Encode> Encode for Box<T> {
    fn encode<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: io::Write,
    {
        self.as_ref().encode(writer)
    }

    fn size(&self) -> usize {
        self.as_ref().size()
    }
}

/// Length-prefixed sequence.
impl<T: Encode> Encode for [T] {
    fn encode<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: io::Write,
    {
        (self.len() as u32).encode(writer)?;
        for item in self {
            item.encode(writer)?;
        }
        Ok(())
    }

    fn size(&self) -> usize {
        std::mem::size_of::<u32>() + self.iter().map(Encode::size).sum::<usize>()
    }
}

impl Encode for bool {
    fn encode<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: io::Write,
    {
        u8::from(*self).encode(writer)
    }

    fn size(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_are_length_prefixed() {
        let values: &[u32] = &[7, 9];
        let mut buf = Vec::new();
        values.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), values.size());
        assert_eq!(buf, [2, 0, 0, 0, 7, 0, 0, 0, 9, 0, 0, 0]);
    }

    #[test]
    fn bool_is_one_byte() {
        let mut buf = Vec::new();
        true.encode(&mut buf).unwrap();
        false.encode(&mut buf).unwrap();
        assert_eq!(buf, [1, 0]);
    }
}
