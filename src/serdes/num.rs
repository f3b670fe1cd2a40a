use std::{io, mem::size_of};

use super::Encode;

macro_rules! implement_encode {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Encode for $ty {
                fn encode<W>(&self, writer: &mut W) -> io::Result<()>
                where
                    W: io::Write,
                {
                    writer.write_all(&self.to_le_bytes())
                }

                fn size(&self) -> usize {
                    size_of::<Self>()
                }
            }
        )*
    };
}

implement_encode!(u8, u32, i32, i64, f64);
