use std::io;

use super::Encode;
use crate::{
    column::ColumnType,
    containers::{BitVector, Range, StringId},
};

/// Borrowed values of a numeric column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumericPayload<'a> {
    Uint32(&'a [u32]),
    Int32(&'a [i32]),
    Int64(&'a [i64]),
    Double(&'a [f64]),
}

impl NumericPayload<'_> {
    pub fn len(&self) -> usize {
        match self {
            NumericPayload::Uint32(data) => data.len(),
            NumericPayload::Int32(data) => data.len(),
            NumericPayload::Int64(data) => data.len(),
            NumericPayload::Double(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Nested description of a realized chain, borrowing the control data of
/// every layer.
#[derive(Clone, Debug, PartialEq)]
pub enum StorageDescriptor<'a> {
    Dummy,
    Id {
        size: u32,
    },
    Numeric {
        column_type: ColumnType,
        is_sorted: bool,
        payload: NumericPayload<'a>,
    },
    String {
        is_sorted: bool,
        data: &'a [StringId],
    },
    SetId {
        data: &'a [u32],
    },
    Arrangement {
        arrangement: &'a [u32],
        inner: Box<StorageDescriptor<'a>>,
    },
    Null {
        non_null: &'a BitVector,
        inner: Box<StorageDescriptor<'a>>,
    },
    DenseNull {
        non_null: &'a BitVector,
        inner: Box<StorageDescriptor<'a>>,
    },
    Selector {
        selector: &'a BitVector,
        inner: Box<StorageDescriptor<'a>>,
    },
    Range {
        range: Range,
        inner: Box<StorageDescriptor<'a>>,
    },
}

impl StorageDescriptor<'_> {
    /// Leading byte identifying the layer kind.
    pub fn tag(&self) -> u8 {
        match self {
            StorageDescriptor::Dummy => 0,
            StorageDescriptor::Id { .. } => 1,
            StorageDescriptor::Numeric { .. } => 2,
            StorageDescriptor::String { .. } => 3,
            StorageDescriptor::SetId { .. } => 4,
            StorageDescriptor::Arrangement { .. } => 5,
            StorageDescriptor::Null { .. } => 6,
            StorageDescriptor::DenseNull { .. } => 7,
            StorageDescriptor::Selector { .. } => 8,
            StorageDescriptor::Range { .. } => 9,
        }
    }

    /// The wrapped description, `None` for leaves.
    pub fn inner(&self) -> Option<&StorageDescriptor<'_>> {
        match self {
            StorageDescriptor::Arrangement { inner, .. }
            | StorageDescriptor::Null { inner, .. }
            | StorageDescriptor::DenseNull { inner, .. }
            | StorageDescriptor::Selector { inner, .. }
            | StorageDescriptor::Range { inner, .. } => Some(inner.as_ref()),
            _ => None,
        }
    }

    /// Number of layers, the leaf included.
    pub fn depth(&self) -> usize {
        1 + self.inner().map_or(0, StorageDescriptor::depth)
    }
}

impl Encode for StringId {
    fn encode<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: io::Write,
    {
        self.raw().encode(writer)
    }

    fn size(&self) -> usize {
        std::mem::size_of::<u32>()
    }
}

impl Encode for Range {
    fn encode<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: io::Write,
    {
        self.start.encode(writer)?;
        self.end.encode(writer)
    }

    fn size(&self) -> usize {
        2 * std::mem::size_of::<u32>()
    }
}

/// Length in bits, byte length of the bitmap, then the portable roaring
/// encoding.
impl Encode for BitVector {
    fn encode<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: io::Write,
    {
        self.serialize_into(writer)
    }

    fn size(&self) -> usize {
        self.serialized_size()
    }
}

impl Encode for NumericPayload<'_> {
    fn encode<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: io::Write,
    {
        match self {
            NumericPayload::Uint32(data) => data.encode(writer),
            NumericPayload::Int32(data) => data.encode(writer),
            NumericPayload::Int64(data) => data.encode(writer),
            NumericPayload::Double(data) => data.encode(writer),
        }
    }

    fn size(&self) -> usize {
        match self {
            NumericPayload::Uint32(data) => data.size(),
            NumericPayload::Int32(data) => data.size(),
            NumericPayload::Int64(data) => data.size(),
            NumericPayload::Double(data) => data.size(),
        }
    }
}

impl Encode for StorageDescriptor<'_> {
    fn encode<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: io::Write,
    {
        self.tag().encode(writer)?;
        match self {
            StorageDescriptor::Dummy => Ok(()),
            StorageDescriptor::Id { size } => size.encode(writer),
            StorageDescriptor::Numeric {
                column_type,
                is_sorted,
                payload,
            } => {
                column_type.tag().encode(writer)?;
                is_sorted.encode(writer)?;
                payload.encode(writer)
            }
            StorageDescriptor::String { is_sorted, data } => {
                is_sorted.encode(writer)?;
                data.encode(writer)
            }
            StorageDescriptor::SetId { data } => data.encode(writer),
            StorageDescriptor::Arrangement { arrangement, inner } => {
                arrangement.encode(writer)?;
                inner.encode(writer)
            }
            StorageDescriptor::Null { non_null, inner }
            | StorageDescriptor::DenseNull { non_null, inner } => {
                non_null.encode(writer)?;
                inner.encode(writer)
            }
            StorageDescriptor::Selector { selector, inner } => {
                selector.encode(writer)?;
                inner.encode(writer)
            }
            StorageDescriptor::Range { range, inner } => {
                range.encode(writer)?;
                inner.encode(writer)
            }
        }
    }

    fn size(&self) -> usize {
        let body = match self {
            StorageDescriptor::Dummy => 0,
            StorageDescriptor::Id { size } => size.size(),
            StorageDescriptor::Numeric { payload, .. } => 2 + payload.size(),
            StorageDescriptor::String { data, .. } => 1 + data.size(),
            StorageDescriptor::SetId { data } => data.size(),
            StorageDescriptor::Arrangement { arrangement, inner } => {
                arrangement.size() + inner.size()
            }
            StorageDescriptor::Null { non_null, inner }
            | StorageDescriptor::DenseNull { non_null, inner } => non_null.size() + inner.size(),
            StorageDescriptor::Selector { selector, inner } => selector.size() + inner.size(),
            StorageDescriptor::Range { range, inner } => Encode::size(range) + inner.size(),
        };
        1 + body
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        column::{
            build_chain, DenseNullOverlay, DummyStorage, IdStorage, NullOverlay, NumericStorage,
            RangeOverlay, SelectorOverlay, SetIdStorage, Storage, StringStorage,
        },
        containers::StringPool,
    };

    fn encoded(descriptor: &StorageDescriptor<'_>) -> Vec<u8> {
        let mut buf = Vec::new();
        descriptor.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), descriptor.size());
        buf
    }

    #[test]
    fn leaves() {
        let id = IdStorage::new(3);
        assert_eq!(encoded(&id.make_chain().serialize()), [1, 3, 0, 0, 0]);

        let dummy = DummyStorage::new(0);
        assert_eq!(encoded(&dummy.make_chain().serialize()), [0]);

        let numeric = NumericStorage::new(vec![-1i32, 1], true);
        let buf = encoded(&numeric.make_chain().serialize());
        assert_eq!(buf[0], 2);
        assert_eq!(buf[1], ColumnType::Int32.tag());
        assert_eq!(buf[2], 1);
        assert_eq!(&buf[3..7], &2u32.to_le_bytes());
        assert_eq!(&buf[7..11], &(-1i32).to_le_bytes());
        assert_eq!(&buf[11..], &1i32.to_le_bytes());

        let set_id = SetIdStorage::new(vec![0, 0, 2]);
        assert_eq!(
            encoded(&set_id.make_chain().serialize()),
            [4, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0]
        );
    }

    #[test]
    fn strings_write_ids() {
        let mut pool = StringPool::new();
        let data = vec![pool.intern("x"), StringId::NULL, pool.intern("y")];
        let raw: Vec<u32> = data.iter().map(|id| id.raw()).collect();
        let storage = StringStorage::new(Arc::new(pool), data, false);
        let buf = encoded(&storage.make_chain().serialize());
        assert_eq!(&buf[..6], &[3, 0, 3, 0, 0, 0]);
        assert_eq!(&buf[6..10], &raw[0].to_le_bytes());
        assert_eq!(&buf[10..14], &0u32.to_le_bytes());
    }

    #[test]
    fn overlays_nest_outermost_first() {
        let storage = NumericStorage::new(vec![1.0f64, 2.0, 3.0, 4.0], false);
        let window = RangeOverlay::new(Range::new(1, 4));
        let selector = SelectorOverlay::new(BitVector::from([true, false, true]));
        let nulls = NullOverlay::new(BitVector::from([false, true, true, false]));
        let dense = DenseNullOverlay::new(BitVector::from([true, true, false, true]));
        let chain = build_chain(&storage, &[&window, &selector, &nulls, &dense]);

        let descriptor = chain.serialize();
        assert_eq!(descriptor.depth(), 5);
        let mut tags = Vec::new();
        let mut layer = Some(&descriptor);
        while let Some(d) = layer {
            tags.push(d.tag());
            layer = d.inner();
        }
        assert_eq!(tags, [7, 6, 8, 9, 2]);

        let buf = encoded(&descriptor);
        assert_eq!(buf[0], 7);
        let dense_len = dense.non_null().size();
        assert_eq!(buf[1 + dense_len], 6);
    }
}
