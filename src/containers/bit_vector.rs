use std::{fmt, io};

use roaring::RoaringBitmap;

const WORD_BITS: u32 = u64::BITS;

/// Fixed-length sequence of booleans backed by a compressed bitmap.
///
/// Positions `>= len()` are never set. Rank is exposed as
/// [`count_set_bits_until`](Self::count_set_bits_until) and select as
/// [`index_of_nth_set`](Self::index_of_nth_set).
#[derive(Clone, Default, PartialEq)]
pub struct BitVector {
    bits: RoaringBitmap,
    len: u32,
}

impl BitVector {
    /// Creates an empty bit vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bit vector of `len` bits all equal to `value`.
    pub fn with_len(len: u32, value: bool) -> Self {
        let mut bits = RoaringBitmap::new();
        if value {
            bits.insert_range(0..len);
        }
        Self { bits, len }
    }

    /// Bits `[start, end)` are `pred(i)`, bits below `start` are unset.
    pub fn range<F>(start: u32, end: u32, mut pred: F) -> Self
    where
        F: FnMut(u32) -> bool,
    {
        assert!(start <= end, "invalid range [{start}, {end})");
        let mut builder = BitVectorBuilder::new(end, start);
        for i in start..end {
            builder.append(pred(i));
        }
        builder.build()
    }

    /// Creates a bit vector of length `len` with the given bits set.
    ///
    /// # Panics
    ///
    /// Panics if any index is `>= len`.
    pub fn from_indices<I>(len: u32, indices: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        let bits: RoaringBitmap = indices.into_iter().collect();
        if let Some(max) = bits.max() {
            assert!(max < len, "index {max} out of bounds for bit vector of len {len}");
        }
        Self { bits, len }
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_set(&self, index: u32) -> bool {
        debug_assert!(index < self.len, "index {index} out of bounds ({})", self.len);
        self.bits.contains(index)
    }

    pub fn set(&mut self, index: u32) {
        debug_assert!(index < self.len, "index {index} out of bounds ({})", self.len);
        self.bits.insert(index);
    }

    pub fn clear(&mut self, index: u32) {
        debug_assert!(index < self.len, "index {index} out of bounds ({})", self.len);
        self.bits.remove(index);
    }

    pub fn append(&mut self, value: bool) {
        if value {
            self.bits.insert(self.len);
        }
        self.len += 1;
    }

    pub fn append_true(&mut self) {
        self.append(true);
    }

    pub fn append_false(&mut self) {
        self.append(false);
    }

    pub fn count_set_bits(&self) -> u32 {
        self.bits.len() as u32
    }

    /// Number of set bits strictly before `index` (rank).
    pub fn count_set_bits_until(&self, index: u32) -> u32 {
        if index == 0 {
            return 0;
        }
        self.bits.rank(index - 1) as u32
    }

    /// Number of set bits in `[start, end)`.
    pub fn count_set_bits_in(&self, start: u32, end: u32) -> u32 {
        debug_assert!(start <= end);
        self.count_set_bits_until(end) - self.count_set_bits_until(start)
    }

    /// Position of the `n`th (zero-based) set bit (select).
    ///
    /// # Panics
    ///
    /// Panics if fewer than `n + 1` bits are set.
    pub fn index_of_nth_set(&self, n: u32) -> u32 {
        match self.bits.select(n) {
            Some(index) => index,
            None => panic!(
                "requested set bit {n} but only {} bits are set",
                self.count_set_bits()
            ),
        }
    }

    /// Set bits of `self` restricted to `[start, end)`.
    ///
    /// The returned vector has length `min(end, len())`, or zero when the
    /// window is empty.
    pub fn intersect_range(&self, start: u32, end: u32) -> BitVector {
        let end = end.min(self.len);
        if start >= end {
            return BitVector::new();
        }
        let mut window = RoaringBitmap::new();
        window.insert_range(start..end);
        window &= &self.bits;
        Self {
            bits: window,
            len: end,
        }
    }

    /// Bitwise AND. Both vectors must have the same length.
    pub fn and(&mut self, other: &BitVector) {
        debug_assert_eq!(self.len, other.len);
        self.bits &= &other.bits;
    }

    /// Bitwise OR. The result has the larger of the two lengths.
    pub fn or(&mut self, other: &BitVector) {
        self.bits |= &other.bits;
        self.len = self.len.max(other.len);
    }

    /// Flips every bit in `[0, len())`.
    pub fn not(&mut self) {
        let mut full = RoaringBitmap::new();
        full.insert_range(0..self.len);
        full -= &self.bits;
        self.bits = full;
    }

    pub fn resize(&mut self, len: u32, value: bool) {
        if len < self.len {
            self.bits.remove_range(len..);
        } else if value {
            self.bits.insert_range(self.len..len);
        }
        self.len = len;
    }

    /// Keeps the `i`th set bit only if bit `i` of `update` is set.
    ///
    /// `update` must have exactly [`count_set_bits`](Self::count_set_bits)
    /// positions.
    pub fn update_set_bits(&mut self, update: &BitVector) {
        assert_eq!(
            update.len(),
            self.count_set_bits(),
            "update vector must cover every set bit"
        );
        let kept = self
            .bits
            .iter()
            .enumerate()
            .filter(|(ordinal, _)| update.bits.contains(*ordinal as u32))
            .map(|(_, index)| index);
        self.bits = kept.collect();
    }

    /// Ascending iterator over set positions.
    pub fn iter_set_bits(&self) -> impl Iterator<Item = u32> + '_ {
        self.bits.iter()
    }

    pub(crate) fn set_bits(&self) -> roaring::bitmap::Iter<'_> {
        self.bits.iter()
    }

    /// Iterator over every bit in `[0, len())`.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(|i| self.bits.contains(i))
    }

    pub fn set_bit_indices(&self) -> Vec<u32> {
        self.bits.iter().collect()
    }

    /// Highest set position, if any.
    pub fn last_set_bit(&self) -> Option<u32> {
        self.bits.max()
    }

    /// Rough memory footprint of an uncompressed vector of `len` bits,
    /// including rank counters.
    pub fn approx_bytes_cost(len: u32) -> u64 {
        let len = u64::from(len);
        len.div_ceil(u64::from(WORD_BITS)) * 8 + len.div_ceil(512) * 4
    }

    pub(crate) fn serialize_into<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.len.to_le_bytes())?;
        writer.write_all(&(self.bits.serialized_size() as u32).to_le_bytes())?;
        self.bits.serialize_into(writer)
    }

    pub(crate) fn serialized_size(&self) -> usize {
        2 * std::mem::size_of::<u32>() + self.bits.serialized_size()
    }
}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitVector")
            .field("len", &self.len)
            .field("set", &self.bits)
            .finish()
    }
}

impl FromIterator<bool> for BitVector {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut bv = BitVector::new();
        for value in iter {
            bv.append(value);
        }
        bv
    }
}

impl From<&[bool]> for BitVector {
    fn from(values: &[bool]) -> Self {
        values.iter().copied().collect()
    }
}

impl<const N: usize> From<[bool; N]> for BitVector {
    fn from(values: [bool; N]) -> Self {
        values.into_iter().collect()
    }
}

/// Packs booleans into 64-bit words before building a [`BitVector`].
///
/// Callers scanning contiguous data use the three-pass pattern: scalar appends
/// until the next word boundary, whole words through
/// [`append_word`](Self::append_word), then scalar appends for the tail.
#[derive(Debug)]
pub struct BitVectorBuilder {
    words: Vec<u64>,
    size: u32,
    pos: u32,
}

impl BitVectorBuilder {
    /// Builder for a vector of `size` bits whose first `skip` bits are unset.
    pub fn new(size: u32, skip: u32) -> Self {
        assert!(skip <= size, "cannot skip {skip} bits of {size}");
        Self {
            words: vec![0; size.div_ceil(WORD_BITS) as usize],
            size,
            pos: skip,
        }
    }

    #[inline]
    pub fn append(&mut self, value: bool) {
        debug_assert!(self.pos < self.size, "builder is full");
        let word = (self.pos / WORD_BITS) as usize;
        self.words[word] |= u64::from(value) << (self.pos % WORD_BITS);
        self.pos += 1;
    }

    /// Appends 64 bits at once. Must be called on a word boundary.
    #[inline]
    pub fn append_word(&mut self, word: u64) {
        debug_assert_eq!(self.pos % WORD_BITS, 0, "not on a word boundary");
        debug_assert!(self.size - self.pos >= WORD_BITS, "word overflows builder");
        self.words[(self.pos / WORD_BITS) as usize] = word;
        self.pos += WORD_BITS;
    }

    /// Leaves the next `count` bits unset.
    pub fn skip(&mut self, count: u32) {
        debug_assert!(self.pos + count <= self.size);
        self.pos += count;
    }

    pub fn bits_until_word_boundary_or_full(&self) -> u32 {
        let to_boundary = (WORD_BITS - self.pos % WORD_BITS) % WORD_BITS;
        to_boundary.min(self.bits_until_full())
    }

    pub fn bits_in_complete_words_until_full(&self) -> u32 {
        let next_word = self.pos.div_ceil(WORD_BITS);
        let end_word = self.size / WORD_BITS;
        end_word.saturating_sub(next_word) * WORD_BITS
    }

    pub fn bits_until_full(&self) -> u32 {
        self.size - self.pos
    }

    pub fn build(self) -> BitVector {
        debug_assert_eq!(self.pos, self.size, "builder finalized before full");
        let mut bits = RoaringBitmap::new();
        for (i, mut word) in self.words.into_iter().enumerate() {
            let base = i as u32 * WORD_BITS;
            while word != 0 {
                bits.push(base + word.trailing_zeros());
                word &= word - 1;
            }
        }
        BitVector {
            bits,
            len: self.size,
        }
    }
}
