use std::fmt::Display;

use num_traits::PrimInt;

// Bit stream
//------------------------------------------------------------------------------

/// Growable MSB-first bit buffer with a read cursor.
///
/// The encoder pushes header, segment and padding bits into it; the bitstream parser
/// reads them back with [`BitStream::take_bits`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitStream {
    data: Vec<u8>,
    // Bit length
    len: usize,
    // Pointer to take bits
    cursor: usize,
}

impl BitStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bit_capacity: usize) -> Self {
        Self { data: Vec::with_capacity((bit_capacity + 7) >> 3), len: 0, cursor: 0 }
    }

    pub fn from(inp: &[u8]) -> Self {
        Self { data: inp.to_vec(), len: inp.len() << 3, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len_bytes(&self) -> usize {
        (self.len + 7) >> 3
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of bits left to take.
    pub fn available(&self) -> usize {
        self.len - self.cursor
    }

    pub fn get(&self, pos: usize) -> bool {
        debug_assert!(pos < self.len, "Out of bit stream bounds: Len {}, Pos {pos}", self.len);

        (self.data[pos >> 3] >> (7 - (pos & 7))) & 1 == 1
    }
}

// Push bits for bit stream
//------------------------------------------------------------------------------

impl BitStream {
    pub fn push_bits<T>(&mut self, bits: T, size: usize)
    where
        T: PrimInt + Display,
    {
        let max_bits = std::mem::size_of::<T>() * 8;
        debug_assert!(size <= max_bits, "Bit count exceeds type width: Size {size}, Bits {bits}");
        debug_assert!(
            size >= max_bits - bits.leading_zeros() as usize,
            "Bit count shouldn't exceed bit length: Length {size}, Bits {bits}"
        );

        for i in (0..size).rev() {
            self.push((bits >> i) & T::one() == T::one());
        }
    }

    pub fn push(&mut self, bit: bool) {
        let offset = self.len & 7;
        if offset == 0 {
            self.data.push(0);
        }
        if bit {
            let pos = self.len >> 3;
            self.data[pos] |= 0b10000000 >> offset;
        }
        self.len += 1;
    }

    pub fn extend(&mut self, arr: &[u8]) {
        if self.len & 7 == 0 {
            self.data.extend_from_slice(arr);
            self.len += arr.len() << 3;
        } else {
            arr.iter().for_each(|&b| self.push_bits(b, 8));
        }
    }

    pub fn append(&mut self, other: &BitStream) {
        (0..other.len).for_each(|i| self.push(other.get(i)));
    }
}

#[cfg(test)]
mod bit_stream_push_tests {
    use super::BitStream;

    #[test]
    fn test_len() {
        let mut bs = BitStream::new();
        assert_eq!(bs.len(), 0);
        bs.push_bits(0, 0);
        assert_eq!(bs.len(), 0);
        bs.push_bits(0b1000, 4);
        assert_eq!(bs.len(), 4);
        bs.push_bits(0b1000, 8);
        assert_eq!(bs.len(), 12);
        bs.push_bits(0b1111111, 7);
        assert_eq!(bs.len(), 19);
        bs.push_bits(0b111111111111u16, 16);
        assert_eq!(bs.len(), 35);
        assert_eq!(bs.len_bytes(), 5);
    }

    #[test]
    #[should_panic]
    fn test_invalid_len() {
        let mut bs = BitStream::new();
        bs.push_bits(256u16, 8);
    }

    #[test]
    fn test_push() {
        let mut bs = BitStream::new();
        bs.push(false);
        assert_eq!(bs.data(), [0b00000000]);
        bs.push(true);
        assert_eq!(bs.data(), [0b01000000]);
    }

    #[test]
    fn test_push_bits() {
        let mut bs = BitStream::new();
        bs.push_bits(0b0100u8, 4);
        bs.push_bits(0b000000101u16, 9);
        bs.push_bits(0b110u8, 3);
        assert_eq!(bs.data(), [0b01000000, 0b00101110]);
    }

    #[test]
    fn test_extend_unaligned() {
        let mut bs = BitStream::new();
        bs.push(true);
        bs.extend(&[0xff, 0x00]);
        assert_eq!(bs.len(), 17);
        assert_eq!(bs.data(), [0xff, 0x80, 0x00]);
    }

    #[test]
    fn test_append() {
        let mut a = BitStream::new();
        a.push_bits(0b101u8, 3);
        let mut b = BitStream::new();
        b.push_bits(0b11u8, 2);
        a.append(&b);
        assert_eq!(a.len(), 5);
        assert_eq!(a.data(), [0b10111000]);
    }
}

// Take bits for bit stream
//------------------------------------------------------------------------------

impl BitStream {
    pub fn take_bits(&mut self, n: usize) -> Option<u32> {
        debug_assert!(n <= 32, "Cannot take more than 32 bits: N {n}");

        if self.cursor + n > self.len {
            return None;
        }

        let res =
            (self.cursor..self.cursor + n).fold(0u32, |acc, i| (acc << 1) | self.get(i) as u32);
        self.cursor += n;
        Some(res)
    }

    pub fn take(&mut self) -> Option<bool> {
        if self.cursor == self.len {
            return None;
        }

        let bit = self.get(self.cursor);
        self.cursor += 1;
        Some(bit)
    }
}

#[cfg(test)]
mod bit_stream_take_tests {
    use super::BitStream;

    #[test]
    fn test_take_bits() {
        let data = [
            0b11010010, 0b00110100, 0b10001101, 0b00100011, 0b01001000, 0b11010010, 0b00110100,
            0b10001101, 0b00100011, 0b01001000, 0b11010010, 0b00110100, 0b10001100,
        ];
        let mut bs = BitStream::from(&data);
        assert_eq!(bs.take_bits(0), Some(0));
        assert_eq!(bs.take_bits(4), Some(0b1101));
        assert_eq!(bs.take_bits(4), Some(0b0010));
        assert_eq!(bs.take_bits(8), Some(0b00110100));
        assert_eq!(bs.take_bits(9), Some(0b100011010));
        assert_eq!(bs.take_bits(7), Some(0b0100011));
        assert_eq!(bs.take_bits(16), Some(0b01001000_11010010));
        assert_eq!(bs.take_bits(1), Some(0b0));
        assert_eq!(bs.take_bits(11), Some(0b01101001000));
        assert_eq!(bs.take_bits(14), Some(0b11010010001101));
        assert_eq!(bs.take_bits(16), Some(0b0010001101001000));
        assert_eq!(bs.take_bits(4), Some(0b1101));
        assert_eq!(bs.available(), 10);
        assert_eq!(bs.take_bits(4), Some(0b0010));
        assert_eq!(bs.take_bits(6), Some(0b001100));
        assert_eq!(bs.take_bits(1), None);
    }

    #[test]
    fn test_take_bits_over_capacity() {
        let mut bs = BitStream::from(&[]);
        assert_eq!(bs.take_bits(5), None);
        assert_eq!(BitStream::take(&mut bs), None);
    }
}

// Iterator for bit stream
//------------------------------------------------------------------------------

impl Iterator for BitStream {
    type Item = bool;
    fn next(&mut self) -> Option<Self::Item> {
        self.take()
    }
}
