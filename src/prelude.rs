use std::cmp::Ordering;

use digest::{consts::U32, Digest, OutputSizeUser};

pub use crate::{
    error::*,
    tree::{Cursor, Iter, MerkleBTree, NodeRef, Order, MIN_ORDER},
    values::*,
};

/// An item that can be stored in a [`MerkleBTree`].
///
/// `compare` must define a strict total order that stays stable for as long
/// as the item lives in a tree. Two items comparing [`Ordering::Equal`] are
/// the same key: storing the second one replaces the first.
pub trait Content {
    fn compare(&self, other: &Self) -> Ordering;

    /// Digest binding the whole item (key and payload).
    fn digest(&self) -> Result<Vec<u8>>;
}

/// The hash used to combine content digests and child digests into node
/// digests. Any [`Digest`] producing 256 bits of output qualifies.
pub trait CombiningHash: Digest + OutputSizeUser<OutputSize = U32> {}

impl<D> CombiningHash for D where D: Digest + OutputSizeUser<OutputSize = U32> {}

pub trait FromBytes
where
    Self: Sized,
{
    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}

pub trait ToBytes {
    type Output: AsRef<[u8]>;

    /// Converts the value to a representation in bytes.
    fn to_bytes(&self) -> Self::Output;

    /// Converts the value to a representation in bytes, as a vector.
    ///
    /// This is a convenience method, and automatically derived from `to_bytes`.
    fn to_bytes_vec(&self) -> Vec<u8> {
        self.to_bytes().as_ref().to_vec()
    }

    /// Hashes the value using the blake3 algorithm.
    ///
    /// This is a convenience method, and automatically derived from `to_bytes`.
    fn hash_bytes(&self) -> blake3::Hash {
        blake3::hash(self.to_bytes().as_ref())
    }
}

pub trait FromHex
where
    Self: Sized,
{
    fn from_hex(hex: &str) -> Result<Self>;
}

pub trait ToHex {
    fn to_hex(&self) -> String;
}

macro_rules! impl_to_bytes_for_ints {
    ($($int:ty),*) => {
        $(
            impl ToBytes for $int {
                type Output = [u8; std::mem::size_of::<$int>()];

                fn to_bytes(&self) -> Self::Output {
                    self.to_be_bytes()
                }
            }
        )*
    };
}

impl_to_bytes_for_ints!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);

impl ToBytes for String {
    type Output = Vec<u8>;

    fn to_bytes(&self) -> Self::Output {
        self.as_bytes().to_vec()
    }
}

impl ToBytes for Vec<u8> {
    type Output = Vec<u8>;

    fn to_bytes(&self) -> Self::Output {
        self.clone()
    }
}

impl ToBytes for () {
    type Output = [u8; 0];

    fn to_bytes(&self) -> Self::Output {
        []
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;
    use crate::testing::*;

    fn combining<D: CombiningHash>() -> Hash {
        Hash::digest::<D>(b"abc")
    }

    #[test]
    fn test_default_hasher_is_combining() {
        assert_eq!(combining::<blake3::Hasher>().as_ref(), blake3::hash(b"abc").as_bytes());

        let mut tree = MerkleBTree::<Pair>::new(3).unwrap();
        tree.put(pair(1)).unwrap();
        assert!(tree.verify().unwrap());
    }

    #[proptest(fork = false)]
    fn test_hash_bytes_is_blake3_of_bytes(value: u64, text: String) {
        prop_assert_eq!(value.hash_bytes(), blake3::hash(&value.to_be_bytes()));
        prop_assert_eq!(text.hash_bytes(), blake3::hash(text.as_bytes()));
    }
}
