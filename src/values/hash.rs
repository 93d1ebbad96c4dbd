use std::fmt::{Display, Formatter};

use digest::Digest;
use proptest::prelude::*;

use crate::prelude::*;

/// A 256-bit digest, as produced by a [`CombiningHash`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Hash([u8; 32]);

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Hash {
    /// Creates a new Hash from any type that can be converted into [u8; 32].
    pub fn new<T: Into<[u8; 32]>>(data: T) -> Self {
        Hash(data.into())
    }

    /// Returns a zero hash (all bytes set to 0).
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Hashes `data` in one go.
    pub fn digest<D: CombiningHash>(data: &[u8]) -> Self {
        Self::finalize::<D>(D::new_with_prefix(data))
    }

    /// Hashes the concatenation of `parts`, without allocating the
    /// concatenated buffer.
    pub fn combine<D, I>(parts: I) -> Self
    where
        D: CombiningHash,
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let hasher = parts.into_iter().fold(D::new(), |mut hasher, part| {
            Digest::update(&mut hasher, part);
            hasher
        });

        Self::finalize::<D>(hasher)
    }

    fn finalize<D: CombiningHash>(hasher: D) -> Self {
        let mut inner = [0u8; 32];
        inner.copy_from_slice(&hasher.finalize());
        Hash(inner)
    }
}

impl Default for Hash {
    fn default() -> Self {
        Hash::zero()
    }
}

impl From<[u8; 32]> for Hash {
    fn from(array: [u8; 32]) -> Self {
        Hash(array)
    }
}

impl From<Hash> for [u8; 32] {
    fn from(val: Hash) -> Self {
        val.0
    }
}

impl TryFrom<&[u8]> for Hash {
    type Error = Error;

    fn try_from(slice: &[u8]) -> Result<Self> {
        Ok(Hash(<[u8; 32]>::try_from(slice)?))
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromBytes for Hash {
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::try_from(bytes)
    }
}

impl ToBytes for Hash {
    type Output = [u8; 32];

    fn to_bytes(&self) -> Self::Output {
        self.0
    }
}

impl FromHex for Hash {
    fn from_hex(input: &str) -> Result<Self> {
        let bytes = hex::decode(input)?;

        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength.into());
        }

        Self::from_bytes(&bytes)
    }
}

impl ToHex for Hash {
    fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Arbitrary for Hash {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        any::<[u8; 32]>().prop_map(Hash).boxed()
    }
}
