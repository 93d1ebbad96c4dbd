use std::cmp::Ordering;

use proptest::prelude::*;

use crate::prelude::*;

/// A key/value pair, ordered by key only.
///
/// Two items with the same key are the same entry of a tree, whatever their
/// values: storing one replaces the other. The digest binds both halves, so
/// replacing a value changes the root digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Item<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> Item<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

impl<K: Default, V: Default> Item<K, V> {
    /// An item usable as a lookup probe: only the key matters for
    /// [`MerkleBTree::get`] and [`MerkleBTree::remove`].
    pub fn probe(key: K) -> Self {
        Self {
            key,
            value: V::default(),
        }
    }
}

impl<K, V> Content for Item<K, V>
where
    K: ToBytes + Ord,
    V: ToBytes,
{
    fn compare(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }

    fn digest(&self) -> Result<Vec<u8>> {
        let value = self.value.to_bytes();
        let value = value.as_ref();

        let mut hasher = blake3::Hasher::new();
        hasher.update(self.key.to_bytes().as_ref());
        hasher.update(&(value.len() as u64).to_be_bytes());
        hasher.update(value);

        Ok(hasher.finalize().as_bytes().to_vec())
    }
}

impl<K, V> Arbitrary for Item<K, V>
where
    K: Arbitrary + 'static,
    V: Arbitrary + 'static,
{
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        any::<(K, V)>()
            .prop_map(|(key, value)| Self { key, value })
            .boxed()
    }
}
