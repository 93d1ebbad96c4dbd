use crate::prelude::*;

/// The smallest order a [`MerkleBTree`] accepts.
pub const MIN_ORDER: usize = 3;

/// The branching order of a tree: the maximum number of children a node may
/// have. Every capacity threshold derives from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Order(usize);

impl Order {
    pub fn new(order: usize) -> Result<Self> {
        if order < MIN_ORDER {
            return Err(Error::InvalidOrder(order));
        }

        Ok(Self(order))
    }

    pub fn get(&self) -> usize {
        self.0
    }

    pub fn max_children(&self) -> usize {
        self.0
    }

    /// `ceil(m / 2)`
    pub fn min_children(&self) -> usize {
        (self.0 + 1) / 2
    }

    pub fn max_contents(&self) -> usize {
        self.max_children() - 1
    }

    pub fn min_contents(&self) -> usize {
        self.min_children() - 1
    }

    /// Index of the separator promoted out of an overfull node. Rounds down,
    /// so on even orders the right half of a split keeps the extra item.
    pub fn pivot(&self) -> usize {
        (self.0 - 1) / 2
    }
}

impl TryFrom<usize> for Order {
    type Error = Error;

    fn try_from(order: usize) -> Result<Self> {
        Self::new(order)
    }
}

impl From<Order> for usize {
    fn from(order: Order) -> Self {
        order.0
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_rejects_small_orders() {
        for order in 0..MIN_ORDER {
            assert_eq!(Order::new(order), Err(Error::InvalidOrder(order)));
        }
        assert_eq!(Order::try_from(3).map(usize::from), Ok(3));
    }

    #[test]
    fn test_thresholds() {
        let three = Order::new(3).unwrap();
        assert_eq!(
            (three.min_children(), three.min_contents(), three.max_contents(), three.pivot()),
            (2, 1, 2, 1)
        );

        let four = Order::new(4).unwrap();
        assert_eq!(
            (four.min_children(), four.min_contents(), four.max_contents(), four.pivot()),
            (2, 1, 3, 1)
        );

        let six = Order::new(6).unwrap();
        assert_eq!(
            (six.min_children(), six.min_contents(), six.max_contents(), six.pivot()),
            (3, 2, 5, 2)
        );
    }

    #[test_strategy::proptest]
    fn test_split_halves_are_legal(#[strategy(MIN_ORDER..1024usize)] order: usize) {
        let order = Order::new(order)?;
        let overfull = order.max_contents() + 1;
        let left = order.pivot();
        let right = overfull - order.pivot() - 1;

        prop_assert!(left >= order.min_contents());
        prop_assert!(right >= left);
        prop_assert!(right - left <= 1);
        prop_assert!(right <= order.max_contents());
    }
}
