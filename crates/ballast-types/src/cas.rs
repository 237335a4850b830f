use serde::{Deserialize, Serialize};

use crate::ids::BlockId;

/// The payload a writer signs to authorize moving its mutable pointer.
///
/// `original` is the value the writer believes the pointer currently holds;
/// `updated` is the value it should hold afterwards. `None` denotes an empty
/// pointer — so `original: None` is a first write and `updated: None` is a
/// deletion. A pointer change is applied only if `original` matches the
/// currently recorded target, which is what makes the swap compare-and-set
/// rather than last-writer-wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasPair {
    /// Expected current pointer target.
    pub original: Option<BlockId>,
    /// Requested new pointer target.
    pub updated: Option<BlockId>,
}

impl CasPair {
    /// Build a pair moving the pointer from `original` to `updated`.
    pub fn new(original: Option<BlockId>, updated: Option<BlockId>) -> Self {
        Self { original, updated }
    }

    /// A first write: the pointer is expected to be empty.
    pub fn initial(updated: BlockId) -> Self {
        Self {
            original: None,
            updated: Some(updated),
        }
    }

    /// A deletion: the pointer is cleared.
    pub fn deletion(original: BlockId) -> Self {
        Self {
            original: Some(original),
            updated: None,
        }
    }

    /// Returns `true` if the pair would leave the pointer unchanged.
    pub fn is_noop(&self) -> bool {
        self.original == self.updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(byte: u8) -> BlockId {
        BlockId::from_raw([byte; 32])
    }

    #[test]
    fn initial_pair_has_no_original() {
        let pair = CasPair::initial(block(1));
        assert_eq!(pair.original, None);
        assert_eq!(pair.updated, Some(block(1)));
    }

    #[test]
    fn deletion_pair_has_no_updated() {
        let pair = CasPair::deletion(block(1));
        assert_eq!(pair.original, Some(block(1)));
        assert_eq!(pair.updated, None);
    }

    #[test]
    fn noop_detection() {
        assert!(CasPair::new(Some(block(1)), Some(block(1))).is_noop());
        assert!(CasPair::new(None, None).is_noop());
        assert!(!CasPair::new(Some(block(1)), Some(block(2))).is_noop());
    }

    #[test]
    fn bincode_roundtrip() {
        let pair = CasPair::new(Some(block(3)), Some(block(4)));
        let bytes = bincode::serialize(&pair).unwrap();
        let decoded: CasPair = bincode::deserialize(&bytes).unwrap();
        assert_eq!(pair, decoded);
    }
}
