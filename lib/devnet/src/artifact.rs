//! Compiled contract artifacts.
use alloy_primitives::{keccak256, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// Maximum size of deployed code, as set by [EIP-170].
///
/// [EIP-170]: https://eips.ethereum.org/EIPS/eip-170
pub const MAX_CODE_SIZE: usize = 0x6000;

/// Output of the compiler pipeline for one contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Name of the contract.
    pub contract_name: String,
    /// Code stored on chain. Opaque to everything but the executor.
    pub bytecode: Bytes,
    /// Layout of the state variables the contract declares.
    pub storage_layout: StorageLayout,
}

impl Artifact {
    /// Hash identifying the bytecode.
    #[must_use]
    pub fn code_hash(&self) -> B256 {
        keccak256(&self.bytecode)
    }
}

/// Storage layout of a contract, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLayout {
    /// Declared state variables.
    pub storage: Vec<StorageEntry>,
}

impl StorageLayout {
    /// Looks up the variable at `slot` and byte `offset`.
    #[must_use]
    pub fn entry_at(&self, slot: U256, offset: u8) -> Option<&StorageEntry> {
        self.storage.iter().find(|e| e.slot == slot && e.offset == offset)
    }
}

/// A single state variable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    /// Fully qualified name, e.g. `ERC20Storage._balances`.
    pub label: String,
    /// Slot the variable starts at.
    pub slot: U256,
    /// Byte offset inside the slot, counted from the low-order end.
    pub offset: u8,
    /// Solidity type, e.g. `mapping(address => uint256)`.
    #[serde(rename = "type")]
    pub ty: String,
}

impl StorageEntry {
    /// Creates an entry.
    pub fn new(
        label: impl Into<String>,
        slot: U256,
        offset: u8,
        ty: impl Into<String>,
    ) -> Self {
        Self { label: label.into(), slot, offset, ty: ty.into() }
    }

    /// Bytes the variable occupies from its offset, as solc reports them in
    /// `numberOfBytes`. Types that are not packed take a whole slot.
    #[must_use]
    pub fn number_of_bytes(&self) -> u8 {
        let ty = self.ty.as_str();
        let bits =
            ty.strip_prefix("t_uint").or_else(|| ty.strip_prefix("t_int"));
        match ty {
            "t_bool" => 1,
            "t_address" => 20,
            _ => match (bits, ty.strip_prefix("t_bytes")) {
                (Some(bits), _) => bits
                    .parse::<u16>()
                    .ok()
                    .and_then(|bits| u8::try_from(bits / 8).ok())
                    .unwrap_or(32),
                (None, Some(bytes)) => bytes.parse().unwrap_or(32),
                (None, None) => 32,
            },
        }
    }

    /// Whether `self` and `other` share at least one byte of storage.
    #[must_use]
    pub fn overlaps(&self, other: &StorageEntry) -> bool {
        let range = |e: &StorageEntry| {
            let start = u16::from(e.offset);
            (start, start + u16::from(e.number_of_bytes()))
        };
        let ((start, end), (other_start, other_end)) =
            (range(self), range(other));
        self.slot == other.slot && start < other_end && other_start < end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(offset: u8, ty: &str) -> StorageEntry {
        StorageEntry::new("v", U256::ZERO, offset, ty)
    }

    #[test]
    fn sizes_follow_the_type() {
        assert_eq!(at(0, "t_bool").number_of_bytes(), 1);
        assert_eq!(at(0, "t_address").number_of_bytes(), 20);
        assert_eq!(at(0, "t_uint64").number_of_bytes(), 8);
        assert_eq!(at(0, "t_int128").number_of_bytes(), 16);
        assert_eq!(at(0, "t_uint256").number_of_bytes(), 32);
        assert_eq!(at(0, "t_bytes4").number_of_bytes(), 4);
        assert_eq!(at(0, "t_bytes_storage").number_of_bytes(), 32);
        assert_eq!(at(0, "t_string_storage").number_of_bytes(), 32);
        assert_eq!(
            at(0, "t_mapping(t_address,t_uint256)").number_of_bytes(),
            32
        );
    }

    #[test]
    fn packed_neighbours_do_not_overlap() {
        let version = at(0, "t_uint64");
        let flag = at(8, "t_bool");

        assert!(!version.overlaps(&flag));
        assert!(at(0, "t_uint128").overlaps(&flag));
        assert!(at(4, "t_uint64").overlaps(&version));
        assert!(!StorageEntry::new("w", U256::from(1), 0, "t_uint64")
            .overlaps(&version));
    }
}
