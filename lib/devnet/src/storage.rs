//! Typed accessors over raw storage words, using Solidity's storage layout
//! rules.
//!
//! Values smaller than a word are packed from the low-order end: an `offset`
//! of `0` is the rightmost byte of the word. Mappings place the value for
//! `key` at `keccak256(key . slot)`. Strings shorter than 32 bytes are stored
//! inline with `length * 2` in the lowest byte; longer strings store
//! `length * 2 + 1` in the slot and their data from `keccak256(slot)` on.
use core::marker::PhantomData;

use alloy_primitives::{keccak256, Address, B256, U256};

use crate::host::Host;

const WORD_BYTES: usize = 32;

/// A value that fits in a storage word.
pub trait StorageWord: Sized {
    /// Number of bytes the value occupies.
    const BYTES: usize;

    /// Decodes the value from exactly [`Self::BYTES`] big-endian bytes.
    fn from_be_slice(bytes: &[u8]) -> Self;

    /// Encodes the value into exactly [`Self::BYTES`] big-endian bytes.
    fn write_be(&self, out: &mut [u8]);
}

impl StorageWord for U256 {
    const BYTES: usize = 32;

    fn from_be_slice(bytes: &[u8]) -> Self {
        U256::from_be_slice(bytes)
    }

    fn write_be(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.to_be_bytes::<32>());
    }
}

impl StorageWord for B256 {
    const BYTES: usize = 32;

    fn from_be_slice(bytes: &[u8]) -> Self {
        B256::from_slice(bytes)
    }

    fn write_be(&self, out: &mut [u8]) {
        out.copy_from_slice(self.as_slice());
    }
}

impl StorageWord for Address {
    const BYTES: usize = 20;

    fn from_be_slice(bytes: &[u8]) -> Self {
        Address::from_slice(bytes)
    }

    fn write_be(&self, out: &mut [u8]) {
        out.copy_from_slice(self.as_slice());
    }
}

impl StorageWord for u64 {
    const BYTES: usize = 8;

    fn from_be_slice(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        u64::from_be_bytes(buf)
    }

    fn write_be(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.to_be_bytes());
    }
}

impl StorageWord for bool {
    const BYTES: usize = 1;

    fn from_be_slice(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn write_be(&self, out: &mut [u8]) {
        out[0] = u8::from(*self);
    }
}

/// A value usable as a mapping key.
pub trait StorageKey {
    /// The key padded to a full word, as `abi.encode` would.
    fn to_word(&self) -> B256;
}

impl StorageKey for Address {
    fn to_word(&self) -> B256 {
        self.into_word()
    }
}

impl StorageKey for U256 {
    fn to_word(&self) -> B256 {
        B256::from(self.to_be_bytes::<32>())
    }
}

/// A single value of type `T` at a fixed slot and byte offset.
pub struct StorageValue<'h, T> {
    host: &'h dyn Host,
    slot: U256,
    offset: usize,
    _marker: PhantomData<T>,
}

/// A `uint256` storage value.
pub type StorageU256<'h> = StorageValue<'h, U256>;
/// A `uint64` storage value.
pub type StorageU64<'h> = StorageValue<'h, u64>;
/// An `address` storage value.
pub type StorageAddress<'h> = StorageValue<'h, Address>;
/// A `bool` storage value.
pub type StorageBool<'h> = StorageValue<'h, bool>;

impl<'h, T: StorageWord> StorageValue<'h, T> {
    /// Value occupying the low-order bytes of `slot`.
    #[must_use]
    pub fn new(host: &'h dyn Host, slot: U256) -> Self {
        Self::packed(host, slot, 0)
    }

    /// Value packed at byte `offset` of `slot`.
    ///
    /// # Panics
    ///
    /// If the value does not fit in the word at `offset`.
    #[must_use]
    pub fn packed(host: &'h dyn Host, slot: U256, offset: usize) -> Self {
        assert!(offset + T::BYTES <= WORD_BYTES, "value must fit in a word");
        Self { host, slot, offset, _marker: PhantomData }
    }

    /// The slot this value lives in.
    #[must_use]
    pub fn slot(&self) -> U256 {
        self.slot
    }

    fn range(&self) -> core::ops::Range<usize> {
        let end = WORD_BYTES - self.offset;
        end - T::BYTES..end
    }

    /// Reads the value.
    #[must_use]
    pub fn get(&self) -> T {
        let word = self.host.sload(self.slot);
        T::from_be_slice(&word[self.range()])
    }

    /// Writes the value, leaving the other bytes of the word untouched.
    pub fn set(&self, value: T) {
        let mut word = self.host.sload(self.slot);
        let range = self.range();
        value.write_be(&mut word[range]);
        self.host.sstore(self.slot, word);
    }
}

/// A `mapping(K => _)` rooted at a slot.
pub struct StorageMap<'h, K> {
    host: &'h dyn Host,
    slot: U256,
    _marker: PhantomData<K>,
}

impl<'h, K: StorageKey> StorageMap<'h, K> {
    /// Mapping declared at `slot`.
    #[must_use]
    pub fn new(host: &'h dyn Host, slot: U256) -> Self {
        Self { host, slot, _marker: PhantomData }
    }

    /// Slot holding the entry for `key`.
    #[must_use]
    pub fn slot_of(&self, key: &K) -> U256 {
        let mut preimage = [0u8; 2 * WORD_BYTES];
        preimage[..WORD_BYTES].copy_from_slice(key.to_word().as_slice());
        preimage[WORD_BYTES..].copy_from_slice(&self.slot.to_be_bytes::<32>());
        U256::from_be_bytes(keccak256(preimage).0)
    }

    /// Value stored for `key`.
    #[must_use]
    pub fn value<T: StorageWord>(&self, key: &K) -> StorageValue<'h, T> {
        StorageValue::new(self.host, self.slot_of(key))
    }

    /// Nested mapping stored for `key`.
    #[must_use]
    pub fn map<K2: StorageKey>(&self, key: &K) -> StorageMap<'h, K2> {
        StorageMap::new(self.host, self.slot_of(key))
    }
}

/// A `string` at a fixed slot.
pub struct StorageString<'h> {
    host: &'h dyn Host,
    slot: U256,
}

impl<'h> StorageString<'h> {
    /// String declared at `slot`.
    #[must_use]
    pub fn new(host: &'h dyn Host, slot: U256) -> Self {
        Self { host, slot }
    }

    fn data_slot(&self) -> U256 {
        U256::from_be_bytes(keccak256(self.slot.to_be_bytes::<32>()).0)
    }

    /// Reads the string. Invalid UTF-8 is replaced lossily.
    #[must_use]
    pub fn get(&self) -> String {
        let word = self.host.sload(self.slot);
        let marker = word[WORD_BYTES - 1];
        if marker & 1 == 0 {
            let len = usize::from(marker / 2).min(WORD_BYTES - 1);
            return String::from_utf8_lossy(&word[..len]).into_owned();
        }

        let encoded = U256::from_be_bytes(word.0);
        let len = usize::try_from(encoded >> 1usize).unwrap_or(usize::MAX);
        let base = self.data_slot();
        let mut bytes = Vec::with_capacity(len.min(4096));
        let mut index = U256::ZERO;
        while bytes.len() < len {
            let chunk = self.host.sload(base + index);
            let take = (len - bytes.len()).min(WORD_BYTES);
            bytes.extend_from_slice(&chunk[..take]);
            index += U256::from(1);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Writes the string, clearing the data slots of the previous value
    /// that the new one does not cover.
    pub fn set(&self, value: &str) {
        let bytes = value.as_bytes();
        self.clear_data_from(bytes.len().div_ceil(WORD_BYTES));
        if bytes.len() < WORD_BYTES {
            let mut word = B256::ZERO;
            word[..bytes.len()].copy_from_slice(bytes);
            #[allow(clippy::cast_possible_truncation)]
            let marker = (bytes.len() * 2) as u8;
            word[WORD_BYTES - 1] = marker;
            self.host.sstore(self.slot, word);
            return;
        }

        let marker = U256::from(bytes.len()) * U256::from(2) + U256::from(1);
        self.host.sstore(self.slot, B256::from(marker.to_be_bytes::<32>()));
        let base = self.data_slot();
        for (index, chunk) in bytes.chunks(WORD_BYTES).enumerate() {
            let mut word = B256::ZERO;
            word[..chunk.len()].copy_from_slice(chunk);
            self.host.sstore(base + U256::from(index), word);
        }
    }

    /// Zeroes the long form data slots from `first` on.
    fn clear_data_from(&self, first: usize) {
        let word = U256::from_be_bytes(self.host.sload(self.slot).0);
        if !word.bit(0) {
            return;
        }
        let len = usize::try_from(word >> 1usize).unwrap_or(usize::MAX);
        let base = self.data_slot();
        for index in first..len.div_ceil(WORD_BYTES) {
            self.host.sstore(base + U256::from(index), B256::ZERO);
        }
    }
}

/// Computes the base slot of an [ERC-7201] storage namespace:
/// `keccak256(abi.encode(uint256(keccak256(id)) - 1)) & ~bytes32(uint256(0xff))`.
///
/// [ERC-7201]: https://eips.ethereum.org/EIPS/eip-7201
#[must_use]
pub fn erc7201_slot(namespace: &str) -> U256 {
    let id = U256::from_be_bytes(keccak256(namespace.as_bytes()).0);
    let location = keccak256((id - U256::from(1)).to_be_bytes::<32>());
    U256::from_be_bytes(location.0) & !U256::from(0xff)
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::HashMap};

    use alloy_primitives::{uint, Bytes, LogData};
    use proptest::prelude::*;

    use super::*;
    use crate::host::Revert;

    #[derive(Default)]
    struct MemoryHost {
        words: RefCell<HashMap<U256, B256>>,
    }

    impl Host for MemoryHost {
        fn contract_address(&self) -> Address {
            Address::ZERO
        }

        fn code_address(&self) -> Address {
            Address::ZERO
        }

        fn msg_sender(&self) -> Address {
            Address::ZERO
        }

        fn block_number(&self) -> u64 {
            0
        }

        fn sload(&self, slot: U256) -> B256 {
            self.words.borrow().get(&slot).copied().unwrap_or_default()
        }

        fn sstore(&self, slot: U256, value: B256) {
            self.words.borrow_mut().insert(slot, value);
        }

        fn emit_log(&self, _data: LogData) {}

        fn has_code(&self, _account: Address) -> bool {
            false
        }

        fn delegate_call(
            &self,
            _target: Address,
            _input: &[u8],
        ) -> Result<Bytes, Revert> {
            Ok(Bytes::new())
        }

        fn static_call(
            &self,
            _target: Address,
            _input: &[u8],
        ) -> Result<Bytes, Revert> {
            Ok(Bytes::new())
        }
    }

    #[test]
    fn packed_values_share_a_word() {
        let host = MemoryHost::default();
        let slot = uint!(5_U256);
        let version = StorageU64::packed(&host, slot, 0);
        let flag = StorageBool::packed(&host, slot, 8);

        version.set(3);
        flag.set(true);

        assert_eq!(version.get(), 3);
        assert!(flag.get());

        let word = host.sload(slot);
        assert_eq!(word[31], 3);
        assert_eq!(word[23], 1);

        flag.set(false);
        assert_eq!(version.get(), 3);
    }

    #[test]
    fn mapping_slot_matches_solidity() {
        let host = MemoryHost::default();
        let map = StorageMap::<Address>::new(&host, U256::ZERO);
        let key = Address::repeat_byte(0x11);

        let mut preimage = [0u8; 64];
        preimage[12..32].copy_from_slice(key.as_slice());
        let expected = U256::from_be_bytes(keccak256(preimage).0);

        assert_eq!(map.slot_of(&key), expected);
    }

    #[test]
    fn nested_mappings_are_distinct() {
        let host = MemoryHost::default();
        let allowances = StorageMap::<Address>::new(&host, uint!(1_U256));
        let alice = Address::repeat_byte(1);
        let bob = Address::repeat_byte(2);

        allowances
            .map::<Address>(&alice)
            .value::<U256>(&bob)
            .set(U256::from(9));

        let stored: U256 =
            allowances.map::<Address>(&alice).value::<U256>(&bob).get();
        let swapped: U256 =
            allowances.map::<Address>(&bob).value::<U256>(&alice).get();
        assert_eq!(stored, U256::from(9));
        assert_eq!(swapped, U256::ZERO);
    }

    #[test]
    fn short_string_is_inline() {
        let host = MemoryHost::default();
        let name = StorageString::new(&host, uint!(3_U256));

        name.set("AST");

        let word = host.sload(uint!(3_U256));
        assert_eq!(&word[..3], b"AST");
        assert_eq!(word[31], 6);
        assert_eq!(name.get(), "AST");
    }

    #[test]
    fn shortening_a_long_string_clears_its_data() {
        let host = MemoryHost::default();
        let name = StorageString::new(&host, uint!(3_U256));
        let base = name.data_slot();
        name.set(&"a".repeat(70));
        assert_ne!(host.sload(base + uint!(2_U256)), B256::ZERO);

        name.set(&"b".repeat(40));
        assert_ne!(host.sload(base + uint!(1_U256)), B256::ZERO);
        assert_eq!(host.sload(base + uint!(2_U256)), B256::ZERO);

        name.set("AST");
        assert_eq!(host.sload(base), B256::ZERO);
        assert_eq!(host.sload(base + uint!(1_U256)), B256::ZERO);
        assert_eq!(name.get(), "AST");
    }

    #[test]
    fn bounds_the_length_of_short_strings() {
        let host = MemoryHost::default();
        let mut word = B256::repeat_byte(b'x');
        word[31] = 0xfe;
        host.sstore(uint!(3_U256), word);

        let name = StorageString::new(&host, uint!(3_U256)).get();

        assert_eq!(name, "x".repeat(31));
    }

    #[test]
    fn erc7201_matches_known_namespace() {
        assert_eq!(
            erc7201_slot("openzeppelin.storage.Initializable"),
            uint!(0xf0c57e16840df040f15088dc2f81fe391c3923bec73e23a9662efc9c229c6a00_U256)
        );
    }

    proptest! {
        #[test]
        fn strings_round_trip_at_any_length(value in ".{0,100}") {
            let host = MemoryHost::default();
            let string = StorageString::new(&host, uint!(7_U256));
            string.set(&value);
            prop_assert_eq!(string.get(), value);
        }
    }
}
