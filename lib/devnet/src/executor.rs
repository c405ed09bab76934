//! Executes contract code against a working copy of the world state.
use std::{
    cell::{Cell, RefCell},
    sync::Arc,
};

use alloy_primitives::{keccak256, Address, Bytes, Log, LogData, B256, U256};

use crate::{
    host::{Contract, Host, Revert},
    registry::Registry,
    state::World,
};

/// Maximum nesting of calls inside a transaction.
pub const MAX_CALL_DEPTH: usize = 1024;

/// Runs a single transaction.
///
/// Every frame takes a checkpoint before running and restores it if it
/// reverts, so a failed sub-call discards exactly its own changes.
pub(crate) struct Executor<'r> {
    world: RefCell<World>,
    logs: RefCell<Vec<Log>>,
    registry: &'r Registry,
    block_number: u64,
}

struct Checkpoint {
    world: World,
    logs: usize,
}

impl<'r> Executor<'r> {
    pub(crate) fn new(
        world: World,
        registry: &'r Registry,
        block_number: u64,
    ) -> Self {
        Self {
            world: RefCell::new(world),
            logs: RefCell::new(Vec::new()),
            registry,
            block_number,
        }
    }

    /// Working world state and the logs emitted so far.
    pub(crate) fn into_parts(self) -> (World, Vec<Log>) {
        (self.world.into_inner(), self.logs.into_inner())
    }

    /// Message call from `caller` into `to`.
    pub(crate) fn call(
        &self,
        caller: Address,
        to: Address,
        input: &[u8],
    ) -> Result<Bytes, Revert> {
        self.execute(&Frame::new(self, to, to, caller, false, 0), input)
    }

    /// Creates a contract running `bytecode` at `address`.
    pub(crate) fn create(
        &self,
        caller: Address,
        address: Address,
        bytecode: &Bytes,
        args: &[u8],
    ) -> Result<(), Revert> {
        if self.world.borrow().has_code(&address) {
            return Err(Revert::empty());
        }
        let contract = self
            .registry
            .get(&keccak256(bytecode))
            .ok_or_else(Revert::empty)?;

        let checkpoint = self.checkpoint();
        let frame = Frame::new(self, address, address, caller, false, 0);
        match contract.constructor(&frame, args).and_then(|()| frame.finish()) {
            Ok(()) => {
                self.world.borrow_mut().account_mut(address).code =
                    bytecode.clone();
                Ok(())
            }
            Err(revert) => {
                self.restore(checkpoint);
                Err(revert)
            }
        }
    }

    fn execute(
        &self,
        frame: &Frame<'_, 'r>,
        input: &[u8],
    ) -> Result<Bytes, Revert> {
        if frame.depth > MAX_CALL_DEPTH {
            return Err(Revert::empty());
        }

        // Calls into accounts without code succeed with no return data.
        let Some(contract) = self.contract_at(&frame.code_address) else {
            return Ok(Bytes::new());
        };

        let checkpoint = self.checkpoint();
        let result = contract
            .call(frame, input)
            .and_then(|output| frame.finish().map(|()| output));
        if result.is_err() {
            self.restore(checkpoint);
        }
        result
    }

    fn contract_at(&self, address: &Address) -> Option<Arc<dyn Contract>> {
        let code_hash = self.world.borrow().account(address)?.code_hash()?;
        self.registry.get(&code_hash)
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            world: self.world.borrow().clone(),
            logs: self.logs.borrow().len(),
        }
    }

    fn restore(&self, checkpoint: Checkpoint) {
        *self.world.borrow_mut() = checkpoint.world;
        self.logs.borrow_mut().truncate(checkpoint.logs);
    }
}

/// A call frame.
struct Frame<'e, 'r> {
    executor: &'e Executor<'r>,
    address: Address,
    code_address: Address,
    caller: Address,
    is_static: bool,
    depth: usize,
    write_violation: Cell<bool>,
}

impl<'e, 'r> Frame<'e, 'r> {
    fn new(
        executor: &'e Executor<'r>,
        address: Address,
        code_address: Address,
        caller: Address,
        is_static: bool,
        depth: usize,
    ) -> Self {
        Self {
            executor,
            address,
            code_address,
            caller,
            is_static,
            depth,
            write_violation: Cell::new(false),
        }
    }

    /// Fails the frame if it tried to modify state inside a static call.
    fn finish(&self) -> Result<(), Revert> {
        if self.write_violation.get() {
            Err(Revert::empty())
        } else {
            Ok(())
        }
    }
}

impl Host for Frame<'_, '_> {
    fn contract_address(&self) -> Address {
        self.address
    }

    fn code_address(&self) -> Address {
        self.code_address
    }

    fn msg_sender(&self) -> Address {
        self.caller
    }

    fn block_number(&self) -> u64 {
        self.executor.block_number
    }

    fn sload(&self, slot: U256) -> B256 {
        self.executor.world.borrow().sload(&self.address, &slot)
    }

    fn sstore(&self, slot: U256, value: B256) {
        if self.is_static {
            self.write_violation.set(true);
            return;
        }
        self.executor.world.borrow_mut().sstore(self.address, slot, value);
    }

    fn emit_log(&self, data: LogData) {
        if self.is_static {
            self.write_violation.set(true);
            return;
        }
        let log = Log { address: self.address, data };
        self.executor.logs.borrow_mut().push(log);
    }

    fn has_code(&self, account: Address) -> bool {
        self.executor.world.borrow().has_code(&account)
    }

    fn delegate_call(
        &self,
        target: Address,
        input: &[u8],
    ) -> Result<Bytes, Revert> {
        let frame = Frame::new(
            self.executor,
            self.address,
            target,
            self.caller,
            self.is_static,
            self.depth + 1,
        );
        self.executor.execute(&frame, input)
    }

    fn static_call(
        &self,
        target: Address,
        input: &[u8],
    ) -> Result<Bytes, Revert> {
        let frame = Frame::new(
            self.executor,
            target,
            target,
            self.address,
            true,
            self.depth + 1,
        );
        self.executor.execute(&frame, input)
    }
}
