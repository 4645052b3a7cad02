//! # Machine-Mode Trap Handling
//!
//! - `vectors`: mtvec encoding, vector slots and the handler table
//! - `traps`: cause decoding, outcomes and dispatch state
//! - `handlers`: the stock software/timer/external/default/exception handlers

pub mod handlers;
pub mod traps;
pub mod vectors;

pub use traps::{
    DispatchState, ExceptionFrame, TrapCause, TrapDispatcher, TrapOutcome, EXCEPTION_EXIT_CODE,
};
pub use vectors::{
    ExceptionHandler, HandlerTable, InterruptHandler, TrapVector, TrapVectorMode, VectorSlot,
    MAX_VECTORS,
};
