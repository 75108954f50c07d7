//! Trait seams between the VM core and its host.
//!
//! The core never touches stdin, stdout, or a terminal: character and
//! integer I/O go through [`ChannelIo`], and everything a front-end
//! might want to display (trace lines, faults, termination bookkeeping)
//! is delivered through [`EventSink`]. A sink method receives `&Vm` so
//! it can inspect stacks and thread state at the moment of the event.

use crate::insn::Instruction;
use crate::vm::{Channel, Vm};

/// Character and integer I/O for the `inc`, `ini`, `outc`, `outi`
/// opcodes. Reads block the whole VM; writes emit one line each.
pub trait ChannelIo {
    /// Read one character for `ch`: the first code point of the next
    /// input line. `None` when input is empty or exhausted (nothing is
    /// pushed).
    fn read_char(&mut self, ch: Channel) -> Option<char>;

    /// Read an integer for `ch`: the next input line parsed as an
    /// unsigned decimal. `None` when it does not parse (nothing is
    /// pushed).
    fn read_int(&mut self, ch: Channel) -> Option<i64>;

    fn write_char(&mut self, c: char);
    fn write_int(&mut self, n: i64);
}

/// A local fault: the offending thread halts, the others continue.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Unassigned high-bit code byte.
    InvalidOpcode(u8),
    /// `div` or `rem` with a zero divisor.
    DivisionByZero,
    /// A stack grew past the configured ceiling.
    StackLimit,
}

/// Scheduler and executor events, for diagnostics.
///
/// All methods default to no-ops; a front-end overrides what it renders.
#[allow(unused_variables)]
pub trait EventSink {
    /// The scheduler reached `ch`'s slot in the current pass.
    fn channel_polled(&mut self, vm: &Vm, ch: Channel) {}

    /// One instruction finished executing on `ch` (stacks reflect the
    /// post-instruction state).
    fn instruction(&mut self, vm: &Vm, ch: Channel, insn: Instruction) {}

    /// `ch` suspended on `waita` with an empty alpha stack.
    fn suspended(&mut self, vm: &Vm, ch: Channel) {}

    /// `ch` left AWAIT after data arrived on the alpha stack.
    fn resumed(&mut self, vm: &Vm, ch: Channel) {}

    /// `ch` executed `halt`.
    fn halted(&mut self, vm: &Vm, ch: Channel) {}

    /// `ch`'s ip reached the end of the code array.
    fn overrun(&mut self, vm: &Vm, ch: Channel) {}

    /// `ch` halted on a local fault at instruction `ip`.
    fn fault(&mut self, vm: &Vm, ch: Channel, ip: usize, fault: Fault) {}

    /// A full pass over the channels completed.
    fn pass_completed(&mut self, vm: &Vm, running: usize, waiting: usize) {}
}

/// Sink that discards every event.
pub struct NullSink;

impl EventSink for NullSink {}
