//! Single-instruction dispatch.
//!
//! The executor owns the instruction pointer bookkeeping: a plain
//! instruction advances ip by one, a taken jump assigns the target
//! directly, an out-of-range jump assigns `size` and overruns, and a
//! suspending `waita` leaves ip on the opcode so the thread re-observes
//! it on resume. Operations whose arity exceeds the current stack depth
//! are silent no-ops on the stack; their counter still increments and ip
//! still advances.

use crate::insn::{Instruction, Opcode};
use crate::vm::{Channel, ChannelIo, EventSink, Fault, ThreadState, Vm};

/// What the dispatched instruction asked of the scheduler.
enum Flow {
    /// Advance past the instruction.
    Advance,
    /// Jump taken: continue at this in-range index.
    Jump(usize),
    /// Jump target out of range: overrun immediately.
    JumpOut,
    /// `waita` found the alpha stack empty: suspend in place.
    Suspend,
    /// Local fault: halt the thread.
    Fault(Fault),
}

impl Vm {
    /// Execute one non-`nop`, non-`halt` instruction for `ch`.
    pub(crate) fn step(
        &mut self,
        ch: Channel,
        insn: Instruction,
        io: &mut dyn ChannelIo,
        sink: &mut dyn EventSink,
    ) {
        let ip = self.threads[ch.index()].ip;
        match self.dispatch(ch, insn, io) {
            Flow::Advance => {
                let overran = self.advance_ip(ch);
                sink.instruction(self, ch, insn);
                if overran {
                    sink.overrun(self, ch);
                }
            }
            Flow::Jump(target) => {
                self.threads[ch.index()].ip = target;
                sink.instruction(self, ch, insn);
            }
            Flow::JumpOut => {
                let size = self.program.len();
                let th = &mut self.threads[ch.index()];
                th.ip = size;
                th.state = ThreadState::Overrun;
                sink.instruction(self, ch, insn);
                sink.overrun(self, ch);
            }
            Flow::Suspend => {
                self.threads[ch.index()].state = ThreadState::Await;
                self.wait_queue.push_back(ch);
                sink.instruction(self, ch, insn);
                sink.suspended(self, ch);
            }
            Flow::Fault(fault) => self.halt_with_fault(ch, ip, fault, sink),
        }
    }

    fn dispatch(&mut self, ch: Channel, insn: Instruction, io: &mut dyn ChannelIo) -> Flow {
        let size = self.program.len();
        let limit = self.stack_limit;
        let Vm { threads, alpha, .. } = self;
        let th = &mut threads[ch.index()];

        let op = match insn {
            Instruction::Push(n) => {
                th.stats.record_push();
                if !push_within(&mut th.stack, limit, n as i64) {
                    return Flow::Fault(Fault::StackLimit);
                }
                return Flow::Advance;
            }
            Instruction::Invalid(b) => return Flow::Fault(Fault::InvalidOpcode(b)),
            Instruction::Op(op) => op,
        };

        // A suspending waita is counted on resume, not here.
        if op != Opcode::Waita {
            th.stats.record(op);
        }

        match op {
            Opcode::Add => {
                if let Some((x, y)) = pop2(&mut th.stack) {
                    th.stack.push(x.wrapping_add(y));
                }
                Flow::Advance
            }
            Opcode::Sub => {
                // Top minus second.
                if let Some((x, y)) = pop2(&mut th.stack) {
                    th.stack.push(x.wrapping_sub(y));
                }
                Flow::Advance
            }
            Opcode::Mul => {
                if let Some((x, y)) = pop2(&mut th.stack) {
                    th.stack.push(x.wrapping_mul(y));
                }
                Flow::Advance
            }
            Opcode::Div => {
                // Top is the dividend.
                if let Some((x, y)) = pop2(&mut th.stack) {
                    if y == 0 {
                        return Flow::Fault(Fault::DivisionByZero);
                    }
                    th.stack.push(floor_div(x, y));
                }
                Flow::Advance
            }
            Opcode::Rem => {
                if let Some((x, y)) = pop2(&mut th.stack) {
                    if y == 0 {
                        return Flow::Fault(Fault::DivisionByZero);
                    }
                    th.stack.push(floor_rem(x, y));
                }
                Flow::Advance
            }
            Opcode::Pop => {
                let _ = th.stack.pop();
                Flow::Advance
            }
            Opcode::Swap => {
                if let Some((x, y)) = pop2(&mut th.stack) {
                    th.stack.push(x);
                    th.stack.push(y);
                }
                Flow::Advance
            }
            Opcode::Dup => {
                if let Some(&top) = th.stack.last() {
                    if !push_within(&mut th.stack, limit, top) {
                        return Flow::Fault(Fault::StackLimit);
                    }
                }
                Flow::Advance
            }
            Opcode::Rot => {
                if let Some(n) = th.stack.pop() {
                    if n <= th.stack.len() as i64 {
                        if let Some(x) = th.stack.pop() {
                            // Reinsert the old top n-1 slots below the new
                            // top; n <= 1 collapses to reinserting at the
                            // top.
                            let len = th.stack.len() as i64;
                            let idx = (len + 1).saturating_sub(n).clamp(0, len) as usize;
                            th.stack.insert(idx, x);
                        }
                    }
                }
                Flow::Advance
            }
            Opcode::Not => {
                if let Some(x) = th.stack.pop() {
                    th.stack.push(!x);
                }
                Flow::Advance
            }
            Opcode::Or => {
                if let Some((x, y)) = pop2(&mut th.stack) {
                    th.stack.push(x | y);
                }
                Flow::Advance
            }
            Opcode::And => {
                if let Some((x, y)) = pop2(&mut th.stack) {
                    th.stack.push(x & y);
                }
                Flow::Advance
            }
            Opcode::Gt => {
                // Top compared against second.
                if let Some((a, b)) = pop2(&mut th.stack) {
                    th.stack.push((a > b) as i64);
                }
                Flow::Advance
            }
            Opcode::Eq => {
                if let Some((a, b)) = pop2(&mut th.stack) {
                    th.stack.push((a == b) as i64);
                }
                Flow::Advance
            }
            Opcode::Lt => {
                if let Some((a, b)) = pop2(&mut th.stack) {
                    th.stack.push((a < b) as i64);
                }
                Flow::Advance
            }
            Opcode::Jmpz | Opcode::Jmpnz => {
                // Condition on top, target below it.
                if let Some((value, addr)) = pop2(&mut th.stack) {
                    let taken = if op == Opcode::Jmpz {
                        value == 0
                    } else {
                        value != 0
                    };
                    if taken {
                        return if addr >= 0 && (addr as usize) < size {
                            Flow::Jump(addr as usize)
                        } else {
                            Flow::JumpOut
                        };
                    }
                }
                Flow::Advance
            }
            Opcode::Outc => {
                if let Some(n) = th.stack.pop() {
                    if (0..=127).contains(&n) {
                        io.write_char(n as u8 as char);
                    }
                }
                Flow::Advance
            }
            Opcode::Inc => {
                if let Some(c) = io.read_char(ch) {
                    if !push_within(&mut th.stack, limit, c as i64) {
                        return Flow::Fault(Fault::StackLimit);
                    }
                }
                Flow::Advance
            }
            Opcode::Outi => {
                if let Some(n) = th.stack.pop() {
                    io.write_int(n);
                }
                Flow::Advance
            }
            Opcode::Ini => {
                if let Some(v) = io.read_int(ch) {
                    if !push_within(&mut th.stack, limit, v) {
                        return Flow::Fault(Fault::StackLimit);
                    }
                }
                Flow::Advance
            }
            Opcode::Pusha => {
                if let Some(v) = th.stack.pop() {
                    if !push_within(alpha, limit, v) {
                        return Flow::Fault(Fault::StackLimit);
                    }
                }
                Flow::Advance
            }
            Opcode::Waita => match alpha.pop() {
                Some(v) => {
                    th.stats.record(op);
                    if !push_within(&mut th.stack, limit, v) {
                        return Flow::Fault(Fault::StackLimit);
                    }
                    Flow::Advance
                }
                None => Flow::Suspend,
            },
            Opcode::Neg => {
                if let Some(x) = th.stack.pop() {
                    th.stack.push(0i64.wrapping_sub(x));
                }
                Flow::Advance
            }
            Opcode::Shl => {
                // Shift amount on top, value below it.
                if let Some((s, v)) = pop2(&mut th.stack) {
                    th.stack.push(shift_left(v, s));
                }
                Flow::Advance
            }
            Opcode::Shr => {
                if let Some((s, v)) = pop2(&mut th.stack) {
                    th.stack.push(shift_right(v, s));
                }
                Flow::Advance
            }
            Opcode::Nop | Opcode::Halt => {
                debug_assert!(false, "nop/halt are scheduler-handled");
                Flow::Advance
            }
        }
    }
}

/// Pop the top two values; `None` (and no mutation) when fewer than two
/// are present.
fn pop2(stack: &mut Vec<i64>) -> Option<(i64, i64)> {
    if stack.len() >= 2 {
        let first = stack.pop()?;
        let second = stack.pop()?;
        Some((first, second))
    } else {
        None
    }
}

/// Push `v` unless it would grow the stack past `limit`.
pub(crate) fn push_within(stack: &mut Vec<i64>, limit: Option<usize>, v: i64) -> bool {
    if let Some(max) = limit {
        if stack.len() >= max {
            return false;
        }
    }
    stack.push(v);
    true
}

/// Floor division (quotient rounds toward negative infinity). `y != 0`.
fn floor_div(x: i64, y: i64) -> i64 {
    let q = x.wrapping_div(y);
    let r = x.wrapping_rem(y);
    if r != 0 && (r < 0) != (y < 0) {
        q.wrapping_sub(1)
    } else {
        q
    }
}

/// Floor modulus (result takes the divisor's sign). `y != 0`.
fn floor_rem(x: i64, y: i64) -> i64 {
    let r = x.wrapping_rem(y);
    if r != 0 && (r < 0) != (y < 0) { r + y } else { r }
}

/// `v << s`; shift amounts outside `0..64` yield 0.
fn shift_left(v: i64, s: i64) -> i64 {
    if (0..64).contains(&s) {
        v.wrapping_shl(s as u32)
    } else {
        0
    }
}

/// Arithmetic `v >> s`; shift amounts outside `0..64` yield the sign
/// fill.
fn shift_right(v: i64, s: i64) -> i64 {
    if (0..64).contains(&s) {
        v >> (s as u32)
    } else if v < 0 {
        -1
    } else {
        0
    }
}
