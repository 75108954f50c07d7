//! The three-thread VM: shared state, the cooperative scheduler, and the
//! AWAIT/PUSHA rendezvous.
//!
//! Scheduling is a deterministic round-robin over `[R, G, B]`. Each pass
//! advances every RUNNING thread by one instruction and services at most
//! one AWAIT thread: the head of the FIFO wait queue, and only when the
//! alpha stack has data. Execution is single-threaded throughout, so no
//! opcode ever observes a partially-mutated shared structure.

mod exec;
mod io;
mod thread;

pub use io::{ChannelIo, EventSink, Fault, NullSink};
pub use thread::{Channel, OpStats, Thread, ThreadState};

use crate::image::ProgramImage;
use crate::insn::{Instruction, Opcode};
use exec::push_within;
use std::collections::VecDeque;

/// Why the scheduler stopped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Every thread reached HALTED or OVERRUN.
    Halted,
    /// No thread is RUNNING but at least one is in AWAIT: nothing can
    /// ever push to the alpha stack again.
    Deadlock,
}

pub struct Vm {
    program: ProgramImage,
    threads: [Thread; 3],
    alpha: Vec<i64>,
    wait_queue: VecDeque<Channel>,
    stack_limit: Option<usize>,
}

impl Vm {
    pub fn new(program: ProgramImage) -> Vm {
        Vm {
            program,
            threads: [Thread::new(), Thread::new(), Thread::new()],
            alpha: Vec::new(),
            wait_queue: VecDeque::with_capacity(3),
            stack_limit: None,
        }
    }

    /// Cap the depth of the three thread stacks and the alpha stack.
    /// A thread that grows a stack past the ceiling halts with a
    /// [`Fault::StackLimit`]. `None` (the default) means unbounded.
    pub fn set_stack_limit(&mut self, limit: Option<usize>) {
        self.stack_limit = limit;
    }

    pub fn program(&self) -> &ProgramImage {
        &self.program
    }

    pub fn thread(&self, ch: Channel) -> &Thread {
        &self.threads[ch.index()]
    }

    pub fn alpha_stack(&self) -> &[i64] {
        &self.alpha
    }

    /// Channels currently suspended on the alpha stack, head first.
    pub fn wait_queue(&self) -> &VecDeque<Channel> {
        &self.wait_queue
    }

    /// Code byte `ch` is about to execute, `None` once the thread has
    /// overrun.
    pub fn current_byte(&self, ch: Channel) -> Option<u8> {
        self.program.byte(ch, self.thread(ch).ip)
    }

    /// `(running, waiting)` thread counts.
    pub fn live_counts(&self) -> (usize, usize) {
        let mut running = 0;
        let mut waiting = 0;
        for th in &self.threads {
            match th.state {
                ThreadState::Running => running += 1,
                ThreadState::Await => waiting += 1,
                _ => {}
            }
        }
        (running, waiting)
    }

    /// Run the scheduler until global termination.
    pub fn run(&mut self, io: &mut dyn ChannelIo, sink: &mut dyn EventSink) -> Termination {
        for th in &mut self.threads {
            if th.state == ThreadState::Loading {
                th.state = ThreadState::Running;
            }
        }
        loop {
            for ch in Channel::ALL {
                sink.channel_polled(self, ch);
                match self.thread(ch).state {
                    ThreadState::Running => self.slot_running(ch, io, sink),
                    ThreadState::Await => self.slot_awaiting(ch, sink),
                    _ => {}
                }
            }
            let (running, waiting) = self.live_counts();
            sink.pass_completed(self, running, waiting);
            if running == 0 {
                return if waiting > 0 {
                    Termination::Deadlock
                } else {
                    Termination::Halted
                };
            }
        }
    }

    /// One scheduler slot for a RUNNING thread. `nop` and `halt` are
    /// handled here; everything else goes through the executor.
    fn slot_running(&mut self, ch: Channel, io: &mut dyn ChannelIo, sink: &mut dyn EventSink) {
        // RUNNING implies ip < size.
        let byte = self.program.code(ch)[self.thread(ch).ip];
        match Instruction::decode(byte) {
            Instruction::Op(Opcode::Nop) => {
                let th = &mut self.threads[ch.index()];
                th.stats.record(Opcode::Nop);
                let overran = self.advance_ip(ch);
                sink.instruction(self, ch, Instruction::Op(Opcode::Nop));
                if overran {
                    sink.overrun(self, ch);
                }
            }
            Instruction::Op(Opcode::Halt) => {
                let th = &mut self.threads[ch.index()];
                th.stats.record(Opcode::Halt);
                th.state = ThreadState::Halted;
                sink.halted(self, ch);
            }
            insn => self.step(ch, insn, io, sink),
        }
    }

    /// One scheduler slot for an AWAIT thread: only the queue head is
    /// serviced, and only when the alpha stack is non-empty. Strict FIFO
    /// keeps a later waiter from starving the head.
    fn slot_awaiting(&mut self, ch: Channel, sink: &mut dyn EventSink) {
        if self.wait_queue.front() != Some(&ch) {
            return;
        }
        let Some(value) = self.alpha.pop() else {
            return;
        };
        self.wait_queue.pop_front();

        let limit = self.stack_limit;
        let th = &mut self.threads[ch.index()];
        let ip = th.ip;
        th.state = ThreadState::Running;
        th.stats.record(Opcode::Waita);
        if !push_within(&mut th.stack, limit, value) {
            self.halt_with_fault(ch, ip, Fault::StackLimit, sink);
            return;
        }
        let overran = self.advance_ip(ch);
        sink.resumed(self, ch);
        sink.instruction(self, ch, Instruction::Op(Opcode::Waita));
        if overran {
            sink.overrun(self, ch);
        }
    }

    /// Post-instruction ip advance and OVERRUN check. Returns whether
    /// the thread overran.
    fn advance_ip(&mut self, ch: Channel) -> bool {
        let size = self.program.len();
        let th = &mut self.threads[ch.index()];
        th.ip += 1;
        if th.ip == size {
            th.state = ThreadState::Overrun;
            true
        } else {
            false
        }
    }

    /// Halt `ch` on a local fault at instruction `ip`. The instruction
    /// pointer still advances afterward, so a fault in the last cell
    /// leaves the thread OVERRUN rather than HALTED (historical image
    /// behavior, kept for compatibility).
    fn halt_with_fault(&mut self, ch: Channel, ip: usize, fault: Fault, sink: &mut dyn EventSink) {
        self.threads[ch.index()].state = ThreadState::Halted;
        sink.fault(self, ch, ip, fault);
        if self.advance_ip(ch) {
            sink.overrun(self, ch);
        }
    }
}
