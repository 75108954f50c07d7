//! Plain-text rendering of diagnostics: INFO messages, the per-step
//! debug trace with stack dumps, and the post-run statistics table.
//!
//! INFO and DEBUG lines go to stderr; only program output and requested
//! listings/tables use stdout. The channel-to-style mapping of the
//! trace lives here, not in the core.

use colorvm_core::image::{VERSION_MAJOR, VERSION_MINOR};
use colorvm_core::insn::{Instruction, Opcode};
use colorvm_core::vm::{Channel, EventSink, Fault, Vm};
use std::io::{self, Write};

pub struct Console {
    silent: bool,
    debug: bool,
}

impl Console {
    pub fn new(silent: bool, debug: bool) -> Console {
        Console { silent, debug }
    }

    /// Informational message, suppressed by `--silent`.
    pub fn info(&self, msg: &str) {
        if !self.silent {
            eprintln!("INFO: {msg}");
        }
    }

    /// Debug trace line, emitted only with `--debug`.
    pub fn debug(&self, msg: &str) {
        if self.debug {
            eprintln!("DEBUG: {msg}");
        }
    }

    /// Four-column dump of the three thread stacks and the alpha stack,
    /// bottom of stack first.
    fn stack_dump(&self, vm: &Vm) {
        let stacks: [&[i64]; 4] = [
            &vm.thread(Channel::R).stack,
            &vm.thread(Channel::G).stack,
            &vm.thread(Channel::B).stack,
            vm.alpha_stack(),
        ];
        let depth = stacks.iter().map(|s| s.len()).max().unwrap_or(0);
        self.debug(&format!(
            "  {:>5} {:>8} {:>8} {:>8} {:>8}",
            "pos", "r", "g", "b", "a"
        ));
        for pos in 0..depth {
            let cell = |i: usize| -> String {
                stacks[i]
                    .get(pos)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string())
            };
            self.debug(&format!(
                "  {pos:>5} {:>8} {:>8} {:>8} {:>8}",
                cell(0),
                cell(1),
                cell(2),
                cell(3),
            ));
        }
    }

    /// Print the per-opcode, per-channel count table on stdout. Rows
    /// with all-zero counts are omitted; rows sort by mnemonic.
    pub fn print_statistics(&self, vm: &Vm) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "Execution statistics")?;
        writeln!(out, "{:<12} {:>8} {:>8} {:>8}", "Instruction", "r", "g", "b")?;
        for (name, [r, g, b]) in statistics_rows(vm) {
            writeln!(out, "{name:<12} {r:>8} {g:>8} {b:>8}")?;
        }
        Ok(())
    }
}

/// Non-zero statistics rows, sorted by mnemonic.
fn statistics_rows(vm: &Vm) -> Vec<(&'static str, [u64; 3])> {
    let per_channel = |count: &dyn Fn(Channel) -> u64| -> [u64; 3] {
        [count(Channel::R), count(Channel::G), count(Channel::B)]
    };

    let mut rows = Vec::with_capacity(Opcode::COUNT + 1);
    rows.push(("push", per_channel(&|ch| vm.thread(ch).stats.push_count())));
    for op in Opcode::ALL {
        rows.push((
            op.mnemonic(),
            per_channel(&move |ch| vm.thread(ch).stats.count(op)),
        ));
    }
    rows.retain(|(_, c)| c.iter().any(|&n| n != 0));
    rows.sort_by_key(|&(name, _)| name);
    rows
}

impl EventSink for Console {
    fn channel_polled(&mut self, vm: &Vm, ch: Channel) {
        if !self.debug {
            return;
        }
        let th = vm.thread(ch);
        let code = match vm.current_byte(ch) {
            Some(byte) => byte.to_string(),
            None => "N/A".to_string(),
        };
        self.debug(&format!(
            "'{ch}', State: {}, IP: {}, Code data: {code}",
            th.state, th.ip
        ));
    }

    fn instruction(&mut self, vm: &Vm, _ch: Channel, insn: Instruction) {
        if !self.debug {
            return;
        }
        self.debug(&format!("  Instruction: {insn}"));
        self.stack_dump(vm);
    }

    fn suspended(&mut self, _vm: &Vm, ch: Channel) {
        self.debug(&format!("  Thread '{ch}' waiting for data in 'a' stack."));
    }

    fn resumed(&mut self, _vm: &Vm, ch: Channel) {
        self.debug(&format!("  Data found in 'a' stack, thread '{ch}' resuming."));
    }

    fn halted(&mut self, _vm: &Vm, ch: Channel) {
        self.debug(&format!("  Thread '{ch}' halted."));
    }

    fn overrun(&mut self, _vm: &Vm, ch: Channel) {
        self.debug(&format!("  Thread '{ch}' overrun."));
    }

    fn fault(&mut self, _vm: &Vm, ch: Channel, ip: usize, fault: Fault) {
        let msg = match fault {
            Fault::InvalidOpcode(b) => format!(
                "Invalid instruction {b} in '{ch}' channel at {ip} position \
                 for ColorVM v{VERSION_MAJOR}.{VERSION_MINOR}.\nHalting channel '{ch}'."
            ),
            Fault::DivisionByZero => format!(
                "Division by zero in '{ch}' channel at {ip} position.\nHalting channel '{ch}'."
            ),
            Fault::StackLimit => format!(
                "Stack limit exceeded in '{ch}' channel at {ip} position.\nHalting channel '{ch}'."
            ),
        };
        self.info(&msg);
    }

    fn pass_completed(&mut self, _vm: &Vm, running: usize, waiting: usize) {
        self.debug(&format!(
            "Number of running threads: {running}, await threads: {waiting}."
        ));
    }
}
