#![allow(dead_code)]

use colorvm_core::image::{PixelSource, ProgramImage};
use colorvm_core::vm::{Channel, ChannelIo, NullSink, Termination, ThreadState, Vm};
use std::collections::VecDeque;

/// Scripted I/O for testing: queued inputs, recorded output lines.
pub struct ScriptedIo {
    chars: VecDeque<Option<char>>,
    ints: VecDeque<Option<i64>>,
    pub out: Vec<String>,
}

impl ScriptedIo {
    pub fn new() -> Self {
        Self {
            chars: VecDeque::new(),
            ints: VecDeque::new(),
            out: Vec::new(),
        }
    }

    pub fn with_chars(mut self, chars: &[Option<char>]) -> Self {
        self.chars = chars.iter().copied().collect();
        self
    }

    pub fn with_ints(mut self, ints: &[Option<i64>]) -> Self {
        self.ints = ints.iter().copied().collect();
        self
    }
}

impl ChannelIo for ScriptedIo {
    fn read_char(&mut self, _ch: Channel) -> Option<char> {
        self.chars.pop_front().flatten()
    }

    fn read_int(&mut self, _ch: Channel) -> Option<i64> {
        self.ints.pop_front().flatten()
    }

    fn write_char(&mut self, c: char) {
        self.out.push(c.to_string());
    }

    fn write_int(&mut self, n: i64) {
        self.out.push(n.to_string());
    }
}

/// In-memory raster built from a rectangular grid of cells.
pub struct GridImage {
    width: u32,
    height: u32,
    px: Vec<(u8, u8, u8)>,
}

impl GridImage {
    pub fn from_grid(cellsize: u8, grid: &[Vec<[u8; 3]>]) -> GridImage {
        let cs = cellsize as u32;
        let rows = grid.len() as u32;
        let cols = grid[0].len() as u32;
        let (width, height) = (cols * cs, rows * cs);
        let mut px = vec![(0, 0, 0); (width * height) as usize];
        for (cy, row) in grid.iter().enumerate() {
            assert_eq!(row.len() as u32, cols, "grid must be rectangular");
            for (cx, &[r, g, b]) in row.iter().enumerate() {
                for dy in 0..cs {
                    for dx in 0..cs {
                        let x = cx as u32 * cs + dx;
                        let y = cy as u32 * cs + dy;
                        px[(y * width + x) as usize] = (r, g, b);
                    }
                }
            }
        }
        GridImage { width, height, px }
    }

    /// Lay out header + program cells the way the reference encoder
    /// does: one column for a single-cell program, two columns for sizes
    /// 2..=6, `floor(sqrt(size + 2))` columns beyond that. The last row
    /// is padded with black cells.
    pub fn encode(cellsize: u8, cells: &[[u8; 3]]) -> GridImage {
        let size = cells.len();
        let cols = match size {
            0 | 1 => 1,
            2..=6 => 2,
            _ => (size as f64 + 2.0).sqrt().floor() as usize,
        };
        let mut all: Vec<[u8; 3]> = Vec::with_capacity(size + 2);
        all.push([
            colorvm_core::image::VERSION_MAJOR,
            colorvm_core::image::VERSION_MINOR,
            cellsize,
        ]);
        all.push([
            (size >> 16) as u8,
            (size >> 8) as u8,
            size as u8,
        ]);
        all.extend_from_slice(cells);
        while all.len() % cols != 0 {
            all.push([0, 0, 0]);
        }
        let grid: Vec<Vec<[u8; 3]>> = all.chunks(cols).map(|c| c.to_vec()).collect();
        GridImage::from_grid(cellsize, &grid)
    }
}

impl PixelSource for GridImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        self.px[(y * self.width + x) as usize]
    }
}

/// Run a program built from `[r, g, b]` cells to termination with no
/// scripted input.
pub fn run_cells(cells: &[[u8; 3]]) -> (Vm, ScriptedIo, Termination) {
    run_cells_with(cells, ScriptedIo::new())
}

pub fn run_cells_with(cells: &[[u8; 3]], mut io: ScriptedIo) -> (Vm, ScriptedIo, Termination) {
    let mut vm = Vm::new(ProgramImage::from_cells(cells));
    let term = vm.run(&mut io, &mut NullSink);
    (vm, io, term)
}

// Readable opcode aliases for building test programs.
pub const ADD: u8 = 0x80;
pub const SUB: u8 = 0x84;
pub const MUL: u8 = 0x88;
pub const DIV: u8 = 0x8C;
pub const REM: u8 = 0x90;
pub const POP: u8 = 0x94;
pub const SWAP: u8 = 0x98;
pub const DUP: u8 = 0x9C;
pub const ROT: u8 = 0xA0;
pub const NOT: u8 = 0xA4;
pub const OR: u8 = 0xA8;
pub const AND: u8 = 0xAC;
pub const GT: u8 = 0xB0;
pub const EQ: u8 = 0xB4;
pub const LT: u8 = 0xB8;
pub const NOP: u8 = 0xBC;
pub const HALT: u8 = 0xC0;
pub const JMPZ: u8 = 0xC4;
pub const JMPNZ: u8 = 0xC8;
pub const OUTC: u8 = 0xCC;
pub const INC: u8 = 0xD0;
pub const OUTI: u8 = 0xD4;
pub const INI: u8 = 0xD8;
pub const PUSHA: u8 = 0xDC;
pub const WAITA: u8 = 0xE0;
pub const NEG: u8 = 0xE4;
pub const SHL: u8 = 0xE8;
pub const SHR: u8 = 0xEC;

/// Build a program that runs `ops` on the R channel while G and B idle
/// on `nop`, all three halting together in the final cell.
pub fn r_program(ops: &[u8]) -> Vec<[u8; 3]> {
    let mut cells: Vec<[u8; 3]> = ops.iter().map(|&r| [r, NOP, NOP]).collect();
    cells.push([HALT, HALT, HALT]);
    cells
}

/// Check the universal VM invariants: ip bounds, the OVERRUN/ip
/// equivalence, and wait-queue membership.
pub fn assert_invariants(vm: &Vm) {
    let size = vm.program().len();
    for ch in Channel::ALL {
        let th = vm.thread(ch);
        assert!(th.ip <= size, "{ch}: ip {} out of bounds", th.ip);
        assert_eq!(
            th.state == ThreadState::Overrun,
            th.ip == size,
            "{ch}: OVERRUN iff ip == size"
        );
        let queued = vm.wait_queue().iter().filter(|&&c| c == ch).count();
        let expected = usize::from(th.state == ThreadState::Await);
        assert_eq!(queued, expected, "{ch}: wait-queue membership");
    }
}
