pub mod image;
pub mod insn;
pub mod listing;
pub mod vm;

pub mod prelude {
    pub use crate::image::{ImageHeader, PixelSource, ProgramImage};
    pub use crate::insn::{Instruction, Opcode};
    pub use crate::vm::{Channel, ChannelIo, EventSink, Termination, ThreadState, Vm};
}
