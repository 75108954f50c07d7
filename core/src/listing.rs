//! Non-executing output modes: byte dump and disassembly listing.
//!
//! Both walk the decoded code arrays and write one line per program
//! index. Surrounding banners (file name, versions) are the caller's
//! concern.

use crate::image::ProgramImage;
use crate::insn::disassemble;
use std::io;

/// Write `Line <i>: [r, g, b]` for every program cell.
pub fn write_byte_dump<W: io::Write>(out: &mut W, program: &ProgramImage) -> io::Result<()> {
    for i in 0..program.len() {
        let [r, g, b] = program.cell(i);
        writeln!(out, "Line {i}: [{r}, {g}, {b}]")?;
    }
    Ok(())
}

/// Write the three-column disassembly listing, one line per program
/// cell: columns padded to width 9, separated by `; `, suffixed with
/// `#Line <i>`.
pub fn write_disassembly<W: io::Write>(out: &mut W, program: &ProgramImage) -> io::Result<()> {
    for i in 0..program.len() {
        let [r, g, b] = program.cell(i);
        writeln!(
            out,
            "{:<9}; {:<9}; {:<9} #Line {i}",
            disassemble(r),
            disassemble(g),
            disassemble(b),
        )?;
    }
    Ok(())
}
