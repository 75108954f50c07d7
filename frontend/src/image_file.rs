//! PNG program images as a [`PixelSource`].
//!
//! Any PNG readable as 24-bit RGB is accepted: paletted, grayscale and
//! 16-bit images are normalized to 8-bit samples at decode time, and an
//! alpha channel is ignored.

use crate::AppError;
use colorvm_core::image::PixelSource;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub struct PngImage {
    width: u32,
    height: u32,
    /// Samples per pixel after normalization (1, 2, 3 or 4).
    channels: usize,
    data: Vec<u8>,
}

/// Load a PNG file and hold its pixels in memory for point queries.
pub fn load(path: &Path) -> Result<PngImage, AppError> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::FileNotFound(path.to_path_buf())
        } else {
            AppError::Image {
                path: path.to_path_buf(),
                source: png::DecodingError::from(e),
            }
        }
    })?;

    let image_err = |source| AppError::Image {
        path: path.to_path_buf(),
        source,
    };

    let mut decoder = png::Decoder::new(BufReader::new(file));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(image_err)?;
    let mut data = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut data).map_err(image_err)?;
    data.truncate(info.buffer_size());

    Ok(PngImage {
        width: info.width,
        height: info.height,
        channels: info.color_type.samples(),
        data,
    })
}

impl PixelSource for PngImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let i = (y as usize * self.width as usize + x as usize) * self.channels;
        match self.channels {
            // Grayscale (with or without alpha): replicate the sample.
            1 | 2 => (self.data[i], self.data[i], self.data[i]),
            _ => (self.data[i], self.data[i + 1], self.data[i + 2]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colorvm_core::image::ProgramImage;
    use colorvm_core::vm::Channel;

    fn write_png(path: &Path, width: u32, height: u32, rgb: &[u8]) {
        let file = File::create(path).unwrap();
        let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(rgb).unwrap();
    }

    #[test]
    fn png_round_trips_into_a_program() {
        let dir = std::env::temp_dir().join("colorvm_image_file_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("program.png");

        // One row of cells: header 0, header 1 (size = 1 is vertical, so
        // use size 7 on a 3x3 grid), then seven program cells.
        let cells: Vec<[u8; 3]> = vec![
            [1, 0, 1], // version 1.0, cellsize 1
            [0, 0, 7], // size 7
            [65, 66, 67],
            [10, 11, 12],
            [0x80, 0xBC, 0xC0],
            [1, 2, 3],
            [4, 5, 6],
            [7, 8, 9],
            [0xC0, 0xC0, 0xC0],
        ];
        let rgb: Vec<u8> = cells.iter().flatten().copied().collect();
        write_png(&path, 3, 3, &rgb);

        let image = load(&path).unwrap();
        let program = ProgramImage::decode(&image).unwrap();
        assert_eq!(program.len(), 7);
        assert_eq!(program.cell(0), [65, 66, 67]);
        assert_eq!(program.cell(2), [0x80, 0xBC, 0xC0]);
        assert_eq!(program.code(Channel::B)[6], 0xC0);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_reported_as_such() {
        let path = std::env::temp_dir().join("colorvm_no_such_file.png");
        match load(&path) {
            Err(AppError::FileNotFound(p)) => assert_eq!(p, path),
            other => panic!("expected FileNotFound, got {other:?}", other = other.err()),
        }
    }
}
