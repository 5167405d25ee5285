//! ROM loading: a raw `.gba` image, or the first cartridge image found
//! inside a `.zip` archive.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

const ROM_EXTENSIONS: [&str; 3] = ["gba", "agb", "bin"];

pub fn load_rom_bytes(path: &Path) -> io::Result<Vec<u8>> {
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    {
        return load_from_zip(path);
    }
    std::fs::read(path)
}

fn load_from_zip(path: &Path) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("invalid ZIP: {e}")))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("ZIP entry error: {e}"))
        })?;

        if entry.is_dir() {
            continue;
        }
        let is_rom = Path::new(entry.name())
            .extension()
            .is_some_and(|ext| ROM_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)));
        if !is_rom {
            continue;
        }

        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        return Ok(data);
    }

    Err(io::Error::new(
        io::ErrorKind::NotFound,
        "no .gba image found in ZIP archive",
    ))
}
