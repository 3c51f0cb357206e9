//! Flat binary loader (spec.md §9: no ELF/object-file parsing, no PALcode or
//! SRM console image — a raw binary is loaded at address zero).

use std::{fs, process};

/// Reads a binary file from disk into a byte vector.
///
/// Exits the process with an error message if the file cannot be read,
/// matching the driver-level fatal-error convention the CLI uses for other
/// unrecoverable setup failures.
pub fn load_binary(path: &str) -> Vec<u8> {
    fs::read(path).unwrap_or_else(|e| {
        eprintln!("\n[!] FATAL: could not read file '{path}': {e}");
        process::exit(1);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_file_contents_verbatim() {
        let path = std::env::temp_dir().join("axp-core-loader-test.bin");
        fs::write(&path, [0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        let data = load_binary(path.to_str().unwrap());
        let _ = fs::remove_file(&path);
        assert_eq!(data, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }
}
