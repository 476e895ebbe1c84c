#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// `MZ` stub with `e_lfanew = 64`, a COFF header and a zeroed PE32 optional
/// header apart from the magic and entry point.
pub fn pe_image(machine: u16, sections: u16) -> Vec<u8> {
    let mut buf = vec![0u8; 64];
    buf[0..2].copy_from_slice(b"MZ");
    buf[60..64].copy_from_slice(&64u32.to_le_bytes());
    buf.extend_from_slice(b"PE\0\0");

    let mut coff = [0u8; 20];
    coff[0..2].copy_from_slice(&machine.to_le_bytes());
    coff[2..4].copy_from_slice(&sections.to_le_bytes());
    coff[16..18].copy_from_slice(&224u16.to_le_bytes());
    buf.extend_from_slice(&coff);

    let mut opt = [0u8; 224];
    opt[0..2].copy_from_slice(&0x10bu16.to_le_bytes());
    opt[16..20].copy_from_slice(&0x1234u32.to_le_bytes());
    buf.extend_from_slice(&opt);
    buf
}

/// ELF64 image with `phnum` program headers and `shnum` section headers
/// laid out back to back after the file header. Every entry field is set to
/// a value derived from its index so offsets can be checked.
pub fn elf_image(phnum: u16, shnum: u16) -> Vec<u8> {
    let phoff = 64u64;
    let shoff = phoff + 56 * phnum as u64;

    let mut buf = vec![0u8; 64];
    buf[0..4].copy_from_slice(b"\x7fELF");
    buf[4] = 2;
    buf[5] = 1;
    buf[6] = 1;
    buf[16..18].copy_from_slice(&3u16.to_le_bytes());
    buf[18..20].copy_from_slice(&0xb7u16.to_le_bytes());
    buf[20..24].copy_from_slice(&1u32.to_le_bytes());
    buf[24..32].copy_from_slice(&0x1040u64.to_le_bytes());
    buf[32..40].copy_from_slice(&phoff.to_le_bytes());
    buf[40..48].copy_from_slice(&shoff.to_le_bytes());
    buf[52..54].copy_from_slice(&64u16.to_le_bytes());
    buf[54..56].copy_from_slice(&56u16.to_le_bytes());
    buf[56..58].copy_from_slice(&phnum.to_le_bytes());
    buf[58..60].copy_from_slice(&64u16.to_le_bytes());
    buf[60..62].copy_from_slice(&shnum.to_le_bytes());

    for i in 0..phnum as u64 {
        buf.extend_from_slice(&(6 + i as u32).to_le_bytes());
        buf.extend_from_slice(&4u32.to_le_bytes());
        for field in 0..6u64 {
            buf.extend_from_slice(&(i * 0x100 + field).to_le_bytes());
        }
    }
    for i in 0..shnum as u64 {
        buf.extend_from_slice(&(i as u32 * 0x10).to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        for field in 0..4u64 {
            buf.extend_from_slice(&(i * 0x1000 + field).to_le_bytes());
        }
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(&8u64.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
    }
    buf
}

pub fn macho_image(magic: [u8; 4], values: [u32; 6]) -> Vec<u8> {
    let mut buf = magic.to_vec();
    for value in values {
        buf.extend_from_slice(&value.to_le_bytes());
    }
    buf
}

pub fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    File::create(&path).unwrap().write_all(data).unwrap();
    path
}
