//! List or extract a recovery control/data pair, or a cabinet, to disk.
//!
//! Usage:
//!   cargo run --release --example extract -- [-l] recctrl.bin [output_dir/]
//!   cargo run --release --example extract -- [-l] setup.cab [output_dir/]
//!
//! The data file is found by replacing `recctrl` with `recdata` in the
//! control file name.

use lzx_stream::{Cabinet, ExtractOptions, LocalFileMedia, RecoveryPackage};
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let list_only = args.first().is_some_and(|a| a == "-l");
    if list_only {
        args.remove(0);
    }
    if args.is_empty() {
        eprintln!("Usage: extract [-l] <recctrl.bin|file.cab> [output_dir]");
        eprintln!("  extract -l ./recctrl.bin");
        eprintln!("  extract ./recctrl.bin ./out/");
        std::process::exit(1);
    }

    let input = &args[0];
    let output_dir = Path::new(args.get(1).map_or("out", String::as_str));

    let media = LocalFileMedia::new(input)?;
    let bytes = media.read_all_sync()?;
    if bytes.starts_with(b"MSCF") {
        return extract_cabinet(&bytes, output_dir, list_only);
    }

    let package = RecoveryPackage::parse(&bytes)?;
    println!(
        "{} entr(ies), window {} bytes:",
        package.entries().len(),
        package.window_size()
    );
    for entry in package.entries() {
        println!(
            "  {} ({} bytes)",
            package.control().long_path(entry),
            entry.decompressed_size
        );
    }
    if list_only {
        return Ok(());
    }

    let data_path = input.replace("recctrl", "recdata");
    let data = LocalFileMedia::new(&data_path)?.read_all_sync()?;

    let mut failed = 0;
    for extracted in package.extract_all(&data, &ExtractOptions::default()) {
        match extracted.result {
            Ok(content) => {
                let out_path = output_dir.join(extracted.path.replace('\\', "/"));
                if let Some(parent) = out_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&out_path, &content)?;
                println!("Extracted {} ({} bytes)", extracted.path, content.len());
            }
            Err(e) => {
                failed += 1;
                eprintln!("Failed {}: {}", extracted.path, e);
            }
        }
    }

    if failed > 0 {
        eprintln!("{} entr(ies) failed", failed);
        std::process::exit(2);
    }
    Ok(())
}

fn extract_cabinet(
    bytes: &[u8],
    output_dir: &Path,
    list_only: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cabinet = Cabinet::parse(bytes)?;

    println!("{} file(s) in cabinet:", cabinet.files().len());
    for f in cabinet.files() {
        let m = f.modified();
        println!(
            "  {} ({} bytes, {:04}-{:02}-{:02} {:02}:{:02})",
            f.name, f.size, m.year, m.month, m.day, m.hour, m.minute
        );
    }
    if list_only {
        return Ok(());
    }

    std::fs::create_dir_all(output_dir)?;
    for index in 0..cabinet.files().len() {
        let name = cabinet.files()[index].name.replace('\\', "/");
        let content = cabinet.extract(index)?;
        let out_path = output_dir.join(&name);
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&out_path, &content)?;
        println!("Extracted {} ({} bytes)", name, content.len());
    }

    Ok(())
}
