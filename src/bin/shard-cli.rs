//! Small demonstration CLI over the shard format.
//!
//! Not part of the format's core: a caller embedding `shard-store` as a
//! library never needs this binary. It exists the way every storage crate
//! in this lineage ships a thin `clap`-driven wrapper alongside the
//! library for interactive poking at a shard on disk.
//!
//! `build` takes a directory of files named by their hex-encoded key
//! (e.g. `<64 hex chars>` with an arbitrary extension) and packs them into
//! a shard. `get` looks a key up in an existing shard and writes the
//! payload to stdout.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process;

use clap::{App, Arg, SubCommand};

use shard_store::{ShardBuilder, ShardReader, ShardKey, SHARD_KEY_LEN};

fn parse_key(hex: &str) -> Result<ShardKey, String> {
    if hex.len() != SHARD_KEY_LEN * 2 {
        return Err(format!(
            "key must be {} hex characters, got {}",
            SHARD_KEY_LEN * 2,
            hex.len()
        ));
    }
    let mut key = [0u8; SHARD_KEY_LEN];
    for (i, byte) in key.iter_mut().enumerate() {
        let s = &hex[i * 2..i * 2 + 2];
        *byte = u8::from_str_radix(s, 16).map_err(|e| format!("invalid hex key: {}", e))?;
    }
    Ok(key)
}

fn cmd_build(shard_path: &str, input_dir: &str) -> Result<(), String> {
    let mut entries: Vec<PathBuf> = fs::read_dir(input_dir)
        .map_err(|e| format!("reading {}: {}", input_dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    let mut builder = ShardBuilder::create(shard_path, entries.len() as u64)
        .map_err(|e| format!("create {}: {}", shard_path, e))?;

    for path in &entries {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| format!("non-unicode filename: {:?}", path))?;
        let key = parse_key(stem)?;
        let payload = fs::read(path).map_err(|e| format!("reading {:?}: {}", path, e))?;
        builder
            .write_object(key, &payload)
            .map_err(|e| format!("writing {:?}: {}", path, e))?;
    }

    builder.save().map_err(|e| format!("save: {}", e))?;
    println!("built {} with {} objects", shard_path, entries.len());
    Ok(())
}

fn cmd_get(shard_path: &str, hex_key: &str) -> Result<(), String> {
    let key = parse_key(hex_key)?;
    let mut reader = ShardReader::load(shard_path).map_err(|e| format!("load {}: {}", shard_path, e))?;
    let payload = reader.lookup(&key).map_err(|e| format!("lookup: {}", e))?;
    std::io::stdout()
        .write_all(&payload)
        .map_err(|e| format!("writing stdout: {}", e))?;
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let matches = App::new("shard-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("build and query immutable minimal-perfect-hash key-value shards")
        .subcommand(
            SubCommand::with_name("build")
                .about("pack a directory of hex-key-named files into a shard")
                .arg(Arg::with_name("SHARD").index(1).required(true))
                .arg(Arg::with_name("INPUT DIR").index(2).required(true)),
        )
        .subcommand(
            SubCommand::with_name("get")
                .about("look up a key in a shard and print its payload to stdout")
                .arg(Arg::with_name("SHARD").index(1).required(true))
                .arg(Arg::with_name("KEY").index(2).required(true)),
        )
        .get_matches();

    let result = match matches.subcommand() {
        ("build", Some(args)) => cmd_build(
            args.value_of("SHARD").unwrap(),
            args.value_of("INPUT DIR").unwrap(),
        ),
        ("get", Some(args)) => cmd_get(args.value_of("SHARD").unwrap(), args.value_of("KEY").unwrap()),
        _ => {
            println!("{}", matches.usage());
            process::exit(1);
        }
    };

    if let Err(msg) = result {
        log::error!("{}", msg);
        process::exit(1);
    }
}
