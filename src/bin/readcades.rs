//! Prints the timestamps of a CAdES signature.
//!
//! Usage: `readcades <signature> [<document>]`
//!
//! The signature can be BER or DER encoded or Base 64 text. If the
//! signature is detached, the signed document can be given as the second
//! argument.

use std::{env, fs, process};
use bytes::Bytes;
use cades_ts::Config;
use cades_ts::cades::{CadesSignature, DetachedDocument};
use cades_ts::timestamp::{CadesTimestampSource, TimestampToken};


fn read_file(path: &str) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|err| format!("Can’t read {}: {}", path, err))
}

/// Converts Base 64 text into binary data.
///
/// Data starting with a sequence tag is returned as is.
fn decode_text(data: Vec<u8>) -> Result<Bytes, String> {
    if data.first() == Some(&0x30) {
        return Ok(data.into())
    }
    let text: Vec<u8> = data.into_iter().filter(|ch| {
        !ch.is_ascii_whitespace()
    }).collect();
    base64::decode(&text).map(Into::into).map_err(|err| {
        format!("Neither BER nor Base 64: {}", err)
    })
}

fn print_token(token: &TimestampToken) {
    print!("  {} ", token.timestamp_type());
    if let Some(archive_type) = token.archive_timestamp_type() {
        print!("({}) ", archive_type);
    }
    println!("at {}", token.gen_time().to_rfc3339());
    println!("    id: {}", token.id());
    println!(
        "    message imprint: {}",
        if !token.is_message_imprint_data_found() {
            "data not found"
        }
        else if token.is_message_imprint_intact() {
            "intact"
        }
        else {
            "BROKEN"
        }
    );
    for reference in token.references() {
        println!("    covers {}", reference);
    }
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1);
    let path = match args.next() {
        Some(path) => path,
        None => {
            return Err("Usage: readcades <signature> [<document>]".into())
        }
    };
    let data = decode_text(read_file(&path)?)?;
    let documents = match args.next() {
        Some(path) => {
            let content = read_file(&path)?;
            vec![DetachedDocument::new(Some(path), content)]
        }
        None => Vec::new()
    };

    let signatures = CadesSignature::decode(
        data, documents, &Config::default()
    ).map_err(|err| format!("Can’t decode signature: {}", err))?;
    for signature in &signatures {
        println!("Signature {}", signature.id());
        let source = CadesTimestampSource::new(signature);
        for token in source.all_timestamps() {
            print_token(token)
        }
        for counter in signature.counter_signatures() {
            println!("Counter signature {}", counter.id());
            let source = CadesTimestampSource::new(&counter);
            for token in source.all_timestamps() {
                print_token(token)
            }
        }
    }
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err);
        process::exit(1);
    }
}
