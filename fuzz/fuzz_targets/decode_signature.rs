#![no_main]

use bytes::Bytes;
use cades_ts::Config;
use cades_ts::cades::{CadesSignature, DetachedDocument};
use cades_ts::timestamp::CadesTimestampSource;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let (which, data) = match data.split_first() {
        Some((first, data)) => (*first, data),
        None => return,
    };
    let mut config = Config::default();
    config.set_strict(which & 1 != 0);
    let documents = if which & 2 != 0 {
        vec![DetachedDocument::new(None, Bytes::from_static(b"document"))]
    }
    else {
        Vec::new()
    };
    let signatures = match CadesSignature::decode(
        Bytes::copy_from_slice(data), documents, &config
    ) {
        Ok(signatures) => signatures,
        Err(_) => return,
    };
    for signature in &signatures {
        let source = CadesTimestampSource::new(signature);
        let _ = source.all_timestamps_except_last_archive_timestamp();
    }
});
