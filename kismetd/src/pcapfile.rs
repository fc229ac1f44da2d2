// SPDX-License-Identifier: Apache-2.0

//! `pcapfile` capture driver: the one `SourceBuilder` this daemon ships
//! in-process, reading a libpcap savefile and replaying its packets
//! through the chain. Every other driver named in spec.md §1 (wext,
//! nexmon, the IPC subprocess protocol itself) is an external helper
//! binary and out of scope here (spec.md §1: "individual capture-driver
//! *binaries* (only their wire protocol is specified)"); `pcapfile` is
//! the one capture path this crate can exercise without one.

use std::collections::HashMap;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::Sender;
use kismet_chain::{CaptureTime, ComponentId, Packet};
use kismet_datasource::{SourceBuilder, SourceTracker};
use kismet_dot11::Dot11Tracker;
use tracing::{info, warn};
use uuid::Uuid;

/// `network` value in the global header for raw 802.11 MAC frames
/// (no radiotap/prism prefix).
const LINKTYPE_IEEE802_11: u32 = 105;

const MAGIC_LE: u32 = 0xa1b2_c3d4;
const MAGIC_NS_LE: u32 = 0xa1b2_3c4d;

fn parse_options(definition: &str) -> HashMap<String, String> {
    let body = definition.split_once(':').map_or(definition, |(_, rest)| rest);
    body.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

pub(crate) fn source_path(definition: &str) -> Option<String> {
    parse_options(definition).remove("source")
}

/// Whether `path`'s first four bytes are a recognized pcap magic, in
/// either byte order.
fn has_pcap_magic(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else { return false };
    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() {
        return false;
    }
    let le = u32::from_le_bytes(magic);
    let be = u32::from_be_bytes(magic);
    [le, be].contains(&MAGIC_LE) || [le, be].contains(&MAGIC_NS_LE)
}

pub struct PcapfileBuilder;

impl SourceBuilder for PcapfileBuilder {
    fn driver_name(&self) -> &str {
        "pcapfile"
    }

    fn supports_passive_probe(&self) -> bool {
        true
    }

    fn probe(&self, definition: &str) -> bool {
        source_path(definition).is_some_and(|p| has_pcap_magic(Path::new(&p)))
    }
}

struct GlobalHeader {
    big_endian: bool,
    network: u32,
}

fn read_u32(buf: &[u8], big_endian: bool) -> u32 {
    let bytes = [
        buf.first().copied().unwrap_or(0),
        buf.get(1).copied().unwrap_or(0),
        buf.get(2).copied().unwrap_or(0),
        buf.get(3).copied().unwrap_or(0),
    ];
    if big_endian { u32::from_be_bytes(bytes) } else { u32::from_le_bytes(bytes) }
}

fn read_global_header(file: &mut File) -> std::io::Result<GlobalHeader> {
    let mut header = [0u8; 24];
    file.read_exact(&mut header)?;
    let le = read_u32(&header[0..4], false);
    let big_endian = ![MAGIC_LE, MAGIC_NS_LE].contains(&le);
    Ok(GlobalHeader {
        big_endian,
        network: read_u32(&header[20..24], big_endian),
    })
}

struct RecordHeader {
    ts_secs: u64,
    ts_micros: u32,
    incl_len: u32,
}

fn read_record_header(file: &mut File, big_endian: bool) -> std::io::Result<RecordHeader> {
    let mut header = [0u8; 16];
    file.read_exact(&mut header)?;
    Ok(RecordHeader {
        ts_secs: read_u32(&header[0..4], big_endian) as u64,
        ts_micros: read_u32(&header[4..8], big_endian),
        incl_len: read_u32(&header[8..12], big_endian),
    })
}

/// The pieces a replay thread needs to turn pcap records into chain
/// packets and report lifecycle back to the tracker.
#[derive(Clone)]
pub struct CaptureContext {
    pub tracker: Arc<SourceTracker>,
    pub dot11: Arc<Dot11Tracker>,
    pub chain_tx: Sender<Packet>,
}

/// Replays `path` into the chain on the calling thread, driving `uuid`'s
/// state machine as it goes. Intended to be run on a dedicated thread per
/// source; returns once the file is exhausted or an I/O error ends replay.
pub fn replay(uuid: Uuid, path: &str, ctx: &CaptureContext) {
    let mark_error = |msg: String| {
        ctx.tracker.with_source(uuid, |s| s.on_error(crate::clock::now_secs(), msg));
    };

    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(err) => {
            mark_error(err.to_string());
            return;
        }
    };

    let header = match read_global_header(&mut file) {
        Ok(h) => h,
        Err(err) => {
            mark_error(err.to_string());
            return;
        }
    };

    match ctx.tracker.with_source(uuid, |s| s.on_open_ack(header.network)) {
        None => {
            warn!(%uuid, "pcapfile replay started for an unknown source");
            return;
        }
        Some(Err(err)) => {
            warn!(%uuid, %err, "pcapfile source was not in a state that accepts open_ack");
            return;
        }
        Some(Ok(())) => {}
    }
    info!(%uuid, path, dlt = header.network, "pcapfile replay opened");

    let raw_component: ComponentId = ctx.dot11.raw_component();

    loop {
        let record = match read_record_header(&mut file, header.big_endian) {
            Ok(r) => r,
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => break,
            Err(err) => {
                mark_error(err.to_string());
                return;
            }
        };

        let mut payload = vec![0u8; record.incl_len as usize];
        if let Err(err) = file.read_exact(&mut payload) {
            mark_error(err.to_string());
            return;
        }

        let mut packet = Packet::new(
            CaptureTime { secs: record.ts_secs, micros: record.ts_micros },
            uuid,
        );
        if header.network == LINKTYPE_IEEE802_11 {
            packet.insert(raw_component, payload);
        }
        if ctx.chain_tx.send(packet).is_err() {
            break; // chain worker gone; nothing left to replay into.
        }
        let _ = ctx.tracker.with_source(uuid, |s| s.on_data(record.ts_secs));
    }

    ctx.tracker.with_source(uuid, |s| s.close());
    info!(%uuid, path, "pcapfile replay finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_test_pcap(path: &Path, frames: &[&[u8]]) {
        let mut file = File::create(path).unwrap();
        file.write_all(&MAGIC_LE.to_le_bytes()).unwrap();
        file.write_all(&2u16.to_le_bytes()).unwrap(); // version_major
        file.write_all(&4u16.to_le_bytes()).unwrap(); // version_minor
        file.write_all(&0i32.to_le_bytes()).unwrap(); // thiszone
        file.write_all(&0u32.to_le_bytes()).unwrap(); // sigfigs
        file.write_all(&65535u32.to_le_bytes()).unwrap(); // snaplen
        file.write_all(&LINKTYPE_IEEE802_11.to_le_bytes()).unwrap();
        for (i, frame) in frames.iter().enumerate() {
            file.write_all(&(i as u32).to_le_bytes()).unwrap(); // ts_sec
            file.write_all(&0u32.to_le_bytes()).unwrap(); // ts_usec
            file.write_all(&(frame.len() as u32).to_le_bytes()).unwrap();
            file.write_all(&(frame.len() as u32).to_le_bytes()).unwrap();
            file.write_all(frame).unwrap();
        }
    }

    #[test]
    fn probe_accepts_a_real_pcap_file_and_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.pcap");
        write_test_pcap(&good, &[&[0u8; 24]]);
        let bad = dir.path().join("bad.pcap");
        std::fs::write(&bad, b"not a pcap file").unwrap();

        let builder = PcapfileBuilder;
        assert!(builder.probe(&format!("pcapfile:source={}", good.display())));
        assert!(!builder.probe(&format!("pcapfile:source={}", bad.display())));
    }

    #[test]
    fn replay_feeds_every_frame_into_the_chain_then_closes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.pcap");
        write_test_pcap(&path, &[&[0x80u8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0][..]; 3]);

        let tracker = Arc::new(SourceTracker::default());
        tracker.register_prototype(Arc::new(PcapfileBuilder));
        let uuid = tracker.open(&format!("pcapfile:source={}", path.display()), false).unwrap();

        let dot11 = Arc::new(Dot11Tracker::new());
        let (tx, rx) = kismet_chain::input_queue(8);
        let ctx = CaptureContext { tracker: Arc::clone(&tracker), dot11, chain_tx: tx };

        replay(uuid, &path.to_string_lossy(), &ctx);

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 3);
        assert_eq!(
            tracker.with_source(uuid, |s| s.state()),
            Some(kismet_datasource::SourceState::Closed)
        );
    }
}
