//! Memory-mapped pcap reader and ITCH payload offset discovery.
//!
//! No libpcap dependency: the global and per-packet headers are parsed by
//! hand over an `mmap`'d file, and packet payloads are handed to the caller
//! as borrows of the mapping. The byte-swap flag derived from the magic
//! number is applied to every header integer.
//!
//! Captures encapsulate the ITCH stream in varying ways (plain UDP, 802.1Q
//! VLAN, MoldUDP64, per-message length prefixes) and nothing in the file
//! self-describes which; [`find_itch_offset`] recovers the payload start
//! heuristically and the decoder downstream validates the result.

use std::fs::File;
use std::io;
use std::mem::size_of;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::wire::is_itch_tag;

/// Microsecond-resolution pcap, host byte order.
pub const MAGIC_USEC: u32 = 0xA1B2_C3D4;
/// Nanosecond-resolution pcap, host byte order.
pub const MAGIC_NSEC: u32 = 0xA1B2_3C4D;
/// Microsecond-resolution pcap, swapped byte order.
pub const MAGIC_USEC_SWAPPED: u32 = 0xD4C3_B2A1;
/// Nanosecond-resolution pcap, swapped byte order.
pub const MAGIC_NSEC_SWAPPED: u32 = 0x4D3C_B2A1;

/// pcap global header (24 bytes). Integers are in the writer's native
/// byte order; the magic tells us whether that matches ours.
#[repr(C)]
#[allow(dead_code)]
struct GlobalHeader {
    magic: [u8; 4],
    version_major: [u8; 2],
    version_minor: [u8; 2],
    thiszone: [u8; 4],
    sigfigs: [u8; 4],
    snaplen: [u8; 4],
    network: [u8; 4],
}

const _: () = assert!(size_of::<GlobalHeader>() == 24);
const _: () = assert!(std::mem::align_of::<GlobalHeader>() == 1);

impl GlobalHeader {
    #[inline]
    fn magic(&self) -> u32 {
        u32::from_ne_bytes(self.magic)
    }
}

/// pcap per-packet header (16 bytes).
#[repr(C)]
#[allow(dead_code)]
struct PacketHeader {
    ts_sec: [u8; 4],
    ts_frac: [u8; 4],
    incl_len: [u8; 4],
    orig_len: [u8; 4],
}

const _: () = assert!(size_of::<PacketHeader>() == 16);
const _: () = assert!(std::mem::align_of::<PacketHeader>() == 1);

impl PacketHeader {
    /// Captured payload length, passed through the reader's swap flag.
    #[inline]
    fn incl_len(&self, swap: bool) -> u32 {
        let v = u32::from_ne_bytes(self.incl_len);
        if swap {
            v.swap_bytes()
        } else {
            v
        }
    }
}

/// Reinterpret the prefix of `buf` as a header struct (alignment 1, all
/// byte-array fields).
#[inline]
fn header_view<T>(buf: &[u8]) -> Option<&T> {
    const { assert!(std::mem::align_of::<T>() == 1) };
    if buf.len() < size_of::<T>() {
        return None;
    }
    // SAFETY: length checked; T has alignment 1 and no invalid bit patterns.
    Some(unsafe { &*buf.as_ptr().cast::<T>() })
}

/// Memory-mapped pcap capture.
///
/// Owns the mapping exclusively: moving a reader transfers it, and the
/// mapping is released on drop or [`close`](PcapReader::close). Payload
/// slices handed out by [`for_each_payload`](PcapReader::for_each_payload)
/// borrow the mapping and cannot outlive the reader.
#[derive(Debug)]
pub struct PcapReader {
    map: Option<Mmap>,
    swap: bool,
}

impl PcapReader {
    /// Map `path` read-only and validate the global header.
    ///
    /// An unrecognised magic number surfaces as
    /// [`io::ErrorKind::InvalidData`]; no mapping is retained on failure.
    pub fn open(path: impl AsRef<Path>) -> io::Result<PcapReader> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // SAFETY: the file is opened read-only and mapped privately; writers
        // mutating it concurrently are outside this program's contract.
        let map = unsafe { Mmap::map(&file)? };

        let Some(header) = header_view::<GlobalHeader>(&map) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "capture shorter than pcap global header",
            ));
        };

        let magic = header.magic();
        let swap = match magic {
            MAGIC_USEC | MAGIC_NSEC => false,
            MAGIC_USEC_SWAPPED | MAGIC_NSEC_SWAPPED => true,
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("not a pcap file (magic {magic:#010x})"),
                ));
            }
        };

        debug!(path = %path.display(), size = map.len(), swap, "mapped capture");
        Ok(PcapReader { map: Some(map), swap })
    }

    /// Release the mapping. Idempotent; a closed reader visits no packets.
    pub fn close(&mut self) {
        self.map = None;
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.map.is_some()
    }

    /// Size of the mapped file in bytes, 0 when closed.
    #[inline]
    pub fn file_size(&self) -> usize {
        self.map.as_ref().map_or(0, |m| m.len())
    }

    /// Walk packet records, passing each complete payload to `f`.
    ///
    /// A final record whose payload extends past the end of the file is
    /// treated as truncation and ends the walk cleanly. Returns the number
    /// of complete packets visited.
    pub fn for_each_payload<F: FnMut(&[u8])>(&self, mut f: F) -> usize {
        let Some(map) = self.map.as_ref() else {
            return 0;
        };

        let data: &[u8] = map;
        let mut offset = size_of::<GlobalHeader>();
        let mut packets = 0;

        while let Some(header) = header_view::<PacketHeader>(&data[offset..]) {
            let incl_len = header.incl_len(self.swap) as usize;
            offset += size_of::<PacketHeader>();

            if offset + incl_len > data.len() {
                break; // truncated final record
            }

            f(&data[offset..offset + incl_len]);
            offset += incl_len;
            packets += 1;
        }

        packets
    }
}

/// Encapsulation depths to probe before falling back to a linear scan.
///
/// 42 = Ethernet(14) + IPv4(20) + UDP(8); +4 for an 802.1Q VLAN tag; +20
/// for a MoldUDP64 session header; +2 for a per-message length prefix.
const CANDIDATE_OFFSETS: [usize; 6] = [42, 46, 62, 64, 66, 68];

/// Bytes of a payload the fallback scan will inspect.
const SCAN_LIMIT: usize = 100;

/// Stock-locate values above this are implausible for these captures.
const MAX_PLAUSIBLE_LOCATE: u16 = 10_000;

#[inline]
fn plausible_locate(payload: &[u8], offset: usize) -> bool {
    if payload.len() < offset + 3 {
        return false;
    }
    let locate = u16::from_be_bytes([payload[offset + 1], payload[offset + 2]]);
    locate > 0 && locate < MAX_PLAUSIBLE_LOCATE
}

/// Locate the start of the ITCH stream inside a captured datagram.
///
/// Each candidate offset is accepted when the byte there is a known ITCH
/// tag; a big-endian stock-locate in (0, 10000) right after it confirms the
/// match, but a recognised tag alone is accepted too. If no candidate fits,
/// the first [`SCAN_LIMIT`] bytes are scanned with the stricter
/// tag-plus-locate predicate. On total failure returns 42 (the plain UDP
/// case) and lets the decoder surface the error.
pub fn find_itch_offset(payload: &[u8]) -> usize {
    for &offset in &CANDIDATE_OFFSETS {
        if offset >= payload.len() {
            continue;
        }
        if is_itch_tag(payload[offset]) {
            if plausible_locate(payload, offset) {
                debug!(offset, confirmed = true, "itch payload offset");
                return offset;
            }
            // Recognised tag with an out-of-range locate still wins.
            debug!(offset, confirmed = false, "itch payload offset");
            return offset;
        }
    }

    let scan_end = payload.len().min(SCAN_LIMIT);
    for offset in 0..scan_end {
        if is_itch_tag(payload[offset]) && plausible_locate(payload, offset) {
            debug!(offset, scanned = true, "itch payload offset");
            return offset;
        }
    }

    debug!(offset = 42, fallback = true, "itch payload offset");
    42
}
