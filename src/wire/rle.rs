//! Run-length-encoded voxel diff, used for `blockUpdate` broadcasts.
//!
//! Each entry is 6 bytes: `flatIndex: u32 LE`, `count: u8`, `blockId: u8`.
//! A decoder expands each entry to `count` consecutive voxel changes
//! starting at `flatIndex`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor};

/// A single voxel change: its flattened chunk index and new block id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelChange {
    pub flat_index: u32,
    pub block_id: u8,
}

/// One encoded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RleEntry {
    pub flat_index: u32,
    pub count: u8,
    pub block_id: u8,
}

const ENTRY_LEN: usize = 6;
const MAX_RUN: u32 = 255;

/// Encodes a list of voxel changes: sorts by index, coalesces contiguous
/// runs of identical `block_id`, caps each run at 255.
pub fn encode(changes: &[VoxelChange]) -> Vec<u8> {
    let mut sorted = changes.to_vec();
    sorted.sort_by_key(|c| c.flat_index);

    let mut entries: Vec<RleEntry> = Vec::new();
    for change in sorted {
        if let Some(last) = entries.last_mut() {
            let run_end = last.flat_index + last.count as u32;
            if last.block_id == change.block_id
                && change.flat_index == run_end
                && (last.count as u32) < MAX_RUN
            {
                last.count += 1;
                continue;
            }
        }
        entries.push(RleEntry {
            flat_index: change.flat_index,
            count: 1,
            block_id: change.block_id,
        });
    }

    let mut buf = Vec::with_capacity(entries.len() * ENTRY_LEN);
    for entry in entries {
        buf.write_u32::<LittleEndian>(entry.flat_index).unwrap();
        buf.write_u8(entry.count).unwrap();
        buf.write_u8(entry.block_id).unwrap();
    }
    buf
}

/// Decodes an RLE byte stream back into individual voxel changes, in index order.
pub fn decode(bytes: &[u8]) -> io::Result<Vec<VoxelChange>> {
    if bytes.len() % ENTRY_LEN != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "RLE byte stream is not a multiple of the 6-byte entry length",
        ));
    }
    let mut cursor = Cursor::new(bytes);
    let mut out = Vec::with_capacity(bytes.len() / ENTRY_LEN);
    while (cursor.position() as usize) < bytes.len() {
        let flat_index = cursor.read_u32::<LittleEndian>()?;
        let count = cursor.read_u8()?;
        let block_id = cursor.read_u8()?;
        for offset in 0..count as u32 {
            out.push(VoxelChange {
                flat_index: flat_index + offset,
                block_id,
            });
        }
    }
    Ok(out)
}

/// Convenience: encode a single voxel change (the common case for a mine/place edit).
pub fn encode_single(flat_index: u32, block_id: u8) -> Vec<u8> {
    encode(&[VoxelChange { flat_index, block_id }])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_change_round_trips() {
        let changes = vec![VoxelChange { flat_index: 100, block_id: 0 }];
        let decoded = decode(&encode(&changes)).unwrap();
        assert_eq!(decoded, changes);
    }

    #[test]
    fn contiguous_run_coalesces() {
        let changes: Vec<_> = (10..20)
            .map(|i| VoxelChange { flat_index: i, block_id: 3 })
            .collect();
        let encoded = encode(&changes);
        assert_eq!(encoded.len(), 6, "contiguous identical-id run must coalesce into one entry");
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, changes);
    }

    #[test]
    fn run_caps_at_255() {
        let changes: Vec<_> = (0..300)
            .map(|i| VoxelChange { flat_index: i, block_id: 7 })
            .collect();
        let encoded = encode(&changes);
        assert_eq!(encoded.len(), 12, "300 contiguous voxels must split into two runs of <=255");
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.len(), 300);
        for (i, change) in decoded.iter().enumerate() {
            assert_eq!(change.flat_index, i as u32);
            assert_eq!(change.block_id, 7);
        }
    }

    #[test]
    fn unsorted_input_is_sorted_on_encode() {
        let changes = vec![
            VoxelChange { flat_index: 5, block_id: 1 },
            VoxelChange { flat_index: 1, block_id: 2 },
            VoxelChange { flat_index: 3, block_id: 1 },
        ];
        let decoded = decode(&encode(&changes)).unwrap();
        let indices: Vec<u32> = decoded.iter().map(|c| c.flat_index).collect();
        assert_eq!(indices, vec![1, 3, 5]);
    }

    #[test]
    fn different_block_ids_do_not_coalesce() {
        let changes = vec![
            VoxelChange { flat_index: 0, block_id: 1 },
            VoxelChange { flat_index: 1, block_id: 2 },
        ];
        assert_eq!(encode(&changes).len(), 2 * ENTRY_LEN);
    }
}
