//! File-backed peer store: one file per tracked info-hash, containing a
//! concatenation of 7-byte peer records.
//!
//! Reference: spec.md Section 4.5 (C5), Section 6 (file format)

use std::io::Write;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::entities::Peer;
use crate::domain::errors::{PeerInsert, PeerStoreError};
use crate::ports::outbound::PeerStore;

const RECORD_LEN: usize = 7;

/// Guards filesystem access with a single mutex, matching the single
/// logical critical section spec.md Section 5 requires for shared state.
pub struct FilePeerStore {
    dir: PathBuf,
    max_peers_per_torrent: usize,
    lock: Mutex<()>,
}

impl FilePeerStore {
    pub fn new(dir: impl Into<PathBuf>, max_peers_per_torrent: usize) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_peers_per_torrent,
            lock: Mutex::new(()),
        })
    }

    fn path_for(&self, info_hash: &[u8; 20]) -> PathBuf {
        self.dir.join(format!("0x{}", hex::encode(info_hash)))
    }

    /// Read and decode a torrent's peer file, truncating any trailing
    /// partial record so a crash mid-write never surfaces garbage
    /// (spec.md 4.5, "crash-consistent at record granularity").
    fn read_peers(path: &Path) -> Result<Vec<Peer>, PeerStoreError> {
        let bytes = std::fs::read(path).map_err(|e| PeerStoreError::Io(e.to_string()))?;
        let whole_records = bytes.len() / RECORD_LEN;
        Ok(bytes[..whole_records * RECORD_LEN]
            .chunks_exact(RECORD_LEN)
            .map(decode_record)
            .collect())
    }
}

fn encode_record(peer: &Peer) -> [u8; RECORD_LEN] {
    let mut out = [0u8; RECORD_LEN];
    out[0..4].copy_from_slice(&peer.addr.octets());
    out[4..6].copy_from_slice(&peer.port.to_be_bytes());
    out[6] = peer.seeder as u8;
    out
}

fn decode_record(bytes: &[u8]) -> Peer {
    let addr = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
    let port = u16::from_be_bytes([bytes[4], bytes[5]]);
    let seeder = bytes[6] != 0;
    Peer::new(addr, port, seeder)
}

#[async_trait]
impl PeerStore for FilePeerStore {
    async fn torrent_exists(&self, info_hash: &[u8; 20]) -> bool {
        self.path_for(info_hash).is_file()
    }

    async fn get_peers(&self, info_hash: &[u8; 20]) -> Result<Vec<Peer>, PeerStoreError> {
        let path = self.path_for(info_hash);
        if !path.is_file() {
            return Err(PeerStoreError::NotTracked);
        }
        Self::read_peers(&path)
    }

    async fn add_peer(&self, info_hash: &[u8; 20], peer: Peer) -> Result<PeerInsert, PeerStoreError> {
        let _guard = self.lock.lock().unwrap();
        let path = self.path_for(info_hash);

        let existing = if path.is_file() {
            Self::read_peers(&path)?
        } else {
            Vec::new()
        };

        if existing.contains(&peer) {
            return Ok(PeerInsert::Duplicate);
        }
        if existing.len() >= self.max_peers_per_torrent {
            return Ok(PeerInsert::Full);
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| PeerStoreError::Io(e.to_string()))?;
        file.write_all(&encode_record(&peer))
            .map_err(|e| PeerStoreError::Io(e.to_string()))?;

        Ok(PeerInsert::Added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(byte: u8) -> Peer {
        Peer::new(Ipv4Addr::new(10, 0, 0, byte), 6881, false)
    }

    #[tokio::test]
    async fn untracked_torrent_reports_not_tracked() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePeerStore::new(dir.path(), 6000).unwrap();
        let hash = [1u8; 20];
        assert!(!store.torrent_exists(&hash).await);
        assert!(matches!(store.get_peers(&hash).await, Err(PeerStoreError::NotTracked)));
    }

    #[tokio::test]
    async fn add_then_get_preserves_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePeerStore::new(dir.path(), 6000).unwrap();
        let hash = [2u8; 20];

        assert_eq!(store.add_peer(&hash, peer(1)).await.unwrap(), PeerInsert::Added);
        assert_eq!(store.add_peer(&hash, peer(2)).await.unwrap(), PeerInsert::Added);

        let peers = store.get_peers(&hash).await.unwrap();
        assert_eq!(peers, vec![peer(1), peer(2)]);
    }

    #[tokio::test]
    async fn duplicate_peer_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePeerStore::new(dir.path(), 6000).unwrap();
        let hash = [3u8; 20];

        assert_eq!(store.add_peer(&hash, peer(1)).await.unwrap(), PeerInsert::Added);
        assert_eq!(store.add_peer(&hash, peer(1)).await.unwrap(), PeerInsert::Duplicate);
    }

    #[tokio::test]
    async fn cap_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePeerStore::new(dir.path(), 2).unwrap();
        let hash = [4u8; 20];

        assert_eq!(store.add_peer(&hash, peer(1)).await.unwrap(), PeerInsert::Added);
        assert_eq!(store.add_peer(&hash, peer(2)).await.unwrap(), PeerInsert::Added);
        assert_eq!(store.add_peer(&hash, peer(3)).await.unwrap(), PeerInsert::Full);
    }

    #[tokio::test]
    async fn trailing_partial_record_is_ignored_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePeerStore::new(dir.path(), 6000).unwrap();
        let hash = [5u8; 20];

        store.add_peer(&hash, peer(1)).await.unwrap();
        let path = store.path_for(&hash);
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0xffu8; 3]).unwrap();

        let peers = store.get_peers(&hash).await.unwrap();
        assert_eq!(peers, vec![peer(1)]);
    }

    /// spec.md Section 8, scenario 6: peer-store persistence across a
    /// fresh `FilePeerStore` bound to the same directory.
    #[tokio::test]
    async fn peers_persist_across_a_fresh_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        let hash = [6u8; 20];
        {
            let store = FilePeerStore::new(dir.path(), 6000).unwrap();
            store.add_peer(&hash, peer(1)).await.unwrap();
            store.add_peer(&hash, peer(2)).await.unwrap();
        }
        let restarted = FilePeerStore::new(dir.path(), 6000).unwrap();
        let peers = restarted.get_peers(&hash).await.unwrap();
        assert_eq!(peers, vec![peer(1), peer(2)]);
    }
}
