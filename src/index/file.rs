//! Index files on disk.
//!
//! One file per index kind per segment, named `prefix-0000.i4`,
//! `prefix-0001.i4`, ... Files are written to a `.tmp` sibling and renamed
//! into place, so a reader never sees a partial index.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::codec::Method;
use crate::error::{IndexError, Result};
use crate::index::builder::{AcceptStats, IndexBuilder};
use crate::index::format::{Trailer, TRAILER_SIZE};
use crate::index::key::{IndexKey, KeyWidth};
use crate::index::serializer::serialize_index;
use crate::index::view::{make_poly_index_view, OffsetIndex};
use crate::query::Environment;

// ── Index Kinds ───────────────────────────────────────────────────

/// What an index file is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKind {
    /// IPv4 addresses, u32 keys.
    Ipv4,
    /// IPv6 addresses, u128 keys.
    Ipv6,
    /// TCP/UDP ports, u16 keys.
    Port,
    /// Pattern-match ids, u64 keys.
    Pattern,
}

impl IndexKind {
    pub const ALL: [IndexKind; 4] = [
        IndexKind::Ipv4,
        IndexKind::Ipv6,
        IndexKind::Port,
        IndexKind::Pattern,
    ];

    /// File extension, also the name the kind is bound to in queries.
    pub fn extension(self) -> &'static str {
        match self {
            IndexKind::Ipv4 => "i4",
            IndexKind::Ipv6 => "i6",
            IndexKind::Port => "ix",
            IndexKind::Pattern => "iy",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.extension() == ext)
    }

    pub fn key_width(self) -> KeyWidth {
        match self {
            IndexKind::Ipv4 => KeyWidth::W32,
            IndexKind::Ipv6 => KeyWidth::W128,
            IndexKind::Port => KeyWidth::W16,
            IndexKind::Pattern => KeyWidth::W64,
        }
    }
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

// ── Naming ────────────────────────────────────────────────────────

/// `prefix-0007.i4`
pub fn index_file_name(prefix: &str, seq: u32, kind: IndexKind) -> String {
    format!("{}-{:04}.{}", prefix, seq, kind.extension())
}

pub fn index_path(dir: &Path, prefix: &str, seq: u32, kind: IndexKind) -> PathBuf {
    dir.join(index_file_name(prefix, seq, kind))
}

/// Split `prefix-0007.i4` into its parts.
pub fn parse_index_file_name(name: &str) -> Option<(&str, u32, IndexKind)> {
    let (stem, ext) = name.rsplit_once('.')?;
    let kind = IndexKind::from_extension(ext)?;
    let (prefix, seq) = stem.rsplit_once('-')?;
    if prefix.is_empty() || seq.len() < 4 || !seq.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((prefix, seq.parse().ok()?, kind))
}

/// Sequence numbers of all segments under `dir` written with `prefix`.
pub fn list_segments(dir: &Path, prefix: &str) -> Result<Vec<u32>> {
    let mut seqs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some((p, seq, _)) = parse_index_file_name(name) {
            if p == prefix {
                seqs.push(seq);
            }
        }
    }
    seqs.sort_unstable();
    seqs.dedup();
    Ok(seqs)
}

// ── Writing ───────────────────────────────────────────────────────

/// Serialize `builder` to `path`, replacing any existing file atomically.
pub fn write_index_file<K: IndexKey>(
    path: &Path,
    builder: IndexBuilder<K>,
    method: Method,
    segment_offset: u64,
) -> Result<AcceptStats> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let file = File::create(&tmp)?;
    let result = serialize_index(builder, method, segment_offset, BufWriter::new(file))
        .and_then(|(writer, stats)| {
            let file = writer.into_inner().map_err(|e| IndexError::Io(e.into_error()))?;
            file.sync_all()?;
            Ok(stats)
        });

    match result {
        Ok(stats) => {
            fs::rename(&tmp, path)?;
            Ok(stats)
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

// ── Reading ───────────────────────────────────────────────────────

/// Memory-mapped index file, validated on open.
#[derive(Debug)]
pub struct MappedIndex {
    path: PathBuf,
    mmap: Mmap,
}

impl MappedIndex {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(IndexError::Io)?;
        let len = file.metadata()?.len();
        if len < TRAILER_SIZE as u64 {
            return Err(IndexError::InvalidFormat(format!(
                "{}: {} bytes is too small for an index",
                path.display(),
                len
            )));
        }
        let mmap = unsafe { Mmap::map(&file) }.map_err(IndexError::Io)?;
        Trailer::read_from_end(&mmap)?;
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    /// Codec-erased view borrowing the mapping.
    pub fn view(&self) -> Result<Box<dyn OffsetIndex + '_>> {
        make_poly_index_view(&self.mmap)
    }
}

/// All index files of one segment.
#[derive(Debug)]
pub struct IndexSet {
    seq: u32,
    files: Vec<(IndexKind, MappedIndex)>,
}

impl IndexSet {
    /// Open whichever kinds exist for segment `seq`.
    pub fn open(dir: &Path, prefix: &str, seq: u32) -> Result<Self> {
        let mut files = Vec::new();
        for kind in IndexKind::ALL {
            let path = index_path(dir, prefix, seq, kind);
            if path.exists() {
                files.push((kind, MappedIndex::open(&path)?));
            }
        }
        Ok(Self { seq, files })
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn kinds(&self) -> impl Iterator<Item = IndexKind> + '_ {
        self.files.iter().map(|(k, _)| *k)
    }

    pub fn get(&self, kind: IndexKind) -> Option<&MappedIndex> {
        self.files.iter().find(|(k, _)| *k == kind).map(|(_, m)| m)
    }

    /// Query environment binding each present kind by its extension.
    pub fn environment(&self) -> Result<Environment<'_>> {
        let mut env = Environment::new();
        for (kind, mapped) in &self.files {
            env.bind(kind.extension(), mapped.view()?);
        }
        Ok(env)
    }
}

// ── Tests ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_names() {
        assert_eq!(index_file_name("cap", 0, IndexKind::Ipv4), "cap-0000.i4");
        assert_eq!(index_file_name("cap", 12345, IndexKind::Pattern), "cap-12345.iy");
        assert_eq!(
            parse_index_file_name("my-cap-0042.ix"),
            Some(("my-cap", 42, IndexKind::Port))
        );
        assert_eq!(parse_index_file_name("cap-0042.pcap"), None);
        assert_eq!(parse_index_file_name("cap-42.i4"), None);
        assert_eq!(parse_index_file_name("cap-0042.i4.tmp"), None);
    }

    #[test]
    fn test_write_then_map() {
        let dir = TempDir::new().unwrap();
        let path = index_path(dir.path(), "cap", 3, IndexKind::Ipv4);

        let mut b = IndexBuilder::<u32>::for_method(Method::BitPack128);
        b.add(0x0a00_0001, 40);
        b.add(0x0a00_0001, 90);
        let stats = write_index_file(&path, b, Method::BitPack128, 1 << 32).unwrap();
        assert_eq!(stats.key_count, 1);
        assert_eq!(stats.bytes_written, fs::metadata(&path).unwrap().len());
        assert!(!dir.path().join("cap-0003.i4.tmp").exists());

        let mapped = MappedIndex::open(&path).unwrap();
        let view = mapped.view().unwrap();
        let r = view.lookup_forward_32(0x0a00_0001).unwrap();
        assert_eq!(r.values(), &[40, 90]);
        assert_eq!(r.segment_offset(), Some(1 << 32));
    }

    #[test]
    fn test_open_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad-0000.i4");
        fs::write(&path, b"short").unwrap();
        assert!(MappedIndex::open(&path).unwrap_err().is_malformed());
        fs::write(&path, vec![0u8; 64]).unwrap();
        assert!(MappedIndex::open(&path).is_err());
        assert!(MappedIndex::open(&dir.path().join("missing.i4")).is_err());
    }

    #[test]
    fn test_index_set_and_listing() {
        let dir = TempDir::new().unwrap();
        for seq in [0u32, 2] {
            let mut b = IndexBuilder::<u16>::new(128);
            b.add(80, seq);
            write_index_file(&index_path(dir.path(), "cap", seq, IndexKind::Port), b, Method::StreamVByte128, 0)
                .unwrap();
        }
        fs::write(dir.path().join("other-0001.ix"), b"x").unwrap();
        assert_eq!(list_segments(dir.path(), "cap").unwrap(), vec![0, 2]);

        let set = IndexSet::open(dir.path(), "cap", 2).unwrap();
        assert_eq!(set.kinds().collect::<Vec<_>>(), vec![IndexKind::Port]);
        assert!(set.get(IndexKind::Ipv4).is_none());
        let env = set.environment().unwrap();
        assert!(env.get("ix").is_some());

        assert!(IndexSet::open(dir.path(), "cap", 1).unwrap().is_empty());
    }
}
