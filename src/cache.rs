// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Content-keyed on-disk cache of parsed documents.
//!
//! Parsing and normalising a PDF dwarfs every other per-document cost, so
//! the pipeline persists the finished word records and skips both steps when
//! a reference has not changed. The key is `md5(absolute path, mtime_ns,
//! size)`: touch the file and the key moves, so stale entries are simply
//! never read again. Fingerprints are deliberately NOT persisted; they are
//! cheap to recompute, and keeping them out of the format means cache
//! entries stay portable across processes and seed-size changes.
//!
//! One file per document, `<key>.dat`, little-endian throughout:
//!
//! ```text
//! "PDFC" | version u16 | name | pages (w,h f32 pairs) |
//! words (raw, token, page, bbox, fused fragments) | token map |
//! CRC32 footer over everything before it
//! ```
//!
//! The cache is strictly an optimisation. Write failures are logged once and
//! swallowed. Read failures (bad magic, unknown version, truncation, CRC
//! mismatch, inconsistent token map) delete the entry and fall back to a
//! re-parse. Writes go through a temp file in the cache directory followed
//! by an atomic rename, so a concurrent instance never observes a torn file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use log::{debug, warn};

use crate::types::{Bbox, Document, PageDims, Word};

/// Magic bytes: "PDFC" in ASCII.
pub const MAGIC: [u8; 4] = [0x50, 0x44, 0x46, 0x43];

/// Current format version. Unknown versions force a re-parse.
pub const VERSION: u16 = 1;

// Caps against malformed or malicious files. A corrupt length prefix must
// not turn into a multi-gigabyte allocation.
const MAX_PAGES: u32 = 50_000;
const MAX_WORDS: u32 = 5_000_000;
const MAX_STRING: u32 = 4_096;
const MAX_FRAGMENTS: u16 = 16;

pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// `~/.pdfcompare/index_cache`, or `None` when no home is discoverable.
    pub fn default_dir() -> Option<PathBuf> {
        let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"))?;
        Some(PathBuf::from(home).join(".pdfcompare").join("index_cache"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Content key for a document version: md5 over the absolute path, the
    /// modification time in nanoseconds, and the byte size, NUL-separated.
    /// `None` when the file cannot be stat'ed (it will fail extraction with
    /// a better error anyway).
    pub fn content_key(path: &Path) -> Option<String> {
        let abs = path.canonicalize().ok()?;
        let meta = fs::metadata(&abs).ok()?;
        let mtime_ns = meta
            .modified()
            .ok()?
            .duration_since(UNIX_EPOCH)
            .ok()?
            .as_nanos();
        let mut keyed: Vec<u8> = Vec::new();
        keyed.extend_from_slice(abs.to_string_lossy().as_bytes());
        keyed.push(0);
        keyed.extend_from_slice(mtime_ns.to_string().as_bytes());
        keyed.push(0);
        keyed.extend_from_slice(meta.len().to_string().as_bytes());
        Some(format!("{:x}", md5::compute(&keyed)))
    }

    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.dat"))
    }

    /// Load a cached document. Any decode failure deletes the entry and
    /// returns `None` so the caller re-parses.
    pub fn load(&self, key: &str) -> Option<Document> {
        let path = self.entry_path(key);
        let bytes = fs::read(&path).ok()?;
        match decode_document(&bytes) {
            Ok(doc) => {
                debug!("cache hit for {key} ({} words)", doc.words.len());
                Some(doc)
            }
            Err(e) => {
                warn!("corrupt cache entry {}: {e}; re-parsing", path.display());
                let _ = fs::remove_file(&path);
                None
            }
        }
    }

    /// Persist a document under `key`. Failures are logged and swallowed;
    /// the cache must never take a run down with it.
    pub fn store(&self, key: &str, doc: &Document) {
        if let Err(e) = self.try_store(key, doc) {
            warn!("cache write for {key} failed: {e}");
        }
    }

    fn try_store(&self, key: &str, doc: &Document) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let bytes = encode_document(doc);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(self.entry_path(key))
            .map_err(|e| e.error)?;
        Ok(())
    }
}

// ============================================================================
// ENCODING
// ============================================================================

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_f32(buf: &mut Vec<u8>, v: f32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_u32(buf, s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
}

fn put_bbox(buf: &mut Vec<u8>, b: &Bbox) {
    put_f32(buf, b.x0);
    put_f32(buf, b.y0);
    put_f32(buf, b.x1);
    put_f32(buf, b.y1);
}

pub fn encode_document(doc: &Document) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&MAGIC);
    put_u16(&mut buf, VERSION);
    put_str(&mut buf, &doc.name);

    put_u32(&mut buf, doc.pages.len() as u32);
    for page in &doc.pages {
        put_f32(&mut buf, page.width);
        put_f32(&mut buf, page.height);
    }

    put_u32(&mut buf, doc.words.len() as u32);
    for word in &doc.words {
        put_str(&mut buf, &word.raw);
        put_str(&mut buf, &word.token);
        put_u32(&mut buf, word.page);
        put_bbox(&mut buf, &word.bbox);
        put_u16(&mut buf, word.merged_from.len() as u16);
        for (page, bbox) in &word.merged_from {
            put_u32(&mut buf, *page);
            put_bbox(&mut buf, bbox);
        }
    }

    put_u32(&mut buf, doc.token_map.len() as u32);
    for idx in &doc.token_map {
        put_u32(&mut buf, *idx);
    }

    let crc = crc32fast::hash(&buf);
    put_u32(&mut buf, crc);
    buf
}

// ============================================================================
// DECODING
// ============================================================================

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> io::Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or_else(|| corrupt("overflow"))?;
        if end > self.bytes.len() {
            return Err(corrupt("truncated"));
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u16(&mut self) -> io::Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> io::Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32(&mut self) -> io::Result<f32> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn string(&mut self, cap: u32) -> io::Result<String> {
        let len = self.u32()?;
        if len > cap {
            return Err(corrupt("string length exceeds cap"));
        }
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| corrupt("invalid utf-8"))
    }

    fn bbox(&mut self) -> io::Result<Bbox> {
        Ok(Bbox::new(self.f32()?, self.f32()?, self.f32()?, self.f32()?))
    }
}

fn corrupt(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, what.to_string())
}

pub fn decode_document(bytes: &[u8]) -> io::Result<Document> {
    // Footer first: refuse to parse anything whose checksum is off.
    if bytes.len() < MAGIC.len() + 2 + 4 {
        return Err(corrupt("file too small"));
    }
    let (body, footer) = bytes.split_at(bytes.len() - 4);
    let stored = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
    if crc32fast::hash(body) != stored {
        return Err(corrupt("crc mismatch"));
    }

    let mut cur = Cursor::new(body);
    if cur.take(4)? != MAGIC {
        return Err(corrupt("bad magic"));
    }
    let version = cur.u16()?;
    if version != VERSION {
        return Err(corrupt("unknown format version"));
    }

    let name = cur.string(MAX_STRING)?;

    let page_count = cur.u32()?;
    if page_count > MAX_PAGES {
        return Err(corrupt("page count exceeds cap"));
    }
    let mut pages = Vec::with_capacity(page_count as usize);
    for _ in 0..page_count {
        pages.push(PageDims {
            width: cur.f32()?,
            height: cur.f32()?,
        });
    }

    let word_count = cur.u32()?;
    if word_count > MAX_WORDS {
        return Err(corrupt("word count exceeds cap"));
    }
    let mut words = Vec::with_capacity(word_count as usize);
    for _ in 0..word_count {
        let raw = cur.string(MAX_STRING)?;
        let token = cur.string(MAX_STRING)?;
        let page = cur.u32()?;
        if page >= page_count {
            return Err(corrupt("word page out of range"));
        }
        let bbox = cur.bbox()?;
        let fragment_count = cur.u16()?;
        if fragment_count > MAX_FRAGMENTS {
            return Err(corrupt("fragment count exceeds cap"));
        }
        let mut merged_from = Vec::with_capacity(fragment_count as usize);
        for _ in 0..fragment_count {
            let frag_page = cur.u32()?;
            let frag_bbox = cur.bbox()?;
            merged_from.push((frag_page, frag_bbox));
        }
        words.push(Word {
            raw,
            token,
            page,
            bbox,
            merged_from,
        });
    }

    let map_count = cur.u32()?;
    if map_count > word_count {
        return Err(corrupt("token map longer than word stream"));
    }
    let mut token_map = Vec::with_capacity(map_count as usize);
    let mut prev: Option<u32> = None;
    for _ in 0..map_count {
        let idx = cur.u32()?;
        if idx >= word_count || prev.is_some_and(|p| idx <= p) {
            return Err(corrupt("token map not strictly increasing"));
        }
        if words[idx as usize].token.is_empty() {
            return Err(corrupt("token map points at filtered word"));
        }
        prev = Some(idx);
        token_map.push(idx);
    }

    if cur.pos != body.len() {
        return Err(corrupt("trailing bytes"));
    }

    Ok(Document {
        name,
        pages,
        words,
        token_map,
    })
}

/// Header-level view of a cache file, for `pdfcompare inspect`.
#[derive(Debug)]
pub struct CacheSummary {
    pub name: String,
    pub version: u16,
    pub pages: usize,
    pub words: usize,
    pub tokens: usize,
    pub bytes: usize,
}

pub fn read_summary(path: &Path) -> io::Result<CacheSummary> {
    let bytes = fs::read(path)?;
    let doc = decode_document(&bytes)?;
    Ok(CacheSummary {
        name: doc.name,
        version: VERSION,
        pages: doc.pages.len(),
        words: doc.words.len(),
        tokens: doc.token_map.len(),
        bytes: bytes.len(),
    })
}
