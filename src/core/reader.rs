// Container file reader: header-only scan plus on-demand payload loads

use crate::core::codec;
use crate::core::config::{FramingMode, ReaderOptions, StreamMode};
use crate::core::constants::*;
use crate::core::error::{EclError, Result};
use crate::core::format::{ArrayData, RecordEntry};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Lifecycle of the underlying descriptor.
#[derive(Debug)]
enum StreamState {
    Open(BufReader<File>),
    Closed,
}

#[derive(Debug)]
pub struct EclFile {
    path: PathBuf,
    framing: FramingMode,
    stream_mode: StreamMode,
    stream: StreamState,
    entries: Vec<RecordEntry>,
    name_index: HashMap<String, Vec<usize>>,
    cache: HashMap<usize, ArrayData>,
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => EclError::FileNotFound(path.to_path_buf()),
        _ => EclError::Io(e),
    })
}

impl EclFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &ReaderOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut reader = BufReader::new(open_file(&path)?);

        let entries = Self::scan_index(&mut reader, &path, options.framing)?;

        let mut name_index: HashMap<String, Vec<usize>> = HashMap::new();
        for (id, entry) in entries.iter().enumerate() {
            name_index.entry(entry.name.clone()).or_default().push(id);
        }

        info!("opened {} with {} records", path.display(), entries.len());

        let stream = match options.stream_mode {
            StreamMode::KeepOpen => StreamState::Open(reader),
            StreamMode::CloseBetweenAccesses => StreamState::Closed,
        };

        Ok(Self {
            path,
            framing: options.framing,
            stream_mode: options.stream_mode,
            stream,
            entries,
            name_index,
            cache: HashMap::new(),
        })
    }

    /// Single pass over the file reading headers only. A file ending on a
    /// record boundary yields the records found so far.
    pub fn scan_index(reader: &mut BufReader<File>, path: &Path, framing: FramingMode) -> Result<Vec<RecordEntry>> {
        let file_len = reader.get_ref().metadata()?.len();
        if file_len == 0 {
            return Err(EclError::not_container(path, "empty file"));
        }

        let mut entries = Vec::new();
        let mut pos = 0u64;

        while pos < file_len {
            reader.seek(SeekFrom::Start(pos))?;

            let entry = match codec::read_header(reader, framing) {
                Ok(entry) => entry,
                Err(EclError::MalformedRecord { reason, .. }) if entries.is_empty() => {
                    return Err(EclError::not_container(path, reason));
                }
                Err(EclError::TruncatedRecord { .. }) if entries.is_empty() && file_len < HEADER_RECORD_SIZE as u64 => {
                    return Err(EclError::not_container(path, "file shorter than one record header"));
                }
                Err(e) => return Err(e),
            };

            let end = entry.end_offset();
            if end > file_len {
                if framing == FramingMode::Relaxed && end - file_len == MARKER_SIZE as u64 {
                    warn!("{}: last record {} lacks its trailing marker", path.display(), entry.name);
                    entries.push(entry);
                    break;
                }
                return Err(EclError::TruncatedRecord {
                    offset: entry.offset,
                });
            }

            entries.push(entry);
            pos = end;
        }

        Ok(entries)
    }

    /// Scans the file again, picking up records appended since open.
    pub fn refresh(&mut self) -> Result<()> {
        let mut reader = BufReader::new(open_file(&self.path)?);
        let entries = Self::scan_index(&mut reader, &self.path, self.framing)?;
        let known = self.entries.len();

        self.name_index.clear();
        for (id, entry) in entries.iter().enumerate() {
            self.name_index.entry(entry.name.clone()).or_default().push(id);
        }
        self.cache.retain(|id, _| *id < entries.len());

        debug!("{}: refresh found {} new records", self.path.display(), entries.len().saturating_sub(known));
        self.entries = entries;
        if let StreamState::Open(_) = self.stream {
            self.stream = StreamState::Open(reader);
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn framing(&self) -> FramingMode {
        self.framing
    }

    pub fn entries(&self) -> &[RecordEntry] {
        &self.entries
    }

    pub fn entry(&self, id: usize) -> Option<&RecordEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn list(&self) -> Vec<(String, ArrayType, usize)> {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), e.array_type, e.count))
            .collect()
    }

    pub fn has_key(&self, name: &str) -> bool {
        self.name_index.contains_key(name)
    }

    pub fn count_occurrences(&self, name: &str) -> usize {
        self.name_index.get(name).map_or(0, |ids| ids.len())
    }

    /// Record id of the `occurrence`-th record called `name`.
    pub fn find(&self, name: &str, occurrence: usize) -> Option<usize> {
        self.name_index.get(name)?.get(occurrence).copied()
    }

    pub fn is_stream_open(&self) -> bool {
        matches!(self.stream, StreamState::Open(_))
    }

    pub fn close_stream(&mut self) {
        if self.is_stream_open() {
            debug!("{}: closing stream", self.path.display());
        }
        self.stream = StreamState::Closed;
    }

    pub fn reopen_stream(&mut self) -> Result<()> {
        if !self.is_stream_open() {
            debug!("{}: reopening stream", self.path.display());
            self.stream = StreamState::Open(BufReader::new(open_file(&self.path)?));
        }
        Ok(())
    }

    /// Runs `f` on a positioned stream. When closed-between-accesses the
    /// file is opened for this call only and dropped on every exit path.
    fn with_stream<T>(&mut self, offset: u64, f: impl FnOnce(&mut BufReader<File>) -> Result<T>) -> Result<T> {
        if self.stream_mode == StreamMode::KeepOpen {
            self.reopen_stream()?;
        }

        match &mut self.stream {
            StreamState::Open(reader) => {
                reader.seek(SeekFrom::Start(offset))?;
                f(reader)
            }
            StreamState::Closed => {
                let mut scoped = BufReader::new(open_file(&self.path)?);
                scoped.seek(SeekFrom::Start(offset))?;
                f(&mut scoped)
            }
        }
    }

    /// Reads the payload of `entry` without touching the cache.
    pub fn read_record(&mut self, entry: &RecordEntry) -> Result<ArrayData> {
        let framing = self.framing;
        self.with_stream(entry.data_offset(), |reader| codec::read_payload(reader, entry, framing))
    }

    /// Payload bytes of record `id` exactly as stored, framing removed.
    pub fn load_raw(&mut self, id: usize) -> Result<Vec<u8>> {
        let entry = self.entries.get(id).cloned().ok_or_else(|| EclError::array_not_found(format!("#{}", id), 0))?;
        let framing = self.framing;
        self.with_stream(entry.data_offset(), |reader| codec::read_raw_payload(reader, &entry, framing))
    }

    /// Materializes record `id`, caching the result.
    pub fn load_record(&mut self, id: usize) -> Result<&ArrayData> {
        if !self.cache.contains_key(&id) {
            let entry = self.entries.get(id).cloned().ok_or_else(|| EclError::array_not_found(format!("#{}", id), 0))?;
            debug!("{}: loading {} ({} x {})", self.path.display(), entry.name, entry.count, entry.array_type);
            let data = self.read_record(&entry)?;
            self.cache.insert(id, data);
        }
        Ok(&self.cache[&id])
    }

    pub fn load_ids(&mut self, ids: impl IntoIterator<Item = usize>) -> Result<()> {
        for id in ids {
            self.load_record(id)?;
        }
        Ok(())
    }

    pub fn load_all(&mut self) -> Result<()> {
        self.load_ids(0..self.entries.len())
    }

    pub fn is_loaded(&self, id: usize) -> bool {
        self.cache.contains_key(&id)
    }

    pub fn unload(&mut self, id: usize) {
        self.cache.remove(&id);
    }

    pub fn get_occurrence(&mut self, name: &str, occurrence: usize) -> Result<&ArrayData> {
        let id = self
            .find(name, occurrence)
            .ok_or_else(|| EclError::array_not_found(name, occurrence))?;
        self.load_record(id)
    }

    pub fn get(&mut self, name: &str) -> Result<&ArrayData> {
        self.get_occurrence(name, 0)
    }

    pub fn get_int(&mut self, name: &str) -> Result<Vec<i32>> {
        Ok(self.get(name)?.as_int(name)?.to_vec())
    }

    pub fn get_float(&mut self, name: &str) -> Result<Vec<f32>> {
        Ok(self.get(name)?.as_float(name)?.to_vec())
    }

    pub fn get_double(&mut self, name: &str) -> Result<Vec<f64>> {
        Ok(self.get(name)?.as_double(name)?.to_vec())
    }

    pub fn get_bool(&mut self, name: &str) -> Result<Vec<bool>> {
        Ok(self.get(name)?.as_bool(name)?.to_vec())
    }

    pub fn get_char(&mut self, name: &str) -> Result<Vec<String>> {
        Ok(self.get(name)?.as_char(name)?.to_vec())
    }
}
