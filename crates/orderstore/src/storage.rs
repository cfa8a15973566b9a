//! Storage engine implementation
//!
//! File layout:
//! - `orders.db`: Data file with store header + `key\tpayload` records
//!
//! The key index is not persisted. It is rebuilt on open by scanning a
//! memory map of the data file.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::parser::{
    create_header, encode_record, parse_header, parse_record, HEADER_LEN, STORE_MAGIC,
    STORE_VERSION,
};

/// Name of the data file inside the store directory
pub const DATA_FILE: &str = "orders.db";

/// Maximum value size (1 MB)
const MAX_VALUE_SIZE: usize = 1024 * 1024;

/// Maximum database size (1 GB)
const MAX_DB_SIZE: u64 = 1024 * 1024 * 1024;

/// Location of a payload inside the data file
#[derive(Debug, Clone, Copy)]
struct Slot {
    offset: u64,
    len: usize,
}

/// In-memory key index plus insertion order
#[derive(Debug, Default)]
struct Index {
    slots: HashMap<String, Slot>,
    order: Vec<String>,
    /// Current end of the data file
    db_size: u64,
}

impl Index {
    fn insert(&mut self, key: String, slot: Slot) {
        self.order.push(key.clone());
        self.slots.insert(key, slot);
    }
}

/// OrderStore is the append-only record store handle
pub struct OrderStore {
    /// Path to the database directory
    path: PathBuf,

    /// Data file handle
    data_file: RwLock<File>,

    /// Key index, lock order: index before data_file
    index: RwLock<Index>,

    /// Is the database closed?
    closed: RwLock<bool>,
}

impl OrderStore {
    /// Open or create a store at the given directory
    ///
    /// # Arguments
    /// * `path` - Directory path for the database files
    ///
    /// # Returns
    /// * `Result<OrderStore>` - Store handle
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let data_path = path.join(DATA_FILE);

        let (data_file, index) = if data_path.exists() {
            Self::open_existing(&data_path)?
        } else {
            Self::create_new(&data_path)?
        };

        debug!(
            "Opened store at {:?} with {} records ({} bytes)",
            path,
            index.order.len(),
            index.db_size
        );

        Ok(OrderStore {
            path: path.to_path_buf(),
            data_file: RwLock::new(data_file),
            index: RwLock::new(index),
            closed: RwLock::new(false),
        })
    }

    fn open_existing(data_path: &Path) -> Result<(File, Index)> {
        let data_file = OpenOptions::new().read(true).write(true).open(data_path)?;

        let file_len = data_file.metadata()?.len();
        if file_len < HEADER_LEN as u64 {
            return Err(Error::Parse("Data file shorter than header".to_string()));
        }

        // SAFETY: the file is opened by this handle only and is not truncated
        // while the map is alive; the map is dropped before any truncation.
        let map = unsafe { Mmap::map(&data_file)? };
        let header = parse_header(&map)?;

        if header.version != STORE_VERSION {
            return Err(Error::Parse(format!("Unsupported store version {}", header.version)));
        }

        let mut index = Index::default();
        let mut torn_tail = None;
        let mut rest = &map[HEADER_LEN..];
        while !rest.is_empty() {
            let start = (map.len() - rest.len()) as u64;

            // An unterminated last record is a partial append
            if !rest.contains(&b'\n') {
                torn_tail = Some(start);
                break;
            }

            let (next, record) = parse_record(rest)
                .map_err(|_| Error::Parse(format!("Corrupt record at offset {}", start)))?;

            let key = std::str::from_utf8(record.key)
                .map_err(|_| Error::Parse(format!("Non UTF-8 key at offset {}", start)))?
                .to_string();
            if index.slots.contains_key(&key) {
                return Err(Error::Parse(format!("Duplicate key {} at offset {}", key, start)));
            }

            let slot = Slot {
                offset: start + record.key.len() as u64 + 1,
                len: record.payload.len(),
            };
            index.insert(key, slot);
            rest = next;
        }
        index.db_size = map.len() as u64;
        drop(map);

        if let Some(start) = torn_tail {
            warn!(
                "Dropping {} bytes of partial record at offset {}",
                file_len - start,
                start
            );
            data_file.set_len(start)?;
            data_file.sync_all()?;
            index.db_size = start;
        }

        if header.record_count as usize != index.order.len() {
            warn!(
                "Store header records {} entries but {} were found, last close was not clean",
                header.record_count,
                index.order.len()
            );
        }

        Ok((data_file, index))
    }

    fn create_new(data_path: &Path) -> Result<(File, Index)> {
        let mut data_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(data_path)?;

        let header = create_header(STORE_VERSION, 0);
        data_file.write_all(&header)?;

        let index = Index {
            db_size: header.len() as u64,
            ..Index::default()
        };

        Ok((data_file, index))
    }

    /// Append a record to the store
    ///
    /// # Arguments
    /// * `key` - Unique record key (no tabs or newlines)
    /// * `value` - Raw payload (no newlines)
    ///
    /// # Returns
    /// * `Result<()>` - Ok once the record is written
    pub fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        if *self.closed.read() {
            return Err(Error::Closed);
        }

        if key.is_empty() || key.contains(|c: char| c == '\t' || c == '\n') {
            return Err(Error::InvalidKey(key.to_string()));
        }

        if value.len() > MAX_VALUE_SIZE {
            return Err(Error::ValueTooLarge(value.len()));
        }

        if value.contains(&b'\n') {
            return Err(Error::InvalidValue);
        }

        let mut index = self.index.write();
        if index.slots.contains_key(key) {
            return Err(Error::DuplicateKey(key.to_string()));
        }

        let record = encode_record(key, value);
        if index.db_size + record.len() as u64 > MAX_DB_SIZE {
            return Err(Error::DatabaseFull(index.db_size));
        }

        let mut data_file = self.data_file.write();
        let offset = data_file.seek(SeekFrom::End(0))?;
        if let Err(e) = data_file.write_all(&record) {
            // Leave no partial record behind
            if let Err(trunc) = data_file.set_len(offset) {
                warn!("Failed to roll back partial record at offset {}: {}", offset, trunc);
            }
            return Err(e.into());
        }

        let slot = Slot {
            offset: offset + key.len() as u64 + 1,
            len: value.len(),
        };
        index.insert(key.to_string(), slot);
        index.db_size = offset + record.len() as u64;

        Ok(())
    }

    /// Get a record payload by key
    ///
    /// # Arguments
    /// * `key` - Record key
    ///
    /// # Returns
    /// * `Result<Vec<u8>>` - Raw payload
    pub fn get(&self, key: &str) -> Result<Vec<u8>> {
        if *self.closed.read() {
            return Err(Error::Closed);
        }

        let index = self.index.read();
        let slot = *index.slots.get(key).ok_or(Error::NotFound)?;

        let mut data_file = self.data_file.write();
        Self::read_slot(&mut data_file, slot)
    }

    /// Check whether a key is stored
    pub fn contains(&self, key: &str) -> bool {
        self.index.read().slots.contains_key(key)
    }

    /// Read every record in insertion order
    ///
    /// # Returns
    /// * `Result<Vec<(String, Vec<u8>)>>` - (key, payload) pairs
    pub fn scan(&self) -> Result<Vec<(String, Vec<u8>)>> {
        if *self.closed.read() {
            return Err(Error::Closed);
        }

        let index = self.index.read();
        let mut data_file = self.data_file.write();

        let mut records = Vec::with_capacity(index.order.len());
        for key in &index.order {
            let slot = index.slots[key];
            records.push((key.clone(), Self::read_slot(&mut data_file, slot)?));
        }

        Ok(records)
    }

    fn read_slot(data_file: &mut File, slot: Slot) -> Result<Vec<u8>> {
        data_file.seek(SeekFrom::Start(slot.offset))?;
        let mut payload = vec![0u8; slot.len];
        data_file.read_exact(&mut payload)?;
        Ok(payload)
    }

    /// Get the number of records in the store
    pub fn len(&self) -> usize {
        self.index.read().order.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.index.read().order.is_empty()
    }

    /// Directory the store lives in
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the store and fsync all changes
    pub fn close(&mut self) -> Result<()> {
        if *self.closed.read() {
            return Ok(());
        }

        let record_count = self.index.read().order.len() as u32;

        let mut data_file = self.data_file.write();
        data_file.seek(SeekFrom::Start(STORE_MAGIC.len() as u64 + 4))?;
        data_file.write_all(&record_count.to_le_bytes())?;
        data_file.sync_all()?;

        *self.closed.write() = true;

        Ok(())
    }
}

impl Drop for OrderStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
