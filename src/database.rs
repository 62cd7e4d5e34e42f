//! Database API
//!
//! Owns the database bytes (memory-mapped or in memory), the decoded
//! metadata and the precomputed search start node, and exposes lookups
//! over them. Nothing is mutated after loading, so a `Database` can be
//! shared across threads behind an `Arc` without locking.

use crate::error::{IpdbError, Result};
use crate::ipdb::{
    find_start_node, grow_tree, raw_record, IpTree, IpVersion, IpdbHeader, Metadata, Record,
    SearchTree,
};
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Storage for database data - either owned or memory-mapped
enum DatabaseStorage {
    Owned(Vec<u8>),
    Mmap(Mmap),
}

impl DatabaseStorage {
    fn as_slice(&self) -> &[u8] {
        match self {
            DatabaseStorage::Owned(v) => v.as_slice(),
            DatabaseStorage::Mmap(m) => &m[..],
        }
    }
}

/// A loaded IPDB database
///
/// # Examples
///
/// ```no_run
/// use ipdb::Database;
///
/// let db = Database::open("ipipfree.ipdb")?;
/// let locator = db.lookup("8.8.8.8")?;
/// let fields = db.get_all_fields_locale(locator, "CN")?;
/// println!("{:?}", fields);
/// # Ok::<(), ipdb::IpdbError>(())
/// ```
pub struct Database {
    storage: DatabaseStorage,
    metadata: Metadata,
    data_offset: usize,
    start_from: u32,
}

/// Fluent opener returned by [`Database::opener`]
///
/// ```no_run
/// use ipdb::Database;
///
/// let db = Database::opener("ipipfree.ipdb").in_memory().open()?;
/// # Ok::<(), ipdb::IpdbError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseOpener {
    path: PathBuf,
    mmap: bool,
}

impl DatabaseOpener {
    /// Read the whole file into memory instead of mapping it
    pub fn in_memory(mut self) -> Self {
        self.mmap = false;
        self
    }

    /// Memory-map the file (the default)
    pub fn mmap(mut self) -> Self {
        self.mmap = true;
        self
    }

    /// Open and validate the database
    pub fn open(self) -> Result<Database> {
        let path = self.path.display();
        let storage = if self.mmap {
            let file = File::open(&self.path)
                .map_err(|e| IpdbError::Io(format!("Failed to open {}: {}", path, e)))?;
            let mmap = unsafe { Mmap::map(&file) }
                .map_err(|e| IpdbError::Io(format!("Failed to mmap {}: {}", path, e)))?;
            DatabaseStorage::Mmap(mmap)
        } else {
            let bytes = std::fs::read(&self.path)
                .map_err(|e| IpdbError::Io(format!("Failed to read {}: {}", path, e)))?;
            DatabaseStorage::Owned(bytes)
        };

        tracing::debug!(path = %path, mmap = self.mmap, "opening database");
        Database::from_storage(storage)
    }
}

impl Database {
    /// Open a database file using memory mapping
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::opener(path).open()
    }

    /// Start a fluent open of `path`
    pub fn opener<P: AsRef<Path>>(path: P) -> DatabaseOpener {
        DatabaseOpener {
            path: path.as_ref().to_path_buf(),
            mmap: true,
        }
    }

    /// Create database from raw bytes
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_storage(DatabaseStorage::Owned(data))
    }

    fn from_storage(storage: DatabaseStorage) -> Result<Self> {
        let file = storage.as_slice();
        let IpdbHeader {
            metadata,
            data_offset,
        } = IpdbHeader::from_file(file)?;
        let start_from = find_start_node(&file[data_offset..], &metadata)?;

        tracing::debug!(
            size = file.len(),
            ip_version = metadata.ip_version,
            node_count = metadata.node_count,
            languages = metadata.languages.len(),
            fields = metadata.fields.len(),
            start_from,
            "loaded database"
        );

        Ok(Self {
            storage,
            metadata,
            data_offset,
            start_from,
        })
    }

    /// Data region: trie nodes followed by leaf records
    pub fn data(&self) -> &[u8] {
        &self.storage.as_slice()[self.data_offset..]
    }

    /// Search the database for `ip`, returning the leaf locator of its record
    ///
    /// IPv4 databases accept `IpAddr::V4` and IPv4-mapped IPv6 addresses
    /// (`::ffff:a.b.c.d`), IPv6 databases only `IpAddr::V6`; anything else
    /// is [`IpdbError::VersionMismatch`].
    pub fn search(&self, ip: IpAddr) -> Result<u32> {
        SearchTree::new(self.data(), &self.metadata, self.start_from).search(ip)
    }

    /// Parse `query` as an IP address and search for it
    pub fn lookup(&self, query: &str) -> Result<u32> {
        let ip = query
            .parse::<IpAddr>()
            .map_err(|e| IpdbError::InvalidIpAddress(format!("{}: {}", query, e)))?;
        self.search(ip)
    }

    /// Raw tab-separated record at `locator`
    ///
    /// The slice borrows the database buffer and cannot outlive `self`.
    pub fn get_raw(&self, locator: u32) -> Result<&[u8]> {
        raw_record(self.data(), &self.metadata, locator)
    }

    fn record(&self, locator: u32) -> Result<Record<'_>> {
        Record::parse(self.get_raw(locator)?)
    }

    /// Every field in every language, as `field -> language -> value`
    pub fn get_all_fields(&self, locator: u32) -> Result<HashMap<String, HashMap<String, String>>> {
        self.record(locator)?.all(&self.metadata)
    }

    /// Every field in `lang`, as `field -> value`
    pub fn get_all_fields_locale(&self, locator: u32, lang: &str) -> Result<HashMap<String, String>> {
        self.record(locator)?.locale(&self.metadata, lang)
    }

    /// One field in every language, as `language -> value`
    pub fn get_value(&self, locator: u32, field: &str) -> Result<HashMap<String, String>> {
        let mut all = self.get_all_fields(locator)?;
        all.remove(field)
            .ok_or_else(|| IpdbError::UnknownField(field.to_string()))
    }

    /// One field in `lang`
    pub fn get_value_locale(&self, locator: u32, field: &str, lang: &str) -> Result<String> {
        let mut locale = self.get_all_fields_locale(locator, lang)?;
        locale
            .remove(field)
            .ok_or_else(|| IpdbError::UnknownField(field.to_string()))
    }

    /// Materialize the trie as a navigable tree rooted at the search start
    pub fn grow_tree(&self) -> Result<IpTree<'_>> {
        grow_tree(self.data(), &self.metadata, self.start_from)
    }

    /// Decoded metadata
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Build time recorded in the metadata
    ///
    /// `None` if the timestamp cannot be represented on this platform.
    pub fn build_time(&self) -> Option<SystemTime> {
        let secs = Duration::from_secs(self.metadata.build.unsigned_abs());
        if self.metadata.build >= 0 {
            UNIX_EPOCH.checked_add(secs)
        } else {
            UNIX_EPOCH.checked_sub(secs)
        }
    }

    /// Supported language codes, sorted
    pub fn languages(&self) -> Vec<&str> {
        self.metadata.languages.keys().map(String::as_str).collect()
    }

    /// Field names in column order
    pub fn fields(&self) -> &[String] {
        &self.metadata.fields
    }

    /// IP version, `None` if the metadata carries an unknown value
    pub fn ip_version(&self) -> Option<IpVersion> {
        self.metadata.version()
    }

    /// Check if the database is an IPv4 database
    pub fn is_ipv4(&self) -> bool {
        self.ip_version() == Some(IpVersion::V4)
    }

    /// Check if the database is an IPv6 database
    pub fn is_ipv6(&self) -> bool {
        self.ip_version() == Some(IpVersion::V6)
    }

    /// Number of internal trie nodes
    pub fn node_count(&self) -> u32 {
        self.metadata.node_count
    }

    /// Node index searches begin from
    pub fn start_from(&self) -> u32 {
        self.start_from
    }

    /// Total size of the database file in bytes
    pub fn size(&self) -> usize {
        self.storage.as_slice().len()
    }

    /// Whether the database is memory-mapped
    pub fn is_mmap(&self) -> bool {
        matches!(self.storage, DatabaseStorage::Mmap(_))
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("size", &self.size())
            .field("mmap", &self.is_mmap())
            .field("metadata", &self.metadata)
            .field("start_from", &self.start_from)
            .finish()
    }
}
