//! Append-only record of every hardware address seen so far.
//!
//! One line per host, `<hw> <ipv4>`, hardware address in canonical form:
//!
//! ```text
//! 00:11:22:33:44:55 192.168.1.17
//! 90:11:95:3e:cf:5d 192.168.1.106
//! ```

use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use crate::{
    address::{canonical_hw_addr, parse_proto_addr},
    error::{Error, Result},
};

pub struct Store {
    path: PathBuf,
    // Guards the file, not any in-memory state. Lookups share it, writers hold it alone.
    lock: RwLock<()>,
}

impl Store {
    /// Opens the store at `path`, creating an empty one if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        Self::open_for_append(&path)?;
        log::debug!("store ready at {}", path.display());
        Ok(Self { path, lock: RwLock::new(()) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `hw_addr` has been recorded, in any of its spellings.
    ///
    /// Linear scan of the whole file under the shared lock.
    pub fn exists(&self, hw_addr: &str) -> Result<bool> {
        let mac = canonical_hw_addr(hw_addr)?;

        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        let f = File::open(&self.path).map_err(|e| Error::store_io(&self.path, e))?;
        for line in BufReader::new(f).lines() {
            let line = line.map_err(|e| Error::store_io(&self.path, e))?;
            if line.split(' ').next() == Some(mac.as_str()) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Appends one record. Callers check [`Store::exists`] first; this does not.
    pub fn add(&self, hw_addr: &str, proto_addr: &str) -> Result<()> {
        let mac = canonical_hw_addr(hw_addr)?;
        let ip = parse_proto_addr(proto_addr)?;
        let record = format!("{} {}\n", mac, ip);

        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        let mut f = Self::open_for_append(&self.path)?;
        // a single write so a record is never split across concurrent appends
        f.write_all(record.as_bytes()).map_err(|e| Error::store_io(&self.path, e))?;
        Ok(())
    }

    /// Drops every record.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| Error::store_io(&self.path, e))?;
        log::info!("store {} cleared", self.path.display());
        Ok(())
    }

    fn open_for_append(path: &Path) -> Result<File> {
        OpenOptions::new().create(true).append(true).open(path).map_err(|e| Error::store_io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(store: &Store) -> Vec<String> {
        std::fs::read_to_string(store.path()).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn open_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arpwatch.db");
        let store = Store::open(&path).unwrap();
        assert!(path.exists());
        assert!(records(&store).is_empty());
    }

    #[test]
    fn open_fails_in_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = Store::open(dir.path().join("nope").join("arpwatch.db")).err().unwrap();
        assert!(matches!(err, Error::StoreIo { .. }));
    }

    #[test]
    fn open_keeps_existing_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arpwatch.db");
        Store::open(&path).unwrap().add("00:11:22:33:44:55", "1.2.3.4").unwrap();

        let reopened = Store::open(&path).unwrap();
        assert!(reopened.exists("00:11:22:33:44:55").unwrap());
        assert_eq!(records(&reopened), vec!["00:11:22:33:44:55 1.2.3.4"]);
    }

    #[test]
    fn add_writes_canonical_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("arpwatch.db")).unwrap();
        store.add("AA-BB-CC-DD-EE-FF", "10.0.0.1").unwrap();
        assert_eq!(records(&store), vec!["aa:bb:cc:dd:ee:ff 10.0.0.1"]);
    }

    #[test]
    fn exists_matches_only_hw_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("arpwatch.db")).unwrap();
        store.add("00:11:22:33:44:55", "1.2.3.4").unwrap();
        assert!(!store.exists("00:11:22:33:44:56").unwrap());
        assert!(!store.exists("01:02:03:04:00:11").unwrap());
    }
}
