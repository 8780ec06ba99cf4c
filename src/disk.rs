use crate::storage::Storage;
use crate::{Timestamp, Value};
use byteorder::{BigEndian, ReadBytesExt};
use fjall::{PartitionCreateOptions, TxKeyspace, TxPartition};
use std::path::Path;
use std::sync::RwLock;

// Flip the sign bit so the big-endian byte order matches numeric order
// for signed bucket timestamps.
#[allow(clippy::cast_sign_loss)]
fn encode_key(bucket: Timestamp) -> [u8; 8] {
    ((bucket as u64) ^ (1 << 63)).to_be_bytes()
}

#[allow(clippy::cast_possible_wrap)]
fn decode_key(bytes: &[u8]) -> Timestamp {
    let mut reader = bytes;
    let raw = reader.read_u64::<BigEndian>().expect("should deserialize");
    (raw ^ (1 << 63)) as Timestamp
}

fn decode_value(bytes: &[u8]) -> Value {
    let mut reader = bytes;
    reader.read_i64::<BigEndian>().expect("should deserialize")
}

/// Persistent storage backend built on an embedded LSM keyspace.
///
/// Every counter gets its own partition (`ctr#<name>`), keyed by the bucket
/// timestamp in order-preserving big-endian encoding. `add` is a
/// read-modify-write inside a single-writer transaction, so concurrent
/// increments to the same bucket are serialized and never lost.
pub struct DiskStorage {
    keyspace: TxKeyspace,
    partitions: RwLock<crate::HashMap<String, TxPartition>>,
}

impl DiskStorage {
    /// Opens or recovers a keyspace at the given path.
    ///
    /// # Errors
    ///
    /// Returns error if an I/O error occurred.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let keyspace = fjall::Config::new(path).open_transactional()?;
        Ok(Self::from_keyspace(keyspace))
    }

    /// Uses an existing `fjall` keyspace.
    ///
    /// Counter partitions are prefixed with `ctr#` to avoid name clashes with
    /// other applications.
    #[must_use]
    pub fn from_keyspace(keyspace: TxKeyspace) -> Self {
        Self {
            keyspace,
            partitions: RwLock::default(),
        }
    }

    fn partition(&self, counter: &str) -> crate::Result<TxPartition> {
        if let Some(partition) = self
            .partitions
            .read()
            .expect("lock is poisoned")
            .get(counter)
        {
            return Ok(partition.clone());
        }

        let mut lock = self.partitions.write().expect("lock is poisoned");

        if let Some(partition) = lock.get(counter) {
            return Ok(partition.clone());
        }

        log::trace!("creating partition for counter {counter:?}");

        let opts = PartitionCreateOptions::default()
            .block_size(4_096)
            .compression(fjall::CompressionType::Lz4);

        // partition names cannot contain dots; '$' is not a valid counter
        // name character, so the mapping stays injective
        let partition_name = format!("ctr#{}", counter.replace('.', "$"));

        let partition = self.keyspace.open_partition(&partition_name, opts)?;
        lock.insert(counter.to_string(), partition.clone());

        Ok(partition)
    }
}

impl Storage for DiskStorage {
    fn get(&self, counter: &str, bucket: Timestamp) -> crate::Result<Option<Value>> {
        let partition = self.partition(counter)?;

        Ok(partition
            .get(encode_key(bucket))?
            .map(|bytes| decode_value(&bytes)))
    }

    fn add(&self, counter: &str, bucket: Timestamp, delta: Value) -> crate::Result<()> {
        let partition = self.partition(counter)?;
        let key = encode_key(bucket);

        let mut tx = self.keyspace.write_tx();

        let current = tx
            .get(&partition, key)?
            .map(|bytes| decode_value(&bytes))
            .unwrap_or_default();

        tx.insert(&partition, key, (current + delta).to_be_bytes());
        tx.commit()?;

        Ok(())
    }

    fn set(&self, counter: &str, bucket: Timestamp, value: Value) -> crate::Result<()> {
        let partition = self.partition(counter)?;

        let mut tx = self.keyspace.write_tx();
        tx.insert(&partition, encode_key(bucket), value.to_be_bytes());
        tx.commit()?;

        Ok(())
    }

    fn get_range(
        &self,
        counter: &str,
        buckets: &[Timestamp],
    ) -> crate::Result<crate::HashMap<Timestamp, Value>> {
        let mut map =
            crate::HashMap::with_capacity_and_hasher(buckets.len(), rustc_hash::FxBuildHasher);

        let (Some(&first), Some(&last)) = (buckets.first(), buckets.last()) else {
            return Ok(map);
        };

        let partition = self.partition(counter)?;

        // one scan over the requested window instead of a point read per bucket
        for kv in partition
            .inner()
            .range(encode_key(first)..=encode_key(last))
        {
            let (key, value) = kv?;
            let bucket = decode_key(&key);

            if buckets.binary_search(&bucket).is_ok() {
                map.insert(bucket, decode_value(&value));
            }
        }

        Ok(map)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test_log::test]
    fn key_encoding_preserves_order() {
        let mut timestamps = vec![-2_000, -1, 0, 1_000, i64::from(u32::MAX)];
        timestamps.sort_unstable();

        let mut keys = timestamps.iter().map(|&t| encode_key(t)).collect::<Vec<_>>();
        keys.sort_unstable();

        assert_eq!(
            timestamps,
            keys.iter().map(|k| decode_key(k)).collect::<Vec<_>>(),
        );
    }

    #[test_log::test]
    fn add_and_get() -> crate::Result<()> {
        let path = tempfile::tempdir()?;
        let storage = DiskStorage::open(&path)?;

        assert_eq!(None, storage.get("a", 1_000)?);

        storage.add("a", 1_000, 2)?;
        storage.add("a", 1_000, 3)?;

        assert_eq!(Some(5), storage.get("a", 1_000)?);
        assert_eq!(None, storage.get("b", 1_000)?);

        Ok(())
    }

    #[test_log::test]
    fn set_overwrites() -> crate::Result<()> {
        let path = tempfile::tempdir()?;
        let storage = DiskStorage::open(&path)?;

        storage.add("page.views", 1_000, 2)?;
        storage.set("page.views", 1_000, -7)?;

        assert_eq!(Some(-7), storage.get("page.views", 1_000)?);

        Ok(())
    }

    #[test_log::test]
    fn get_range_scans_requested_buckets_only() -> crate::Result<()> {
        let path = tempfile::tempdir()?;
        let storage = DiskStorage::open(&path)?;

        for bucket in [0, 1_000, 2_000, 3_000] {
            storage.add("a", bucket, bucket + 1)?;
        }

        let map = storage.get_range("a", &[1_000, 2_000])?;

        assert_eq!(2, map.len());
        assert_eq!(Some(&1_001), map.get(&1_000));
        assert_eq!(Some(&2_001), map.get(&2_000));

        Ok(())
    }
}
