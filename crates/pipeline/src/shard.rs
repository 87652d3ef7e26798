use crate::record::FileRecord;

/// A contiguous, capacity-bounded slice of the file list, uploaded into one
/// remote container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    /// Numbered sub-folder, or `None` when everything fits in one shard and
    /// files go directly under the remote root.
    pub folder: Option<String>,
    pub records: Vec<FileRecord>,
}

/// Split `records` into `ceil(len / capacity)` shards, preserving order.
///
/// A `capacity` of zero is treated as one.
pub fn shard(records: Vec<FileRecord>, capacity: usize) -> Vec<Shard> {
    let capacity = capacity.max(1);
    let count = records.len().div_ceil(capacity);
    let mut shards = Vec::with_capacity(count);
    let mut records = records.into_iter().peekable();
    while records.peek().is_some() {
        let index = shards.len();
        shards.push(Shard {
            folder: (count > 1).then(|| folder_name(index, count)),
            records: records.by_ref().take(capacity).collect(),
        });
    }
    shards
}

/// Zero-padded, one-based folder name of shard `index` out of `count`.
///
/// # Examples
///
/// ```
/// use ferry_pipeline::folder_name;
/// assert_eq!(folder_name(0, 3), "01");
/// assert_eq!(folder_name(9, 150), "010");
/// ```
pub fn folder_name(index: usize, count: usize) -> String {
    let width = count.to_string().len().max(2);
    format!("{:0width$}", index + 1)
}
