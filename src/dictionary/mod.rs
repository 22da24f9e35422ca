// Dictionary 模块 - 分层词库
//
// - entry: 条目、层级与合并算法
// - json: 容错的 JSON 数组读写
// - store: 按语言对载入、快照交换、暂存名持久化

pub mod entry;
pub mod json;
pub mod store;

pub use entry::{combine_with_temp, sort_entries, SubstitutionEntry, Tier};
pub use store::{DictionaryStore, Snapshot};
