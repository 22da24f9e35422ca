// 词库仓库
//
// 按 (来源语言, 目标语言) 载入并合并各层级替换表，
// 对外暴露一份只读快照。重载时整体替换快照，
// 进行中的修正始终看到一致的数据。

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::dictionary::entry::{
    combine_with_temp, rows_to_entries, sort_entries, SubstitutionEntry, Tier,
};
use crate::dictionary::json;
use crate::types::Language;

// ============================================================================
// 快照
// ============================================================================

/// 一次载入产生的完整词库视图
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    /// 整句覆盖表（含 overwriteTemp 合并）
    pub overwrite: Vec<SubstitutionEntry>,
    /// 译后修正表
    pub after_translation: Vec<SubstitutionEntry>,
    /// 双语主词库
    pub main: Vec<SubstitutionEntry>,
    /// 玩家名表
    pub player: Vec<SubstitutionEntry>,
    /// 会话暂存表
    pub temp: Vec<SubstitutionEntry>,
    /// main/player/temp 的合并结果，修正时唯一使用的查找表
    pub combine: Vec<SubstitutionEntry>,
    /// 忽略规则（正则）
    pub ignore: Vec<String>,
    /// 保护前的字面替换表
    pub before_protect: Vec<SubstitutionEntry>,
    /// 保护后、翻译前的字面替换表
    pub after_protect: Vec<SubstitutionEntry>,
}

// ============================================================================
// 仓库
// ============================================================================

pub struct DictionaryStore {
    text_dir: PathBuf,
    temp_dir: PathBuf,
    snapshot: RwLock<Arc<Snapshot>>,
    /// 最近一次载入的语言对，重建 combine 时使用
    loaded: RwLock<Option<(Language, Language)>>,
}

impl DictionaryStore {
    pub fn new(text_dir: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            text_dir: text_dir.into(),
            temp_dir: temp_dir.into(),
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            loaded: RwLock::new(None),
        }
    }

    /// 当前快照（Arc 克隆，读取方全程一致）
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().expect("snapshot 锁中毒").clone()
    }

    /// 载入指定语言对的全部词库
    ///
    /// 任何单个文件损坏都按空表处理，不中断载入
    pub fn load(&self, from: Language, to: Language) -> Result<()> {
        let target_dir = self.text_dir.join(to.text_dir());
        let source_dir = self.text_dir.join(from.text_dir());

        // 整句覆盖：overwriteTemp 与覆盖目录合并
        let overwrite_temp = self.read_temp_entries("overwriteTemp.json");
        let overwrite_base = sort_entries(rows_to_entries(
            json::read_dir_rows(&target_dir.join(format!("overwrite-{}", from.text_dir()))),
            Tier::Overwrite,
        ));
        let overwrite = combine_with_temp(&overwrite_temp, &[&overwrite_base]);

        // 译后修正
        let after_translation = sort_entries(rows_to_entries(
            json::read_rows(&target_dir.join("afterTranslation.json")),
            Tier::AfterTranslation,
        ));

        // 主词库：多文件行 [ja, en, zht, zhs]，按语言对投影
        let main = self.read_main(from, to);

        // 玩家名与会话暂存
        let player = self.read_temp_entries_with_tier("player.json", Tier::Player);
        let temp = self.read_temp_entries("chTemp.json");

        let combine = combine_with_temp(&temp, &[&player, &main]);

        // 来源语言的修正表
        let ignore = json::read_strings(&source_dir.join("ignore.json"));
        let before_protect = sort_entries(rows_to_entries(
            json::read_rows(&source_dir.join("before.json")),
            Tier::Main,
        ));
        let after_protect = sort_entries(rows_to_entries(
            json::read_rows(&source_dir.join("after.json")),
            Tier::Main,
        ));

        tracing::info!(
            "词库载入完成 {:?} -> {:?}（main: {}, combine: {}, overwrite: {}）",
            from,
            to,
            main.len(),
            combine.len(),
            overwrite.len()
        );

        let snapshot = Snapshot {
            overwrite,
            after_translation,
            main,
            player,
            temp,
            combine,
            ignore,
            before_protect,
            after_protect,
        };

        *self.snapshot.write().expect("snapshot 锁中毒") = Arc::new(snapshot);
        *self.loaded.write().expect("loaded 锁中毒") = Some((from, to));
        Ok(())
    }

    fn read_main(&self, from: Language, to: Language) -> Vec<SubstitutionEntry> {
        let (Some(src_index), Some(dst_index)) = (from.main_index(), to.main_index()) else {
            return Vec::new();
        };

        let rows = json::read_dir_rows(&self.text_dir.join("main"));
        let projected: Vec<Vec<String>> = rows
            .into_iter()
            .filter_map(|row| {
                let source = row.get(src_index)?.clone();
                let replacement = row.get(dst_index)?.clone();
                Some(vec![source, replacement])
            })
            .collect();

        sort_entries(rows_to_entries(projected, Tier::Main))
    }

    fn read_temp_entries(&self, name: &str) -> Vec<SubstitutionEntry> {
        sort_entries(rows_to_entries(
            json::read_rows(&self.temp_dir.join(name)),
            Tier::Temp,
        ))
    }

    fn read_temp_entries_with_tier(&self, name: &str, tier: Tier) -> Vec<SubstitutionEntry> {
        sort_entries(rows_to_entries(
            json::read_rows(&self.temp_dir.join(name)),
            tier,
        ))
    }

    /// 把学到的名字写入会话暂存层并立即重建 combine
    ///
    /// 文件整体改写；之后开始的修正可见新名字
    pub fn save_temp_name(&self, source: &str, replacement: &str) -> Result<()> {
        if source == replacement || source.is_empty() {
            return Ok(());
        }

        let path = self.temp_dir.join("chTemp.json");

        // 重新读取文件而非使用内存快照，避免覆盖其他来源的写入
        let mut rows = json::read_rows(&path);

        // 过短的名字带 `#` 后缀登录，避免误伤子串
        let key = if source.chars().count() < 3 {
            format!("{}#", source)
        } else {
            source.to_string()
        };
        rows.push(vec![key, replacement.to_string(), "temp".to_string()]);

        json::write_array(
            &path,
            &serde_json::to_value(&rows).unwrap_or_else(|_| serde_json::json!([])),
        )?;

        // 重建快照中的 temp 与 combine
        let temp = self.read_temp_entries("chTemp.json");
        let mut snapshot = (*self.snapshot()).clone();
        snapshot.combine = combine_with_temp(&temp, &[&snapshot.player, &snapshot.main]);
        snapshot.temp = temp;
        *self.snapshot.write().expect("snapshot 锁中毒") = Arc::new(snapshot);

        tracing::info!("学到新名字: {} -> {}", source, replacement);
        Ok(())
    }

    pub fn text_dir(&self) -> &Path {
        &self.text_dir
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }
}
