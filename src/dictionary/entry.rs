// 词库条目
//
// 条目在文件中是 `[source, replacement]` 或 `[source, replacement, tier]`
// 形式的数组；载入后统一为 SubstitutionEntry。

use serde::{Deserialize, Serialize};

// ============================================================================
// 层级
// ============================================================================

/// 词库层级（优先级类别）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Tier {
    /// 整句覆盖，最高优先级
    #[serde(rename = "overwrite")]
    Overwrite,
    /// 译后修正
    #[serde(rename = "afterTranslation")]
    AfterTranslation,
    /// 双语主词库
    #[default]
    #[serde(rename = "main")]
    Main,
    /// 运行期注册的玩家/雇员名
    #[serde(rename = "player")]
    Player,
    /// 本次会话学到的名字，被更高层级收录后自动淘汰
    #[serde(rename = "temp")]
    Temp,
    /// 会话学到的 NPC 名，任一基础层级收录后淘汰
    #[serde(rename = "temp-npc")]
    TempNpc,
}

impl Tier {
    /// 是否为会话暂存层级
    pub fn is_temp(&self) -> bool {
        matches!(self, Tier::Temp | Tier::TempNpc)
    }
}

// ============================================================================
// 条目
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionEntry {
    pub source: String,
    pub replacement: String,
    #[serde(default)]
    pub tier: Tier,
}

impl SubstitutionEntry {
    pub fn new(source: &str, replacement: &str, tier: Tier) -> Self {
        Self {
            source: source.to_string(),
            replacement: replacement.to_string(),
            tier,
        }
    }

    /// 源字串长度（按字符计）
    pub fn source_len(&self) -> usize {
        self.source.chars().count()
    }
}

/// 行数据转换为条目
///
/// 过滤 `//comment`、`N/A` 与空白的注释哨兵行
pub fn rows_to_entries(rows: Vec<Vec<String>>, tier: Tier) -> Vec<SubstitutionEntry> {
    rows.into_iter()
        .filter_map(|row| {
            let source = row.first()?.clone();
            let replacement = row.get(1)?.clone();
            if is_filtered(&source) || is_filtered_replacement(&replacement) {
                return None;
            }
            // 第三列可指定层级（temp / temp-npc 等）
            let tier = row
                .get(2)
                .and_then(|t| serde_json::from_value(serde_json::Value::String(t.clone())).ok())
                .unwrap_or(tier);
            Some(SubstitutionEntry {
                source,
                replacement,
                tier,
            })
        })
        .collect()
}

fn is_filtered(text: &str) -> bool {
    text.is_empty() || text == "N/A" || text.contains("//comment")
}

fn is_filtered_replacement(text: &str) -> bool {
    text == "N/A" || text.contains("//comment")
}

/// 按源字串长度降序排序（最长匹配优先）
pub fn sort_entries(mut entries: Vec<SubstitutionEntry>) -> Vec<SubstitutionEntry> {
    entries.sort_by(|a, b| b.source_len().cmp(&a.source_len()));
    entries
}

// ============================================================================
// 合并
// ============================================================================

/// 带暂存层的词库合并
///
/// 暂存条目与基础条目按键比对（精确，或基础键带 `#`/`##` 消歧后缀）：
/// - temp / temp-npc 条目已被任一基础条目收录时，暂存侧淘汰；
/// - 其余暂存条目（如 player）命中时淘汰基础侧；
/// - 未命中时两侧都保留。
///
/// 结果再次按最长匹配优先排序，重复合并是幂等的。
pub fn combine_with_temp(
    temp: &[SubstitutionEntry],
    bases: &[&[SubstitutionEntry]],
) -> Vec<SubstitutionEntry> {
    let mut combine: Vec<SubstitutionEntry> = bases.iter().flat_map(|b| b.iter().cloned()).collect();
    let mut kept_temp: Vec<SubstitutionEntry> = Vec::new();

    for temp_entry in temp {
        let matched = combine
            .iter()
            .position(|base| key_matches(&base.source, &temp_entry.source));

        match matched {
            Some(index) => {
                if temp_entry.tier.is_temp() {
                    // 暂存条目已被基础层收录，自动淘汰
                } else {
                    // 暂存侧优先，移除基础条目
                    combine.remove(index);
                    kept_temp.push(temp_entry.clone());
                }
            }
            None => kept_temp.push(temp_entry.clone()),
        }
    }

    kept_temp.extend(combine);
    sort_entries(kept_temp)
}

/// 基础键是否覆盖暂存键（精确或 `#`/`##` 后缀）
fn key_matches(base_key: &str, temp_key: &str) -> bool {
    base_key == temp_key
        || base_key.strip_suffix("##") == Some(temp_key)
        || base_key.strip_suffix('#') == Some(temp_key)
}
