// 文本修正工具
//
// 字面替换、标点整理、千分位数值保护、忽略规则匹配。
// 全部是纯函数，规则集中在预编译正则里。

use regex::Regex;

use crate::dictionary::SubstitutionEntry;

lazy_static::lazy_static! {
    /// 全角括号及其内容
    static ref FULLWIDTH_PAREN: Regex = Regex::new(r"（.*?）").expect("正则无效");
    /// 半角括号及其内容
    static ref HALFWIDTH_PAREN: Regex = Regex::new(r"\(.*?\)").expect("正则无效");
    /// 「 开头却以 「 收尾的引用
    static ref QUOTE_OPEN_OPEN: Regex = Regex::new(r"「([^」]*?)「").expect("正则无效");
    /// 」 开头的错配引用
    static ref QUOTE_CLOSE_CLOSE: Regex = Regex::new(r"」([^「]*?)」").expect("正则无效");
    /// 直引号
    static ref DOUBLE_QUOTE: Regex = Regex::new(r#""(.*?)""#).expect("正则无效");
    static ref SINGLE_QUOTE: Regex = Regex::new(r"'(.*?)'").expect("正则无效");
    /// 非数字字符之间的句点 / 中点
    static ref STRAY_PERIOD: Regex = Regex::new(r"([^.0-9])\.([^.0-9])").expect("正则无效");
    static ref STRAY_MIDDLE_DOT: Regex = Regex::new(r"([^.0-9])·([^.0-9])").expect("正则无效");
    /// 含千分位分隔符的数值
    static ref THOUSANDS_VALUE: Regex = Regex::new(r"\d+(?:,\d{3})+(?:\.\d+)?").expect("正则无效");
}

// ============================================================================
// 字面替换
// ============================================================================

/// 按词库做字面替换（最长匹配优先，大小写不敏感）
pub fn replace_text(text: &str, entries: &[SubstitutionEntry]) -> String {
    if text.is_empty() || entries.is_empty() {
        return text.to_string();
    }

    let mut result = text.to_string();
    for entry in entries {
        if entry.source.is_empty() {
            continue;
        }
        let Ok(regex) = Regex::new(&format!("(?i){}", regex::escape(&entry.source))) else {
            continue;
        };
        if regex.is_match(&result) {
            result = regex
                .replace_all(&result, regex::NoExpand(&entry.replacement))
                .into_owned();
        }
    }
    result
}

/// 文本是否与某个词条源字串完全一致（忽略大小写与首尾空白）
pub fn same_as_entry<'a>(
    text: &str,
    entries: &'a [SubstitutionEntry],
) -> Option<&'a SubstitutionEntry> {
    let normalized = text.trim();
    entries
        .iter()
        .find(|entry| entry.source.eq_ignore_ascii_case(normalized))
}

// ============================================================================
// 忽略规则
// ============================================================================

/// 文本是否命中任一忽略规则（规则本身是正则，大小写不敏感）
pub fn can_ignore(text: &str, patterns: &[String]) -> bool {
    if text.is_empty() {
        return false;
    }

    patterns.iter().any(|pattern| {
        match Regex::new(&format!("(?i){}", pattern)) {
            Ok(regex) => regex.is_match(text),
            Err(e) => {
                // 无效规则跳过，不影响其余规则
                tracing::debug!("忽略规则无效 {:?}: {}", pattern, e);
                false
            }
        }
    })
}

// ============================================================================
// 标点整理
// ============================================================================

/// 标点修正
///
/// 译前：去除全角/半角括号的旁白。
/// 译后（`is_translated`）：统一错配引号为「」，
/// 把非数字字符之间的句点/中点换成全角中点（保留小数点与省略号）。
pub fn mark_fix(text: &str, is_translated: bool) -> String {
    let mut result = FULLWIDTH_PAREN.replace_all(text, "").into_owned();
    result = HALFWIDTH_PAREN.replace_all(&result, "").into_owned();

    if is_translated {
        result = QUOTE_OPEN_OPEN.replace_all(&result, "「$1」").into_owned();
        result = QUOTE_CLOSE_CLOSE.replace_all(&result, "「$1」").into_owned();
        result = DOUBLE_QUOTE.replace_all(&result, "「$1」").into_owned();
        result = SINGLE_QUOTE.replace_all(&result, "「$1」").into_owned();
        result = STRAY_PERIOD.replace_all(&result, "$1・$2").into_owned();
        result = STRAY_MIDDLE_DOT.replace_all(&result, "$1・$2").into_owned();
    }

    result
}

// ============================================================================
// 数值保护
// ============================================================================

/// 数值修正表：`(去分隔符形式, 原始形式)`
pub type ValueTable = Vec<(String, String)>;

/// 译前去掉千分位分隔符并记录原始形式
///
/// 翻译器经常把 `1,234` 断成两个数字或改写分隔符；
/// 先换成 `1234`，译后按表精确还原。
pub fn value_fix_before(text: &str) -> (String, ValueTable) {
    let mut result = text.to_string();
    let mut table: ValueTable = Vec::new();

    for m in THOUSANDS_VALUE.find_iter(text) {
        let original = m.as_str().to_string();
        let stripped = original.replace(',', "");
        if !table.iter().any(|(s, _)| s == &stripped) {
            result = result.replace(&original, &stripped);
            table.push((stripped, original));
        }
    }

    // 较长的数值先还原，避免子串误替换
    table.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    (result, table)
}

/// 译后还原数值格式
pub fn value_fix_after(text: &str, table: &ValueTable) -> String {
    let mut result = text.to_string();
    for (stripped, original) in table {
        result = result.replace(stripped, original);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Tier;

    fn entry(src: &str, rpl: &str) -> SubstitutionEntry {
        SubstitutionEntry::new(src, rpl, Tier::Main)
    }

    #[test]
    fn test_replace_text_longest_first() {
        // 排序后的表：abc 必须先于 ab 被整体替换
        let entries = crate::dictionary::sort_entries(vec![
            entry("ab", "二"),
            entry("abc", "三"),
        ]);
        assert_eq!(replace_text("xabcx", &entries), "x三x");
    }

    #[test]
    fn test_replace_text_case_insensitive() {
        let entries = vec![entry("alphinaud", "阿爾菲諾")];
        assert_eq!(replace_text("ALPHINAUD said", &entries), "阿爾菲諾 said");
    }

    #[test]
    fn test_same_as_entry() {
        let entries = vec![entry("You sense aether.", "你感觉到了以太。")];
        assert!(same_as_entry("you sense aether.", &entries).is_some());
        assert!(same_as_entry("  You sense aether.  ", &entries).is_some());
        assert!(same_as_entry("You sense aether", &entries).is_none());
    }

    #[test]
    fn test_can_ignore() {
        let patterns = vec!["^Welcome to".to_string(), "engaged".to_string()];
        assert!(can_ignore("welcome to Eorzea", &patterns));
        assert!(!can_ignore("goodbye", &patterns));
        // 无效规则不致命
        assert!(!can_ignore("text", &vec!["(".to_string()]));
    }

    #[test]
    fn test_mark_fix_strips_parentheticals() {
        assert_eq!(mark_fix("台词（小声）继续", false), "台词继续");
        assert_eq!(mark_fix("line (whisper) goes", false), "line  goes");
    }

    #[test]
    fn test_mark_fix_quote_pairs() {
        assert_eq!(mark_fix("「你好「", true), "「你好」");
        assert_eq!(mark_fix("」你好」", true), "「你好」");
        assert_eq!(mark_fix("\"你好\"", true), "「你好」");
        assert_eq!(mark_fix("'你好'", true), "「你好」");
    }

    #[test]
    fn test_mark_fix_interpunct() {
        // 非数字之间的句点换成全角中点
        assert_eq!(mark_fix("菈菈.菲尔", true), "菈菈・菲尔");
        assert_eq!(mark_fix("菈菈·菲尔", true), "菈菈・菲尔");
        // 小数点保留
        assert_eq!(mark_fix("伤害 1.5 倍", true), "伤害 1.5 倍");
        // 连续省略号保留
        assert_eq!(mark_fix("等等...好吧", true), "等等...好吧");
    }

    #[test]
    fn test_value_fix_roundtrip() {
        let (text, table) = value_fix_before("You gained 1,234 gil.");
        assert_eq!(text, "You gained 1234 gil.");
        assert_eq!(table, vec![("1234".to_string(), "1,234".to_string())]);

        let restored = value_fix_after("你获得了 1234 金币。", &table);
        assert_eq!(restored, "你获得了 1,234 金币。");
    }

    #[test]
    fn test_value_fix_multiple_values() {
        let (text, table) = value_fix_before("paid 1,000 of 12,345,678 gil");
        assert_eq!(text, "paid 1000 of 12345678 gil");
        assert_eq!(table.len(), 2);
        // 长数值排在前面
        assert_eq!(table[0].0, "12345678");
    }

    #[test]
    fn test_value_fix_plain_numbers_untouched() {
        let (text, table) = value_fix_before("gained 42 gil");
        assert_eq!(text, "gained 42 gil");
        assert!(table.is_empty());
    }
}
