// 代码保护
//
// 把词库命中的词条换成单个大写字母代码，让机器翻译无法破坏它们；
// 翻译完成后再把代码还原为目标语言词条。
//
// 代码字母表排除文本中已出现的大写字母，保证不会与正文冲突。

use regex::Regex;

use crate::dictionary::SubstitutionEntry;

/// 候选代码字母表（排除 A/D/E/H/I/K/O/Q/U 等易被翻译器吞掉的字母）
pub const CODE_ALPHABET: &str = "BCFGJLMNPRSTVWXYZ";

lazy_static::lazy_static! {
    /// 首字母大写的单词
    static ref CAPITALIZED_WORD: Regex = Regex::new(r"\b[A-Z]+[a-z]+\b").expect("正则无效");
    /// 非字母字符
    static ref NON_LETTER: Regex = Regex::new(r"[^A-Za-z]").expect("正则无效");
}

/// 不可数名词（复数形式不参与匹配）
const UNCOUNTABLE: [&str; 8] = [
    "aether", "gil", "fish", "sheep", "equipment", "information", "gear", "materia",
];

// ============================================================================
// 结果类型
// ============================================================================

/// 单个代码指派：一次文本修正内有效，不持久化
#[derive(Debug, Clone, PartialEq)]
pub struct CodeAssignment {
    /// 指派的单字母代码
    pub code: char,
    /// 命中的词库源词条
    pub original: String,
    /// 还原时使用的目标词条
    pub replacement: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProtectResult {
    pub text: String,
    pub table: Vec<CodeAssignment>,
}

// ============================================================================
// 保护与还原
// ============================================================================

/// 用未使用的代码字母替换文本中命中的词条
///
/// 词条按源字串长度降序匹配（多词词条先于其子串被保护）。
/// 字母表用尽后停止指派，剩余命中保持原样——这是可接受的近似。
pub fn protect(text: &str, entries: &[SubstitutionEntry]) -> ProtectResult {
    if text.is_empty() || entries.is_empty() {
        return ProtectResult {
            text: text.to_string(),
            table: Vec::new(),
        };
    }

    let mut alphabet = available_codes(text);
    let mut protected = text.to_string();
    let mut table = Vec::new();

    for entry in entries {
        if alphabet.is_empty() {
            break;
        }

        let Some(regex) = word_regex(&entry.source) else {
            continue;
        };

        if regex.is_match(&protected) {
            let code = alphabet.remove(0);
            protected = regex.replace_all(&protected, code.to_string()).into_owned();
            table.push(CodeAssignment {
                code,
                original: entry.source.clone(),
                replacement: entry.replacement.clone(),
            });
        }
    }

    ProtectResult {
        text: protected,
        table,
    }
}

/// 文本可用的代码字母
///
/// 首字母大写的词全词视为大写（专有名词常被翻译器保留原样），
/// 再剔除文本中出现的全部大写字母。
fn available_codes(text: &str) -> Vec<char> {
    let upper = CAPITALIZED_WORD
        .replace_all(text, |caps: &regex::Captures| caps[0].to_uppercase())
        .into_owned();

    CODE_ALPHABET
        .chars()
        .filter(|c| !upper.contains(*c))
        .collect()
}

/// 词条的整词匹配正则（含复数/形容词形式）
fn word_regex(source: &str) -> Option<Regex> {
    let base = regex::escape(source);
    let adjective = regex::escape(&adjective_form(source));

    let pattern = if UNCOUNTABLE.contains(&source.to_lowercase().as_str()) {
        format!(r"(?i)\b(?:{}|{})\b", base, adjective)
    } else {
        let plural = regex::escape(&plural_form(source));
        format!(r"(?i)\b(?:{}|{}|{})\b", plural, base, adjective)
    };

    Regex::new(&pattern).ok()
}

/// 翻译完成后还原代码
///
/// 代码不存在时是无操作（幂等）
pub fn restore(text: &str, table: &[CodeAssignment]) -> String {
    let mut result = text.to_string();
    for assignment in table {
        result = result.replace(assignment.code, &assignment.replacement);
    }
    result
}

/// 归一化译文中的代码字符
///
/// 翻译器有时会重复代码或在两侧加空格，统一收敛为单个大写代码
pub fn clear_code(text: &str, table: &[CodeAssignment]) -> String {
    let mut result = text.to_string();
    for assignment in table {
        let Ok(regex) = Regex::new(&format!(r"(?i)\s?{}+\s?", assignment.code)) else {
            continue;
        };
        result = regex
            .replace_all(&result, assignment.code.to_string())
            .into_owned();
    }
    result
}

/// 译文中丢失的代码（大小写不敏感的整词判定）
pub fn missing_codes(text: &str, table: &[CodeAssignment]) -> Vec<char> {
    table
        .iter()
        .filter_map(|assignment| {
            let regex = Regex::new(&format!(r"(?i)\b{}\b", assignment.code)).ok()?;
            (!regex.is_match(text)).then_some(assignment.code)
        })
        .collect()
}

/// 对丢失代码做尽力修补
///
/// 在现有代码串旁再复制一份，降低翻译器下次吞掉它的概率。
/// 这是启发式手段，不保证成功。
pub fn fix_code(text: &str, missing: &[char]) -> String {
    let mut result = text.to_string();
    for code in missing {
        let Ok(regex) = Regex::new(&format!(r"(?i)({}+)", code)) else {
            continue;
        };
        result = regex
            .replace_all(&result, format!("${{1}}{}", code))
            .into_owned();
    }
    result
}

/// 保护后是否还有需要翻译的内容
///
/// 去掉代码与非字母字符后为空时，可跳过引擎调用
pub fn can_skip_translation(text: &str, table: &[CodeAssignment]) -> bool {
    let mut remainder = text.to_string();
    for assignment in table {
        if let Ok(regex) = Regex::new(&format!(r"(?i){}", assignment.code)) {
            remainder = regex.replace_all(&remainder, "").into_owned();
        }
    }
    NON_LETTER.replace_all(&remainder, "").is_empty()
}

// ============================================================================
// 英文词形
// ============================================================================

/// 规则复数形式
pub fn plural_form(text: &str) -> String {
    let lower = text.to_lowercase();
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("sh")
        || lower.ends_with("ch")
    {
        format!("{}es", text)
    } else if lower.ends_with("fe") {
        format!("{}ves", &text[..text.len() - 2])
    } else if lower.ends_with('f') {
        format!("{}ves", &text[..text.len() - 1])
    } else if ends_with_consonant_then(text, 'y') {
        format!("{}ies", &text[..text.len() - 1])
    } else if ends_with_consonant_then(text, 'o') {
        format!("{}es", text)
    } else {
        format!("{}s", text)
    }
}

/// 形容词/种族形容形式（如 elezen -> elezenen 风格的词尾）
pub fn adjective_form(text: &str) -> String {
    let lower = text.to_lowercase();
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("sh")
        || lower.ends_with("ch")
    {
        format!("{}en", text)
    } else if lower.ends_with("fe") {
        format!("{}ven", &text[..text.len() - 2])
    } else if lower.ends_with('f') {
        format!("{}ven", &text[..text.len() - 1])
    } else if ends_with_consonant_then(text, 'y') {
        format!("{}ien", &text[..text.len() - 1])
    } else if matches!(lower.chars().last(), Some('a' | 'e' | 'i' | 'o' | 'u')) {
        format!("{}an", &text[..text.len() - 1])
    } else {
        format!("{}an", text)
    }
}

/// 词尾是“辅音 + 指定字母”
fn ends_with_consonant_then(text: &str, last: char) -> bool {
    let lower: Vec<char> = text.to_lowercase().chars().collect();
    let n = lower.len();
    if n < 2 || lower[n - 1] != last {
        return false;
    }
    !matches!(lower[n - 2], 'a' | 'e' | 'i' | 'o' | 'u')
}
