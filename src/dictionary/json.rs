// 词库 JSON 读写
//
// 词库文件一律是 JSON 数组；损坏或类型错误的文件不致命：
// 记录日志、重置为空数组、按空表处理。

use anyhow::Result;
use std::path::Path;

/// 读取二维行数组（`[["src","rpl"], ...]`）
///
/// 文件缺失返回空表；损坏时重置为 `[]` 并返回空表
pub fn read_rows(path: &Path) -> Vec<Vec<String>> {
    if !path.exists() {
        return Vec::new();
    }

    match try_read_rows(path) {
        Ok(rows) => {
            tracing::debug!("读取 {:?} (条目数: {})", path, rows.len());
            rows
        }
        Err(e) => {
            tracing::warn!("读取 {:?} 失败，重置为空表: {}", path, e);
            let _ = write_array(path, &serde_json::json!([]));
            Vec::new()
        }
    }
}

fn try_read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;

    let rows = value
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("{:?} 不是数组", path))?;

    // 逐行提取字符串列，忽略形状错误的行
    Ok(rows
        .iter()
        .filter_map(|row| {
            let cols = row.as_array()?;
            let strings: Vec<String> = cols
                .iter()
                .filter_map(|c| c.as_str().map(|s| s.to_string()))
                .collect();
            (strings.len() >= 2).then_some(strings)
        })
        .collect())
}

/// 读取一维字符串数组（忽略规则等）
pub fn read_strings(path: &Path) -> Vec<String> {
    if !path.exists() {
        return Vec::new();
    }

    let result: Result<Vec<String>> = (|| {
        let content = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        let rows = value
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("{:?} 不是数组", path))?;
        Ok(rows
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .filter(|s| !s.is_empty() && s != "N/A" && !s.contains("//comment"))
            .collect())
    })();

    match result {
        Ok(list) => list,
        Err(e) => {
            tracing::warn!("读取 {:?} 失败，重置为空表: {}", path, e);
            let _ = write_array(path, &serde_json::json!([]));
            Vec::new()
        }
    }
}

/// 整体改写 JSON 数组（不做追加写）
pub fn write_array(path: &Path, value: &serde_json::Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(value)?;

    // 先写临时文件再改名，避免写一半的文件被当作词库读入
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, &content)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// 读取目录下全部词库文件并拼接（跳过 hidden.json）
pub fn read_dir_rows(dir: &Path) -> Vec<Vec<String>> {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<_> = read_dir
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension().map(|x| x == "json").unwrap_or(false)
                && p.file_name().map(|n| n != "hidden.json").unwrap_or(false)
        })
        .collect();
    files.sort();

    let mut rows = Vec::new();
    for file in files {
        rows.extend(read_rows(&file));
    }
    rows
}
