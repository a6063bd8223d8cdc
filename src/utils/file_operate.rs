use std::{
    fs::{File, OpenOptions},
    io::{Read, Write},
    path::Path,
};

use anyhow::{Context, Result};
use log::{debug, error};

pub fn check_read_simple<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists() && path.as_ref().is_file()
}

/// 读取文件内容，最多 max_len 字节
pub fn read_file<P: AsRef<Path>>(path: P, max_len: usize) -> Result<String> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open file for reading: {}", path_ref.display()))?;

    let mut content = String::with_capacity(max_len);
    file.take(max_len as u64)
        .read_to_string(&mut content)
        .with_context(|| format!("Failed to read from file: {}", path_ref.display()))?;

    Ok(content)
}

/// 读取 sysfs 节点里的一个整数
pub fn read_u64<P: AsRef<Path>>(path: P) -> Result<u64> {
    let path_ref = path.as_ref();
    let content = read_file(path_ref, 32)?;
    content
        .trim()
        .parse::<u64>()
        .with_context(|| format!("Failed to parse integer from {}", path_ref.display()))
}

pub fn write_file<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, content: C) -> Result<usize> {
    let path_ref = path.as_ref();

    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path_ref)
        .with_context(|| format!("Failed to open file for writing: {}", path_ref.display()))?;

    let bytes_written = file
        .write(content.as_ref())
        .with_context(|| format!("Failed to write to file: {}", path_ref.display()))?;

    Ok(bytes_written)
}

/// 安全地写入 sysfs 节点，节点不存在或写失败时记录但不中断程序
///
/// 下线的簇、不存在的 devfreq 节点都会走这条路径。
pub fn write_file_safe<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, content: C) -> Result<usize> {
    let path_ref = path.as_ref();

    if !path_ref.exists() {
        debug!("文件不存在，跳过写入: {}", path_ref.display());
        return Ok(0);
    }

    match write_file(path_ref, content) {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            error!(
                "写入文件失败，但继续执行: {} - 错误: {}",
                path_ref.display(),
                e
            );
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn read_u64_parses_sysfs_style_value() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "300000").unwrap();
        assert_eq!(read_u64(f.path()).unwrap(), 300000);
    }

    #[test]
    fn read_file_enforces_length_bound() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&[b'7'; 512]).unwrap();
        let content = read_file(f.path(), 16).unwrap();
        assert_eq!(content.len(), 16);
    }

    #[test]
    fn write_file_safe_skips_missing_node() {
        let bytes = write_file_safe("/nonexistent/sysfs/node", "1").unwrap();
        assert_eq!(bytes, 0);
    }

    #[test]
    fn write_then_read_roundtrip() {
        let f = tempfile::NamedTempFile::new().unwrap();
        write_file_safe(f.path(), "768000").unwrap();
        assert_eq!(read_u64(f.path()).unwrap(), 768000);
    }
}
