//! # Manifest Parser / 清单解析器
//!
//! Reads the line-oriented test list. Each non-blank line that does not start
//! with `//` (after leading whitespace) is one test identifier, taken verbatim
//! after trimming. Identifiers are not validated; the runner decides what a
//! valid test is.
//!
//! 读取面向行的测试列表。每个非空且（去除前导空白后）不以 `//` 开头的行
//! 都是一个测试标识符，修剪后逐字采用。标识符不做校验；由运行器决定什么是有效的测试。

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::core::error::ManifestError;
use crate::core::models::TestId;

/// Marker that starts a comment line.
pub const COMMENT_MARKER: &str = "//";

/// How a single manifest line is interpreted.
/// 单个清单行的解释方式。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestLine<'a> {
    Comment,
    Blank,
    Entry(&'a str),
}

/// Classifies one raw line. Surrounding whitespace, including `\r` left over
/// from CRLF files, is not part of an entry.
pub fn classify_line(raw: &str) -> ManifestLine<'_> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        ManifestLine::Blank
    } else if trimmed.starts_with(COMMENT_MARKER) {
        ManifestLine::Comment
    } else {
        ManifestLine::Entry(trimmed)
    }
}

/// A lazy, single-pass sequence of test identifiers read from a manifest.
///
/// The reader is consumed as the iterator advances, so the sequence cannot be
/// restarted. The first read error ends the sequence.
///
/// 从清单读取的惰性、单次遍历的测试标识符序列。
/// 迭代器前进时会消耗读取器，因此序列无法重新开始。第一个读取错误会结束序列。
pub struct ManifestReader<R> {
    source: PathBuf,
    reader: R,
    line_no: usize,
    buf: String,
    failed: bool,
}

impl ManifestReader<BufReader<File>> {
    /// Opens a manifest file for reading.
    /// 打开清单文件以供读取。
    pub fn open(path: &Path) -> Result<Self, ManifestError> {
        let file = File::open(path).map_err(|source| ManifestError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path, BufReader::new(file)))
    }
}

impl<R: BufRead> ManifestReader<R> {
    /// Wraps any buffered reader. `source` is only used in error messages.
    pub fn new(source: impl Into<PathBuf>, reader: R) -> Self {
        Self {
            source: source.into(),
            reader,
            line_no: 0,
            buf: String::new(),
            failed: false,
        }
    }

    fn read_error(&self, source: io::Error) -> ManifestError {
        ManifestError::Read {
            path: self.source.clone(),
            line: self.line_no,
            source,
        }
    }
}

impl<R: BufRead> Iterator for ManifestReader<R> {
    type Item = Result<TestId, ManifestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            self.buf.clear();
            self.line_no += 1;
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    if let ManifestLine::Entry(id) = classify_line(&self.buf) {
                        return Some(Ok(TestId::new(id)));
                    }
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(self.read_error(e)));
                }
            }
        }
    }
}

/// Reads a whole manifest file into memory, preserving file order.
///
/// # Errors
/// Returns `ManifestError::Open` if the file cannot be opened and
/// `ManifestError::Read` if any line cannot be read (including invalid UTF-8).
pub fn parse_manifest(path: &Path) -> Result<Vec<TestId>, ManifestError> {
    ManifestReader::open(path)?.collect()
}
