use std::fmt;
use std::str::FromStr;

use image::DynamicImage;
use image::imageops::FilterType;

use crate::error::FingerprintError;

/// 缩放后的宽度，每行比较 8 次
const HASH_WIDTH: u32 = 9;
const HASH_HEIGHT: u32 = 8;

/// 64 位差异哈希
///
/// 按行优先顺序排列，第一个比较结果位于最高位，因此十六进制表示的第一个字符对应第一行的前 4 次比较
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DHash(pub u64);

impl DHash {
    /// 固定为 16 个小写十六进制字符
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }

    pub fn distance(&self, other: &DHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Display for DHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseDHashError;

impl fmt::Display for ParseDHashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("指纹必须是 16 位十六进制字符串")
    }
}

impl std::error::Error for ParseDHashError {}

impl FromStr for DHash {
    type Err = ParseDHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // from_str_radix 接受前导的 `+`，这里需要逐字符检查
        if s.len() != 16 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseDHashError);
        }
        u64::from_str_radix(s, 16).map(DHash).map_err(|_| ParseDHashError)
    }
}

/// 解码图片数据并计算差异哈希
pub fn d_hash(data: &[u8]) -> Result<DHash, FingerprintError> {
    let image = image::load_from_memory(data)?;
    Ok(d_hash_image(&image))
}

/// 计算已解码图片的差异哈希
///
/// 1. 缩放到 9x8
/// 2. 转为灰度
/// 3. 每个像素与右侧像素比较，左侧严格更亮时记为 1
pub fn d_hash_image(image: &DynamicImage) -> DHash {
    let gray = image.resize_exact(HASH_WIDTH, HASH_HEIGHT, FilterType::Triangle).to_luma8();
    let data = gray.as_raw();
    debug_assert_eq!(data.len(), (HASH_WIDTH * HASH_HEIGHT) as usize);

    let mut hash = 0u64;
    for row in data.chunks_exact(HASH_WIDTH as usize) {
        for pair in row.windows(2) {
            hash <<= 1;
            hash |= (pair[0] > pair[1]) as u64;
        }
    }

    DHash(hash)
}
