use serde::Serialize;

/// 指纹的十六进制长度
pub const HEX_LEN: usize = 16;

/// 0x0 ~ 0xf 中置位的数量
const NIBBLE_POPCOUNT: [u8; 16] = [0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4];

#[inline(always)]
fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// 计算两个十六进制指纹的汉明距离
///
/// 任意一方长度不是 16 或含有非十六进制字符时返回 `None`，表示两者不可比较
pub fn hamming_hex(a: &str, b: &str) -> Option<u32> {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != HEX_LEN || b.len() != HEX_LEN {
        return None;
    }
    let mut sum = 0;
    for (&x, &y) in a.iter().zip(b) {
        sum += NIBBLE_POPCOUNT[(nibble(x)? ^ nibble(y)?) as usize] as u32;
    }
    Some(sum)
}

/// 同 [`hamming_hex`]，但允许指纹缺失
#[inline]
pub fn hamming_opt(a: Option<&str>, b: Option<&str>) -> Option<u32> {
    hamming_hex(a?, b?)
}

/// 一条排序结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Neighbor<I> {
    pub id: I,
    pub distance: u32,
}

/// 相似度排序器
///
/// 输入查询指纹和候选列表，输出距离最近的 k 个候选。
/// 目前只有线性扫描的实现，商品数量上去之后可以换成 BK 树之类的索引
pub trait Ranker {
    fn rank<'a, I, T>(&self, query: &str, candidates: T, k: usize) -> Vec<Neighbor<I>>
    where
        T: IntoIterator<Item = (I, Option<&'a str>)>;
}

/// 逐个计算距离后排序
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearScan;

impl Ranker for LinearScan {
    fn rank<'a, I, T>(&self, query: &str, candidates: T, k: usize) -> Vec<Neighbor<I>>
    where
        T: IntoIterator<Item = (I, Option<&'a str>)>,
    {
        let mut result = candidates
            .into_iter()
            .filter_map(|(id, fingerprint)| {
                hamming_opt(Some(query), fingerprint).map(|distance| Neighbor { id, distance })
            })
            .collect::<Vec<_>>();
        // NOTE: 必须是稳定排序，距离相同的候选保持输入顺序
        result.sort_by_key(|n| n.distance);
        result.truncate(k);
        result
    }
}
