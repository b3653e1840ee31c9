//! ID 生成工具
//!
//! - 采购批次 ID：14 位 base62，前段为 2014-01-01 以来的纳秒数，后 4 位随机
//! - 运行 ID：`<文件名>_<时间戳>_<采购批次 ID>`

use chrono::{DateTime, Local, Utc};
use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;

const BASE62_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const MAX_RANDOM_INT_CEIL: i64 = 9_999_999_999_999;
const EXPECTED_ID_SIZE: usize = 14;
/// 2014-01-01 00:00:00 UTC，单位纳秒
const FIRST_JAN_2014_EPOCH_NANOS: i64 = 1_388_534_400 * 1_000_000_000;

/// base62 编码
pub fn base62_encode(mut num: i64) -> String {
    if num <= 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while num > 0 {
        out.push(BASE62_CHARS[(num % 62) as usize]);
        num /= 62;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// 生成采购批次 ID
pub fn generate_procurement_id() -> String {
    let random = rand::thread_rng().gen_range(0..MAX_RANDOM_INT_CEIL);
    procurement_id_at(Utc::now(), random)
}

/// 按给定时间和随机数生成采购批次 ID
pub fn procurement_id_at(now: DateTime<Utc>, random: i64) -> String {
    let nanos = now
        .timestamp_nanos_opt()
        .unwrap_or(i64::MAX)
        .saturating_sub(FIRST_JAN_2014_EPOCH_NANOS);

    let random_part = base62_encode(random);
    let random_part = if random_part.len() > 4 {
        random_part[random_part.len() - 4..].to_string()
    } else {
        format!("{:0>4}", random_part)
    };

    let id = format!("{}{}", base62_encode(nanos), random_part);

    if id.len() < EXPECTED_ID_SIZE {
        format!("{:0>width$}", id, width = EXPECTED_ID_SIZE)
    } else {
        id[id.len() - EXPECTED_ID_SIZE..].to_string()
    }
}

fn unsafe_chars() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").ok()).as_ref()
}

/// 生成运行 ID
///
/// 时间戳只精确到秒，同一秒内上传同名文件靠后缀区分
///
/// # 参数
/// - `file_stem`: 上传文件名（不含扩展名）
/// - `now`: 本地时间
/// - `suffix`: 唯一后缀（采购批次 ID）
pub fn generate_run_id(file_stem: &str, now: DateTime<Local>, suffix: &str) -> String {
    let cleaned = match unsafe_chars() {
        Some(re) => re.replace_all(file_stem.trim(), "_").into_owned(),
        None => file_stem.trim().to_string(),
    };
    let cleaned = if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    };
    format!("{}_{}_{}", cleaned, now.format("%Y-%m-%dT%H-%M-%S"), suffix)
}
