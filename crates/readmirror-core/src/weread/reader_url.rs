//! Web reader links.
//!
//! The reader addresses items by an obfuscated id derived from the book id
//! with MD5 and a hex re-encoding of the id itself.

use md5::{Digest, Md5};

const READER_BASE: &str = "https://weread.qq.com/web/reader/";
const MIN_BODY_LEN: usize = 20;

/// Reader URL for a book id.
pub fn reader_url(book_id: &str) -> String {
    format!("{}{}", READER_BASE, encode_book_id(book_id))
}

/// Obfuscated reader id for a book id.
pub fn encode_book_id(book_id: &str) -> String {
    let digest = md5_hex(book_id);
    let (code, parts) = transform_id(book_id);

    let mut result = String::with_capacity(32);
    result.push_str(&digest[..3]);
    result.push_str(code);
    result.push('2');
    result.push_str(&digest[digest.len() - 2..]);

    let encoded: Vec<String> = parts
        .iter()
        .map(|part| format!("{:02x}{}", part.len(), part))
        .collect();
    result.push_str(&encoded.join("g"));

    if result.len() < MIN_BODY_LEN {
        let missing = MIN_BODY_LEN - result.len();
        result.push_str(&digest[..missing]);
    }

    let checksum = md5_hex(&result);
    result.push_str(&checksum[..3]);
    result
}

/// Numeric ids are split into 9-digit groups rendered in hex; anything else
/// is rendered as the hex code points of its characters.
fn transform_id(book_id: &str) -> (&'static str, Vec<String>) {
    if book_id.bytes().all(|b| b.is_ascii_digit()) {
        let parts = book_id
            .as_bytes()
            .chunks(9)
            .map(|chunk| {
                let value = chunk
                    .iter()
                    .fold(0u64, |acc, digit| acc * 10 + u64::from(digit - b'0'));
                format!("{:x}", value)
            })
            .collect();
        return ("3", parts);
    }

    let hex: String = book_id
        .chars()
        .map(|c| format!("{:x}", u32::from(c)))
        .collect();
    ("4", vec![hex])
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}
