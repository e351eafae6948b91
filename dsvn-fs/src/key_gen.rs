//! Base-36 key generation for transaction names and representation keys

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn digit_value(c: u8) -> Option<usize> {
    DIGITS.iter().position(|&d| d == c)
}

/// The key following `key`: base-36 increment with carry (`z` -> `10`).
///
/// Returns `None` if `key` is empty or contains anything but `0-9a-z`.
pub fn next_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return None;
    }
    let mut digits = key
        .bytes()
        .map(digit_value)
        .collect::<Option<Vec<_>>>()?;

    let mut carry = true;
    for d in digits.iter_mut().rev() {
        if !carry {
            break;
        }
        *d += 1;
        carry = *d == DIGITS.len();
        if carry {
            *d = 0;
        }
    }
    if carry {
        digits.insert(0, 1);
    }

    Some(digits.into_iter().map(|d| DIGITS[d] as char).collect())
}
