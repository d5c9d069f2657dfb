use unicode_normalization::UnicodeNormalization;

/// Indel similarity in [0, 100]: `200 * lcs / (len_a + len_b)`, counted in
/// chars. Both sides are NFC-normalized first so composed and decomposed
/// spellings compare equal.
pub fn text_ratio(a: &str, b: &str) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a: Vec<char> = a.nfc().collect();
    let b: Vec<char> = b.nfc().collect();
    let total = a.len() + b.len();
    (200.0 * longest_common_subsequence(&a, &b) as f64 / total as f64) as f32
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let (outer, inner) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let mut prev = vec![0_usize; inner.len() + 1];
    let mut row = vec![0_usize; inner.len() + 1];

    for &x in outer {
        for (j, &y) in inner.iter().enumerate() {
            row[j + 1] = if x == y {
                prev[j] + 1
            } else {
                row[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[inner.len()]
}
