/// Compares a supplied api key against the configured secret without
/// short-circuiting on the first mismatched byte.
pub fn keys_match(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    let mut diff = provided.len() ^ expected.len();
    for (a, b) in provided.iter().zip(expected.iter()) {
        diff |= usize::from(a ^ b);
    }
    diff == 0
}
