//! Inline source-map reference handling for development builds.
//!
//! weft never generates source maps - the engine does, as an inline
//! `sourceMappingURL` comment at the end of its debug output. The write
//! pipeline detaches that trailing comment before the start-write hook
//! runs (so hooks transform only the code body) and reattaches it
//! afterwards, preserving a pre-existing map across caller
//! transformations.

const SOURCE_MAP_PREFIX: &[u8] = b"//# sourceMappingURL=";

/// Split a buffered asset into its body and a trailing inline
/// source-map comment, if one is present as the final line.
pub(crate) fn split(bytes: Vec<u8>) -> (Vec<u8>, Option<Vec<u8>>) {
    let trimmed_len = bytes.iter().rposition(|b| *b != b'\n').map_or(0, |i| i + 1);
    let line_start = bytes[..trimmed_len]
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |i| i + 1);

    if bytes[line_start..trimmed_len].starts_with(SOURCE_MAP_PREFIX) {
        let comment = bytes[line_start..trimmed_len].to_vec();
        let mut body = bytes;
        body.truncate(line_start);
        (body, Some(comment))
    } else {
        (bytes, None)
    }
}

/// Reattach a detached source-map comment as the final line of a body.
pub(crate) fn join(mut body: Vec<u8>, comment: &[u8]) -> Vec<u8> {
    if !body.is_empty() && !body.ends_with(b"\n") {
        body.push(b'\n');
    }
    body.extend_from_slice(comment);
    body.push(b'\n');
    body
}
