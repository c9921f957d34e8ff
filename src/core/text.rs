//! Line/byte conversion for text signing.

/// Join lines into one buffer, each line terminated by `\n`.
pub fn lines_to_bytes<S: AsRef<str>>(lines: &[S]) -> Vec<u8> {
    let mut out = Vec::with_capacity(lines.iter().map(|l| l.as_ref().len() + 1).sum());
    for line in lines {
        out.extend_from_slice(line.as_ref().as_bytes());
        out.push(b'\n');
    }
    out
}

/// Split a buffer on `\n`. A trailing newline does not produce an empty
/// last line; invalid UTF-8 is replaced.
pub fn bytes_to_lines(data: &[u8]) -> Vec<String> {
    let mut lines: Vec<String> = data
        .split(|b| *b == b'\n')
        .map(|l| String::from_utf8_lossy(l).into_owned())
        .collect();
    if data.is_empty() || data.ends_with(b"\n") {
        lines.pop();
    }
    lines
}
