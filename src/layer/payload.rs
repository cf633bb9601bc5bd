/// A trailing, headerless byte blob. `None` is the wildcard: "accept any
/// payload, including none" during a match, or "no bytes to emit" during a
/// send. `Some(bytes)` during a match requires an exact byte-for-byte equal
/// payload (spec.md's open question about under-length matches is resolved
/// by treating a too-short observed frame as a non-match rather than a
/// panic, handled in `Layers::matches_prefix`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PayloadFields {
    pub bytes: Option<Vec<u8>>,
}

impl PayloadFields {
    pub fn merge(&mut self, other: &PayloadFields) {
        if other.bytes.is_some() {
            self.bytes = other.bytes.clone();
        }
    }

    pub fn field_matches(&self, observed: &PayloadFields) -> bool {
        self.bytes.is_none() || self.bytes == observed.bytes
    }

    pub fn diff_lines(&self, observed: &PayloadFields) -> Vec<String> {
        if let Some(want) = &self.bytes {
            if Some(want) != observed.bytes.as_ref() {
                return vec![format!("Payload: got {:?}, want {:?}", observed.bytes, want)];
            }
        }
        Vec::new()
    }

    pub fn len(&self) -> usize {
        self.bytes.as_ref().map(Vec::len).unwrap_or(0)
    }
}
