/// One observed change from the watch stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Source key as reported upstream
    pub key: String,
    /// Value carried by the put notification
    pub value: String,
}

impl ChangeEvent {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Build an event from raw watch payload bytes. Invalid UTF-8 is
    /// replaced, never dropped.
    pub fn from_bytes(
        key: &[u8],
        value: &[u8],
    ) -> Self {
        Self {
            key: String::from_utf8_lossy(key).into_owned(),
            value: String::from_utf8_lossy(value).into_owned(),
        }
    }
}
