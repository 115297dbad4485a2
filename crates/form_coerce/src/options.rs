/// Capabilities of the environment the coerced schema runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoerceOptions {
    /// Whether input may contain uploaded files. When `false` the file-like
    /// normalizer is a no-op and no node is treated as a file leaf.
    pub file_inputs: bool,
}

impl Default for CoerceOptions {
    fn default() -> Self {
        Self { file_inputs: true }
    }
}

impl CoerceOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file_inputs(mut self, file_inputs: bool) -> Self {
        self.file_inputs = file_inputs;
        self
    }
}
