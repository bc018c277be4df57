use std::{fmt, path::Path};

/// Which uploads accept which image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePolicy {
    /// Proof of payment screenshots.
    PaymentProof,
    Promotion,
}

impl ImagePolicy {
    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            ImagePolicy::PaymentProof => &["png"],
            ImagePolicy::Promotion => &["png", "jpg", "jpeg", "gif", "webp"],
        }
    }

    /// Checks the file extension, ignoring case.
    pub fn accepts(self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions()
                    .iter()
                    .any(|allowed| ext.eq_ignore_ascii_case(allowed))
            })
            .unwrap_or(false)
    }
}

impl fmt::Display for ImagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImagePolicy::PaymentProof => f.write_str("payment proof"),
            ImagePolicy::Promotion => f.write_str("promotion"),
        }
    }
}
