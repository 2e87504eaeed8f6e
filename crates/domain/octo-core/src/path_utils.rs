use std::path::{Component, Path};

pub struct ItemPath;

impl ItemPath {
    /// A listed name must resolve to exactly one file directly inside the
    /// destination directory. Rejects empty names, separators, `.`/`..` and
    /// absolute or prefixed paths from a misbehaving server.
    pub fn verify_safe(name: &str) -> bool {
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return false;
        }
        let mut components = Path::new(name).components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        )
    }
}
