//! Shared key generation for storage backends.
//!
//! Key format: `drops/{uuid}-{sanitized_filename}`. The uuid prefix keeps
//! every upload under its own key, so repeated uploads of the same name (or
//! even the same bytes) never collide.

use uuid::Uuid;

/// Generate an object key for an uploaded file.
///
/// The remote drive backend ignores this and uses the id the drive assigns;
/// the local and memory backends use it as their canonical key.
pub(crate) fn generate_object_key(file_name: &str) -> String {
    format!("drops/{}-{}", Uuid::new_v4(), sanitize_file_name(file_name))
}

/// Reduce a client-supplied filename to a key-safe form.
///
/// Only the final path component is kept. Alphanumerics, dots, dashes, and
/// underscores survive; other characters become underscores. Dot runs are
/// collapsed and boundary dots trimmed, so the result can never contain `..`.
pub(crate) fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let mut cleaned = String::with_capacity(base.len());
    let mut prev_dot = false;
    for c in base.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            c
        } else {
            '_'
        };
        if c == '.' {
            if prev_dot {
                continue;
            }
            prev_dot = true;
        } else {
            prev_dot = false;
        }
        cleaned.push(c);
    }

    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}
