// SPDX-License-Identifier: MIT OR Apache-2.0
//! Object-store key-layout helpers (§6).
//!
//! Every key advertised by a manifest has the shape
//! `updates/<applicationId>/<runtimeVersion>/<updateId>/<publisher-relative-path>`.

/// The prefix every key for a given upload lives under.
pub fn blob_prefix(application_id: &str, runtime_version: &str, update_id: &str) -> String {
    format!("updates/{application_id}/{runtime_version}/{update_id}")
}

/// Full key for a publisher-relative path within an upload.
pub fn blob_key(
    application_id: &str,
    runtime_version: &str,
    update_id: &str,
    relative_path: &str,
) -> String {
    format!(
        "{}/{}",
        blob_prefix(application_id, runtime_version, update_id),
        relative_path.trim_start_matches('/')
    )
}

/// The root prefix under which every upload for `application_id` lives.
pub fn app_root(application_id: &str) -> String {
    format!("updates/{application_id}/")
}

/// Given a full object key, return the `updates/<app>/<runtime>/<id>`
/// prefix it belongs to, or `None` if `key` does not have the expected
/// shape (fewer than four path segments under `updates/`).
pub fn upload_prefix_of(key: &str) -> Option<String> {
    let segments: Vec<&str> = key.split('/').collect();
    if segments.len() < 4 || segments[0] != "updates" {
        return None;
    }
    Some(segments[0..4].join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_prefix_has_expected_shape() {
        assert_eq!(
            blob_prefix("myapp", "1.0.0", "u1"),
            "updates/myapp/1.0.0/u1"
        );
    }

    #[test]
    fn blob_key_joins_relative_path() {
        assert_eq!(
            blob_key("myapp", "1.0.0", "u1", "assets/foo.png"),
            "updates/myapp/1.0.0/u1/assets/foo.png"
        );
    }

    #[test]
    fn blob_key_strips_leading_slash_on_relative_path() {
        assert_eq!(
            blob_key("myapp", "1.0.0", "u1", "/metadata.json"),
            "updates/myapp/1.0.0/u1/metadata.json"
        );
    }

    #[test]
    fn app_root_ends_with_trailing_slash() {
        assert_eq!(app_root("myapp"), "updates/myapp/");
    }

    #[test]
    fn upload_prefix_of_extracts_four_segments() {
        assert_eq!(
            upload_prefix_of("updates/myapp/1.0.0/u1/assets/foo.png"),
            Some("updates/myapp/1.0.0/u1".to_string())
        );
    }

    #[test]
    fn upload_prefix_of_rejects_shallow_keys() {
        assert_eq!(upload_prefix_of("updates/myapp/1.0.0"), None);
        assert_eq!(upload_prefix_of("other/myapp/1.0.0/u1/x"), None);
    }
}
