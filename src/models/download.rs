use url::Url;

/// One entry of the download list: a URL and the file name it is saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    pub url: String,
    pub file_name: String,
}

impl DownloadEntry {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let file_name = basename_from_url(&url);
        Self { url, file_name }
    }
}

/// Derive the destination file name from the final path segment of `url`.
///
/// Query strings and fragments are ignored. When the URL has no non-empty
/// path segment, or does not parse at all, the full URL string is returned.
pub fn basename_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string)
        })
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_basename_simple() {
        assert_eq!(basename_from_url("https://example.com/mods/foo.zip"), "foo.zip");
    }

    #[test]
    fn test_basename_ignores_query_and_fragment() {
        assert_eq!(
            basename_from_url("https://example.com/dl/Mod-1.2.3.zip?token=abc#top"),
            "Mod-1.2.3.zip"
        );
    }

    #[test]
    fn test_basename_trailing_slash() {
        assert_eq!(basename_from_url("https://example.com/mods/pack/"), "pack");
    }

    #[test]
    fn test_basename_falls_back_to_url() {
        assert_eq!(basename_from_url("https://example.com/"), "https://example.com/");
        assert_eq!(basename_from_url("https://example.com"), "https://example.com");
        assert_eq!(basename_from_url("not a url"), "not a url");
    }

    #[test]
    fn test_entry_new() {
        let entry = DownloadEntry::new("https://thunderstore.io/package/download/a/b/1.0.0/");
        assert_eq!(entry.file_name, "1.0.0");
        assert_eq!(entry.url, "https://thunderstore.io/package/download/a/b/1.0.0/");
    }

    proptest! {
        #[test]
        fn prop_last_segment_is_file_name(
            dirs in proptest::collection::vec("[a-z0-9_-]{1,8}", 0..4),
            name in "[A-Za-z0-9_-]{1,12}\\.(zip|tar|tgz|tar\\.gz)",
        ) {
            let mut url = String::from("https://mods.example.org/");
            for dir in &dirs {
                url.push_str(dir);
                url.push('/');
            }
            url.push_str(&name);

            prop_assert_eq!(basename_from_url(&url), name);
        }
    }
}
