use std::collections::HashMap;

use crate::feed::Episode;

/// Fixed extension for downloaded audio files
pub const AUDIO_EXTENSION: &str = "mp3";

/// Fixed extension for sidecar cover images
pub const IMAGE_EXTENSION: &str = "jpg";

/// Check if a character is allowed in filename stems (whitelist approach)
fn is_valid_stem_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, ' ' | '-' | '_')
}

/// Find the download URL of an episode's audio file.
///
/// Returns the first link whose declared media type contains "audio".
/// `None` means the entry has no downloadable audio; the caller reports
/// it and moves on without failing the batch.
pub fn find_audio_url(episode: &Episode) -> Option<&str> {
    episode
        .links
        .iter()
        .find(|link| {
            link.mime_type
                .as_deref()
                .is_some_and(|mime| mime.contains("audio"))
        })
        .map(|link| link.href.as_str())
}

/// Reduce an episode title to a filesystem-safe filename stem.
///
/// Disallowed characters are dropped, not replaced, so the result is
/// idempotent under re-application.
pub fn sanitize_stem(title: &str) -> String {
    title.chars().filter(|c| is_valid_stem_char(*c)).collect()
}

/// Assign a collision-free stem to every title of a run.
///
/// Stems are assigned in feed order; when two distinct titles sanitize
/// to the same stem, the second and later occurrences get a numeric
/// suffix. Feed order is stable within a run, so the same feed yields
/// the same stems on a re-run and the skip-if-exists check holds.
pub fn unique_stems<'a, I>(titles: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut occurrences: HashMap<String, usize> = HashMap::new();

    titles
        .into_iter()
        .map(|title| {
            let stem = sanitize_stem(title);
            let count = occurrences.entry(stem.clone()).or_insert(0);
            *count += 1;
            if *count > 1 {
                format!("{} {}", stem, count)
            } else {
                stem
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::MediaLink;

    fn episode_with_links(links: Vec<MediaLink>) -> Episode {
        Episode {
            title: "Test".to_string(),
            links,
            ..Episode::default()
        }
    }

    #[test]
    fn sanitize_drops_disallowed_characters() {
        assert_eq!(sanitize_stem("Ep. 1: Hello/World!"), "Ep 1 HelloWorld");
    }

    #[test]
    fn sanitize_keeps_space_hyphen_underscore() {
        assert_eq!(sanitize_stem("a b-c_d"), "a b-c_d");
    }

    #[test]
    fn sanitize_keeps_unicode_alphanumerics() {
        assert_eq!(sanitize_stem("Café résumé"), "Café résumé");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let once = sanitize_stem("Ep. 1: Hello/World!");
        assert_eq!(sanitize_stem(&once), once);
    }

    #[test]
    fn sanitize_of_only_disallowed_chars_is_empty() {
        assert_eq!(sanitize_stem("?!:/\\."), "");
    }

    #[test]
    fn audio_url_picks_first_audio_typed_link() {
        let episode = episode_with_links(vec![
            MediaLink {
                href: "https://example.com/page".to_string(),
                mime_type: None,
            },
            MediaLink {
                href: "https://example.com/ep.mp4".to_string(),
                mime_type: Some("video/mp4".to_string()),
            },
            MediaLink {
                href: "https://example.com/ep.mp3".to_string(),
                mime_type: Some("audio/mpeg".to_string()),
            },
            MediaLink {
                href: "https://example.com/ep.m4a".to_string(),
                mime_type: Some("audio/mp4".to_string()),
            },
        ]);

        assert_eq!(find_audio_url(&episode), Some("https://example.com/ep.mp3"));
    }

    #[test]
    fn audio_url_absent_when_no_audio_typed_link() {
        let episode = episode_with_links(vec![MediaLink {
            href: "https://example.com/page".to_string(),
            mime_type: Some("text/html".to_string()),
        }]);

        assert!(find_audio_url(&episode).is_none());
    }

    #[test]
    fn audio_url_absent_when_links_empty() {
        let episode = episode_with_links(vec![]);
        assert!(find_audio_url(&episode).is_none());
    }

    #[test]
    fn unique_stems_disambiguates_colliding_titles() {
        let stems = unique_stems(vec!["Ep. 1", "Ep 1", "Other"]);
        assert_eq!(stems, vec!["Ep 1", "Ep 1 2", "Other"]);
    }

    #[test]
    fn unique_stems_is_deterministic_across_runs() {
        let first = unique_stems(vec!["A!", "A", "A?"]);
        let second = unique_stems(vec!["A!", "A", "A?"]);
        assert_eq!(first, second);
        assert_eq!(first, vec!["A", "A 2", "A 3"]);
    }
}
