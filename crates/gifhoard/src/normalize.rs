//! Media link normalization.
//!
//! Maps a link found in a listing to a URL that can be fetched directly as
//! a gif, or flags it as not eligible for ingestion. Rules are applied in
//! order and the first one that matches decides:
//!
//! 1. links ending in `.jpg` are rejected
//! 2. links pointing at a video player host are rejected
//! 3. links ending in `.gif` or on the direct image host are kept as they are
//! 4. gallery host links are rewritten to the direct image host
//! 5. transcoding host links are rewritten to its raw gif host
//! 6. everything else is rejected
//!
//! Direct image host links pass through untouched, so a `.gifv` link on that
//! host stays a `.gifv` link. Only gallery host links get their video
//! extension replaced.

const DIRECT_IMAGE_HOST: &str = "i.imgur.com";
const GALLERY_HOST: &str = "imgur.com";
const TRANSCODING_HOST: &str = "gfycat.com";
const TRANSCODING_GIF_HOST: &str = "giant.gfycat.com";
const REJECTED_HOSTS: &[&str] = &["youtube.com"];
const VIDEO_SUFFIXES: &[&str] = &[".gifv", ".webm"];

/// Outcome of [`normalize`]. Rejected links carry the input unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub url: String,
    pub eligible: bool,
}

impl Normalized {
    fn accept(url: String) -> Self {
        Self { url, eligible: true }
    }

    fn reject(raw: &str) -> Self {
        Self {
            url: raw.to_string(),
            eligible: false,
        }
    }
}

/// Normalizes one raw media link.
pub fn normalize(raw: &str) -> Normalized {
    if raw.ends_with(".jpg") {
        return Normalized::reject(raw);
    }

    let host = host_of(raw);
    if REJECTED_HOSTS.iter().any(|h| host_matches(host, h)) {
        return Normalized::reject(raw);
    }

    if raw.ends_with(".gif") || host == DIRECT_IMAGE_HOST {
        return Normalized::accept(raw.to_string());
    }

    if host_matches(host, GALLERY_HOST) {
        let stem = strip_video_suffix(raw).unwrap_or(raw);
        let rewritten = stem
            .replacen(
                &format!("://{}", GALLERY_HOST),
                &format!("://{}", DIRECT_IMAGE_HOST),
                1,
            )
            .replace("/gallery/", "/");
        return Normalized::accept(format!("{}.gif", rewritten));
    }

    if host_matches(host, TRANSCODING_HOST) {
        let rewritten = raw.replacen(
            &format!("://{}", TRANSCODING_HOST),
            &format!("://{}", TRANSCODING_GIF_HOST),
            1,
        );
        return Normalized::accept(format!("{}.gif", rewritten));
    }

    Normalized::reject(raw)
}

/// Host part of an absolute URL, or `""` when there is none.
fn host_of(raw: &str) -> &str {
    let Some((_, rest)) = raw.split_once("://") else {
        return "";
    };
    let end = rest
        .find(|c| matches!(c, '/' | '?' | '#' | ':'))
        .unwrap_or(rest.len());
    &rest[..end]
}

/// True for `domain` itself and any subdomain of it.
fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn strip_video_suffix(raw: &str) -> Option<&str> {
    VIDEO_SUFFIXES.iter().find_map(|s| raw.strip_suffix(s))
}
