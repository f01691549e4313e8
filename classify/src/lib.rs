// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![forbid(unsafe_code)]
#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Application classification: server name (or `Host`) against a static
//! domain dictionary, with a port heuristic fallback.

mod domains;

pub use domains::DOMAIN_DICTIONARY;

use net::packet::IpProto;

/// The application carried by a flow.
///
/// A closed enumeration; labels the engine cannot name fall into
/// [`AppLabel::Unknown`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(ascii_case_insensitive)]
#[repr(usize)]
pub enum AppLabel {
    /// Plaintext web traffic.
    Http,
    /// TLS web traffic with no recognized server name.
    Https,
    /// Domain name system.
    Dns,
    /// YouTube (including the googlevideo CDN).
    YouTube,
    /// Google properties other than YouTube.
    Google,
    /// Facebook (including the fbcdn CDN).
    Facebook,
    /// Netflix (including the nflxvideo CDN).
    Netflix,
    /// TikTok.
    TikTok,
    /// Twitter / X.
    Twitter,
    /// Instagram.
    Instagram,
    /// WhatsApp.
    WhatsApp,
    /// Telegram.
    Telegram,
    /// Spotify.
    Spotify,
    /// Amazon retail and Prime Video.
    Amazon,
    /// Microsoft properties.
    Microsoft,
    /// Cloudflare-operated infrastructure.
    Cloudflare,
    /// Anything the dictionary and heuristics cannot name.
    Unknown,
}

impl AppLabel {
    /// The number of labels (array-counter width).
    pub const COUNT: usize = 17;

    /// Dense index of this label.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Whether `name` equals `suffix` or ends with `.suffix`.
///
/// Both sides are expected lowercased. Matching is anchored at a label
/// boundary so `imytimg.com` does not match the suffix `ytimg.com`.
#[must_use]
pub fn domain_matches(name: &str, suffix: &str) -> bool {
    if name.len() == suffix.len() {
        return name == suffix;
    }
    name.len() > suffix.len()
        && name.ends_with(suffix)
        && name.as_bytes()[name.len() - suffix.len() - 1] == b'.'
}

fn dictionary_lookup(name: &str) -> Option<AppLabel> {
    let mut best: Option<(&str, AppLabel)> = None;
    for &(suffix, label) in DOMAIN_DICTIONARY {
        if domain_matches(name, suffix)
            && best.is_none_or(|(best_suffix, _)| suffix.len() > best_suffix.len())
        {
            best = Some((suffix, label));
        }
    }
    best.map(|(_, label)| label)
}

fn port_heuristic(proto: IpProto, ports: (u16, u16)) -> AppLabel {
    let (a, b) = ports;
    if a == 53 || b == 53 {
        return AppLabel::Dns;
    }
    if proto == IpProto::Tcp {
        if a == 443 || b == 443 {
            return AppLabel::Https;
        }
        if a == 80 || b == 80 {
            return AppLabel::Http;
        }
    }
    AppLabel::Unknown
}

/// Classify a flow from what is known about it.
///
/// Tried in order: server name against the dictionary, `Host` header
/// against the dictionary, port heuristic on either endpoint port. A name
/// that is present but unrecognized still falls through to the port
/// heuristic (an unknown domain on :443 is still TLS web traffic).
#[must_use]
pub fn classify(
    sni: Option<&str>,
    http_host: Option<&str>,
    proto: IpProto,
    ports: (u16, u16),
) -> AppLabel {
    if let Some(label) = sni.and_then(dictionary_lookup) {
        return label;
    }
    if let Some(label) = http_host.and_then(dictionary_lookup) {
        return label;
    }
    port_heuristic(proto, ports)
}
