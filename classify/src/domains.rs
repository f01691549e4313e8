// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The static domain dictionary.

use crate::AppLabel;

/// Domain suffix to application mapping, consulted with longest-suffix
/// precedence. All suffixes are lowercase.
pub const DOMAIN_DICTIONARY: &[(&str, AppLabel)] = &[
    ("youtube.com", AppLabel::YouTube),
    ("youtu.be", AppLabel::YouTube),
    ("googlevideo.com", AppLabel::YouTube),
    ("ytimg.com", AppLabel::YouTube),
    ("google.com", AppLabel::Google),
    ("gstatic.com", AppLabel::Google),
    ("googleapis.com", AppLabel::Google),
    ("googleusercontent.com", AppLabel::Google),
    ("1e100.net", AppLabel::Google),
    ("facebook.com", AppLabel::Facebook),
    ("facebook.net", AppLabel::Facebook),
    ("fbcdn.net", AppLabel::Facebook),
    ("netflix.com", AppLabel::Netflix),
    ("nflxvideo.net", AppLabel::Netflix),
    ("nflxso.net", AppLabel::Netflix),
    ("nflximg.net", AppLabel::Netflix),
    ("tiktok.com", AppLabel::TikTok),
    ("tiktokcdn.com", AppLabel::TikTok),
    ("tiktokv.com", AppLabel::TikTok),
    ("twitter.com", AppLabel::Twitter),
    ("twimg.com", AppLabel::Twitter),
    ("x.com", AppLabel::Twitter),
    ("t.co", AppLabel::Twitter),
    ("instagram.com", AppLabel::Instagram),
    ("cdninstagram.com", AppLabel::Instagram),
    ("whatsapp.com", AppLabel::WhatsApp),
    ("whatsapp.net", AppLabel::WhatsApp),
    ("wa.me", AppLabel::WhatsApp),
    ("telegram.org", AppLabel::Telegram),
    ("telegram.me", AppLabel::Telegram),
    ("t.me", AppLabel::Telegram),
    ("spotify.com", AppLabel::Spotify),
    ("spotifycdn.com", AppLabel::Spotify),
    ("scdn.co", AppLabel::Spotify),
    ("amazon.com", AppLabel::Amazon),
    ("amazonaws.com", AppLabel::Amazon),
    ("media-amazon.com", AppLabel::Amazon),
    ("primevideo.com", AppLabel::Amazon),
    ("microsoft.com", AppLabel::Microsoft),
    ("windows.net", AppLabel::Microsoft),
    ("office.com", AppLabel::Microsoft),
    ("live.com", AppLabel::Microsoft),
    ("msn.com", AppLabel::Microsoft),
    ("azureedge.net", AppLabel::Microsoft),
    ("cloudflare.com", AppLabel::Cloudflare),
    ("cloudflare.net", AppLabel::Cloudflare),
];
