// Project sharing - compact text form of a DrumProject for links

pub mod codec;

pub use codec::{decode, decode_or_default, encode};

use crate::error::PracticeResult;
use crate::sequencer::pattern::DrumProject;

/// Query key carrying the encoded project in a share link
pub const SHARE_KEY: &str = "p";

/// Build a link like `https://host/drums#p=<code>`
pub fn share_link(base_url: &str, project: &DrumProject) -> PracticeResult<String> {
    let code = encode(project)?;
    Ok(format!(
        "{}#{}={}",
        base_url.trim_end_matches('#'),
        SHARE_KEY,
        code
    ))
}

/// Pull the encoded project out of a share link's fragment or query
pub fn extract_share_code(link: &str) -> Option<&str> {
    let start = link.find(['#', '?'])?;
    link[start + 1..]
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == SHARE_KEY)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
