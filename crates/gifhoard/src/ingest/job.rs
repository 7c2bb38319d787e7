use crate::db::NewGif;
use crate::transcode::TranscodedMedia;

/// A new item waiting to be transcoded and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeJob {
    pub channel: String,
    pub gif: NewGif,
}

impl TranscodeJob {
    pub fn new(channel: impl Into<String>, gif: NewGif) -> Self {
        Self {
            channel: channel.into(),
            gif,
        }
    }

    /// URL handed to the transcoder and keyed in the ledger.
    pub fn url(&self) -> &str {
        &self.gif.url
    }

    /// The record to store once the transcoder has produced `media`.
    pub fn into_record(self, media: TranscodedMedia) -> NewGif {
        NewGif {
            webm_url: media.webm_url,
            mp4_url: media.mp4_url,
            thumbnail_url: media.thumbnail_url,
            width: media.width,
            height: media.height,
            ..self.gif
        }
    }
}
