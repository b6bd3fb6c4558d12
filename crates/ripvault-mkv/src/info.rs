//! Disc table of contents from `makemkvcon -r info`.

use std::collections::BTreeMap;

use ripvault_common::{DiscInfo, Error, Result, StreamInfo, StreamKind, TitleInfo};

use crate::robot::{parse_line, RobotLine};

// Attribute ids from makemkv's apdefs.h.
const AP_TYPE: u32 = 1;
const AP_NAME: u32 = 2;
const AP_LANG_CODE: u32 = 3;
const AP_CODEC_SHORT: u32 = 6;
const AP_CHAPTER_COUNT: u32 = 8;
const AP_DURATION: u32 = 9;
const AP_DISK_SIZE: u32 = 10;
const AP_SOURCE_FILE_NAME: u32 = 16;
const AP_VIDEO_SIZE: u32 = 19;
const AP_OUTPUT_FILE_NAME: u32 = 27;
const AP_VOLUME_NAME: u32 = 32;

/// Build a [`DiscInfo`] from robot output.
///
/// Fails when the output describes no disc at all; the last engine message
/// is included in the error.
pub fn parse_disc_info(output: &str) -> Result<DiscInfo> {
    let mut info = DiscInfo::default();
    let mut titles: BTreeMap<u32, TitleInfo> = BTreeMap::new();
    let mut streams: BTreeMap<(u32, u32), StreamInfo> = BTreeMap::new();
    let mut saw_disc = false;
    let mut last_message = None;

    for line in output.lines() {
        match parse_line(line) {
            Some(RobotLine::Cinfo { attr, value }) => {
                saw_disc = true;
                match attr {
                    AP_NAME => info.name = value,
                    AP_VOLUME_NAME => info.volume_name = value,
                    _ => {}
                }
            }
            Some(RobotLine::Tinfo { title, attr, value }) => {
                let t = titles.entry(title).or_insert_with(|| TitleInfo {
                    id: title,
                    ..Default::default()
                });
                match attr {
                    AP_NAME => t.name = value,
                    AP_CHAPTER_COUNT => t.chapter_count = value.parse().unwrap_or(0),
                    AP_DURATION => t.duration = value,
                    AP_DISK_SIZE => t.disk_size = value,
                    AP_SOURCE_FILE_NAME => t.source_file_name = value,
                    AP_OUTPUT_FILE_NAME => t.file_name = value,
                    _ => {}
                }
            }
            Some(RobotLine::Sinfo {
                title,
                stream,
                attr,
                value,
            }) => {
                let s = streams.entry((title, stream)).or_default();
                match attr {
                    AP_TYPE => s.kind = StreamKind::from_engine(&value),
                    AP_CODEC_SHORT => s.codec = value,
                    AP_VIDEO_SIZE => s.video_size = Some(value),
                    AP_LANG_CODE => s.language = Some(value),
                    _ => {}
                }
            }
            Some(RobotLine::Message { text, .. }) => last_message = Some(text),
            _ => {}
        }
    }

    if !saw_disc && titles.is_empty() {
        return Err(Error::parse(format!(
            "no disc information in makemkvcon output{}",
            last_message
                .map(|m| format!(": {}", m))
                .unwrap_or_default()
        )));
    }

    for ((title, _), stream) in streams {
        if let Some(t) = titles.get_mut(&title) {
            t.streams.push(stream);
        }
    }
    info.titles = titles.into_values().collect();
    Ok(info)
}
