use bytes::Bytes;
use hls_origin_core::model::{Codec, LiveSegment, MediaTimestamp};
use hls_origin_core::playlist::EventPlaylist;
use m3u8_rs::Playlist;
use std::collections::BTreeSet;

fn segment(index: u64, start: f64, duration: f64) -> LiveSegment {
    let mut codecs = BTreeSet::new();
    codecs.insert(Codec::Aac);
    LiveSegment {
        index,
        filename: format!("segment_{}.m4s", index),
        data: Bytes::new(),
        duration,
        timestamp: MediaTimestamp::new((start * 1000.0).round() as i64, 1000),
        frame_count: 1,
        is_independent: true,
        codecs,
        is_gap: false,
        program_date_time: None,
        discontinuity_before: false,
    }
}

#[test]
fn event_playlist_round_trips_through_reference_parser() {
    let mut playlist = EventPlaylist::new(None, 7);
    for i in 0..3u64 {
        playlist
            .add_segment(segment(i, i as f64 * 6.006, 6.006))
            .expect("add_segment should succeed before end_stream");
    }
    let rendered = playlist.end_stream();

    let parsed = m3u8_rs::parse_playlist_res(rendered.as_bytes())
        .expect("rendered playlist must parse as valid m3u8");

    let media = match parsed {
        Playlist::MediaPlaylist(m) => m,
        Playlist::MasterPlaylist(_) => panic!("expected a media playlist"),
    };

    assert_eq!(media.segments.len(), 3);
    assert!(media.end_list);
    assert_eq!(media.target_duration as u64, 7);

    for (i, seg) in media.segments.iter().enumerate() {
        assert_eq!(seg.uri, format!("segment_{}.m4s", i));
        assert!((seg.duration as f64 - 6.006).abs() < 0.01);
    }
}

#[test]
fn cmaf_media_segment_has_well_formed_box_chain() {
    use hls_origin_core::cmaf::CMAFWriter;
    use hls_origin_core::model::EncodedFrame;

    let frames: Vec<EncodedFrame> = (0..4)
        .map(|i| EncodedFrame {
            data: Bytes::from(vec![0x11u8; 512]),
            timestamp: MediaTimestamp::new(i * 1024, 48_000),
            duration: MediaTimestamp::new(1024, 48_000),
            is_keyframe: i == 0,
            codec: Codec::Aac,
        })
        .collect();

    let segment_bytes = CMAFWriter::build_media_segment(&frames, 1, 3, 48_000);
    assert_eq!(&segment_bytes[4..8], b"styp");
    assert!(segment_bytes.len() > 4 * 512);
}
