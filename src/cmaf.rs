//! Hand-rolled ISO-BMFF / CMAF box writer.
//!
//! No frame validation happens here: callers (the segmenter) are responsible for handing
//! over well-formed, monotonically timestamped frames. This module only encodes bytes.

use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, Bytes, BytesMut};

use crate::model::{Codec, EncodedFrame};

/// Wraps `payload` in a standard 32-bit length-prefixed box. Falls back to the 64-bit
/// extended-size form when the payload would overflow a u32 box size.
pub fn make_box(typ: &[u8; 4], payload: &[u8]) -> BytesMut {
    let mut out = BytesMut::with_capacity(payload.len() + 8);
    let size = payload.len() as u64 + 8;
    if size <= u32::MAX as u64 {
        out.put_u32(size as u32);
        out.put_slice(typ);
    } else {
        out.put_u32(1);
        out.put_slice(typ);
        out.put_u64(size + 8);
    }
    out.put_slice(payload);
    out
}

fn full_box_header(version: u8, flags: u32) -> [u8; 4] {
    let mut header = [0u8; 4];
    header[0] = version;
    BigEndian::write_u24(&mut header[1..], flags);
    header
}

/// A per-sample view used while building a `trun` table. Built internally from
/// `EncodedFrame`s; never constructed by callers.
struct SampleLocator {
    size: u32,
    duration: u32,
    is_sync: bool,
    cts_offset: i32,
}

#[derive(Clone, Debug)]
pub struct AudioInitConfig {
    pub track_id: u32,
    pub timescale: u32,
    pub sample_rate: u32,
    pub channels: u16,
    /// Raw `AudioSpecificConfig` bytes (MPEG-4 §1.6.2), used verbatim inside `esds`.
    pub audio_specific_config: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct VideoInitConfig {
    pub track_id: u32,
    pub timescale: u32,
    pub width: u16,
    pub height: u16,
    pub sps: Vec<u8>,
    pub pps: Vec<u8>,
}

pub struct CMAFWriter;

impl CMAFWriter {
    pub fn build_audio_init(config: &AudioInitConfig) -> Bytes {
        let ftyp = build_ftyp();
        let moov = build_moov_audio(config);
        let mut out = BytesMut::with_capacity(ftyp.len() + moov.len());
        out.put_slice(&ftyp);
        out.put_slice(&moov);
        out.freeze()
    }

    pub fn build_video_init(config: &VideoInitConfig) -> Bytes {
        let ftyp = build_ftyp();
        let moov = build_moov_video(config);
        let mut out = BytesMut::with_capacity(ftyp.len() + moov.len());
        out.put_slice(&ftyp);
        out.put_slice(&moov);
        out.freeze()
    }

    pub fn build_media_segment(
        frames: &[EncodedFrame],
        track_id: u32,
        sequence_number: u32,
        timescale: u32,
    ) -> Bytes {
        let styp = build_styp();
        let fragment = build_fragment(frames, track_id, sequence_number, timescale);
        let mut out = BytesMut::with_capacity(styp.len() + fragment.len());
        out.put_slice(&styp);
        out.put_slice(&fragment);
        out.freeze()
    }

    pub fn build_partial_segment(
        frames: &[EncodedFrame],
        track_id: u32,
        sequence_number: u32,
        timescale: u32,
    ) -> Bytes {
        build_fragment(frames, track_id, sequence_number, timescale).freeze()
    }
}

fn build_ftyp() -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_slice(b"iso6");
    payload.put_u32(0);
    for brand in [b"iso6", b"mp42", b"cmfc"] {
        payload.put_slice(brand);
    }
    make_box(b"ftyp", &payload)
}

fn build_styp() -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_slice(b"msdh");
    payload.put_u32(0);
    for brand in [b"msdh", b"msix", b"isom"] {
        payload.put_slice(brand);
    }
    make_box(b"styp", &payload)
}

fn build_mvhd(timescale: u32, next_track_id: u32) -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_slice(&full_box_header(1, 0));
    payload.put_u64(0); // creation_time
    payload.put_u64(0); // modification_time
    payload.put_u32(timescale);
    payload.put_u64(0); // duration (fragmented, unknown up front)
    payload.put_i32(0x00010000); // rate 1.0
    payload.put_i16(0x0100); // volume 1.0
    payload.put_u16(0); // reserved
    payload.put_u64(0); // reserved[2]
    // unity matrix
    for v in [0x00010000i32, 0, 0, 0, 0x00010000, 0, 0, 0, 0x40000000] {
        payload.put_i32(v);
    }
    for _ in 0..6 {
        payload.put_u32(0); // pre_defined
    }
    payload.put_u32(next_track_id);
    make_box(b"mvhd", &payload)
}

fn build_tkhd(track_id: u32, width: u16, height: u16) -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_slice(&full_box_header(1, 0x000007)); // enabled | in_movie | in_preview
    payload.put_u64(0);
    payload.put_u64(0);
    payload.put_u32(track_id);
    payload.put_u32(0); // reserved
    payload.put_u64(0); // duration
    payload.put_u64(0); // reserved[2]
    payload.put_i16(0); // layer
    payload.put_i16(0); // alternate_group
    payload.put_i16(if width == 0 && height == 0 { 0x0100 } else { 0 }); // volume
    payload.put_u16(0); // reserved
    for v in [0x00010000i32, 0, 0, 0, 0x00010000, 0, 0, 0, 0x40000000] {
        payload.put_i32(v);
    }
    payload.put_u32((width as u32) << 16);
    payload.put_u32((height as u32) << 16);
    make_box(b"tkhd", &payload)
}

fn build_mdhd(timescale: u32) -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_slice(&full_box_header(1, 0));
    payload.put_u64(0);
    payload.put_u64(0);
    payload.put_u32(timescale);
    payload.put_u64(0); // duration
    payload.put_u16(0x55c4); // 'und' language
    payload.put_u16(0);
    make_box(b"mdhd", &payload)
}

fn build_hdlr(handler: &[u8; 4], name: &str) -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_slice(&full_box_header(0, 0));
    payload.put_u32(0); // pre_defined
    payload.put_slice(handler);
    payload.put_u64(0); // reserved[3] (part)
    payload.put_u32(0);
    payload.put_slice(name.as_bytes());
    payload.put_u8(0);
    make_box(b"hdlr", &payload)
}

fn build_vmhd() -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_slice(&full_box_header(0, 1));
    payload.put_u16(0); // graphicsmode
    payload.put_u64(0); // opcolor
    make_box(b"vmhd", &payload)
}

fn build_smhd() -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_slice(&full_box_header(0, 0));
    payload.put_i16(0); // balance
    payload.put_u16(0); // reserved
    make_box(b"smhd", &payload)
}

fn build_dinf() -> BytesMut {
    let mut url_payload = BytesMut::new();
    url_payload.put_slice(&full_box_header(0, 1)); // self-contained
    let url = make_box(b"url ", &url_payload);

    let mut dref_payload = BytesMut::new();
    dref_payload.put_slice(&full_box_header(0, 0));
    dref_payload.put_u32(1);
    dref_payload.put_slice(&url);
    let dref = make_box(b"dref", &dref_payload);

    make_box(b"dinf", &dref)
}

fn build_empty_stts() -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_slice(&full_box_header(0, 0));
    payload.put_u32(0);
    make_box(b"stts", &payload)
}

fn build_empty_stsc() -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_slice(&full_box_header(0, 0));
    payload.put_u32(0);
    make_box(b"stsc", &payload)
}

fn build_empty_stsz() -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_slice(&full_box_header(0, 0));
    payload.put_u32(0); // sample_size
    payload.put_u32(0); // sample_count
    make_box(b"stsz", &payload)
}

fn build_empty_stco() -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_slice(&full_box_header(0, 0));
    payload.put_u32(0);
    make_box(b"stco", &payload)
}

fn build_avcc(sps: &[u8], pps: &[u8]) -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_u8(1); // configurationVersion
    payload.put_u8(sps.get(1).copied().unwrap_or(0)); // profile_idc
    payload.put_u8(sps.get(2).copied().unwrap_or(0)); // profile_compat
    payload.put_u8(sps.get(3).copied().unwrap_or(0)); // level_idc
    payload.put_u8(0xff); // reserved(6) + lengthSizeMinusOne=3
    payload.put_u8(0xe1); // reserved(3) + numOfSequenceParameterSets=1
    payload.put_u16(sps.len() as u16);
    payload.put_slice(sps);
    payload.put_u8(1); // numOfPictureParameterSets
    payload.put_u16(pps.len() as u16);
    payload.put_slice(pps);
    make_box(b"avcC", &payload)
}

fn build_avc1_sample_entry(config: &VideoInitConfig) -> BytesMut {
    let avcc = build_avcc(&config.sps, &config.pps);

    let mut payload = BytesMut::new();
    payload.put_uint(0, 6); // reserved
    payload.put_u16(1); // data_reference_index
    payload.put_u16(0); // pre_defined
    payload.put_u16(0); // reserved
    payload.put_u32(0);
    payload.put_u32(0);
    payload.put_u32(0); // pre_defined[3]
    payload.put_u16(config.width);
    payload.put_u16(config.height);
    payload.put_u32(0x00480000); // horizresolution 72dpi
    payload.put_u32(0x00480000); // vertresolution 72dpi
    payload.put_u32(0); // reserved
    payload.put_u16(1); // frame_count
    payload.put_bytes(0, 32); // compressorname
    payload.put_u16(0x0018); // depth
    payload.put_i16(-1); // pre_defined
    payload.put_slice(&avcc);

    make_box(b"avc1", &payload)
}

fn build_esds(asc: &[u8]) -> BytesMut {
    // Minimal MPEG-4 ES_Descriptor wrapping a DecoderSpecificInfo around the raw ASC.
    let mut dsi = BytesMut::new();
    dsi.put_u8(0x05); // DecoderSpecificInfo tag
    dsi.put_u8(asc.len() as u8);
    dsi.put_slice(asc);

    let mut dec_config = BytesMut::new();
    dec_config.put_u8(0x04); // DecoderConfigDescriptor tag
    dec_config.put_u8((13 + dsi.len()) as u8);
    dec_config.put_u8(0x40); // objectTypeIndication: Audio ISO/IEC 14496-3
    dec_config.put_u8(0x15); // streamType=audio, upStream=0, reserved=1
    dec_config.put_uint(0, 3); // bufferSizeDB
    dec_config.put_u32(0); // maxBitrate
    dec_config.put_u32(0); // avgBitrate
    dec_config.put_slice(&dsi);

    let mut sl_config = BytesMut::new();
    sl_config.put_u8(0x06); // SLConfigDescriptor tag
    sl_config.put_u8(1);
    sl_config.put_u8(0x02); // predefined = MP4

    let mut es = BytesMut::new();
    es.put_u8(0x03); // ES_DescriptorTag
    es.put_u8((3 + dec_config.len() + sl_config.len()) as u8);
    es.put_u16(0); // ES_ID
    es.put_u8(0); // flags
    es.put_slice(&dec_config);
    es.put_slice(&sl_config);

    let mut payload = BytesMut::new();
    payload.put_slice(&full_box_header(0, 0));
    payload.put_slice(&es);
    make_box(b"esds", &payload)
}

fn build_mp4a_sample_entry(config: &AudioInitConfig) -> BytesMut {
    let esds = build_esds(&config.audio_specific_config);

    let mut payload = BytesMut::new();
    payload.put_uint(0, 6); // reserved
    payload.put_u16(1); // data_reference_index
    payload.put_u64(0); // reserved[2]
    payload.put_u16(config.channels);
    payload.put_u16(16); // samplesize
    payload.put_u32(0); // pre_defined + reserved
    payload.put_u32((config.sample_rate as u32) << 16);
    payload.put_slice(&esds);

    make_box(b"mp4a", &payload)
}

fn build_stsd(sample_entry: &[u8]) -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_slice(&full_box_header(0, 0));
    payload.put_u32(1); // entry_count
    payload.put_slice(sample_entry);
    make_box(b"stsd", &payload)
}

fn build_stbl(sample_entry: &[u8]) -> BytesMut {
    let stsd = build_stsd(sample_entry);
    let stts = build_empty_stts();
    let stsc = build_empty_stsc();
    let stsz = build_empty_stsz();
    let stco = build_empty_stco();

    let mut payload = BytesMut::with_capacity(
        stsd.len() + stts.len() + stsc.len() + stsz.len() + stco.len(),
    );
    payload.put_slice(&stsd);
    payload.put_slice(&stts);
    payload.put_slice(&stsc);
    payload.put_slice(&stsz);
    payload.put_slice(&stco);
    make_box(b"stbl", &payload)
}

fn build_minf_video(config: &VideoInitConfig) -> BytesMut {
    let vmhd = build_vmhd();
    let dinf = build_dinf();
    let entry = build_avc1_sample_entry(config);
    let stbl = build_stbl(&entry);

    let mut payload = BytesMut::with_capacity(vmhd.len() + dinf.len() + stbl.len());
    payload.put_slice(&vmhd);
    payload.put_slice(&dinf);
    payload.put_slice(&stbl);
    make_box(b"minf", &payload)
}

fn build_minf_audio(config: &AudioInitConfig) -> BytesMut {
    let smhd = build_smhd();
    let dinf = build_dinf();
    let entry = build_mp4a_sample_entry(config);
    let stbl = build_stbl(&entry);

    let mut payload = BytesMut::with_capacity(smhd.len() + dinf.len() + stbl.len());
    payload.put_slice(&smhd);
    payload.put_slice(&dinf);
    payload.put_slice(&stbl);
    make_box(b"minf", &payload)
}

fn build_mdia_video(config: &VideoInitConfig) -> BytesMut {
    let mdhd = build_mdhd(config.timescale);
    let hdlr = build_hdlr(b"vide", "VideoHandler");
    let minf = build_minf_video(config);
    let mut payload = BytesMut::with_capacity(mdhd.len() + hdlr.len() + minf.len());
    payload.put_slice(&mdhd);
    payload.put_slice(&hdlr);
    payload.put_slice(&minf);
    make_box(b"mdia", &payload)
}

fn build_mdia_audio(config: &AudioInitConfig) -> BytesMut {
    let mdhd = build_mdhd(config.timescale);
    let hdlr = build_hdlr(b"soun", "SoundHandler");
    let minf = build_minf_audio(config);
    let mut payload = BytesMut::with_capacity(mdhd.len() + hdlr.len() + minf.len());
    payload.put_slice(&mdhd);
    payload.put_slice(&hdlr);
    payload.put_slice(&minf);
    make_box(b"mdia", &payload)
}

fn build_trak_video(config: &VideoInitConfig) -> BytesMut {
    let tkhd = build_tkhd(config.track_id, config.width, config.height);
    let mdia = build_mdia_video(config);
    let mut payload = BytesMut::with_capacity(tkhd.len() + mdia.len());
    payload.put_slice(&tkhd);
    payload.put_slice(&mdia);
    make_box(b"trak", &payload)
}

fn build_trak_audio(config: &AudioInitConfig) -> BytesMut {
    let tkhd = build_tkhd(config.track_id, 0, 0);
    let mdia = build_mdia_audio(config);
    let mut payload = BytesMut::with_capacity(tkhd.len() + mdia.len());
    payload.put_slice(&tkhd);
    payload.put_slice(&mdia);
    make_box(b"trak", &payload)
}

fn build_trex(track_id: u32) -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_slice(&full_box_header(0, 0));
    payload.put_u32(track_id);
    payload.put_u32(1); // default_sample_description_index
    payload.put_u32(0); // default_sample_duration
    payload.put_u32(0); // default_sample_size
    payload.put_u32(0); // default_sample_flags
    make_box(b"trex", &payload)
}

fn build_mvex(track_id: u32) -> BytesMut {
    make_box(b"mvex", &build_trex(track_id))
}

fn build_moov_video(config: &VideoInitConfig) -> BytesMut {
    let mvhd = build_mvhd(config.timescale, config.track_id + 1);
    let trak = build_trak_video(config);
    let mvex = build_mvex(config.track_id);
    let mut payload = BytesMut::with_capacity(mvhd.len() + trak.len() + mvex.len());
    payload.put_slice(&mvhd);
    payload.put_slice(&trak);
    payload.put_slice(&mvex);
    make_box(b"moov", &payload)
}

fn build_moov_audio(config: &AudioInitConfig) -> BytesMut {
    let mvhd = build_mvhd(config.timescale, config.track_id + 1);
    let trak = build_trak_audio(config);
    let mvex = build_mvex(config.track_id);
    let mut payload = BytesMut::with_capacity(mvhd.len() + trak.len() + mvex.len());
    payload.put_slice(&mvhd);
    payload.put_slice(&trak);
    payload.put_slice(&mvex);
    make_box(b"moov", &payload)
}

fn locators(frames: &[EncodedFrame], timescale: u32) -> Vec<SampleLocator> {
    frames
        .iter()
        .map(|f| {
            let duration = f.duration.rescale(timescale).num.max(0) as u32;
            let dts = f.timestamp.rescale(timescale);
            let pts = f.timestamp.rescale(timescale); // pre-encoded frames carry PTS==DTS here
            SampleLocator {
                size: f.data.len() as u32,
                duration,
                is_sync: f.is_keyframe || f.codec.is_audio(),
                cts_offset: (pts.num - dts.num) as i32,
            }
        })
        .collect()
}

fn build_tfhd(track_id: u32) -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_slice(&full_box_header(0, 0x020000)); // default-base-is-moof
    payload.put_u32(track_id);
    make_box(b"tfhd", &payload)
}

fn build_tfdt(base_decode_time: u64) -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_slice(&full_box_header(1, 0));
    payload.put_u64(base_decode_time);
    make_box(b"tfdt", &payload)
}

/// Builds `trun` and returns (box_bytes, offset_of_data_offset_field_within_box).
fn build_trun(locators: &[SampleLocator], needs_cts: bool) -> (BytesMut, usize) {
    let needs_flags = locators.iter().any(|l| !l.is_sync);
    let mut flags: u32 = 0x000001 | 0x000100 | 0x000200;
    if needs_flags {
        flags |= 0x000400;
    }
    if needs_cts {
        flags |= 0x000800;
    }

    let mut payload = BytesMut::new();
    payload.put_slice(&full_box_header(0, flags));
    payload.put_u32(locators.len() as u32);

    let data_offset_pos = 8 /* full box header */ + payload.len();
    payload.put_i32(0); // data_offset placeholder, patched by caller

    for loc in locators {
        payload.put_u32(loc.duration);
        payload.put_u32(loc.size);
        if needs_flags {
            let sample_flags: u32 = if loc.is_sync { 0x02000000 } else { 0x01010000 };
            payload.put_u32(sample_flags);
        }
        if needs_cts {
            payload.put_i32(loc.cts_offset);
        }
    }

    (make_box(b"trun", &payload), data_offset_pos)
}

fn build_fragment(
    frames: &[EncodedFrame],
    track_id: u32,
    sequence_number: u32,
    timescale: u32,
) -> BytesMut {
    let locs = locators(frames, timescale);
    let base_decode_time = frames
        .first()
        .map(|f| f.timestamp.rescale(timescale).num.max(0) as u64)
        .unwrap_or(0);

    let tfhd = build_tfhd(track_id);
    let tfdt = build_tfdt(base_decode_time);
    let needs_cts = locs.iter().any(|l| l.cts_offset != 0);
    let (trun, data_offset_pos_in_trun) = build_trun(&locs, needs_cts);

    let mut traf_payload = BytesMut::with_capacity(tfhd.len() + tfdt.len() + trun.len());
    traf_payload.put_slice(&tfhd);
    traf_payload.put_slice(&tfdt);
    let trun_offset_in_traf_payload = traf_payload.len();
    traf_payload.put_slice(&trun);
    let traf = make_box(b"traf", &traf_payload);

    let mut mfhd_payload = BytesMut::new();
    mfhd_payload.put_slice(&full_box_header(0, 0));
    mfhd_payload.put_u32(sequence_number);
    let mfhd = make_box(b"mfhd", &mfhd_payload);

    let mut moof_payload = BytesMut::with_capacity(mfhd.len() + traf.len());
    moof_payload.put_slice(&mfhd);
    let traf_offset_in_moof_payload = moof_payload.len();
    moof_payload.put_slice(&traf);
    let mut moof = make_box(b"moof", &moof_payload);

    let moof_size = moof.len();
    let data_offset_val = moof_size as u32 + 8; // mdat header

    // box header(8) + mfhd + box header(8, traf) + tfhd + tfdt + box header(8, trun)
    //   + full_box_header(4) + sample_count(4) -> data_offset field
    let data_offset_field_abs =
        8 + traf_offset_in_moof_payload + 8 + trun_offset_in_traf_payload + data_offset_pos_in_trun;
    BigEndian::write_i32(
        &mut moof[data_offset_field_abs..data_offset_field_abs + 4],
        data_offset_val as i32,
    );

    let total_data: usize = locs.iter().map(|l| l.size as usize).sum();
    let mut mdat_payload = BytesMut::with_capacity(total_data);
    for frame in frames {
        mdat_payload.put_slice(&frame.data);
    }
    let mdat = make_box(b"mdat", &mdat_payload);

    let mut out = BytesMut::with_capacity(moof.len() + mdat.len());
    out.put_slice(&moof);
    out.put_slice(&mdat);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaTimestamp;

    fn frame(ts: i64, dur: i64, keyframe: bool, size: usize) -> EncodedFrame {
        EncodedFrame {
            data: Bytes::from(vec![0xAB; size]),
            timestamp: MediaTimestamp::new(ts, 48_000),
            duration: MediaTimestamp::new(dur, 48_000),
            is_keyframe: keyframe,
            codec: Codec::Aac,
        }
    }

    #[test]
    fn audio_init_has_ftyp_and_moov() {
        let config = AudioInitConfig {
            track_id: 1,
            timescale: 48_000,
            sample_rate: 48_000,
            channels: 2,
            audio_specific_config: vec![0x11, 0x90],
        };
        let init = CMAFWriter::build_audio_init(&config);
        assert_eq!(&init[4..8], b"ftyp");
        let ftyp_size = BigEndian::read_u32(&init[0..4]) as usize;
        assert_eq!(&init[ftyp_size + 4..ftyp_size + 8], b"moov");
    }

    #[test]
    fn video_init_has_avcc() {
        let config = VideoInitConfig {
            track_id: 0,
            timescale: 90_000,
            width: 1280,
            height: 720,
            sps: vec![0x67, 0x64, 0x00, 0x1f, 0x00],
            pps: vec![0x68, 0xeb, 0x8f],
        };
        let init = CMAFWriter::build_video_init(&config);
        assert!(find_box(&init, b"avcC").is_some());
        assert!(find_box(&init, b"avc1").is_some());
    }

    #[test]
    fn media_segment_box_order_and_mdat_size() {
        let frames = vec![frame(0, 1024, true, 1024), frame(1024, 1024, false, 1024), frame(2048, 1024, false, 1024)];
        let seg = CMAFWriter::build_media_segment(&frames, 2, 7, 48_000);
        assert_eq!(&seg[4..8], b"styp");
        let styp_size = BigEndian::read_u32(&seg[0..4]) as usize;
        assert_eq!(&seg[styp_size + 4..styp_size + 8], b"moof");
        let moof_size = BigEndian::read_u32(&seg[styp_size..styp_size + 4]) as usize;
        let mdat_start = styp_size + moof_size;
        assert_eq!(&seg[mdat_start + 4..mdat_start + 8], b"mdat");
        let mdat_size = BigEndian::read_u32(&seg[mdat_start..mdat_start + 4]) as usize;
        assert_eq!(mdat_size, 8 + 3 * 1024);
    }

    #[test]
    fn partial_segment_has_no_styp() {
        let frames = vec![frame(0, 1024, true, 512)];
        let part = CMAFWriter::build_partial_segment(&frames, 1, 0, 48_000);
        assert_eq!(&part[4..8], b"moof");
    }

    fn find_box<'a>(data: &'a [u8], typ: &[u8; 4]) -> Option<&'a [u8]> {
        let mut pos = 0;
        while pos + 8 <= data.len() {
            let size = BigEndian::read_u32(&data[pos..pos + 4]) as usize;
            if size < 8 || pos + size > data.len() {
                break;
            }
            if &data[pos + 4..pos + 8] == typ {
                return Some(&data[pos..pos + size]);
            }
            // descend into container boxes
            if matches!(typ, b"avcC" | b"avc1" | b"stsd" | b"stbl" | b"minf" | b"mdia" | b"trak" | b"moov")
            {
                if let Some(found) = find_box(&data[pos + 8..pos + size], typ) {
                    return Some(found);
                }
            }
            pos += size;
        }
        None
    }
}
