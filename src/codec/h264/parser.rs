use super::types::SpsInfo;
use crate::error::{MuxError, Result};
use crate::utils::BitReader;

/// Strips emulation prevention bytes (`00 00 03` → `00 00`) to recover the RBSP.
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut zeros = 0;
    for &byte in data {
        if zeros >= 2 && byte == 0x03 {
            zeros = 0;
            continue;
        }
        zeros = if byte == 0 { zeros + 1 } else { 0 };
        out.push(byte);
    }
    out
}

const HIGH_PROFILES: [u8; 10] = [100, 110, 122, 244, 44, 83, 86, 118, 128, 138];

/// Parses an SPS NAL unit (header byte included) far enough to get the
/// cropped picture dimensions.
pub fn parse_sps(nal: &[u8]) -> Result<SpsInfo> {
    if nal.first().map(|h| h & 0x1F) != Some(7) {
        return Err(MuxError::Codec("not an H.264 SPS NAL unit".into()));
    }
    let rbsp = remove_emulation_prevention(&nal[1..]);
    let mut reader = BitReader::new(&rbsp);

    let profile_idc = reader.read_bits(8)? as u8;
    reader.skip_bits(8)?; // constraint_set flags + reserved_zero_2bits
    let level_idc = reader.read_bits(8)? as u8;
    reader.read_golomb()?; // seq_parameter_set_id

    let mut chroma_format_idc = 1;
    let mut separate_colour_plane = false;
    if HIGH_PROFILES.contains(&profile_idc) {
        chroma_format_idc = reader.read_golomb()?;
        if chroma_format_idc == 3 {
            separate_colour_plane = reader.read_flag()?;
        }
        reader.read_golomb()?; // bit_depth_luma_minus8
        reader.read_golomb()?; // bit_depth_chroma_minus8
        reader.read_flag()?; // qpprime_y_zero_transform_bypass_flag
        if reader.read_flag()? {
            let lists = if chroma_format_idc != 3 { 8 } else { 12 };
            for i in 0..lists {
                if reader.read_flag()? {
                    skip_scaling_list(&mut reader, if i < 6 { 16 } else { 64 })?;
                }
            }
        }
    }

    reader.read_golomb()?; // log2_max_frame_num_minus4
    match reader.read_golomb()? {
        0 => {
            reader.read_golomb()?; // log2_max_pic_order_cnt_lsb_minus4
        }
        1 => {
            reader.read_flag()?; // delta_pic_order_always_zero_flag
            reader.read_signed_golomb()?; // offset_for_non_ref_pic
            reader.read_signed_golomb()?; // offset_for_top_to_bottom_field
            for _ in 0..reader.read_golomb()? {
                reader.read_signed_golomb()?;
            }
        }
        _ => {}
    }

    reader.read_golomb()?; // max_num_ref_frames
    reader.read_flag()?; // gaps_in_frame_num_value_allowed_flag

    let width_in_mbs = reader.read_golomb()?.checked_add(1).ok_or_else(oversized)?;
    let height_in_map_units = reader.read_golomb()?.checked_add(1).ok_or_else(oversized)?;
    let frame_mbs_only = reader.read_flag()?;
    if !frame_mbs_only {
        reader.read_flag()?; // mb_adaptive_frame_field_flag
    }
    reader.read_flag()?; // direct_8x8_inference_flag

    let field_factor: u32 = if frame_mbs_only { 1 } else { 2 };
    let mut width = width_in_mbs.checked_mul(16).ok_or_else(oversized)?;
    let mut height = height_in_map_units
        .checked_mul(16 * field_factor)
        .ok_or_else(oversized)?;

    if reader.read_flag()? {
        let left = reader.read_golomb()?;
        let right = reader.read_golomb()?;
        let top = reader.read_golomb()?;
        let bottom = reader.read_golomb()?;

        let (crop_x, crop_y) = if chroma_format_idc == 0 || separate_colour_plane {
            (1, field_factor)
        } else {
            let sub_width = if chroma_format_idc == 3 { 1 } else { 2 };
            let sub_height = if chroma_format_idc == 1 { 2 } else { 1 };
            (sub_width, sub_height * field_factor)
        };
        let crop_width = left
            .checked_add(right)
            .and_then(|c| c.checked_mul(crop_x))
            .ok_or_else(oversized)?;
        let crop_height = top
            .checked_add(bottom)
            .and_then(|c| c.checked_mul(crop_y))
            .ok_or_else(oversized)?;
        width = width.saturating_sub(crop_width);
        height = height.saturating_sub(crop_height);
    }

    Ok(SpsInfo {
        profile_idc,
        level_idc,
        width,
        height,
    })
}

fn oversized() -> MuxError {
    MuxError::Codec("SPS picture dimensions out of range".into())
}

fn skip_scaling_list(reader: &mut BitReader, size: usize) -> Result<()> {
    let mut last_scale = 8i64;
    let mut next_scale = 8i64;
    for _ in 0..size {
        if next_scale != 0 {
            let delta = reader.read_signed_golomb()? as i64;
            next_scale = (last_scale + delta).rem_euclid(256);
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }
    Ok(())
}
