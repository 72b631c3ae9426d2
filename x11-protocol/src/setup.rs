//! Decoding of the connection setup success block.
//!
//! After an accepted handshake the server describes itself: release and
//! vendor, resource id allocation, image format parameters, the pixmap
//! formats it supports, and one entry per screen with its allowed depths and
//! visuals. The block is decoded here from the contiguous header+body buffer
//! produced by [`crate::handshake::read_setup_response`].
//!
//! All fields are little-endian, matching the byte order the client announced.

use crate::handshake::RESPONSE_HEADER_LEN;
use crate::io::pad;
use bytes::Buf;

/// Structured server setup information.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Setup {
    /// Response status (non-zero once accepted).
    pub status: u8,
    /// Server protocol major version.
    pub protocol_major_version: u16,
    /// Server protocol minor version.
    pub protocol_minor_version: u16,
    /// Vendor-specific release number.
    pub release_number: u32,
    /// Base value for resource ids the client allocates.
    pub resource_id_base: u32,
    /// Bits of a resource id the client may set.
    pub resource_id_mask: u32,
    /// Size of the pointer motion history buffer.
    pub motion_buffer_size: u32,
    /// Largest request accepted, in 4-byte units.
    pub maximum_request_length: u16,
    /// 0 for LSB first, 1 for MSB first.
    pub image_byte_order: u8,
    /// 0 for least significant bit first, 1 for most significant.
    pub bitmap_format_bit_order: u8,
    /// Bitmap scanline unit in bits.
    pub bitmap_format_scanline_unit: u8,
    /// Bitmap scanline padding in bits.
    pub bitmap_format_scanline_pad: u8,
    /// Smallest keycode the server reports.
    pub min_keycode: u8,
    /// Largest keycode the server reports.
    pub max_keycode: u8,
    /// Vendor name.
    pub vendor: String,
    /// Supported pixmap formats.
    pub pixmap_formats: Vec<Format>,
    /// Root screens, indexed by screen number.
    pub roots: Vec<Screen>,
}

/// A pixmap format supported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    /// Depth in bits.
    pub depth: u8,
    /// Bits per pixel at this depth.
    pub bits_per_pixel: u8,
    /// Scanline padding in bits.
    pub scanline_pad: u8,
}

/// A root screen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Screen {
    /// Root window id.
    pub root: u32,
    /// Default colormap id.
    pub default_colormap: u32,
    /// Pixel value for white in the default colormap.
    pub white_pixel: u32,
    /// Pixel value for black in the default colormap.
    pub black_pixel: u32,
    /// Event mask currently selected on the root window.
    pub current_input_masks: u32,
    /// Width in pixels.
    pub width_in_pixels: u16,
    /// Height in pixels.
    pub height_in_pixels: u16,
    /// Physical width.
    pub width_in_millimeters: u16,
    /// Physical height.
    pub height_in_millimeters: u16,
    /// Minimum number of installed colormaps.
    pub min_installed_maps: u16,
    /// Maximum number of installed colormaps.
    pub max_installed_maps: u16,
    /// Visual id of the root window.
    pub root_visual: u32,
    /// Backing store support: 0 never, 1 when mapped, 2 always.
    pub backing_stores: u8,
    /// Whether save-unders are supported.
    pub save_unders: bool,
    /// Depth of the root window.
    pub root_depth: u8,
    /// Depths windows may be created with on this screen.
    pub allowed_depths: Vec<Depth>,
}

/// A depth allowed on a screen and the visuals available at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Depth {
    /// Depth in bits.
    pub depth: u8,
    /// Visuals available at this depth.
    pub visuals: Vec<VisualType>,
}

/// A visual type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualType {
    /// Visual id.
    pub visual_id: u32,
    /// Visual class (StaticGray .. DirectColor, 0..=5).
    pub class: u8,
    /// Significant bits per color channel.
    pub bits_per_rgb_value: u8,
    /// Number of colormap entries.
    pub colormap_entries: u16,
    /// Red channel mask.
    pub red_mask: u32,
    /// Green channel mask.
    pub green_mask: u32,
    /// Blue channel mask.
    pub blue_mask: u32,
}

const SETUP_FIXED_LEN: usize = 32;
const FORMAT_LEN: usize = 8;
const SCREEN_FIXED_LEN: usize = 40;
const DEPTH_FIXED_LEN: usize = 8;
const VISUAL_LEN: usize = 24;

impl Setup {
    /// Decode the setup block from the full response buffer (8-byte header
    /// included).
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedEof` if the buffer ends before a declared field.
    pub fn decode(buffer: &[u8]) -> std::io::Result<Self> {
        let mut buf = buffer;

        need(buf, RESPONSE_HEADER_LEN, "setup header")?;
        let status = buf.get_u8();
        buf.advance(1);
        let protocol_major_version = buf.get_u16_le();
        let protocol_minor_version = buf.get_u16_le();
        buf.advance(2);

        need(buf, SETUP_FIXED_LEN, "setup block")?;
        let release_number = buf.get_u32_le();
        let resource_id_base = buf.get_u32_le();
        let resource_id_mask = buf.get_u32_le();
        let motion_buffer_size = buf.get_u32_le();
        let vendor_len = usize::from(buf.get_u16_le());
        let maximum_request_length = buf.get_u16_le();
        let roots_len = usize::from(buf.get_u8());
        let formats_len = usize::from(buf.get_u8());
        let image_byte_order = buf.get_u8();
        let bitmap_format_bit_order = buf.get_u8();
        let bitmap_format_scanline_unit = buf.get_u8();
        let bitmap_format_scanline_pad = buf.get_u8();
        let min_keycode = buf.get_u8();
        let max_keycode = buf.get_u8();
        buf.advance(4);

        need(buf, vendor_len + pad(vendor_len), "vendor")?;
        let vendor = String::from_utf8_lossy(&buf[..vendor_len]).into_owned();
        buf.advance(vendor_len + pad(vendor_len));

        let mut pixmap_formats = Vec::with_capacity(formats_len);
        for _ in 0..formats_len {
            need(buf, FORMAT_LEN, "pixmap format")?;
            let depth = buf.get_u8();
            let bits_per_pixel = buf.get_u8();
            let scanline_pad = buf.get_u8();
            buf.advance(5);
            pixmap_formats.push(Format {
                depth,
                bits_per_pixel,
                scanline_pad,
            });
        }

        let mut roots = Vec::with_capacity(roots_len);
        for _ in 0..roots_len {
            roots.push(decode_screen(&mut buf)?);
        }

        Ok(Self {
            status,
            protocol_major_version,
            protocol_minor_version,
            release_number,
            resource_id_base,
            resource_id_mask,
            motion_buffer_size,
            maximum_request_length,
            image_byte_order,
            bitmap_format_bit_order,
            bitmap_format_scanline_unit,
            bitmap_format_scanline_pad,
            min_keycode,
            max_keycode,
            vendor,
            pixmap_formats,
            roots,
        })
    }
}

fn decode_screen(buf: &mut &[u8]) -> std::io::Result<Screen> {
    need(buf, SCREEN_FIXED_LEN, "screen")?;
    let mut screen = Screen {
        root: buf.get_u32_le(),
        default_colormap: buf.get_u32_le(),
        white_pixel: buf.get_u32_le(),
        black_pixel: buf.get_u32_le(),
        current_input_masks: buf.get_u32_le(),
        width_in_pixels: buf.get_u16_le(),
        height_in_pixels: buf.get_u16_le(),
        width_in_millimeters: buf.get_u16_le(),
        height_in_millimeters: buf.get_u16_le(),
        min_installed_maps: buf.get_u16_le(),
        max_installed_maps: buf.get_u16_le(),
        root_visual: buf.get_u32_le(),
        backing_stores: buf.get_u8(),
        save_unders: buf.get_u8() != 0,
        root_depth: buf.get_u8(),
        allowed_depths: Vec::new(),
    };
    let depths_len = usize::from(buf.get_u8());

    screen.allowed_depths.reserve(depths_len);
    for _ in 0..depths_len {
        need(buf, DEPTH_FIXED_LEN, "depth")?;
        let depth = buf.get_u8();
        buf.advance(1);
        let visuals_len = usize::from(buf.get_u16_le());
        buf.advance(4);

        need(buf, visuals_len * VISUAL_LEN, "visuals")?;
        let mut visuals = Vec::with_capacity(visuals_len);
        for _ in 0..visuals_len {
            let visual = VisualType {
                visual_id: buf.get_u32_le(),
                class: buf.get_u8(),
                bits_per_rgb_value: buf.get_u8(),
                colormap_entries: buf.get_u16_le(),
                red_mask: buf.get_u32_le(),
                green_mask: buf.get_u32_le(),
                blue_mask: buf.get_u32_le(),
            };
            buf.advance(4);
            visuals.push(visual);
        }
        screen.allowed_depths.push(Depth { depth, visuals });
    }

    Ok(screen)
}

fn need(buf: &[u8], n: usize, what: &str) -> std::io::Result<()> {
    if buf.len() < n {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("truncated {}: need {} bytes, have {}", what, n, buf.len()),
        ));
    }
    Ok(())
}

/// Builds setup blocks in wire format. Used by tests across the workspace to
/// play the server side of a handshake.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;
    use bytes::BufMut;

    /// Encode a complete success response (header and body) for `setup`.
    pub fn encode_success(setup: &Setup) -> Vec<u8> {
        let mut body = Vec::new();
        body.put_u32_le(setup.release_number);
        body.put_u32_le(setup.resource_id_base);
        body.put_u32_le(setup.resource_id_mask);
        body.put_u32_le(setup.motion_buffer_size);
        body.put_u16_le(setup.vendor.len() as u16);
        body.put_u16_le(setup.maximum_request_length);
        body.put_u8(setup.roots.len() as u8);
        body.put_u8(setup.pixmap_formats.len() as u8);
        body.put_u8(setup.image_byte_order);
        body.put_u8(setup.bitmap_format_bit_order);
        body.put_u8(setup.bitmap_format_scanline_unit);
        body.put_u8(setup.bitmap_format_scanline_pad);
        body.put_u8(setup.min_keycode);
        body.put_u8(setup.max_keycode);
        body.put_bytes(0, 4);
        body.put_slice(setup.vendor.as_bytes());
        body.put_bytes(0, pad(setup.vendor.len()));

        for format in &setup.pixmap_formats {
            body.put_u8(format.depth);
            body.put_u8(format.bits_per_pixel);
            body.put_u8(format.scanline_pad);
            body.put_bytes(0, 5);
        }

        for screen in &setup.roots {
            body.put_u32_le(screen.root);
            body.put_u32_le(screen.default_colormap);
            body.put_u32_le(screen.white_pixel);
            body.put_u32_le(screen.black_pixel);
            body.put_u32_le(screen.current_input_masks);
            body.put_u16_le(screen.width_in_pixels);
            body.put_u16_le(screen.height_in_pixels);
            body.put_u16_le(screen.width_in_millimeters);
            body.put_u16_le(screen.height_in_millimeters);
            body.put_u16_le(screen.min_installed_maps);
            body.put_u16_le(screen.max_installed_maps);
            body.put_u32_le(screen.root_visual);
            body.put_u8(screen.backing_stores);
            body.put_u8(u8::from(screen.save_unders));
            body.put_u8(screen.root_depth);
            body.put_u8(screen.allowed_depths.len() as u8);
            for depth in &screen.allowed_depths {
                body.put_u8(depth.depth);
                body.put_u8(0);
                body.put_u16_le(depth.visuals.len() as u16);
                body.put_bytes(0, 4);
                for visual in &depth.visuals {
                    body.put_u32_le(visual.visual_id);
                    body.put_u8(visual.class);
                    body.put_u8(visual.bits_per_rgb_value);
                    body.put_u16_le(visual.colormap_entries);
                    body.put_u32_le(visual.red_mask);
                    body.put_u32_le(visual.green_mask);
                    body.put_u32_le(visual.blue_mask);
                    body.put_bytes(0, 4);
                }
            }
        }

        let mut out = Vec::with_capacity(RESPONSE_HEADER_LEN + body.len());
        out.put_u8(setup.status.max(1));
        out.put_u8(0);
        out.put_u16_le(setup.protocol_major_version);
        out.put_u16_le(setup.protocol_minor_version);
        out.put_u16_le((body.len() / 4) as u16);
        out.extend_from_slice(&body);
        out
    }

    /// A plausible single-screen setup with `screens` identical roots.
    pub fn sample_setup(screens: usize) -> Setup {
        let visual = VisualType {
            visual_id: 0x21,
            class: 4,
            bits_per_rgb_value: 8,
            colormap_entries: 256,
            red_mask: 0xff_0000,
            green_mask: 0x00_ff00,
            blue_mask: 0x00_00ff,
        };
        let screen = Screen {
            root: 0x0000_01e6,
            default_colormap: 0x20,
            white_pixel: 0x00ff_ffff,
            black_pixel: 0,
            current_input_masks: 0,
            width_in_pixels: 1920,
            height_in_pixels: 1080,
            width_in_millimeters: 508,
            height_in_millimeters: 285,
            min_installed_maps: 1,
            max_installed_maps: 1,
            root_visual: 0x21,
            backing_stores: 0,
            save_unders: false,
            root_depth: 24,
            allowed_depths: vec![
                Depth {
                    depth: 24,
                    visuals: vec![visual],
                },
                Depth {
                    depth: 1,
                    visuals: Vec::new(),
                },
            ],
        };
        Setup {
            status: 1,
            protocol_major_version: 11,
            protocol_minor_version: 0,
            release_number: 12_101_004,
            resource_id_base: 0x0400_0000,
            resource_id_mask: 0x001f_ffff,
            motion_buffer_size: 256,
            maximum_request_length: 65535,
            image_byte_order: 0,
            bitmap_format_bit_order: 0,
            bitmap_format_scanline_unit: 32,
            bitmap_format_scanline_pad: 32,
            min_keycode: 8,
            max_keycode: 255,
            vendor: "The X.Org Foundation".to_string(),
            pixmap_formats: vec![
                Format {
                    depth: 1,
                    bits_per_pixel: 1,
                    scanline_pad: 32,
                },
                Format {
                    depth: 24,
                    bits_per_pixel: 32,
                    scanline_pad: 32,
                },
            ],
            roots: vec![screen; screens],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{encode_success, sample_setup};
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_sample_setup() {
        let expected = sample_setup(2);
        let wire = encode_success(&expected);
        assert_eq!(wire.len() % 4, 0);

        let decoded = Setup::decode(&wire).unwrap();
        assert_eq!(decoded, expected);
        assert_eq!(decoded.vendor, "The X.Org Foundation");
        assert_eq!(decoded.roots.len(), 2);
        assert_eq!(decoded.roots[0].allowed_depths[0].visuals.len(), 1);
    }

    #[test]
    fn test_vendor_padding_respected() {
        let mut setup = sample_setup(1);
        setup.vendor = "abcde".to_string();
        let decoded = Setup::decode(&encode_success(&setup)).unwrap();
        assert_eq!(decoded.vendor, "abcde");
        assert_eq!(decoded.pixmap_formats, setup.pixmap_formats);
    }

    #[test]
    fn test_truncated_block() {
        let wire = encode_success(&sample_setup(1));
        let err = Setup::decode(&wire[..wire.len() - 10]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_header_only_is_truncated() {
        let err = Setup::decode(&[1, 0, 11, 0, 0, 0, 0, 0]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
